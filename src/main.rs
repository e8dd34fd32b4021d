use clap::{Parser, Subcommand};
use std::path::PathBuf;

use getexec::Result;
use getexec::annex::AnnexRepo;
use getexec::config::RemoteConfig;
use getexec::register::{self, Registration};

#[derive(Parser)]
#[command(name = "getexec")]
#[command(about = "Register commands that regenerate annexed files on demand", long_about = None)]
struct Cli {
    /// Dataset to work in; defaults to the one containing the current directory.
    #[arg(short = 'd', long, global = true)]
    dataset: Option<PathBuf>,

    /// Log at info level.
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Log at debug level.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get a file by executing a command and register the command for future
    /// retrievals.
    ///
    /// The command runs without a shell; the output path is appended as its
    /// last argument.
    Register {
        /// Output file, relative to the dataset root.
        #[arg(short = 'O', long)]
        path: PathBuf,

        /// File that must be present before the command runs (repeatable).
        #[arg(short = 'i', long = "input", value_name = "PATH")]
        inputs: Vec<String>,

        /// Commit message; defaults to a summary of the command.
        #[arg(short = 'm', long)]
        message: Option<String>,

        /// Program followed by its arguments.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    getexec::logging::init(cli.verbose, cli.debug);

    let start = match cli.dataset {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let repo = AnnexRepo::discover(&start)?;

    match cli.cmd {
        Commands::Register {
            path,
            inputs,
            message,
            command,
        } => {
            let registration = Registration {
                command,
                path,
                inputs,
                message,
            };
            let locator = register::register(&repo, &RemoteConfig::default(), &registration)?;
            println!("Registered {} ({})", registration.path.display(), locator);
        }
    }

    Ok(())
}
