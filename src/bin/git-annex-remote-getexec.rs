//! git-annex external special remote entry point.
//!
//! git-annex starts this program from the repository root and talks to it
//! over stdin/stdout. Logging goes to stderr (see `GETEXEC_LOG`).

use getexec::Result;
use getexec::Remote;
use getexec::annex::AnnexRepo;
use getexec::remote::protocol::{self, Channel};

use std::io;

fn main() -> Result<()> {
    getexec::logging::init(false, false);

    let repo = AnnexRepo::new(std::env::current_dir()?);
    let remote = Remote::default();
    let mut channel = Channel::new(io::stdin().lock(), io::stdout().lock());
    protocol::serve(&remote, &repo, &mut channel)
}
