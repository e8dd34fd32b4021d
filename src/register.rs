//! Register a generator command for a path and commit the result.

use crate::Result;
use crate::annex::AnnexRepo;
use crate::config::RemoteConfig;
use crate::spec::{self, GenerationSpec};

use anyhow::Context;
use std::path::PathBuf;
use tracing::{debug, info};

/// Longest command summary used as a commit subject before it is cut.
const SUMMARY_MAX_CHARS: usize = 40;

#[derive(Debug, Clone)]
pub struct Registration {
    /// Program and arguments; the output path is appended at generation time.
    pub command: Vec<String>,
    /// Output path, relative to the dataset root.
    pub path: PathBuf,
    pub inputs: Vec<String>,
    /// Commit subject; defaults to a summary of the command.
    pub message: Option<String>,
}

/// Attach a getexec locator to `registration.path`, generate the file once
/// through git-annex, and commit it. Returns the locator.
pub fn register(
    repo: &AnnexRepo,
    config: &RemoteConfig,
    registration: &Registration,
) -> Result<String> {
    let spec = GenerationSpec::new(registration.command.clone(), registration.inputs.clone())?;
    debug!(?spec, "generation spec");
    let locator = spec::encode(&spec)?;
    debug!(%locator, "locator");

    ensure_special_remote(repo, config)?;

    info!(path = %registration.path.display(), "registering generator");
    repo.add_url_to_file(&registration.path, &locator)
        .with_context(|| format!("generate {}", registration.path.display()))?;

    let message = commit_message(&spec, registration.message.as_deref())?;
    repo.commit(&registration.path, &message)
        .with_context(|| format!("commit {}", registration.path.display()))?;
    Ok(locator)
}

/// Initialize the special remote, or enable it if it is known but disabled.
pub fn ensure_special_remote(repo: &AnnexRepo, config: &RemoteConfig) -> Result<()> {
    let enabled = repo
        .annex_remote_uuids()?
        .into_iter()
        .find(|(_, uuid)| *uuid == config.uuid);
    if let Some((name, _)) = enabled {
        debug!(%name, "special remote is enabled");
        return Ok(());
    }

    if repo.enable_remote(&config.name).is_ok() {
        debug!(name = %config.name, "special remote found, enabled");
        return Ok(());
    }

    info!(name = %config.name, "initializing special remote");
    repo.init_remote(&config.name, &config.initremote_params())
        .with_context(|| format!("initialize special remote {}", config.name))
}

/// `'prog' 'arg1' ...`, cut to 40 characters with a trailing ` ...`.
pub fn command_summary(command: &[String]) -> String {
    let full = format!("'{}'", command.join("' '"));
    if full.chars().count() <= SUMMARY_MAX_CHARS {
        full
    } else {
        let cut: String = full.chars().take(SUMMARY_MAX_CHARS).collect();
        format!("{} ...", cut)
    }
}

/// Commit message carrying the full spec as a machine-readable record.
pub fn commit_message(spec: &GenerationSpec, message: Option<&str>) -> Result<String> {
    let subject = match message {
        Some(m) => m.to_string(),
        None => command_summary(spec.command()),
    };
    Ok(format!(
        "[GETEXEC] {}\n\n=== Do not change lines below ===\n{}\n^^^ Do not change lines above ^^^\n",
        subject,
        spec.to_record()?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn short_summary_is_kept_whole() {
        assert_eq!(
            command_summary(&strings(&["code/script.sh", "in.txt"])),
            "'code/script.sh' 'in.txt'"
        );
    }

    #[test]
    fn long_summary_is_cut_at_forty_chars() {
        let summary = command_summary(&strings(&[
            "bash",
            "-c",
            r#"printf "Hello World!" > "$1""#,
            "test-cmd",
        ]));
        assert_eq!(summary, r#"'bash' '-c' 'printf "Hello World!" > "$1 ..."#);
    }

    #[test]
    fn summary_counts_characters_not_bytes() {
        let summary = command_summary(&strings(&["\u{e9}".repeat(50).as_str()]));
        assert_eq!(summary.chars().count(), SUMMARY_MAX_CHARS + 4);
    }

    #[test]
    fn commit_message_embeds_record() {
        let spec = GenerationSpec::new(strings(&["true"]), vec![]).unwrap();
        assert_eq!(
            commit_message(&spec, None).unwrap(),
            "[GETEXEC] 'true'\n\n\
             === Do not change lines below ===\n\
             {\n \"cmd\": [\n  \"true\"\n ],\n \"inputs\": []\n}\n\
             ^^^ Do not change lines above ^^^\n"
        );
    }

    #[test]
    fn explicit_message_replaces_summary() {
        let spec = GenerationSpec::new(strings(&["true"]), strings(&["a.txt"])).unwrap();
        let msg = commit_message(&spec, Some("make output")).unwrap();
        assert!(msg.starts_with("[GETEXEC] make output\n\n"));
        assert!(msg.contains("\"a.txt\""));
    }
}
