//! Thin wrapper over the `git` / `git annex` command line for one dataset.
//!
//! Every call runs with stdin closed and stdout captured, so it is safe to
//! use from inside the special remote process.

use crate::Result;
use crate::resolve::DependencyKey;

use anyhow::{Context, bail};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct AnnexRepo {
    root: PathBuf,
}

impl AnnexRepo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open the dataset containing `dir` (its git top-level directory).
    pub fn discover(dir: &Path) -> Result<Self> {
        let out = Self::new(dir).git_checked(&["rev-parse", "--show-toplevel"])?;
        Ok(Self::new(out.trim_end_matches('\n')))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn git(&self, args: &[&str]) -> Result<Output> {
        debug!(?args, root = %self.root.display(), "running git");
        Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("run git {}", args.join(" ")))
    }

    /// Run git and return stdout, failing on a nonzero exit.
    fn git_checked(&self, args: &[&str]) -> Result<String> {
        let out = self.git(args)?;
        if !out.status.success() {
            bail!(
                "git {} failed ({}): {}",
                args.join(" "),
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }

    /// Map a dataset-relative path to its annex key.
    pub fn lookup_key(&self, path: &str) -> Result<DependencyKey> {
        let out = self.git(&["annex", "lookupkey", "--", path])?;
        if out.status.success() {
            let key = String::from_utf8_lossy(&out.stdout).trim_end().to_string();
            if !key.is_empty() {
                return Ok(DependencyKey::Annexed(key));
            }
        }

        let tracked = self.git(&["ls-files", "--error-unmatch", "--", path])?;
        if tracked.status.success() {
            Ok(DependencyKey::Tracked)
        } else {
            Ok(DependencyKey::Unknown)
        }
    }

    /// Whether the content of `key` is in the local annex.
    pub fn content_present(&self, key: &str) -> Result<bool> {
        Ok(self.git(&["annex", "contentlocation", key])?.status.success())
    }

    /// Fetch all `paths` with a single `git annex get`.
    pub fn get(&self, paths: &[String]) -> Result<()> {
        let mut args = vec!["annex", "get", "--"];
        args.extend(paths.iter().map(String::as_str));
        let out = self.git_checked(&args)?;
        debug!(output = %out.trim_end(), "git annex get");
        Ok(())
    }

    /// `(remote name, annex uuid)` for every remote with a configured uuid.
    pub fn annex_remote_uuids(&self) -> Result<Vec<(String, String)>> {
        let out = self.git(&["config", "--get-regexp", r"^remote\..*\.annex-uuid$"])?;
        // Exit code 1 just means no matching keys.
        if !out.status.success() && out.status.code() != Some(1) {
            bail!(
                "git config failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(parse_remote_uuids(&String::from_utf8_lossy(&out.stdout)))
    }

    pub fn enable_remote(&self, name: &str) -> Result<()> {
        self.git_checked(&["annex", "enableremote", name])?;
        Ok(())
    }

    pub fn init_remote(&self, name: &str, params: &[String]) -> Result<()> {
        let mut args = vec!["annex", "initremote", name];
        args.extend(params.iter().map(String::as_str));
        self.git_checked(&args)?;
        Ok(())
    }

    /// Record `url` for `path`; git-annex downloads it right away, which runs
    /// the claiming special remote.
    pub fn add_url_to_file(&self, path: &Path, url: &str) -> Result<()> {
        let file = format!("--file={}", path.display());
        self.git_checked(&["annex", "addurl", &file, "--", url])?;
        Ok(())
    }

    pub fn commit(&self, path: &Path, message: &str) -> Result<()> {
        let path = path.to_string_lossy();
        self.git_checked(&["commit", "--quiet", "-m", message, "--", &path])?;
        Ok(())
    }
}

/// Parse `git config --get-regexp` output of `remote.<name>.annex-uuid <uuid>`.
fn parse_remote_uuids(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let (config_key, uuid) = line.split_once(' ')?;
            let name = config_key
                .strip_prefix("remote.")?
                .strip_suffix(".annex-uuid")?;
            Some((name.to_string(), uuid.trim().to_string()))
        })
        .collect()
}
