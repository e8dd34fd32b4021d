//! git-annex external special remote protocol (line based, stdin/stdout).
//!
//! Session shape:
//!
//! remote -> VERSION 1
//! annex  -> EXTENSIONS INFO ...      remote -> EXTENSIONS INFO
//! annex  -> PREPARE                  remote -> PREPARE-SUCCESS
//! annex  -> TRANSFER RETRIEVE <key> <file>
//!   remote -> GETURLS <key> getexec:
//!   annex  -> VALUE <url>  (repeated)   VALUE
//!   remote -> TRANSFER-SUCCESS RETRIEVE <key>
//!
//! All decisions are delegated to [`Remote`]; this module only parses and
//! formats lines.

use crate::Result;
use crate::annex::AnnexRepo;
use crate::remote::{Host, Remote};
use crate::resolve::{DependencyKey, DependencyStore};
use crate::spec;

use anyhow::{Context, bail};
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{debug, warn};

/// A parsed request from git-annex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Extensions(Vec<String>),
    InitRemote,
    Prepare,
    ClaimUrl(String),
    CheckUrl(String),
    CheckPresent(String),
    TransferRetrieve { key: String, file: String },
    TransferStore { key: String },
    Remove(String),
    Error(String),
    Unsupported(String),
}

impl Request {
    pub fn parse(line: &str) -> Self {
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        match verb {
            "EXTENSIONS" => Self::Extensions(rest.split_whitespace().map(str::to_string).collect()),
            "INITREMOTE" => Self::InitRemote,
            "PREPARE" => Self::Prepare,
            "CLAIMURL" if !rest.is_empty() => Self::ClaimUrl(rest.to_string()),
            "CHECKURL" if !rest.is_empty() => Self::CheckUrl(rest.to_string()),
            "CHECKPRESENT" if !rest.is_empty() => Self::CheckPresent(rest.to_string()),
            "REMOVE" if !rest.is_empty() => Self::Remove(rest.to_string()),
            "ERROR" => Self::Error(rest.to_string()),
            "TRANSFER" => {
                // The file name is last and may contain spaces.
                let mut parts = rest.splitn(3, ' ');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some("RETRIEVE"), Some(key), Some(file)) if !file.is_empty() => {
                        Self::TransferRetrieve {
                            key: key.to_string(),
                            file: file.to_string(),
                        }
                    }
                    (Some("STORE"), Some(key), _) => Self::TransferStore {
                        key: key.to_string(),
                    },
                    _ => Self::Unsupported(line.to_string()),
                }
            }
            _ => Self::Unsupported(line.to_string()),
        }
    }
}

/// Line transport to git-annex.
pub struct Channel<R, W> {
    reader: R,
    writer: W,
    /// Set once git-annex announced the INFO extension.
    info: bool,
}

impl<R: BufRead, W: Write> Channel<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            info: false,
        }
    }

    pub fn send(&mut self, line: &str) -> Result<()> {
        debug!(line, "-> annex");
        writeln!(self.writer, "{}", line).context("write to git-annex")?;
        self.writer.flush().context("flush to git-annex")
    }

    /// Next line from git-annex, `None` at end of input.
    pub fn recv(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .context("read from git-annex")?;
        if n == 0 {
            return Ok(None);
        }
        let line = line.trim_end_matches(['\n', '\r']).to_string();
        debug!(line = %line, "<- annex");
        Ok(Some(line))
    }

    /// `GETURLS`: all urls recorded for `key` starting with `prefix`.
    pub fn get_urls(&mut self, key: &str, prefix: &str) -> Result<Vec<String>> {
        self.send(&format!("GETURLS {} {}", key, prefix))?;
        let mut urls = Vec::new();
        loop {
            let Some(line) = self.recv()? else {
                bail!("git-annex closed the connection during GETURLS");
            };
            match line.strip_prefix("VALUE") {
                Some("") => return Ok(urls),
                Some(rest) if rest.starts_with(' ') => {
                    let url = rest[1..].to_string();
                    if url.is_empty() {
                        return Ok(urls);
                    }
                    urls.push(url);
                }
                _ => bail!("unexpected reply to GETURLS: {:?}", line),
            }
        }
    }

    /// Show a message to the user (INFO), or log it (DEBUG) for hosts without
    /// the INFO extension.
    pub fn info(&mut self, message: &str) -> Result<()> {
        let single_line = message.replace(['\n', '\r'], " ");
        if self.info {
            self.send(&format!("INFO {}", single_line))
        } else {
            self.send(&format!("DEBUG {}", single_line))
        }
    }
}

/// Host view of one transfer: locators come over the channel, dependency
/// lookups and fetches go through git.
struct TransferHost<'a, R, W> {
    channel: &'a mut Channel<R, W>,
    repo: &'a AnnexRepo,
}

impl<R: BufRead, W: Write> DependencyStore for TransferHost<'_, R, W> {
    fn lookup_key(&mut self, path: &str) -> anyhow::Result<DependencyKey> {
        self.repo.lookup_key(path)
    }

    fn locators(&mut self, key: &str) -> anyhow::Result<Vec<String>> {
        self.channel.get_urls(key, spec::SCHEME)
    }

    fn content_present(&mut self, key: &str) -> anyhow::Result<bool> {
        self.repo.content_present(key)
    }

    fn fetch(&mut self, paths: &[String]) -> anyhow::Result<()> {
        self.channel.info(&format!("fetching inputs: {:?}", paths))?;
        self.repo.get(paths)
    }
}

impl<R: BufRead, W: Write> Host for TransferHost<'_, R, W> {
    fn notify(&mut self, message: &str) {
        if let Err(e) = self.channel.info(message) {
            warn!(error = %e, "failed to relay message to git-annex");
        }
    }
}

/// Serve git-annex until it closes the connection or reports an error.
pub fn serve<R: BufRead, W: Write>(
    remote: &Remote,
    repo: &AnnexRepo,
    channel: &mut Channel<R, W>,
) -> Result<()> {
    channel.send("VERSION 1")?;

    while let Some(line) = channel.recv()? {
        match Request::parse(&line) {
            Request::Extensions(extensions) => {
                channel.info = extensions.iter().any(|e| e == "INFO");
                channel.send("EXTENSIONS INFO")?;
            }
            Request::InitRemote => channel.send("INITREMOTE-SUCCESS")?,
            Request::Prepare => channel.send("PREPARE-SUCCESS")?,
            Request::ClaimUrl(url) => {
                let reply = if remote.claims(&url) {
                    "CLAIMURL-SUCCESS"
                } else {
                    "CLAIMURL-FAILURE"
                };
                channel.send(reply)?;
            }
            Request::CheckUrl(url) => {
                let reply = if remote.check_valid(&url) {
                    "CHECKURL-CONTENTS UNKNOWN"
                } else {
                    "CHECKURL-FAILURE"
                };
                channel.send(reply)?;
            }
            Request::CheckPresent(key) => {
                let reply = if remote.check_present(&key) {
                    format!("CHECKPRESENT-SUCCESS {}", key)
                } else {
                    format!("CHECKPRESENT-FAILURE {}", key)
                };
                channel.send(&reply)?;
            }
            Request::TransferRetrieve { key, file } => {
                let result = {
                    let mut host = TransferHost {
                        channel: &mut *channel,
                        repo,
                    };
                    remote.retrieve(&mut host, &key, Path::new(&file))
                };
                match result {
                    Ok(()) => channel.send(&format!("TRANSFER-SUCCESS RETRIEVE {}", key))?,
                    Err(e) => {
                        channel.send(&format!("TRANSFER-FAILURE RETRIEVE {} {}", key, e))?
                    }
                }
            }
            Request::TransferStore { key } => channel.send(&format!(
                "TRANSFER-FAILURE STORE {} getexec cannot store content",
                key
            ))?,
            Request::Remove(key) => channel.send(&format!(
                "REMOVE-FAILURE {} getexec cannot remove content",
                key
            ))?,
            Request::Error(message) => bail!("git-annex reported an error: {}", message),
            Request::Unsupported(line) => {
                debug!(line = %line, "unsupported request");
                channel.send("UNSUPPORTED-REQUEST")?;
            }
        }
    }
    Ok(())
}
