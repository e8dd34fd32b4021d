//! Request handler for the getexec special remote.
//!
//! [`Remote`] answers the four queries git-annex makes against a
//! locator-addressed key. It holds no state between calls and contains no
//! I/O loop; [`protocol`] owns the transport and calls in here.
//!
//! A retrieval walks the key's candidate locators in order:
//!
//! candidate -> decoded -> dependencies resolved -> generated
//!
//! Any failure sends the walk back to the next candidate. Only running out of
//! candidates is reported to the host.

pub mod protocol;

use crate::error::GetExecError;
use crate::generate::Generator;
use crate::resolve::{self, DependencyStore};
use crate::spec::{self, GenerationSpec};

use std::path::Path;
use tracing::{debug, info, warn};

/// Everything a retrieval needs from the host.
pub trait Host: DependencyStore {
    /// Relay a short progress note to the user-facing side of the host.
    fn notify(&mut self, _message: &str) {}
}

/// Outcome of trying one candidate locator.
#[derive(Debug)]
pub enum Attempt {
    Generated,
    /// Not viable (malformed, circular); the next candidate is tried.
    Skipped(GetExecError),
    /// Viable but failed while fetching or generating.
    Failed(GetExecError),
}

#[derive(Debug, Clone, Default)]
pub struct Remote {
    generator: Generator,
}

impl Remote {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }

    pub fn claims(&self, url: &str) -> bool {
        url.starts_with(spec::SCHEME)
    }

    /// No remote existence probe exists; generation is always assumed possible.
    pub fn check_valid(&self, url: &str) -> bool {
        self.claims(url)
    }

    pub fn check_present(&self, _key: &str) -> bool {
        true
    }

    /// Produce the content of `key` at `target` from the first candidate
    /// locator that decodes, resolves and generates successfully.
    ///
    /// A failed generator may leave a partial file at `target`.
    pub fn retrieve<H>(&self, host: &mut H, key: &str, target: &Path) -> Result<(), GetExecError>
    where
        H: Host + ?Sized,
    {
        let candidates = match host.locators(key) {
            Ok(candidates) => candidates,
            Err(e) => {
                let error = format!("{:#}", e);
                warn!(key, %error, "cannot list locators");
                return Err(GetExecError::RetrievalFailed(key.to_string()));
            }
        };
        debug!(key, ?candidates, "locators for this key");

        for (index, locator) in candidates.iter().enumerate() {
            match self.attempt(host, key, locator, target) {
                Attempt::Generated => {
                    info!(key, index, "generated content");
                    return Ok(());
                }
                Attempt::Skipped(err) => debug!(key, index, %err, "skipping candidate"),
                Attempt::Failed(err) => warn!(key, index, %err, "candidate failed"),
            }
        }

        Err(GetExecError::RetrievalFailed(key.to_string()))
    }

    /// Try a single candidate; never returns early with an error.
    pub fn attempt<H>(&self, host: &mut H, key: &str, locator: &str, target: &Path) -> Attempt
    where
        H: Host + ?Sized,
    {
        let spec = match spec::decode(locator) {
            Ok(spec) => spec,
            Err(err) => return Attempt::Skipped(err),
        };

        match self.run(host, key, &spec, target) {
            Ok(()) => Attempt::Generated,
            Err(err) if err.is_skippable() => Attempt::Skipped(err),
            Err(err) => Attempt::Failed(err),
        }
    }

    fn run<H>(
        &self,
        host: &mut H,
        key: &str,
        spec: &GenerationSpec,
        target: &Path,
    ) -> Result<(), GetExecError>
    where
        H: Host + ?Sized,
    {
        resolve::resolve(spec, key, host)?;
        host.notify(&format!("executing {:?}", spec.command()));
        self.generator.generate(spec.command(), target)
    }
}
