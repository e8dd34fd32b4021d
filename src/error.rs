//! Error taxonomy for locator decoding, dependency resolution and generation.
//!
//! Everything below [`GetExecError::RetrievalFailed`] is caught at the
//! per-candidate boundary of a retrieval; only exhaustion reaches the host.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GetExecError {
    /// The locator has no recognised scheme/version tag or its payload does
    /// not decode into a generation spec.
    #[error("malformed locator: {reason}")]
    MalformedLocator { reason: String },

    #[error("failed to serialize generation spec: {0}")]
    Encode(#[from] serde_json::Error),

    /// A dependency resolves to the key currently being generated.
    #[error("circular dependency: {dependency} resolves to {key}")]
    CircularDependency { key: String, dependency: String },

    /// The store could not materialize one or more dependencies.
    #[error("failed to fetch dependencies {dependencies:?}: {reason}")]
    FetchFailed {
        dependencies: Vec<String>,
        reason: String,
    },

    /// The generator command could not be started at all.
    #[error("failed to launch {program}: {source}")]
    GeneratorLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The generator exited nonzero (`code` is `None` when killed by a signal).
    #[error("command {command:?} failed with exit code {}", display_code(.code))]
    GenerationFailed {
        command: Vec<String>,
        code: Option<i32>,
    },

    #[error("failed to handle key {0}")]
    RetrievalFailed(String),
}

impl GetExecError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedLocator {
            reason: reason.into(),
        }
    }

    /// Candidates failing with these are not viable and are skipped silently;
    /// other per-candidate failures are logged as warnings.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::MalformedLocator { .. } | Self::CircularDependency { .. }
        )
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}
