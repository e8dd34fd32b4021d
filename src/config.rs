//! Fixed identifiers of the getexec special remote.

/// UUID the special remote is initialized with in every dataset, so clones
/// recognise the same remote without extra configuration.
pub const GETEXEC_REMOTE_UUID: &str = "1da43985-0b3e-4123-89f0-90b88021ed34";

/// Default git-annex name and external type of the special remote.
pub const GETEXEC_REMOTE_NAME: &str = "getexec";

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "GETEXEC_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Name the remote gets in `git annex initremote`.
    pub name: String,
    pub uuid: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            name: GETEXEC_REMOTE_NAME.to_string(),
            uuid: GETEXEC_REMOTE_UUID.to_string(),
        }
    }
}

impl RemoteConfig {
    /// Parameters for `git annex initremote <name> ...`.
    pub fn initremote_params(&self) -> Vec<String> {
        vec![
            "encryption=none".to_string(),
            "type=external".to_string(),
            "autoenable=true".to_string(),
            format!("externaltype={}", GETEXEC_REMOTE_NAME),
            format!("uuid={}", self.uuid),
        ]
    }
}
