//! The generation spec: which command produces a file, and which files must
//! be present before it runs.
//!
//! JSON shape (the only persisted form, always wrapped in a locator):
//! {
//!   "cmd": ["bash", "-c", "cat \"$0\" > \"$1\"", "a.txt"],   // non-empty
//!   "inputs": ["a.txt"]                                      // may be empty
//! }
//!
//! As with other on-disk shapes we keep two representations:
//! - RawSpec: serde-friendly, every field optional
//! - GenerationSpec: validated, `command` guaranteed non-empty

use crate::error::GetExecError;
use crate::spec::json::AsciiEscaped;

use serde::{Deserialize, Serialize};
use serde_json::ser::{CompactFormatter, PrettyFormatter};

/// Raw spec shape as it appears in a decoded locator payload.
///
/// Unknown keys are ignored so newer writers can add fields.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSpec {
    #[serde(default)]
    pub cmd: Option<Vec<String>>,

    /// Older registrations wrote `null` here when no inputs were given.
    #[serde(default)]
    pub inputs: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GenerationSpec {
    #[serde(rename = "cmd")]
    command: Vec<String>,

    #[serde(rename = "inputs")]
    dependencies: Vec<String>,
}

impl GenerationSpec {
    pub fn new(command: Vec<String>, dependencies: Vec<String>) -> Result<Self, GetExecError> {
        if command.is_empty() {
            return Err(GetExecError::malformed("command must not be empty"));
        }
        Ok(Self {
            command,
            dependencies,
        })
    }

    /// Program followed by its arguments; the target path is not included.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Compact JSON with every non-ASCII character escaped.
    ///
    /// This is the exact byte sequence that gets base64-encoded into a
    /// locator, so it must stay stable across releases.
    pub fn to_json(&self) -> Result<Vec<u8>, GetExecError> {
        let mut out = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut out, AsciiEscaped(CompactFormatter));
        self.serialize(&mut ser)?;
        Ok(out)
    }

    /// Human-auditable JSON (one-space indent, keys sorted) for commit records.
    pub fn to_record(&self) -> Result<String, GetExecError> {
        let mut out = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(
            &mut out,
            AsciiEscaped(PrettyFormatter::with_indent(b" ")),
        );
        self.serialize(&mut ser)?;
        // The formatter only ever emits ASCII.
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

impl RawSpec {
    pub fn validate(self) -> Result<GenerationSpec, GetExecError> {
        let command = self
            .cmd
            .ok_or_else(|| GetExecError::malformed("payload has no \"cmd\" field"))?;
        GenerationSpec::new(command, self.inputs.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spec(cmd: &[&str], inputs: &[&str]) -> GenerationSpec {
        GenerationSpec::new(
            cmd.iter().map(|s| s.to_string()).collect(),
            inputs.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = GenerationSpec::new(vec![], vec!["a.txt".into()]).unwrap_err();
        assert!(matches!(err, GetExecError::MalformedLocator { .. }));
    }

    #[test]
    fn compact_json_escapes_non_ascii() {
        let json = spec(&["echo", "h\u{e9}llo \u{1F600}"], &["a.txt"]).to_json().unwrap();
        assert_eq!(
            String::from_utf8(json).unwrap(),
            r#"{"cmd":["echo","h\u00e9llo \ud83d\ude00"],"inputs":["a.txt"]}"#
        );
    }

    #[test]
    fn compact_json_keeps_empty_inputs_as_array() {
        let json = spec(&["true"], &[]).to_json().unwrap();
        assert_eq!(
            String::from_utf8(json).unwrap(),
            r#"{"cmd":["true"],"inputs":[]}"#
        );
    }

    #[test]
    fn record_is_indented_by_one_space() {
        let record = spec(&["echo", "\u{e9}"], &["a.txt"]).to_record().unwrap();
        assert_eq!(
            record,
            "{\n \"cmd\": [\n  \"echo\",\n  \"\\u00e9\"\n ],\n \"inputs\": [\n  \"a.txt\"\n ]\n}"
        );
    }

    #[test]
    fn raw_spec_null_inputs_become_empty() {
        let raw: RawSpec = serde_json::from_str(r#"{"cmd":["true"],"inputs":null}"#).unwrap();
        assert_eq!(raw.validate().unwrap(), spec(&["true"], &[]));
    }

    #[test]
    fn raw_spec_ignores_unknown_keys() {
        let raw: RawSpec =
            serde_json::from_str(r#"{"cmd":["true"],"inputs":["x"],"env":{"A":"1"}}"#).unwrap();
        assert_eq!(raw.validate().unwrap(), spec(&["true"], &["x"]));
    }

    #[test]
    fn raw_spec_without_cmd_is_malformed() {
        let raw: RawSpec = serde_json::from_str(r#"{"inputs":[]}"#).unwrap();
        assert!(matches!(
            raw.validate(),
            Err(GetExecError::MalformedLocator { .. })
        ));
    }
}
