//! Locator codec: `GenerationSpec` <-> `getexec:v1-<payload>`.
//!
//! Payload = percent-escaped, URL-safe base64 (padded) of the compact JSON
//! produced by [`GenerationSpec::to_json`]. Example:
//!
//! getexec:v1-eyJjbWQiOlsidHJ1ZSJdLCJpbnB1dHMiOltdfQ%3D%3D
//!   => {"cmd":["true"],"inputs":[]}

use crate::error::GetExecError;
use crate::spec::generation::{GenerationSpec, RawSpec};

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// URL scheme claimed by the special remote.
pub const SCHEME: &str = "getexec:";

/// Version tag of the only payload encoding understood so far.
pub const VERSION_TAG: &str = "v1-";

/// Characters left unescaped in the payload (RFC 3986 unreserved plus `/`).
const PAYLOAD_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Writes padding, accepts payloads with or without it.
const URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode a spec into a full locator (`getexec:v1-...`).
pub fn encode(spec: &GenerationSpec) -> Result<String, GetExecError> {
    Ok(format!("{}{}", SCHEME, encode_body(spec)?))
}

/// Encode a spec into the part of the locator after the scheme.
pub fn encode_body(spec: &GenerationSpec) -> Result<String, GetExecError> {
    let b64 = URL_SAFE.encode(spec.to_json()?);
    Ok(format!(
        "{}{}",
        VERSION_TAG,
        utf8_percent_encode(&b64, PAYLOAD_SAFE)
    ))
}

/// Decode a full locator; it must carry the `getexec:` scheme.
pub fn decode(locator: &str) -> Result<GenerationSpec, GetExecError> {
    let body = locator
        .strip_prefix(SCHEME)
        .ok_or_else(|| GetExecError::malformed(format!("missing {} scheme", SCHEME)))?;
    decode_body(body)
}

/// Decode the part of a locator after the scheme (`v1-...`).
pub fn decode_body(body: &str) -> Result<GenerationSpec, GetExecError> {
    let payload = body.strip_prefix(VERSION_TAG).ok_or_else(|| {
        GetExecError::malformed(format!(
            "unsupported version tag in {:?}",
            body.split('-').next().unwrap_or_default()
        ))
    })?;

    let b64: Vec<u8> = percent_decode_str(payload).collect();
    let json = URL_SAFE
        .decode(&b64)
        .map_err(|e| GetExecError::malformed(format!("bad base64 payload: {}", e)))?;
    let raw: RawSpec = serde_json::from_slice(&json)
        .map_err(|e| GetExecError::malformed(format!("bad JSON payload: {}", e)))?;
    raw.validate()
}
