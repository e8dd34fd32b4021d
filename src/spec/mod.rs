//! Spec layer: the generation spec and its locator encoding.
//!
//! This module is pure data transformation; it never touches the filesystem
//! or spawns processes. It owns:
//! - GenerationSpec (command + dependencies)
//! - the `getexec:v1-` locator codec

pub mod codec;
pub mod generation;
mod json;

pub use codec::{SCHEME, VERSION_TAG, decode, decode_body, encode};
pub use generation::{GenerationSpec, RawSpec};
