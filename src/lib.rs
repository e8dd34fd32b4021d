//! Files whose content is produced on demand by a registered command.
//!
//! A generation spec (command + input files) is encoded into a
//! `getexec:v1-...` locator and attached to a path in a git-annex dataset.
//! When the content is requested, the special remote decodes the locator,
//! fetches the inputs and runs the command with the output path appended.

pub mod annex;
pub mod config;
pub mod error;
pub mod generate;
pub mod logging;
pub mod register;
pub mod remote;
pub mod resolve;
pub mod spec;

pub type Result<T> = anyhow::Result<T>;

pub use error::GetExecError;
pub use generate::Generator;
pub use remote::{Attempt, Host, Remote};
pub use resolve::{DependencyKey, DependencyStore, resolve};
pub use spec::GenerationSpec;
