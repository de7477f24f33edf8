//! Shared data model for the Avatar peripheral orchestration workspace.
//!
//! This crate holds the pieces every other crate agrees on: the declarative
//! [`Configuration`] document, the flattened [`PeripheralDescriptor`]s the
//! registry consumes, the sample types published on the event bus and the
//! pure distance conversion.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::{BodyKind, Configuration, PeripheralDescriptor, PinAssignment, PullResistance};
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
