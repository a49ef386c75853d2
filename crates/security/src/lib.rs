//! Security module for sitewright.
//!
//! Provides the filesystem [`Sandbox`]: every path the model supplies is
//! resolved against a fixed project root and rejected if it escapes it.

pub mod path;

pub use path::{PathValidationError, Sandbox};
