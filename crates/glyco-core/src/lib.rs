//! Core types and trait definitions for the glyco telemetry sync engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod error;
pub mod record;
pub mod sequence;
pub mod source;
pub mod store;
pub mod time;

pub use error::{Error, Result};
