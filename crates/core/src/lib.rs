//! Core types for objcat
//!
//! This crate provides the declaration model, error taxonomy, run
//! configuration and progress events shared by the header parser, the
//! catalog builder and the command-line front end.

pub mod error;
pub mod types;
pub mod config;
pub mod events;

pub use error::{Error, Result};
pub use types::*;
pub use config::{CatalogOptions, OutputFormat, RunConfig};
pub use events::{EventBus, RunEvent};
