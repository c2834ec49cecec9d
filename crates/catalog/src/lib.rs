//! Framework assembly and catalog generation
//!
//! This crate merges parsed headers into one symbol graph and renders it as
//! the `.extracted` property-list catalog consumed by the patching tool, or as
//! a JSON model dump.

pub mod assembler;
pub mod encoding;
pub mod output;
pub mod pipeline;

pub use assembler::{assemble, Assembler};
pub use output::{CatalogGenerator, ModelJson, SymbolRecord};
pub use pipeline::{run, RunReport};
