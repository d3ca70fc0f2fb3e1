//! Core data types and I/O operations.

pub mod loaders;
pub mod transforms;
pub mod walker;
pub mod writers;

#[cfg(test)]
pub mod testdata;

pub use loaders::{load_scan, EmptyFieldError, HeightField, LoaderError};
pub use walker::{scan_files, WalkError};
pub use writers::{export_summary, ExportError, RoughnessRecord, SummaryTable};
