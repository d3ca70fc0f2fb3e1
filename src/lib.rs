//! AFM height-map roughness analysis and 3D surface rendering.
//!
//! This crate provides tools for:
//! - Loading Nanoscope-style AFM scan containers and extracting a height channel
//! - A fixed geometric correction chain (line leveling, plane removal, scar filtering)
//! - RMS roughness computation over corrected height fields
//! - 3D surface plot rendering with physical-unit axes
//!
//! # Example
//!
//! ```no_run
//! use afm_roughness::config::PipelineConfig;
//! use afm_roughness::processors::batch::process_directory;
//!
//! let mut config = PipelineConfig::default();
//! config.input_dir = Some("scans".into());
//! config.image_dir = Some("renders".into());
//! let outcome = process_directory(&config).unwrap();
//! println!("{} scans processed", outcome.table.len());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use config::{PipelineConfig, RenderConfig, ScaleConfig, ScanConfig};
pub use core::loaders::{HeightField, LoaderError};
pub use processors::batch::{process_directory, BatchOutcome};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
