//! Height-field processing modules.

pub mod batch;
pub mod corrections;
pub mod roughness;

// Re-export key types for convenience
pub use batch::{process_directory, BatchError, BatchOutcome};
pub use corrections::{
    apply_chain, correct_lines, correct_plane, filter_scars, CorrectionStep, DEFAULT_CHAIN,
};
pub use roughness::rms_roughness;
