//! End-to-end batch pipeline: walk, load, correct, measure, render, tabulate.
//!
//! Files are processed strictly one at a time in traversal order. Setup
//! failures (bad input root, unwritable image directory) abort the run
//! before any file is touched; per-file failures are logged, recorded, and
//! skipped so one corrupt scan cannot void a multi-hundred-file batch.

use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use thiserror::Error;

use crate::config::{ConfigError, PipelineConfig};
use crate::core::loaders::{self, EmptyFieldError, LoaderError};
use crate::core::transforms::normalize_to_zero;
use crate::core::walker::{self, WalkError};
use crate::core::writers::{self, ExportError, RoughnessRecord, SummaryTable};
use crate::processors::corrections::{apply_chain, DEFAULT_CHAIN};
use crate::processors::roughness::rms_roughness;
use crate::visualization::{self, RenderError};

/// Fatal setup errors; nothing has been processed when these occur.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error("failed to create image output directory '{path}': {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-file failures; these skip the file and never abort the batch.
#[derive(Debug, Error)]
enum FileError {
    #[error(transparent)]
    Load(#[from] LoaderError),

    #[error(transparent)]
    Empty(#[from] EmptyFieldError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// What one batch run produced.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Roughness records in processing order.
    pub table: SummaryTable,
    /// Rendered image paths, parallel to the table.
    pub images: Vec<PathBuf>,
    /// Files that were skipped, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
    /// Where the summary landed, if export ran and succeeded.
    pub export_path: Option<PathBuf>,
    /// Export failure, if any; images written before it stand.
    pub export_error: Option<ExportError>,
}

/// Run the full pipeline over every scan under the configured input root.
///
/// The image output directory is created once, up front. The summary export
/// (when enabled) runs last; its failure is reported in the outcome rather
/// than returned, since it must not invalidate the images already written.
///
/// # Errors
///
/// Returns a [`BatchError`] for configuration, input-root, or image-directory
/// failures, all of which occur before any file is processed.
pub fn process_directory(config: &PipelineConfig) -> Result<BatchOutcome, BatchError> {
    let paths = config.validate()?;
    let nm_per_pixel = config.scale.nm_per_pixel();

    fs::create_dir_all(paths.image_dir).map_err(|e| BatchError::OutputDir {
        path: paths.image_dir.to_path_buf(),
        source: e,
    })?;

    let files = walker::scan_files(paths.input_dir, &config.scan.ignore_files)?;

    let mut outcome = BatchOutcome::default();
    for path in files {
        match process_one(&path, paths.image_dir, nm_per_pixel, config) {
            Ok((record, image_path)) => {
                info!(
                    "{}: RMS roughness {:.4} nm -> {}",
                    path.display(),
                    record.rms_nm,
                    image_path.display()
                );
                outcome.table.push(record);
                outcome.images.push(image_path);
            }
            Err(reason) => {
                warn!("skipping {}: {reason}", path.display());
                outcome.skipped.push((path, reason.to_string()));
            }
        }
    }

    if let Some(export_path) = paths.export_path {
        match writers::export_summary(export_path, &outcome.table) {
            Ok(()) => {
                info!("summary exported to {}", export_path.display());
                outcome.export_path = Some(export_path.to_path_buf());
            }
            Err(e) => {
                error!("summary export failed: {e}");
                outcome.export_error = Some(e);
            }
        }
    }

    Ok(outcome)
}

/// Load, correct, normalize, measure, and render one scan.
fn process_one(
    path: &Path,
    image_dir: &Path,
    nm_per_pixel: f64,
    config: &PipelineConfig,
) -> Result<(RoughnessRecord, PathBuf), FileError> {
    let raw = loaders::load_scan(path, &config.scan.channel)?;
    let corrected = apply_chain(&raw, &DEFAULT_CHAIN, config.correction.scar_threshold);
    let leveled = normalize_to_zero(&corrected)?;
    let rms_nm = rms_roughness(&leveled)?;

    let image_path = visualization::output_image_path(path, image_dir, &config.render.image_ext);
    visualization::render_surface(&image_path, &leveled, nm_per_pixel, &config.render)?;

    let filename = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok((RoughnessRecord { filename, rms_nm }, image_path))
}
