//! Configuration types for the roughness pipeline.
//!
//! Every knob the pipeline honors lives here with a serde default, so a
//! partial YAML file (or none at all) still yields a runnable configuration.
//! Paths are the only required values; [`PipelineConfig::validate`] checks
//! them along with the numeric ranges before a run starts.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Colormap names the renderer understands.
pub const COLORMAPS: &[&str] = &["viridis", "copper", "bone"];

/// Errors produced by configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration value: {0}")]
    MissingValue(&'static str),

    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },
}

/// Borrowed view of the validated run paths.
#[derive(Debug, Clone, Copy)]
pub struct RunPaths<'a> {
    /// Root directory to enumerate scans under.
    pub input_dir: &'a Path,
    /// Directory rendered images are written into.
    pub image_dir: &'a Path,
    /// Summary export target, when export is enabled.
    pub export_path: Option<&'a Path>,
}

/// Configuration for scan container reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Data channel extracted from each container.
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Filenames skipped during traversal (system artifacts).
    #[serde(default = "default_ignore_files")]
    pub ignore_files: Vec<String>,
}

fn default_channel() -> String {
    "Height".to_string()
}

fn default_ignore_files() -> Vec<String> {
    vec![".DS_Store".to_string()]
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            ignore_files: default_ignore_files(),
        }
    }
}

/// Configuration for the correction chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionConfig {
    /// Sensitivity threshold of the scar filter.
    #[serde(default = "default_scar_threshold")]
    pub scar_threshold: f64,
}

fn default_scar_threshold() -> f64 {
    0.7
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            scar_threshold: default_scar_threshold(),
        }
    }
}

/// Pixel-to-physical scaling, constant for a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleConfig {
    /// Physical width of the scanned field in nanometers.
    #[serde(default = "default_field_width_nm")]
    pub field_width_nm: f64,

    /// Pixel resolution the field width spans.
    #[serde(default = "default_pixels_per_line")]
    pub pixels_per_line: usize,
}

fn default_field_width_nm() -> f64 {
    2000.0
}

fn default_pixels_per_line() -> usize {
    1024
}

impl ScaleConfig {
    /// Nanometers per pixel, derived once and shared by every coordinate
    /// grid in the run.
    pub fn nm_per_pixel(&self) -> f64 {
        self.field_width_nm / self.pixels_per_line as f64
    }
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            field_width_nm: default_field_width_nm(),
            pixels_per_line: default_pixels_per_line(),
        }
    }
}

/// Configuration for 3D surface rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Plot title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Colormap name (see [`COLORMAPS`]).
    #[serde(default = "default_colormap")]
    pub colormap: String,

    /// Camera elevation in degrees.
    #[serde(default = "default_elevation_deg")]
    pub elevation_deg: f64,

    /// Camera azimuth in degrees.
    #[serde(default = "default_azimuth_deg")]
    pub azimuth_deg: f64,

    /// Output image width in pixels.
    #[serde(default = "default_width_px")]
    pub width_px: u32,

    /// Output image height in pixels.
    #[serde(default = "default_height_px")]
    pub height_px: u32,

    /// Output image extension.
    #[serde(default = "default_image_ext")]
    pub image_ext: String,
}

fn default_title() -> String {
    "AFM Surface".to_string()
}

fn default_colormap() -> String {
    "viridis".to_string()
}

fn default_elevation_deg() -> f64 {
    45.0
}

fn default_azimuth_deg() -> f64 {
    30.0
}

// 600 dpi equivalent of a 10x8 inch figure.
fn default_width_px() -> u32 {
    6000
}

fn default_height_px() -> u32 {
    4800
}

fn default_image_ext() -> String {
    "png".to_string()
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            colormap: default_colormap(),
            elevation_deg: default_elevation_deg(),
            azimuth_deg: default_azimuth_deg(),
            width_px: default_width_px(),
            height_px: default_height_px(),
            image_ext: default_image_ext(),
        }
    }
}

/// Configuration for the summary-table export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Whether the table is written at the end of the run.
    #[serde(default)]
    pub enabled: bool,

    /// Spreadsheet path (`.csv` or `.xlsx`); required when enabled.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root directory to enumerate scans under.
    #[serde(default)]
    pub input_dir: Option<PathBuf>,

    /// Directory rendered images are written into (created up front).
    #[serde(default)]
    pub image_dir: Option<PathBuf>,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub correction: CorrectionConfig,

    #[serde(default)]
    pub scale: ScaleConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self).context("failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Check required values and numeric ranges, returning the resolved run
    /// paths on success.
    pub fn validate(&self) -> Result<RunPaths<'_>, ConfigError> {
        let input_dir = self
            .input_dir
            .as_deref()
            .ok_or(ConfigError::MissingValue("input_dir"))?;
        let image_dir = self
            .image_dir
            .as_deref()
            .ok_or(ConfigError::MissingValue("image_dir"))?;

        let export_path = if self.export.enabled {
            Some(
                self.export
                    .path
                    .as_deref()
                    .ok_or(ConfigError::MissingValue("export.path"))?,
            )
        } else {
            None
        };

        if self.scan.channel.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "scan.channel",
                reason: "channel name must not be empty".to_string(),
            });
        }
        if !(self.scale.field_width_nm > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "scale.field_width_nm",
                reason: format!("must be positive, got {}", self.scale.field_width_nm),
            });
        }
        if self.scale.pixels_per_line == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scale.pixels_per_line",
                reason: "must be positive".to_string(),
            });
        }
        if !(self.correction.scar_threshold > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "correction.scar_threshold",
                reason: format!("must be positive, got {}", self.correction.scar_threshold),
            });
        }
        if self.render.width_px == 0 || self.render.height_px == 0 {
            return Err(ConfigError::InvalidValue {
                field: "render.width_px/height_px",
                reason: "image dimensions must be positive".to_string(),
            });
        }
        if self.render.image_ext.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "render.image_ext",
                reason: "image extension must not be empty".to_string(),
            });
        }
        if !COLORMAPS.contains(&self.render.colormap.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "render.colormap",
                reason: format!(
                    "unknown colormap '{}', expected one of {:?}",
                    self.render.colormap, COLORMAPS
                ),
            });
        }

        Ok(RunPaths {
            input_dir,
            image_dir,
            export_path,
        })
    }
}
