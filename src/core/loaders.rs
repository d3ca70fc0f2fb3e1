//! Scan container loading and the core height-field type.
//!
//! This module parses Nanoscope-style AFM containers: an ASCII header of
//! `\`-prefixed key/value lines describing one or more stored images,
//! followed by raw little-endian integer frames. Only the requested data
//! channel (normally "Height") is decoded; everything else in the container
//! is ignored.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use regex::Regex;
use thiserror::Error;

/// Header line that opens every scan container.
const HEADER_MAGIC: &[u8] = b"\\*File list";
/// Header line that terminates the ASCII preamble.
const HEADER_END: &[u8] = b"\\*File list end";
/// Section marker introducing one stored image.
const IMAGE_SECTION: &str = "Ciao image list";

/// Errors that can occur while loading a scan container.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("IO error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is not a scan container (missing file-list magic)")]
    NotAScanFile { path: PathBuf },

    #[error("unterminated header in '{path}'")]
    UnterminatedHeader { path: PathBuf },

    #[error("malformed value for header key '{key}': '{value}'")]
    MalformedKey { key: String, value: String },

    #[error("image section is missing required key '{key}'")]
    MissingKey { key: &'static str },

    #[error("channel '{channel}' not present in '{path}'")]
    MissingChannel { channel: String, path: PathBuf },

    #[error("unsupported byte depth {bytes} (expected 2 or 4)")]
    UnsupportedDepth { bytes: usize },

    #[error(
        "frame data truncated in '{path}': need {needed} bytes at offset {offset}, \
         file has {available}"
    )]
    Truncated {
        path: PathBuf,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("zero-sized image in '{path}'")]
    EmptyImage { path: PathBuf },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Degenerate zero-sized field on which a statistic or transform is undefined.
#[derive(Debug, Error)]
#[error("empty height field in {operation}")]
pub struct EmptyFieldError {
    /// Name of the operation that rejected the field.
    pub operation: &'static str,
}

/// Rectangular grid of height samples, one per pixel, in nanometers.
///
/// Produced by [`load_scan`]; every downstream operation replaces the field
/// rather than mutating it in place.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    data: Array2<f64>,
}

impl HeightField {
    /// Wraps an existing 2D array of height samples.
    pub fn new(data: Array2<f64>) -> Self {
        Self { data }
    }

    /// Builds a field from row-major values; `None` if the lengths disagree.
    pub fn from_rows(rows: usize, cols: usize, values: Vec<f64>) -> Option<Self> {
        Array2::from_shape_vec((rows, cols), values)
            .ok()
            .map(Self::new)
    }

    /// Number of scan lines (rows).
    #[inline]
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Samples per scan line (columns).
    #[inline]
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Total number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the field holds no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sample at (row, col). Panics on out-of-bounds indices.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[[row, col]]
    }

    /// Borrow of the underlying array.
    #[inline]
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Smallest sample. Callers must check [`is_empty`](Self::is_empty) first.
    pub fn min(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Largest sample. Callers must check [`is_empty`](Self::is_empty) first.
    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Mean over all samples. Callers must check
    /// [`is_empty`](Self::is_empty) first.
    pub fn mean(&self) -> f64 {
        self.data.sum() / self.len() as f64
    }
}

/// One image section of the header, as raw key/value pairs.
#[derive(Debug, Default)]
struct ImageSection {
    keys: HashMap<String, String>,
}

impl ImageSection {
    fn get(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(String::as_str)
    }

    fn usize_value(&self, key: &'static str) -> Result<usize> {
        let raw = self.get(key).ok_or(LoaderError::MissingKey { key })?;
        raw.trim().parse().map_err(|_| LoaderError::MalformedKey {
            key: key.to_string(),
            value: raw.to_string(),
        })
    }
}

/// Load one scan container and extract the named channel as a height field.
///
/// The header is scanned for an image section whose image-data tag carries
/// `"channel"`; its frame is decoded from the binary tail and scaled to
/// nanometers using the section's Z-scale calibration. A missing calibration
/// means the raw counts are taken as nanometers directly.
///
/// # Errors
///
/// Returns a [`LoaderError`] if the file cannot be read, is not a scan
/// container, lacks the channel, or its frame data is malformed.
pub fn load_scan(path: &Path, channel: &str) -> Result<HeightField> {
    let bytes = fs::read(path).map_err(|e| LoaderError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    if !bytes.starts_with(HEADER_MAGIC) {
        return Err(LoaderError::NotAScanFile {
            path: path.to_path_buf(),
        });
    }

    let header_len =
        find_subslice(&bytes, HEADER_END).ok_or_else(|| LoaderError::UnterminatedHeader {
            path: path.to_path_buf(),
        })?;
    // The binary tail is not UTF-8; only the preamble is decoded as text.
    let header = String::from_utf8_lossy(&bytes[..header_len]);

    let section =
        find_channel_section(&header, channel).ok_or_else(|| LoaderError::MissingChannel {
            channel: channel.to_string(),
            path: path.to_path_buf(),
        })?;

    let offset = section.usize_value("Data offset")?;
    let bytes_per_pixel = section.usize_value("Bytes/pixel")?;
    let cols = section.usize_value("Samps/line")?;
    let rows = section.usize_value("Number of lines")?;
    let nm_per_lsb = z_scale_factor(&section);

    if rows == 0 || cols == 0 {
        return Err(LoaderError::EmptyImage {
            path: path.to_path_buf(),
        });
    }
    if bytes_per_pixel != 2 && bytes_per_pixel != 4 {
        return Err(LoaderError::UnsupportedDepth {
            bytes: bytes_per_pixel,
        });
    }

    // Declared sizes come from the file and may overflow usize.
    let needed = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(bytes_per_pixel));
    let end = match needed.and_then(|n| offset.checked_add(n)) {
        Some(end) if end <= bytes.len() => end,
        _ => {
            return Err(LoaderError::Truncated {
                path: path.to_path_buf(),
                offset,
                needed: needed.unwrap_or(usize::MAX),
                available: bytes.len(),
            })
        }
    };

    let frame = &bytes[offset..end];
    let data = Array2::from_shape_fn((rows, cols), |(r, c)| {
        let i = (r * cols + c) * bytes_per_pixel;
        let raw = match bytes_per_pixel {
            2 => i16::from_le_bytes([frame[i], frame[i + 1]]) as f64,
            _ => i32::from_le_bytes([frame[i], frame[i + 1], frame[i + 2], frame[i + 3]]) as f64,
        };
        raw * nm_per_lsb
    });

    Ok(HeightField::new(data))
}

/// First occurrence of `needle` in `haystack`.
fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Split the header into image sections and return the one tagged with
/// `channel` in its image-data line.
fn find_channel_section(header: &str, channel: &str) -> Option<ImageSection> {
    let tag_pattern = Regex::new(r#""([^"]*)""#).ok()?;

    let mut sections: Vec<ImageSection> = Vec::new();
    let mut in_image_section = false;

    for line in header.lines() {
        let line = line.trim_end_matches('\r');
        let Some(stripped) = line.strip_prefix('\\') else {
            continue;
        };

        if let Some(marker) = stripped.strip_prefix('*') {
            in_image_section = marker.trim() == IMAGE_SECTION;
            if in_image_section {
                sections.push(ImageSection::default());
            }
            continue;
        }

        if !in_image_section {
            continue;
        }
        // Keys like "@2:Image Data" carry a colon of their own; the header
        // delimiter is the first colon-space.
        if let Some((key, value)) = stripped.split_once(": ") {
            if let Some(section) = sections.last_mut() {
                section
                    .keys
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }
    }

    sections.into_iter().find(|section| {
        section.keys.iter().any(|(key, value)| {
            key.ends_with("Image Data")
                && tag_pattern
                    .captures(value)
                    .map(|caps| &caps[1] == channel)
                    .unwrap_or(false)
        })
    })
}

/// Z-scale calibration in nanometers per LSB count, defaulting to 1.0 when
/// the section carries no `(X nm/LSB)` annotation.
fn z_scale_factor(section: &ImageSection) -> f64 {
    let Ok(pattern) = Regex::new(r"\(([-+0-9.eE]+)\s*nm/LSB\)") else {
        return 1.0;
    };
    section
        .keys
        .iter()
        .find(|(key, _)| key.ends_with("Z scale"))
        .and_then(|(_, value)| pattern.captures(value))
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(1.0)
}
