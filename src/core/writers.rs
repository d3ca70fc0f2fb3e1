//! Summary-table model and spreadsheet export.
//!
//! One roughness record accumulates per processed scan, in processing order.
//! The table can be serialized once, at the end of a run, to `.csv` or
//! `.xlsx` depending on the export path's extension.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use rust_xlsxwriter::{Workbook, XlsxError};
use thiserror::Error;

/// Header of the filename column.
pub const FILENAME_COLUMN: &str = "Filename";
/// Header of the roughness column.
pub const ROUGHNESS_COLUMN: &str = "RMS Roughness (nm)";

/// Per-file roughness statistic, immutable once appended.
#[derive(Debug, Clone, PartialEq)]
pub struct RoughnessRecord {
    /// Base filename of the processed scan.
    pub filename: String,
    /// RMS roughness in nanometers.
    pub rms_nm: f64,
}

/// Insertion-ordered collection of roughness records.
#[derive(Debug, Default)]
pub struct SummaryTable {
    records: Vec<RoughnessRecord>,
}

impl SummaryTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record; insertion order is processing order.
    pub fn push(&mut self, record: RoughnessRecord) {
        self.records.push(record);
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no scans produced a record.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in processing order.
    pub fn records(&self) -> &[RoughnessRecord] {
        &self.records
    }
}

/// Errors that can occur while exporting the summary table.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create export file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write export file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV export error for '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("spreadsheet export error for '{path}': {source}")]
    Xlsx {
        path: String,
        #[source]
        source: XlsxError,
    },

    #[error("unsupported export format '{extension}' (expected csv or xlsx)")]
    UnsupportedFormat { extension: String },
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Serialize the whole table to `path`, format chosen by extension.
///
/// The parent directory is expected to exist already; unlike the image
/// output directory it is not created here.
pub fn export_summary(path: &Path, table: &SummaryTable) -> Result<()> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => export_csv(path, table),
        "xlsx" => export_xlsx(path, table),
        other => Err(ExportError::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

fn export_csv(path: &Path, table: &SummaryTable) -> Result<()> {
    let path_str = path.display().to_string();

    let file = File::create(path).map_err(|e| ExportError::CreateFile {
        path: path_str.clone(),
        source: e,
    })?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));

    writer
        .write_record([FILENAME_COLUMN, ROUGHNESS_COLUMN])
        .map_err(|e| ExportError::Csv {
            path: path_str.clone(),
            source: e,
        })?;

    for record in table.records() {
        writer
            .write_record(&[record.filename.clone(), format!("{:.6}", record.rms_nm)])
            .map_err(|e| ExportError::Csv {
                path: path_str.clone(),
                source: e,
            })?;
    }

    writer.flush().map_err(|e| ExportError::Write {
        path: path_str,
        source: e,
    })?;

    Ok(())
}

fn export_xlsx(path: &Path, table: &SummaryTable) -> Result<()> {
    let path_str = path.display().to_string();
    let to_export_error = |source: XlsxError| ExportError::Xlsx {
        path: path_str.clone(),
        source,
    };

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet
        .write_string(0, 0, FILENAME_COLUMN)
        .map_err(to_export_error)?;
    worksheet
        .write_string(0, 1, ROUGHNESS_COLUMN)
        .map_err(to_export_error)?;

    for (i, record) in table.records().iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet
            .write_string(row, 0, &record.filename)
            .map_err(to_export_error)?;
        worksheet
            .write_number(row, 1, record.rms_nm)
            .map_err(to_export_error)?;
    }

    workbook.save(path).map_err(to_export_error)?;

    Ok(())
}
