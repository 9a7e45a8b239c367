//! Writing the current row set out as files.

pub mod csv;

pub use self::csv::{export_to_csv, write_csv};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ReportError, Result};
use crate::report::ReportRow;

/// Column headings shared by every export format.
pub const EXPORT_HEADERS: [&str; 7] = [
    "Customer",
    "Product ID",
    "Description",
    "License Type",
    "Expiry Date",
    "Total Price",
    "Group",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(format!("unknown format '{s}' (expected csv or pdf)")),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Which rows an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportScope {
    /// Every row matching the current search and mode.
    #[default]
    All,
    /// Only the page currently shown.
    Page,
}

impl FromStr for ExportScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(ExportScope::All),
            "page" => Ok(ExportScope::Page),
            _ => Err(format!("unknown scope '{s}' (expected all or page)")),
        }
    }
}

/// One row rendered as plain text cells, in `EXPORT_HEADERS` order.
pub fn row_cells(row: &ReportRow) -> [String; 7] {
    [
        row.customer_name.clone(),
        row.product_id.clone(),
        row.description.clone(),
        row.license_type.clone(),
        row.expiry_day()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        format_plain_number(row.total_price),
        row.group_display().to_string(),
    ]
}

/// `100.0` -> `100`, `99.5` -> `99.5`
pub fn format_plain_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

pub(crate) fn validate_filename(path: &Path) -> Result<()> {
    let empty = path
        .file_name()
        .map(|n| n.to_string_lossy().trim().is_empty())
        .unwrap_or(true);
    if empty {
        return Err(ReportError::validation(
            "filename",
            path.display(),
            "must name a file",
        ));
    }
    Ok(())
}

/// Sibling path the artifact is written to before it is renamed into place.
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Run `write` against a temporary sibling of `path`, then move it into
/// place. On failure the temporary file is removed and `path` is untouched.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<PathBuf>
where
    F: FnOnce(&Path) -> Result<()>,
{
    validate_filename(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let part = partial_path(path);
    let outcome = write(&part).and_then(|()| fs::rename(&part, path).map_err(ReportError::from));
    if let Err(e) = outcome {
        let _ = fs::remove_file(&part);
        return Err(e);
    }
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_row_cells() {
        let row = ReportRow::from_value(
            &json!({"customerName": "X", "productId": "P1", "totalPrice": 100, "expiryDate": "2025-04-30T12:00:00Z"}),
            None,
        );
        let cells = row_cells(&row);
        assert_eq!(cells[0], "X");
        assert_eq!(cells[4], "2025-04-30");
        assert_eq!(cells[5], "100");
    }

    #[test]
    fn test_plain_numbers() {
        assert_eq!(format_plain_number(0.0), "0");
        assert_eq!(format_plain_number(1250.5), "1250.5");
        assert_eq!(format_plain_number(-3.0), "-3");
    }

    #[test]
    fn test_failed_write_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("out.csv");
        let result = write_atomically(&target, |part| {
            fs::write(part, "half")?;
            Err(ReportError::PdfGeneration("boom".into()))
        });
        assert!(result.is_err());
        assert!(!target.exists());
        assert!(!partial_path(&target).exists());
    }

    #[test]
    fn test_empty_filename_rejected() {
        assert!(write_atomically(Path::new(""), |_| Ok(())).is_err());
        assert!(write_atomically(Path::new("/"), |_| Ok(())).is_err());
    }
}
