use std::borrow::Borrow;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use ::csv::{QuoteStyle, WriterBuilder};

use super::{row_cells, write_atomically, EXPORT_HEADERS};
use crate::error::Result;
use crate::report::ReportRow;

/// Write a header line and one record per row. Fields containing commas,
/// quotes or newlines are quoted.
pub fn write_csv<R, W>(rows: &[R], writer: W) -> Result<()>
where
    R: Borrow<ReportRow>,
    W: Write,
{
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(writer);

    wtr.write_record(EXPORT_HEADERS)?;
    for row in rows {
        wtr.write_record(row_cells(row.borrow()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Export rows to a CSV file at `path`. An empty row set yields a
/// header-only file.
pub fn export_to_csv<R: Borrow<ReportRow>>(rows: &[R], path: &Path) -> Result<PathBuf> {
    let written = write_atomically(path, |part| {
        let file = File::create(part)?;
        write_csv(rows, file)
    })?;
    tracing::info!(path = %written.display(), rows = rows.len(), "CSV export written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn render(rows: &[ReportRow]) -> String {
        let mut buf = Vec::new();
        write_csv(rows, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_single_row() {
        let rows = vec![ReportRow::from_value(
            &json!({"customerName": "X", "productId": "P1", "totalPrice": 100}),
            None,
        )];
        let out = render(&rows);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "Customer,Product ID,Description,License Type,Expiry Date,Total Price,Group"
        );
        assert_eq!(lines[1], "X,P1,,,,100,");
    }

    #[test]
    fn test_quoting() {
        let rows = vec![ReportRow::from_value(
            &json!({"customerName": "Acme, Inc.", "description": "the \"pro\" plan"}),
            None,
        )];
        let out = render(&rows);
        assert!(out.contains("\"Acme, Inc.\""));
        assert!(out.contains("\"the \"\"pro\"\" plan\""));
    }

    #[test]
    fn test_empty_export_writes_header_only() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/f.csv");
        let rows: Vec<ReportRow> = Vec::new();

        let written = export_to_csv(&rows, &path).unwrap();
        let content = std::fs::read_to_string(written).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("Customer,"));
    }

    #[test]
    fn test_accepts_borrowed_rows() {
        let rows = vec![ReportRow::from_value(&json!({"customerName": "a"}), None)];
        let refs: Vec<&ReportRow> = rows.iter().collect();
        let mut buf = Vec::new();
        write_csv(&refs, &mut buf).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("\na,"));
    }
}
