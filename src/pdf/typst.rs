use serde::Serialize;
use std::borrow::Borrow;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{ReportError, Result};
use crate::export::{format_plain_number, row_cells, write_atomically, EXPORT_HEADERS};
use crate::report::ReportRow;

/// Embedded Typst template for report tables.
/// Uses a placeholder that gets replaced with the actual JSON file path
pub const REPORT_TEMPLATE: &str = r##"// Report Template
// Data is loaded from JSON file

#let data = json("DATA_JSON_PATH")

#set page(
  paper: "a4",
  flipped: true,
  margin: (top: 0.75in, bottom: 0.75in, left: 0.6in, right: 0.6in),
  footer: context align(right, text(size: 8pt, fill: gray)[
    Page #counter(page).display() of #counter(page).final().first()
  ]),
)

#set text(size: 9pt)

#grid(
  columns: (1fr, auto),
  align: (left, right),
  [#text(size: 18pt, weight: "bold")[#data.title]],
  [#text(size: 9pt, fill: gray)[Generated #data.generated_date]],
)

#v(0.5em)
#line(length: 100%, stroke: 0.5pt + gray)
#v(0.5em)

#if data.rows.len() == 0 [
  #table(
    columns: data.headers.len(),
    fill: luma(240),
    inset: 6pt,
    ..data.headers.map(h => [*#h*]),
  )
  #v(1em)
  #align(center)[#text(fill: gray)[No data]]
] else [
  // Header repeats on every page
  #table(
    columns: (1.4fr, auto, 2fr, auto, auto, auto, auto),
    align: (left, left, left, left, left, right, left),
    stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else { (bottom: 0.5pt + gray) },
    inset: 6pt,
    fill: (x, y) => if y == 0 { luma(240) } else { none },
    table.header(..data.headers.map(h => [*#h*])),
    ..data.rows.flatten(),
  )
]

#v(1em)
#align(right)[
  #table(
    columns: (auto, auto),
    stroke: none,
    align: (right, right),
    inset: 4pt,
    [Rows:], [#data.total_items],
    table.hline(stroke: 1pt),
    [*Total:*], [*#data.total_price*],
  )
]
"##;

/// Everything the report template reads.
#[derive(Debug, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub generated_date: String,
    pub headers: Vec<String>,
    pub rows: Vec<[String; 7]>,
    pub total_items: usize,
    pub total_price: String,
}

impl ReportDocument {
    pub fn from_rows<R: Borrow<ReportRow>>(title: &str, rows: &[R]) -> Self {
        let total: f64 = rows.iter().map(|r| r.borrow().total_price).sum();
        Self {
            title: title.to_string(),
            generated_date: chrono::Local::now().format("%B %d, %Y").to_string(),
            headers: EXPORT_HEADERS.iter().map(|h| h.to_string()).collect(),
            rows: rows.iter().map(|r| row_cells(r.borrow())).collect(),
            total_items: rows.len(),
            total_price: format_plain_number(total),
        }
    }
}

static RUN_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Scratch directory unique to this call.
fn scratch_dir() -> PathBuf {
    let n = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("crm-report-{}-{n}", std::process::id()))
}

/// Export rows to a PDF at `path` using the Typst CLI. An empty row set
/// produces a document with the header row and a "No data" note.
pub fn export_to_pdf<R: Borrow<ReportRow>>(title: &str, rows: &[R], path: &Path) -> Result<PathBuf> {
    // Check if typst is available
    if Command::new("typst").arg("--version").output().is_err() {
        return Err(ReportError::TypstNotFound);
    }

    let document = ReportDocument::from_rows(title, rows);
    let written = write_atomically(path, |part| compile(&document, part))?;
    tracing::info!(path = %written.display(), rows = rows.len(), "PDF export written");
    Ok(written)
}

fn compile(document: &ReportDocument, output_path: &Path) -> Result<()> {
    let temp_dir = scratch_dir();
    std::fs::create_dir_all(&temp_dir)?;

    let result = run_typst(document, &temp_dir, output_path);
    let _ = std::fs::remove_dir_all(&temp_dir);
    result
}

fn run_typst(document: &ReportDocument, temp_dir: &Path, output_path: &Path) -> Result<()> {
    let json_data = serde_json::to_string(document)
        .map_err(|e| ReportError::PdfGeneration(e.to_string()))?;

    let json_path = temp_dir.join("report_data.json");
    std::fs::write(&json_path, &json_data)?;

    let template_content = REPORT_TEMPLATE.replace("DATA_JSON_PATH", "report_data.json");
    let template_path = temp_dir.join("report.typ");
    std::fs::write(&template_path, &template_content)?;

    // The output carries a .part suffix, so the format is given explicitly.
    let output = Command::new("typst")
        .arg("compile")
        .arg("--format")
        .arg("pdf")
        .arg("--root")
        .arg(temp_dir)
        .arg(&template_path)
        .arg(output_path)
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReportError::PdfGeneration(stderr.trim().to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_document_from_rows() {
        let rows = vec![
            ReportRow::from_value(&json!({"customerName": "X", "totalPrice": 100}), None),
            ReportRow::from_value(&json!({"customerName": "Y", "totalPrice": "20.5"}), None),
        ];
        let doc = ReportDocument::from_rows("License Expiry Report", &rows);
        assert_eq!(doc.total_items, 2);
        assert_eq!(doc.total_price, "120.5");
        assert_eq!(doc.headers.len(), 7);
        assert_eq!(doc.rows[1][0], "Y");

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["rows"][0][5], json!("100"));
    }

    #[test]
    fn test_template_reads_document_fields() {
        for field in ["data.title", "data.generated_date", "data.headers", "data.rows", "data.total_items", "data.total_price"] {
            assert!(REPORT_TEMPLATE.contains(field), "template is missing {field}");
        }
        assert!(REPORT_TEMPLATE.contains("No data"));
    }

    #[test]
    fn test_empty_export_does_not_panic() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f.pdf");
        let rows: Vec<ReportRow> = Vec::new();

        match export_to_pdf("Empty", &rows, &path) {
            Ok(written) => assert!(written.exists()),
            // No typst on this machine: a clean error and no stray file.
            Err(ReportError::TypstNotFound) => assert!(!path.exists()),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
