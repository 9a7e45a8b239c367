mod typst;

pub use typst::{export_to_pdf, ReportDocument, REPORT_TEMPLATE};
