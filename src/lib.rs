pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod pdf;
pub mod report;

pub use api::{Envelope, FileSource, HttpSource, ReportSource};
pub use config::{Config, PermissionSet};
pub use error::{ReportError, Result};
pub use report::{load_report, ReportKind, ReportRow, ReportView};
