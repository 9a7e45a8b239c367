use std::fs;
use std::path::PathBuf;

use super::{Envelope, ReportSource};
use crate::error::{ReportError, Result};

/// Serves envelopes from a directory of JSON files, one per endpoint:
/// `reports/license-expiry` is read from `<root>/reports/license-expiry.json`.
///
/// Query parameters are ignored.
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, endpoint: &str) -> PathBuf {
        self.root
            .join(format!("{}.json", endpoint.trim_matches('/')))
    }
}

impl ReportSource for FileSource {
    fn fetch(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Envelope> {
        let path = self.path_for(endpoint);
        tracing::debug!(path = %path.display(), ?query, "reading offline envelope");

        let body = fs::read_to_string(&path).map_err(|e| ReportError::Transport {
            endpoint: endpoint.to_string(),
            reason: format!("{}: {e}", path.display()),
        })?;
        Envelope::parse(endpoint, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reads_nested_endpoint() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("reports")).unwrap();
        fs::write(
            temp.path().join("reports/license-expiry.json"),
            r#"{"success":true,"data":[]}"#,
        )
        .unwrap();

        let source = FileSource::new(temp.path());
        let data = source.fetch_data("reports/license-expiry", &[]).unwrap();
        assert!(data.as_array().unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_transport_error() {
        let temp = TempDir::new().unwrap();
        let source = FileSource::new(temp.path());
        assert!(matches!(
            source.fetch("dashboard/leads-stats", &[]),
            Err(ReportError::Transport { .. })
        ));
    }
}
