//! The REST collaborator: JSON envelopes and the sources that produce them.

mod file;
mod http;

pub use file::FileSource;
pub use http::HttpSource;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ReportError, Result};

/// Server-side pagination block some list endpoints attach.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerPagination {
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: u64,
}

/// `{ success, data, pagination?, error? }`
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub pagination: Option<ServerPagination>,
    #[serde(default, alias = "message")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn parse(endpoint: &str, body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| ReportError::MalformedResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    /// Unwrap the payload, turning `success: false` into an error.
    pub fn into_data(self, endpoint: &str) -> Result<Value> {
        if !self.success {
            return Err(ReportError::Rejected {
                endpoint: endpoint.to_string(),
                message: self.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        if let Some(p) = &self.pagination {
            tracing::debug!(
                endpoint,
                page = p.page,
                limit = p.limit,
                total = p.total,
                total_pages = p.total_pages,
                "server pagination"
            );
        }
        Ok(self.data)
    }
}

/// Anything that can answer `GET <endpoint>?<query>` with an envelope.
///
/// Implementations must be shareable across threads; the dashboard issues
/// its fetches concurrently.
pub trait ReportSource: Sync {
    fn fetch(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Envelope>;

    /// Fetch and unwrap in one step.
    fn fetch_data(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value> {
        self.fetch(endpoint, query)?.into_data(endpoint)
    }
}
