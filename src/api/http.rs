use std::time::Duration;
use ureq::Agent;

use super::{Envelope, ReportSource};
use crate::config::ApiSettings;
use crate::error::{ReportError, Result};

/// Talks to the live backend over HTTP.
pub struct HttpSource {
    agent: Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpSource {
    pub fn new(settings: &ApiSettings) -> Self {
        // Non-2xx responses still carry an envelope worth reading.
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

impl ReportSource for HttpSource {
    fn fetch(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Envelope> {
        let url = self.url(endpoint);
        tracing::debug!(%url, ?query, "GET");

        let mut request = self.agent.get(&url).header("Accept", "application/json");
        for (key, value) in query {
            request = request.query(*key, value);
        }
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let transport = |e: ureq::Error| ReportError::Transport {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        };

        let mut response = request.call().map_err(transport)?;
        let status = response.status();
        let body = response.body_mut().read_to_string().map_err(transport)?;

        match Envelope::parse(endpoint, &body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(ReportError::Transport {
                endpoint: endpoint.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            }),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let source = HttpSource::new(&ApiSettings {
            base_url: "http://localhost:5000/api/".to_string(),
            token: None,
            timeout_secs: 1,
        });
        assert_eq!(
            source.url("/reports/license-expiry"),
            "http://localhost:5000/api/reports/license-expiry"
        );
        assert_eq!(source.url("dashboard/leads-stats"), "http://localhost:5000/api/dashboard/leads-stats");
    }
}
