use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub api: ApiSettings,
    #[serde(default)]
    pub report: ReportSettings,
    pub export: ExportSettings,
    /// Module name -> granted actions. Missing table means unrestricted.
    #[serde(default)]
    pub permissions: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_expiring_within_days")]
    pub expiring_within_days: i64,
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            expiring_within_days: default_expiring_within_days(),
            search_debounce_ms: default_search_debounce_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ExportSettings {
    pub output_dir: String,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_page_size() -> usize {
    10
}

fn default_expiring_within_days() -> i64 {
    30
}

fn default_search_debounce_ms() -> u64 {
    crate::report::debounce::SEARCH_DEBOUNCE_MS
}
