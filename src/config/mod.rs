pub mod permissions;
mod settings;

pub use permissions::{Action, PermissionSet};
pub use settings::{ApiSettings, Config, ExportSettings, ReportSettings};

use crate::error::{ReportError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (XDG config dir, or ~/.crm-report/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "crm-report") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.crm-report/
    let home = dirs_home().ok_or_else(|| {
        ReportError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".crm-report"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Resolve the export output directory. Relative paths are taken from the
/// config directory so exports don't depend on the working directory.
pub fn resolve_output_dir(output_dir: &str, cfg_dir: &Path) -> PathBuf {
    let expanded = expand_path(output_dir);
    if expanded.is_absolute() {
        expanded
    } else {
        cfg_dir.join(expanded)
    }
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    if !config_dir.exists() {
        return Err(ReportError::ConfigNotFound(config_dir.to_path_buf()));
    }
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(ReportError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| ReportError::ConfigParse { path, source: e })
}

/// Create the config directory with a template config.toml
pub fn init_config_dir(cfg_dir: &Path) -> Result<()> {
    if cfg_dir.exists() {
        return Err(ReportError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::create_dir_all(cfg_dir.join("output"))?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    Ok(())
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[api]
base_url = "http://localhost:5000/api"
# token = "..."          # optional, sent as a bearer token
timeout_secs = 10

[report]
page_size = 10
expiring_within_days = 30
search_debounce_ms = 350

[export]
output_dir = "output"    # relative to this directory, or absolute / ~/...

# Restrict what this session may do. Remove the table for full access.
# [permissions]
# reports = ["read", "export"]
# dashboard = ["read"]
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_template_parses_with_defaults() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.report.page_size, 10);
        assert_eq!(config.report.search_debounce_ms, 350);
        assert_eq!(config.api.timeout_secs, 10);
        assert!(config.permissions.is_none());
    }

    #[test]
    fn test_report_section_is_optional() {
        let config: Config = toml::from_str(
            r#"[api]
base_url = "http://x"

[export]
output_dir = "out"

[permissions]
reports = ["read"]
"#,
        )
        .unwrap();
        assert_eq!(config.report.expiring_within_days, 30);
        assert_eq!(config.permissions.unwrap()["reports"], vec!["read"]);
    }

    #[test]
    fn test_resolve_output_dir_relative_to_config() {
        let cfg = Path::new("/etc/crm");
        assert_eq!(resolve_output_dir("output", cfg), PathBuf::from("/etc/crm/output"));
        assert_eq!(resolve_output_dir("/tmp/x", cfg), PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_init_then_load() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("cfg");
        init_config_dir(&dir).unwrap();
        assert!(dir.join("output").is_dir());
        assert!(load_config(&dir).is_ok());
        assert!(matches!(
            init_config_dir(&dir),
            Err(ReportError::AlreadyInitialized(_))
        ));
    }
}
