use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CHAT_COMPLETIONS: &str = "/chat/completions";
pub const CHAT_STOP: &str = "/chat/stop";
pub const WORKSPACE_FILES: &str = "/workspace/files";
pub const WORKSPACE_TREE: &str = "/workspace/tree";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the analysis backend
    pub backend_url: String,
    /// Base URL used for file downloads and previews
    pub file_server_url: String,
    pub model: String,
    pub refresh_debounce_ms: u64,
    pub scroll_settle_ms: u64,
    /// Where UI state is persisted; defaults to the platform data dir
    pub state_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8200".to_string(),
            file_server_url: "http://localhost:8100".to_string(),
            model: "deepanalyze-8b".to_string(),
            refresh_debounce_ms: 300,
            scroll_settle_ms: 150,
            state_dir: None,
        }
    }
}

impl Config {
    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    pub fn state_dir(&self) -> Result<PathBuf> {
        match &self.state_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let data = dirs::data_dir()
                    .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
                Ok(data.join("analysis-workspace"))
            }
        }
    }

    /// Apply `BACKEND_URL`, `FILE_SERVER_BASE` and `ANALYSIS_MODEL` overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("BACKEND_URL").filter(|v| !v.is_empty()) {
            self.backend_url = url;
        }
        if let Some(url) = lookup("FILE_SERVER_BASE").filter(|v| !v.is_empty()) {
            self.file_server_url = url;
        }
        if let Some(model) = lookup("ANALYSIS_MODEL").filter(|v| !v.is_empty()) {
            self.model = model;
        }
    }

    /// Validate and normalise base URLs
    pub fn normalize(&mut self) -> Result<()> {
        self.backend_url = normalize_base_url(&self.backend_url)?;
        self.file_server_url = normalize_base_url(&self.file_server_url)?;
        Ok(())
    }
}

/// Origin plus path of an absolute http(s) URL, without trailing slash
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| anyhow::anyhow!("Invalid base URL {:?}: {}", raw, e))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("Unsupported URL scheme in {:?}", raw);
    }
    let origin = parsed.origin().ascii_serialization();
    Ok(format!("{}{}", origin, parsed.path().trim_end_matches('/')))
}

/// Get the path to the configuration file
pub fn get_config_path() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home
        .join(".config")
        .join("analysis-workspace")
        .join("config.json"))
}

/// Load configuration from `path` (or the default location), then apply
/// environment overrides. A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => get_config_path()?,
    };

    let mut config = if path.exists() {
        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content)?
    } else {
        Config::default()
    };

    config.apply_env();
    config.normalize()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("http://localhost:8200/").unwrap(),
            "http://localhost:8200"
        );
        assert_eq!(
            normalize_base_url(" https://example.com/api/v1/ ").unwrap(),
            "https://example.com/api/v1"
        );
        assert!(normalize_base_url("localhost:8200").is_err());
        assert!(normalize_base_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"model": "custom", "refresh_debounce_ms": 50}"#).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let config: Config = serde_json::from_str(&content).unwrap();
        assert_eq!(config.model, "custom");
        assert_eq!(config.refresh_debounce(), Duration::from_millis(50));
        assert_eq!(config.backend_url, "http://localhost:8200");
        assert_eq!(config.scroll_settle_ms, 150);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BACKEND_URL", "http://10.0.0.5:8200/"),
            ("ANALYSIS_MODEL", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));
        config.normalize().unwrap();

        assert_eq!(config.backend_url, "http://10.0.0.5:8200");
        assert_eq!(config.model, "deepanalyze-8b");
    }

    #[test]
    fn test_invalid_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
