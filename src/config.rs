use crate::error::{DeskError, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const LOCAL_API_URL: &str = "http://localhost:5000";
pub const HOSTED_API_URL: &str = "https://invoice-extractor-api.onrender.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Base URL of the extraction backend, without trailing slash.
    pub api_url: String,
    pub request_timeout: Duration,
    /// Where exports are written. `None` = Downloads, then Desktop.
    pub download_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: LOCAL_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            download_dir: None,
        }
    }
}

fn load_env() {
    let _ = dotenvy::dotenv();
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Read `.env` (if present) and the `EXTRACTOR_*` variables.
    pub fn from_env() -> Result<Self> {
        load_env();
        Self::from_vars()
    }

    /// Same as [`AppConfig::from_env`] without touching `.env`.
    pub fn from_vars() -> Result<Self> {
        let mut config = AppConfig::default();

        if non_empty_var("EXTRACTOR_PROFILE").as_deref() == Some("hosted") {
            config.api_url = HOSTED_API_URL.to_string();
        }
        if let Some(url) = non_empty_var("EXTRACTOR_API_URL") {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(DeskError::Config(format!(
                    "EXTRACTOR_API_URL must start with http:// or https:// (got {})",
                    url
                )));
            }
            config.api_url = url;
        }
        config.api_url = config.api_url.trim_end_matches('/').to_string();

        if let Some(raw) = non_empty_var("EXTRACTOR_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                DeskError::Config(format!("EXTRACTOR_TIMEOUT_SECS is not a number: {}", raw))
            })?;
            config.request_timeout = Duration::from_secs(secs.max(1));
        }

        config.download_dir = non_empty_var("EXTRACTOR_DOWNLOAD_DIR").map(PathBuf::from);
        Ok(config)
    }

    /// Configured directory, else the user's Downloads or Desktop folder.
    pub fn resolve_download_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.download_dir {
            return Ok(dir.clone());
        }
        dirs::download_dir()
            .or_else(dirs::desktop_dir)
            .ok_or_else(|| DeskError::Config("Could not find Downloads or Desktop folder.".into()))
    }
}
