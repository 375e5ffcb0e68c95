use std::{fs, path::Path, time::Duration};

use anyhow::{ensure, Context};
use serde::Deserialize;
use tracing::warn;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub store_id: String,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "https://order-api-patiparnpa.vercel.app".into(),
            store_id: "65a39b4ae668f5c8329fac98".into(),
            poll_interval_secs: 15,
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.api_base_url)
            .with_context(|| format!("invalid api_base_url '{}'", self.api_base_url))?;
        ensure!(
            matches!(url.scheme(), "http" | "https"),
            "api_base_url must start with http:// or https://"
        );
        ensure!(
            !self.store_id.trim().is_empty(),
            "store_id must not be empty"
        );
        ensure!(
            self.poll_interval_secs >= 1,
            "poll_interval_secs must be at least 1"
        );
        ensure!(
            self.request_timeout_secs != Some(0),
            "request_timeout_secs must be at least 1 when set"
        );
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    store_id: Option<String>,
    poll_interval_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

/// Defaults, then the config file, then the environment.
///
/// An explicit `config_path` must exist; the default `dashboard.toml` is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match config_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            apply_file(&mut settings, &raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
        }
        None => {
            if let Ok(raw) = fs::read_to_string(DEFAULT_CONFIG_FILE) {
                apply_file(&mut settings, &raw)
                    .with_context(|| format!("invalid config file '{DEFAULT_CONFIG_FILE}'"))?;
            }
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.store_id {
        settings.store_id = v;
    }
    if let Some(v) = file_cfg.poll_interval_secs {
        settings.poll_interval_secs = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = Some(v);
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("DASHBOARD_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("DASHBOARD_STORE_ID") {
        settings.store_id = v;
    }
    if let Some(v) = lookup("APP__STORE_ID") {
        settings.store_id = v;
    }

    if let Some(v) = lookup("APP__POLL_INTERVAL_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.poll_interval_secs = parsed,
            Err(_) => warn!(value = %v, "config: ignoring non-numeric APP__POLL_INTERVAL_SECS"),
        }
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = Some(parsed),
            Err(_) => warn!(value = %v, "config: ignoring non-numeric APP__REQUEST_TIMEOUT_SECS"),
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
