use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub log_level: String,
    pub search_debounce_ms: u64,
    pub max_upload_size_mb: u64,
}

const DEFAULTS_FILE: &str = "config/default.toml";

fn message(text: String) -> config::ConfigError {
    config::ConfigError::Message(text)
}

impl Config {
    /// Loads the `.env` file (the given path, or the usual `.env` lookup when
    /// none is given) and then reads settings from the process environment.
    pub fn load(env_path: Option<&Path>) -> Result<Self, config::ConfigError> {
        match env_path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| message(format!(
                    "FATAL: Failed to load .env file from '{}'. Error: {}", path.display(), e
                )))?;
            }
            None => {
                // A missing default .env is fine; the variables may come from the shell.
                let _ = dotenvy::dotenv();
            }
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from a key lookup. `config/default.toml`, if
    /// present, supplies base values; looked-up keys override it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, config::ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup_with_defaults(lookup, Path::new(DEFAULTS_FILE))
    }

    /// Same as `from_lookup`, reading base values from `defaults` instead.
    pub fn from_lookup_with_defaults<F>(lookup: F, defaults: &Path) -> Result<Self, config::ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("API_BASE_URL").ok_or_else(|| message(
            "FATAL: Environment variable 'API_BASE_URL' is not set in your .env file.".to_string()
        ))?;
        let parsed = Url::parse(base_url.trim()).map_err(|e| message(format!(
            "FATAL: 'API_BASE_URL' ('{}') is not a valid URL: {}", base_url, e
        )))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(message(format!(
                "FATAL: 'API_BASE_URL' must use http or https, got '{}'.", parsed.scheme()
            )));
        }

        let mut builder = config::Config::builder()
            .set_default("log_level", "info")?
            .set_default("api.request_timeout_secs", 15)?
            .set_default("search_debounce_ms", 300)?
            .set_default("max_upload_size_mb", 10)?
            .add_source(config::File::from(defaults).format(config::FileFormat::Toml).required(false))
            .set_override("api.base_url", parsed.to_string())?;

        if let Some(level) = lookup("LOG_LEVEL") {
            builder = builder.set_override("log_level", level)?;
        }

        for (key, target) in [
            ("REQUEST_TIMEOUT_SECS", "api.request_timeout_secs"),
            ("SEARCH_DEBOUNCE_MS", "search_debounce_ms"),
            ("MAX_UPLOAD_SIZE_MB", "max_upload_size_mb"),
        ] {
            if let Some(raw) = lookup(key) {
                let value = raw
                    .trim()
                    .parse::<i64>()
                    .ok()
                    .filter(|v| *v >= 0)
                    .ok_or_else(|| message(format!(
                        "FATAL: '{}' must be a non-negative integer, got '{}'.", key, raw
                    )))?;
                builder = builder.set_override(target, value)?;
            }
        }

        let config: Config = builder.build()?.try_deserialize()?;
        if config.max_upload_size_mb == 0 {
            return Err(message("FATAL: 'MAX_UPLOAD_SIZE_MB' must be at least 1.".to_string()));
        }
        Ok(config)
    }

    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.api.base_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}
