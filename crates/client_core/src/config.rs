use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/posts";
pub const DEFAULT_SETTINGS_FILE: &str = "form.toml";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub endpoint_url: Url,
    pub request_timeout: Duration,
    pub enforce_validation: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint_url: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid url"),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            enforce_validation: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid endpoint url '{value}': {source}")]
    InvalidEndpoint {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("endpoint url '{0}' must use http or https")]
    UnsupportedScheme(String),
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    endpoint_url: Option<String>,
    request_timeout_secs: Option<u64>,
    enforce_validation: Option<bool>,
}

pub fn parse_endpoint(raw: &str) -> Result<Url, SettingsError> {
    let raw = raw.trim();
    let url = Url::parse(raw).map_err(|source| SettingsError::InvalidEndpoint {
        value: raw.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(SettingsError::UnsupportedScheme(raw.to_string())),
    }
}

/// With `path == None` the default `form.toml` is read if it exists; an
/// explicit path must exist.
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings, SettingsError> {
    load_settings_with_env(path, |key| std::env::var(key).ok())
}

pub fn load_settings_with_env(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings, SettingsError> {
    let mut settings = ClientSettings::default();

    let file_cfg = match path {
        Some(path) => Some(read_settings_file(path)?),
        None => match read_settings_file(Path::new(DEFAULT_SETTINGS_FILE)) {
            Ok(cfg) => Some(cfg),
            Err(SettingsError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                None
            }
            Err(err) => return Err(err),
        },
    };

    if let Some(file_cfg) = file_cfg {
        if let Some(v) = file_cfg.endpoint_url {
            settings.endpoint_url = parse_endpoint(&v)?;
        }
        if let Some(v) = file_cfg.request_timeout_secs {
            settings.request_timeout = timeout_from_secs(v)?;
        }
        if let Some(v) = file_cfg.enforce_validation {
            settings.enforce_validation = v;
        }
    }

    if let Some(v) = env("FORM_ENDPOINT_URL") {
        settings.endpoint_url = parse_endpoint(&v)?;
    }
    if let Some(v) = env("APP__ENDPOINT_URL") {
        settings.endpoint_url = parse_endpoint(&v)?;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        let secs = v
            .trim()
            .parse::<u64>()
            .map_err(|_| SettingsError::InvalidValue {
                key: "APP__REQUEST_TIMEOUT_SECS",
                value: v.clone(),
            })?;
        settings.request_timeout = timeout_from_secs(secs)?;
    }

    if let Some(v) = env("APP__ENFORCE_VALIDATION") {
        settings.enforce_validation = parse_flag(&v).ok_or(SettingsError::InvalidValue {
            key: "APP__ENFORCE_VALIDATION",
            value: v.clone(),
        })?;
    }

    Ok(settings)
}

pub fn timeout_from_secs(secs: u64) -> Result<Duration, SettingsError> {
    if secs == 0 {
        return Err(SettingsError::InvalidValue {
            key: "request_timeout_secs",
            value: secs.to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn read_settings_file(path: &Path) -> Result<SettingsFile, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
