use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mirror_core::{CellAddress, CellAddressError, LayoutError, PublishLayout};
use serde::Deserialize;
use thiserror::Error;

use crate::sheets::DEFAULT_SHEETS_API_BASE;
use crate::{ConcurrencyPolicy, PipelineSettings, RenderSettings, SheetsSettings};

pub const CONFIG_FILENAME: &str = "conf.json";

const DEFAULT_SOURCE_URL: &str =
    "https://confluence.hflabs.ru/plugins/servlet/mobile?contentId=1181220999#content/view/1181220999";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("required setting `{0}` is missing or empty")]
    Missing(&'static str),
    #[error("setting `{field}` is not a valid cell: {source}")]
    Cell {
        field: &'static str,
        #[source]
        source: CellAddressError,
    },
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("credentials in {path:?} are not usable: {reason}")]
    UnsupportedCredentials { path: PathBuf, reason: String },
}

/// How the source page is turned into markup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RendererConfig {
    HeadlessChrome {
        #[serde(default = "default_chrome_binary")]
        binary: PathBuf,
        #[serde(default)]
        virtual_time_budget_ms: Option<u64>,
        #[serde(default)]
        extra_args: Vec<String>,
    },
    Http,
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig::HeadlessChrome {
            binary: default_chrome_binary(),
            virtual_time_budget_ms: None,
            extra_args: Vec::new(),
        }
    }
}

fn default_chrome_binary() -> PathBuf {
    PathBuf::from("chromium")
}

/// Contents of `conf.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MirrorConfig {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default)]
    pub sheet_name: String,
    #[serde(default)]
    pub credentials_file: PathBuf,
    #[serde(default = "default_source_url")]
    pub source_url: String,
    #[serde(default = "default_table_selector")]
    pub table_selector: String,
    #[serde(default = "default_data_anchor")]
    pub data_anchor: String,
    #[serde(default = "default_digest_cell")]
    pub digest_cell: String,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
    #[serde(default = "default_sheets_api_base")]
    pub sheets_api_base: String,
    #[serde(default)]
    pub verify_before_publish: bool,
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

fn default_table_selector() -> String {
    "table".to_string()
}

fn default_data_anchor() -> String {
    "A1".to_string()
}

fn default_digest_cell() -> String {
    "C1".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_store_timeout_secs() -> u64 {
    30
}

fn default_sheets_api_base() -> String {
    DEFAULT_SHEETS_API_BASE.to_string()
}

impl MirrorConfig {
    /// Reads and validates a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: MirrorConfig =
            serde_json::from_str(text).map_err(|source| ConfigError::Parse {
                path: PathBuf::from(CONFIG_FILENAME),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err(ConfigError::Missing("spreadsheet_id"));
        }
        if self.sheet_name.trim().is_empty() {
            return Err(ConfigError::Missing("sheet_name"));
        }
        if self.credentials_file.as_os_str().is_empty() {
            return Err(ConfigError::Missing("credentials_file"));
        }
        if self.source_url.trim().is_empty() {
            return Err(ConfigError::Missing("source_url"));
        }
        self.layout()?;
        Ok(())
    }

    pub fn layout(&self) -> Result<PublishLayout, ConfigError> {
        let data_anchor = parse_cell("data_anchor", &self.data_anchor)?;
        let digest_cell = parse_cell("digest_cell", &self.digest_cell)?;
        Ok(PublishLayout::new(data_anchor, digest_cell)?)
    }

    pub fn pipeline_settings(&self) -> Result<PipelineSettings, ConfigError> {
        Ok(PipelineSettings {
            source_url: self.source_url.clone(),
            sheet_name: self.sheet_name.clone(),
            layout: self.layout()?,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            store_timeout: Duration::from_secs(self.store_timeout_secs),
            concurrency: if self.verify_before_publish {
                ConcurrencyPolicy::VerifyBeforePublish
            } else {
                ConcurrencyPolicy::SingleWriter
            },
        })
    }

    /// `None` when pages are fetched over plain HTTP.
    pub fn render_settings(&self) -> Option<RenderSettings> {
        match &self.renderer {
            RendererConfig::HeadlessChrome {
                binary,
                virtual_time_budget_ms,
                extra_args,
            } => {
                let defaults = RenderSettings::default();
                Some(RenderSettings {
                    binary: binary.clone(),
                    timeout: Duration::from_secs(self.fetch_timeout_secs),
                    virtual_time_budget: virtual_time_budget_ms
                        .map(Duration::from_millis)
                        .or(defaults.virtual_time_budget),
                    extra_args: extra_args.clone(),
                })
            }
            RendererConfig::Http => None,
        }
    }

    pub fn sheets_settings(&self) -> SheetsSettings {
        SheetsSettings {
            api_base: self.sheets_api_base.clone(),
            request_timeout: Duration::from_secs(self.store_timeout_secs),
            ..SheetsSettings::default()
        }
    }
}

fn parse_cell(field: &'static str, text: &str) -> Result<CellAddress, ConfigError> {
    text.parse()
        .map_err(|source| ConfigError::Cell { field, source })
}

#[derive(Debug, Deserialize)]
struct TokenFile {
    access_token: Option<String>,
    private_key: Option<String>,
}

/// Reads the opaque bearer token handed to the remote store.
///
/// Accepts a JSON object with an `access_token` string or the bare token
/// text. Service-account key files are rejected; minting tokens from them
/// is not supported.
pub fn load_access_token(path: &Path) -> Result<String, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let trimmed = text.trim();
    let unusable = |reason: &str| ConfigError::UnsupportedCredentials {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if trimmed.starts_with('{') {
        let file: TokenFile = serde_json::from_str(trimmed).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        return match (file.access_token, file.private_key) {
            (Some(token), _) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            (_, Some(_)) => Err(unusable(
                "service-account key files need a token exchange; supply an access_token instead",
            )),
            _ => Err(unusable("no access_token field")),
        };
    }

    if trimmed.is_empty() {
        return Err(unusable("file is empty"));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(unusable("token must be a single line without spaces"));
    }
    Ok(trimmed.to_string())
}
