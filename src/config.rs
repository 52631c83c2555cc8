//! Run configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! command-line flags (each of which can also come from an environment
//! variable). Credentials and endpoints are never compiled in.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::SyncError;
use crate::record::urls::{self, DEFAULT_DOWNLOAD_TEMPLATE};
use crate::record::{BuildSettings, DatasetDefaults, LabelStyle, ProxySettings, ResourceFormat, RowTags};

/// Full configuration for a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Spreadsheet URL or local CSV path.
    pub input: Option<String>,
    pub catalog: CatalogConfig,
    pub resources: ResourcesConfig,
    pub dataset: DatasetDefaults,
    pub tags: RowTags,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_secs: u64,
    pub label_style: LabelStyle,
    pub check_groups: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            user_agent: None,
            timeout_secs: 30,
            label_style: LabelStyle::default(),
            check_groups: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourcesConfig {
    pub formats: Vec<ResourceFormat>,
    pub download_url_template: String,
    pub filename_stem: String,
    pub proxy: Option<ProxySettings>,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            formats: vec![ResourceFormat::Csv, ResourceFormat::Json],
            download_url_template: DEFAULT_DOWNLOAD_TEMPLATE.to_string(),
            filename_stem: "activities".to_string(),
            proxy: None,
        }
    }
}

/// Command-line overrides, shared by every subcommand.
#[derive(Clone, Debug, Default, clap::Args)]
pub struct ConfigOverrides {
    /// YAML config file.
    #[arg(long, short = 'c', env = "AIDMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Input spreadsheet URL or local CSV path.
    #[arg(long, env = "AIDMAP_INPUT")]
    pub input: Option<String>,

    /// Base URL of the CKAN catalog.
    #[arg(long, env = "AIDMAP_CATALOG_URL")]
    pub catalog_url: Option<String>,

    /// Catalog API key.
    #[arg(long, env = "AIDMAP_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// User-Agent header sent with every request.
    #[arg(long, env = "AIDMAP_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = "AIDMAP_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Resource formats to publish (repeatable).
    #[arg(long = "format", value_enum)]
    pub formats: Vec<ResourceFormat>,

    /// How groups and tags are written in payloads.
    #[arg(long, value_enum)]
    pub label_style: Option<LabelStyle>,

    /// Link straight to the download endpoint instead of the HXL proxy.
    #[arg(long)]
    pub no_proxy: bool,

    /// Do not check that each country group exists before upserting.
    #[arg(long)]
    pub skip_group_check: bool,
}

impl Config {
    /// Read a YAML config file.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let text = std::fs::read_to_string(path).map_err(|source| SyncError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| SyncError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, then the config file named in `overrides` (if any), then the overrides.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self, SyncError> {
        let mut config = match overrides.config.as_deref() {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Layer command-line values over this config.
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(input) = &overrides.input {
            self.input = Some(input.clone());
        }
        if let Some(url) = &overrides.catalog_url {
            self.catalog.url = Some(url.clone());
        }
        if let Some(api_key) = &overrides.api_key {
            self.catalog.api_key = Some(api_key.clone());
        }
        if let Some(user_agent) = &overrides.user_agent {
            self.catalog.user_agent = Some(user_agent.clone());
        }
        if let Some(timeout) = overrides.timeout {
            self.catalog.timeout_secs = timeout;
        }
        if !overrides.formats.is_empty() {
            self.resources.formats = overrides.formats.clone();
        }
        if let Some(style) = overrides.label_style {
            self.catalog.label_style = style;
        }
        if overrides.no_proxy {
            self.resources.proxy = None;
        }
        if overrides.skip_group_check {
            self.catalog.check_groups = false;
        }
    }

    /// Check values that every subcommand depends on.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.resources.formats.is_empty() {
            return Err(SyncError::InvalidConfig {
                field: "resources.formats",
                message: "at least one format is required".to_string(),
            });
        }
        if self.catalog.timeout_secs == 0 {
            return Err(SyncError::InvalidConfig {
                field: "catalog.timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }

        let probe = urls::download_url(
            &self.resources.download_url_template,
            ResourceFormat::Csv,
            "probe",
            &self.resources.filename_stem,
        )?;
        if let Some(proxy) = &self.resources.proxy {
            urls::proxy_url(
                &proxy.template,
                &probe,
                ResourceFormat::Csv,
                "probe",
                &proxy.directives,
            )?;
        }

        if let Some(url) = self.catalog.url.as_deref() {
            url::Url::parse(url).map_err(|source| SyncError::InvalidConfig {
                field: "catalog.url",
                message: source.to_string(),
            })?;
        }
        Ok(())
    }

    /// The input location, which every subcommand needs.
    pub fn input(&self) -> Result<&str, SyncError> {
        self.input
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(SyncError::MissingConfig("input (--input or AIDMAP_INPUT)"))
    }

    /// Catalog URL and API key, required for `sync`.
    pub fn catalog_credentials(&self) -> Result<(&str, &str), SyncError> {
        let url = self
            .catalog
            .url
            .as_deref()
            .ok_or(SyncError::MissingConfig("catalog URL (--catalog-url or AIDMAP_CATALOG_URL)"))?;
        let api_key = self
            .catalog
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(SyncError::MissingConfig("API key (--api-key or AIDMAP_API_KEY)"))?;
        Ok((url, api_key))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.catalog.timeout_secs)
    }

    /// Builder settings derived from this config.
    pub fn build_settings(&self) -> BuildSettings {
        BuildSettings {
            formats: self.resources.formats.clone(),
            download_url_template: self.resources.download_url_template.clone(),
            filename_stem: self.resources.filename_stem.clone(),
            proxy: self.resources.proxy.clone(),
            dataset: self.dataset.clone(),
        }
    }
}
