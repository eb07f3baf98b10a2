use crate::error::{Result, SearchError};
use crate::fusion::DEFAULT_RRF_K;
use passage_protocol::FusionStrategy;
use serde::Deserialize;
use std::path::Path;

const MAX_WORKSPACE_OFFSET: f64 = 0.3;

/// Tunables for one retriever instance. Passed explicitly, never global.
#[derive(Clone, Debug, PartialEq)]
pub struct RetrievalConfig {
    pub default_top_k: usize,
    /// Each source is asked for `over_fetch × top_k` candidates before fusion.
    pub over_fetch: usize,
    pub fusion: FusionStrategy,
    pub rrf_k: f64,
    pub workspace_threshold_offset: f64,
    pub log_retrievals: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            over_fetch: 2,
            fusion: FusionStrategy::Rrf,
            rrf_k: DEFAULT_RRF_K,
            workspace_threshold_offset: 0.0,
            log_retrievals: true,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRetrievalConfig {
    #[serde(default)]
    schema_version: Option<u32>,
    default_top_k: Option<usize>,
    over_fetch: Option<usize>,
    fusion: Option<FusionStrategy>,
    rrf_k: Option<f64>,
    workspace_threshold_offset: Option<f64>,
    log_retrievals: Option<bool>,
}

impl RetrievalConfig {
    /// Parse JSON, falling back to TOML.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw = parse_raw(bytes)?;
        Self::from_raw(raw)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|err| {
            SearchError::Config(format!("Failed to read config {}: {err}", path.display()))
        })?;
        Self::from_bytes(&bytes).map_err(|err| match err {
            SearchError::Config(msg) => SearchError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    fn from_raw(raw: RawRetrievalConfig) -> Result<Self> {
        if let Some(schema_version) = raw.schema_version {
            if schema_version != 1 {
                return Err(SearchError::Config(format!(
                    "schema_version {schema_version} is not supported (expected 1)"
                )));
            }
        }

        let defaults = Self::default();
        let cfg = Self {
            default_top_k: raw.default_top_k.unwrap_or(defaults.default_top_k),
            over_fetch: raw.over_fetch.unwrap_or(defaults.over_fetch),
            fusion: raw.fusion.unwrap_or(defaults.fusion),
            rrf_k: raw.rrf_k.unwrap_or(defaults.rrf_k),
            workspace_threshold_offset: raw
                .workspace_threshold_offset
                .unwrap_or(defaults.workspace_threshold_offset),
            log_retrievals: raw.log_retrievals.unwrap_or(defaults.log_retrievals),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_top_k == 0 {
            return Err(SearchError::Config("default_top_k must be at least 1".into()));
        }
        if self.over_fetch == 0 {
            return Err(SearchError::Config("over_fetch must be at least 1".into()));
        }
        if !(self.rrf_k.is_finite() && self.rrf_k > 0.0) {
            return Err(SearchError::Config(format!(
                "rrf_k must be a positive number, got {}",
                self.rrf_k
            )));
        }
        if !self.workspace_threshold_offset.is_finite()
            || self.workspace_threshold_offset.abs() > MAX_WORKSPACE_OFFSET
        {
            return Err(SearchError::Config(format!(
                "workspace_threshold_offset must be within ±{MAX_WORKSPACE_OFFSET}, got {}",
                self.workspace_threshold_offset
            )));
        }
        Ok(())
    }
}

fn parse_raw(bytes: &[u8]) -> Result<RawRetrievalConfig> {
    let value: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(json_err) => {
            let utf8 = std::str::from_utf8(bytes)
                .map_err(|err| SearchError::Config(format!("{json_err}; {err}")))?;
            let toml_value: toml::Value = toml::from_str(utf8).map_err(|toml_err| {
                SearchError::Config(format!(
                    "Config is not valid JSON or TOML ({json_err}); TOML parse error: {toml_err}"
                ))
            })?;
            serde_json::to_value(toml_value).map_err(|err| {
                SearchError::Config(format!("Failed to convert TOML config to JSON: {err}"))
            })?
        }
    };

    serde_json::from_value(value)
        .map_err(|err| SearchError::Config(format!("Config parse error: {err}")))
}
