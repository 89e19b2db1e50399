//! # Dispatch configuration
//!
//! Settings that shape how operations are mounted and served, loaded from a
//! YAML file and optionally overlaid with environment variables.
//!
//! ## File format
//!
//! ```yaml
//! base_path: /api/v1
//! default_consumes: [application/json]
//! default_produces: [application/json, application/x-yaml]
//! request_id_header: x-request-id
//! ```
//!
//! Every key is optional.
//!
//! ## Environment variables
//!
//! - `SPECROUTE_BASE_PATH`
//! - `SPECROUTE_DEFAULT_CONSUMES` (comma-separated media types)
//! - `SPECROUTE_DEFAULT_PRODUCES` (comma-separated media types)
//!
//! ```rust
//! use specroute::config::DispatchConfig;
//!
//! let config = DispatchConfig::from_yaml_str("base_path: /api").unwrap();
//! assert_eq!(config.base_path, "/api");
//! assert_eq!(config.default_produces, vec!["application/json".to_string()]);
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;

pub const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Prefix every request path must carry; stripped before lookup.
    pub base_path: String,
    /// Used by operations that declare no `consumes`.
    pub default_consumes: Vec<String>,
    /// Used by operations that declare no `produces`.
    pub default_produces: Vec<String>,
    /// Header carrying the inbound request id, echoed on every response.
    pub request_id_header: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            default_consumes: vec![crate::negotiation::JSON.to_string()],
            default_produces: vec![crate::negotiation::JSON.to_string()],
            request_id_header: DEFAULT_REQUEST_ID_HEADER.to_string(),
        }
    }
}

impl DispatchConfig {
    /// Read a YAML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Failed to parse dispatch config")
    }

    /// Overlay `SPECROUTE_*` environment variables.
    #[must_use]
    pub fn apply_env(self) -> Self {
        self.apply_lookup(|key| env::var(key).ok())
    }

    fn apply_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_path) = lookup("SPECROUTE_BASE_PATH") {
            self.base_path = base_path.trim().to_string();
        }
        if let Some(list) = lookup("SPECROUTE_DEFAULT_CONSUMES") {
            self.default_consumes = split_list(&list);
        }
        if let Some(list) = lookup("SPECROUTE_DEFAULT_PRODUCES") {
            self.default_produces = split_list(&list);
        }
        self
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
