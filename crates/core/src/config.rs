//! Container configuration.
//!
//! Values come from a JSON document (missing fields fall back to defaults), then
//! from `BULKHEAD_*` environment overrides. `validate` runs last so malformed
//! settings fail at deployment time rather than at the first lookup.

use crate::error::{BulkheadError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_SYMBOL_CACHE_TTL_MS: &str = "BULKHEAD_SYMBOL_CACHE_TTL_MS";
pub const ENV_RESOURCE_CACHE_TTL_MS: &str = "BULKHEAD_RESOURCE_CACHE_TTL_MS";
pub const ENV_DENY_MODE: &str = "BULKHEAD_DENY_MODE";

pub const DEFAULT_CACHE_CAPACITY: u64 = 2500;
pub const DEFAULT_SYMBOL_TTL_MS: u64 = 15_000;
pub const DEFAULT_RESOURCE_TTL_MS: u64 = 10_000;

/// How deny-list hits are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyMode {
    /// A hit disqualifies the export-index tier.
    #[default]
    Strict,
    /// A hit is logged and otherwise ignored.
    Permissive,
}

impl FromStr for DenyMode {
    type Err = BulkheadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(DenyMode::Strict),
            "permissive" => Ok(DenyMode::Permissive),
            other => Err(BulkheadError::Config(format!("unknown deny mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub initial_capacity: usize,
    pub max_capacity: u64,
    /// Number of independently locked segments.
    pub concurrency_level: usize,
    /// Time to live from write, in milliseconds.
    pub ttl_ms: u64,
}

impl CacheConfig {
    pub fn symbols() -> Self {
        Self {
            initial_capacity: 256,
            max_capacity: DEFAULT_CACHE_CAPACITY,
            concurrency_level: 4,
            ttl_ms: DEFAULT_SYMBOL_TTL_MS,
        }
    }

    pub fn resources() -> Self {
        Self {
            ttl_ms: DEFAULT_RESOURCE_TTL_MS,
            ..Self::symbols()
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.max_capacity == 0 {
            return Err(BulkheadError::Config(format!(
                "{name}.max_capacity must be greater than zero"
            )));
        }
        if self.ttl_ms == 0 {
            return Err(BulkheadError::Config(format!(
                "{name}.ttl_ms must be greater than zero"
            )));
        }
        if self.concurrency_level == 0 {
            return Err(BulkheadError::Config(format!(
                "{name}.concurrency_level must be greater than zero"
            )));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::symbols()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationConfig {
    pub symbol_cache: CacheConfig,
    pub resource_cache: CacheConfig,
    pub deny_mode: DenyMode,
    /// Namespace patterns reserved for the framework's own SPI, logging and error types.
    pub framework_namespaces: Vec<String>,
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            symbol_cache: CacheConfig::symbols(),
            resource_cache: CacheConfig::resources(),
            deny_mode: DenyMode::Strict,
            framework_namespaces: vec![
                "bulkhead.spi.*".to_string(),
                "bulkhead.api.*".to_string(),
                "bulkhead.log.*".to_string(),
                "bulkhead.exception.*".to_string(),
            ],
        }
    }
}

impl IsolationConfig {
    /// Read a JSON config file, apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?.with_env_overrides()?;
        config.validate()?;
        tracing::info!("Loaded isolation config from {}", path.display());
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = lookup(ENV_SYMBOL_CACHE_TTL_MS) {
            self.symbol_cache.ttl_ms = parse_millis(ENV_SYMBOL_CACHE_TTL_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RESOURCE_CACHE_TTL_MS) {
            self.resource_cache.ttl_ms = parse_millis(ENV_RESOURCE_CACHE_TTL_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DENY_MODE) {
            self.deny_mode = raw.parse()?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.symbol_cache.validate("symbol_cache")?;
        self.resource_cache.validate("resource_cache")?;
        if self.framework_namespaces.iter().any(|ns| ns.trim().is_empty()) {
            return Err(BulkheadError::Config(
                "framework_namespaces must not contain blank entries".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| BulkheadError::Config(format!("{key} expects milliseconds, got '{raw}'")))
}
