use std::time::Duration;

use serde::{Deserialize, Serialize};
use visibility_plugins::plugins::page_speed::{DEFAULT_PAGESPEED_ENDPOINT, PAGESPEED_TIMEOUT};
use visibility_plugins::utils::completion::{
    DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL,
};
use visibility_plugins::{Credentials, FetchOptions};

pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

pub const PAGESPEED_ENDPOINT_VAR: &str = "PAGESPEED_ENDPOINT";
pub const OPENAI_BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const OPENAI_MODEL_VAR: &str = "OPENAI_MODEL";

/// Per-run feature toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisOptions {
    pub enable_llm: bool,
    pub enable_performance: bool,
    pub enable_premium: bool,
    pub timeout_ms: u64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            enable_llm: true,
            enable_performance: true,
            enable_premium: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl AnalysisOptions {
    /// Everything that costs nothing to run.
    pub fn free_only() -> Self {
        Self {
            enable_llm: false,
            ..Self::default()
        }
    }

    /// Everything, including premium providers that have credentials.
    pub fn complete() -> Self {
        Self {
            enable_premium: true,
            ..Self::default()
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Where analyzers reach their services and with which keys. Shared across
/// runs.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub credentials: Credentials,
    pub pagespeed_endpoint: String,
    pub pagespeed_timeout: Duration,
    pub openai_base_url: String,
    pub openai_model: String,
    pub fetch: FetchOptions,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            pagespeed_endpoint: DEFAULT_PAGESPEED_ENDPOINT.to_string(),
            pagespeed_timeout: PAGESPEED_TIMEOUT,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            fetch: FetchOptions::default(),
        }
    }
}

impl AnalyzerConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::new(Credentials::from_lookup(&lookup));
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            pagespeed_endpoint: var(PAGESPEED_ENDPOINT_VAR).unwrap_or(defaults.pagespeed_endpoint),
            openai_base_url: var(OPENAI_BASE_URL_VAR).unwrap_or(defaults.openai_base_url),
            openai_model: var(OPENAI_MODEL_VAR).unwrap_or(defaults.openai_model),
            ..defaults
        }
    }

    pub fn with_pagespeed_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.pagespeed_endpoint = endpoint.into();
        self
    }

    pub fn with_openai_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.openai_base_url = base_url.into();
        self
    }
}
