// src/config/uplink.rs
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, time::Duration};
use tracing::{info, warn};

use crate::acquire::prompts::DEFAULT_TICKER_SYMBOLS;
use crate::orchestrator::Cadence;
use crate::retry::RetryPolicy;
use crate::upstream::gemini::DEFAULT_ENDPOINT;

pub const ENV_UPLINK_CONFIG_PATH: &str = "UPLINK_CONFIG_PATH";
pub const DEFAULT_UPLINK_CONFIG_PATH: &str = "config/uplink.toml";

/// Primary and fallback variables consulted when `api_key = "ENV"`.
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "API_KEY";

const DEFAULT_CHAT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MAX_RETRY_MULTIPLIER: f64 = 10.0;
const MAX_INITIAL_DELAY_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let p = RetryPolicy::default();
        Self {
            max_retries: p.max_retries,
            initial_delay_ms: p.initial_delay.as_millis() as u64,
            multiplier: p.multiplier,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.initial_delay_ms),
            self.multiplier,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    pub ticker_interval_secs: u64,
    pub events_delay_secs: u64,
    pub social_interval_secs: u64,
    pub category_debounce_ms: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            ticker_interval_secs: 180,
            events_delay_secs: 10,
            social_interval_secs: 150,
            category_debounce_ms: 1000,
        }
    }
}

impl RefreshSettings {
    pub fn cadence(&self) -> Cadence {
        Cadence {
            ticker_interval: Duration::from_secs(self.ticker_interval_secs),
            events_delay: Duration::from_secs(self.events_delay_secs),
            social_interval: Duration::from_secs(self.social_interval_secs),
            category_debounce: Duration::from_millis(self.category_debounce_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Tool-call round trips allowed per user message.
    pub max_tool_rounds: u32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self { max_tool_rounds: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UplinkConfig {
    /// "ENV" means: read from GEMINI_API_KEY, then API_KEY
    pub api_key: String,
    pub endpoint: String,
    pub feed_model: String,
    pub chat_model: String,
    pub chat_temperature: f32,
    pub request_timeout_secs: u64,
    pub ticker_symbols: Vec<String>,
    pub retry: RetrySettings,
    pub refresh: RefreshSettings,
    pub chat: ChatSettings,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            api_key: "ENV".to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            feed_model: "gemini-3-flash-preview".to_string(),
            chat_model: "gemini-3-pro-preview".to_string(),
            chat_temperature: DEFAULT_CHAT_TEMPERATURE,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            ticker_symbols: DEFAULT_TICKER_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            retry: RetrySettings::default(),
            refresh: RefreshSettings::default(),
            chat: ChatSettings::default(),
        }
    }
}

impl UplinkConfig {
    /// `UPLINK_CONFIG_PATH`, else `config/uplink.toml` when present, else defaults.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = env::var(ENV_UPLINK_CONFIG_PATH) {
            return Self::load_from_file(&path)
                .with_context(|| format!("loading uplink config from {path}"));
        }
        if Path::new(DEFAULT_UPLINK_CONFIG_PATH).exists() {
            return Self::load_from_file(DEFAULT_UPLINK_CONFIG_PATH);
        }
        Ok(Self::default().finalize())
    }

    /// TOML by default; `.json` files are read as JSON.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let cfg: UplinkConfig = if is_json {
            serde_json::from_str(&data)?
        } else {
            toml::from_str(&data)?
        };

        Ok(cfg.finalize())
    }

    fn finalize(mut self) -> Self {
        self.resolve_api_key();
        self.sanitize();
        info!(
            target: "config",
            feed_model = %self.feed_model,
            chat_model = %self.chat_model,
            key_len = self.api_key.len(),
            symbols = self.ticker_symbols.len(),
            "uplink config loaded"
        );
        self
    }

    fn resolve_api_key(&mut self) {
        if !self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = self.api_key.trim().to_string();
            return;
        }
        self.api_key = env::var(ENV_API_KEY)
            .or_else(|_| env::var(ENV_API_KEY_FALLBACK))
            .map(|k| k.trim().to_string())
            .unwrap_or_default();
        if self.api_key.is_empty() {
            warn!(
                target: "config",
                "no {ENV_API_KEY} / {ENV_API_KEY_FALLBACK} set; every uplink call will fail"
            );
        }
    }

    fn sanitize(&mut self) {
        let defaults = Self::default();

        if self.endpoint.trim().is_empty() {
            self.endpoint = defaults.endpoint;
        }
        if self.feed_model.trim().is_empty() {
            self.feed_model = defaults.feed_model;
        }
        if self.chat_model.trim().is_empty() {
            self.chat_model = defaults.chat_model;
        }
        if !(0.0..=2.0).contains(&self.chat_temperature) {
            self.chat_temperature = DEFAULT_CHAT_TEMPERATURE;
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = DEFAULT_TIMEOUT_SECS;
        }

        self.ticker_symbols = self
            .ticker_symbols
            .iter()
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if self.ticker_symbols.is_empty() {
            self.ticker_symbols = defaults.ticker_symbols;
        }

        // Backoff must grow and stay bounded.
        if !(1.0..=MAX_RETRY_MULTIPLIER).contains(&self.retry.multiplier) {
            self.retry.multiplier = defaults.retry.multiplier;
        }
        if self.retry.initial_delay_ms > MAX_INITIAL_DELAY_MS {
            self.retry.initial_delay_ms = defaults.retry.initial_delay_ms;
        }
        if self.retry.max_retries > 10 {
            self.retry.max_retries = defaults.retry.max_retries;
        }

        let r = &mut self.refresh;
        let d = defaults.refresh;
        if r.ticker_interval_secs == 0 {
            r.ticker_interval_secs = d.ticker_interval_secs;
        }
        if r.social_interval_secs == 0 {
            r.social_interval_secs = d.social_interval_secs;
        }

        if self.chat.max_tool_rounds == 0 {
            self.chat.max_tool_rounds = defaults.chat.max_tool_rounds;
        }
    }
}
