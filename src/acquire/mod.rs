// src/acquire/mod.rs
//! Feed acquisition: prompt, grounded call under the retry policy, citations, parse.

pub mod citations;
pub mod prompts;

use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use tracing::debug;

use crate::config::uplink::UplinkConfig;
use crate::error::UplinkError;
use crate::metrics::ensure_metrics_described;
use crate::model::{
    Category, Citation, Domain, GlobalEvent, MacroSignal, MarketTick, NewsStory, SocialPost,
};
use crate::parse::{ParseContext, ParserSet};
use crate::retry::RetryPolicy;
use crate::upstream::{DynBackend, GenerateRequest, GenerateResponse};

use self::prompts::Prompt;

/// One fetch result. Always a full replacement for the previous snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedSnapshot<T> {
    pub records: Vec<T>,
    pub sources: Vec<Citation>,
}

impl<T> Default for FeedSnapshot<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            sources: Vec::new(),
        }
    }
}

pub struct AcquisitionClient {
    backend: DynBackend,
    model: String,
    retry: RetryPolicy,
    parsers: ParserSet,
    ticker_symbols: Vec<String>,
}

impl AcquisitionClient {
    pub fn new(backend: DynBackend, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            retry: RetryPolicy::default(),
            parsers: ParserSet::default(),
            ticker_symbols: prompts::DEFAULT_TICKER_SYMBOLS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn from_config(backend: DynBackend, cfg: &UplinkConfig) -> Self {
        Self::new(backend, cfg.feed_model.clone())
            .with_retry(cfg.retry.policy())
            .with_ticker_symbols(cfg.ticker_symbols.clone())
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_parsers(mut self, parsers: ParserSet) -> Self {
        self.parsers = parsers;
        self
    }

    /// An empty list keeps the current symbols.
    pub fn with_ticker_symbols(mut self, symbols: Vec<String>) -> Self {
        if !symbols.is_empty() {
            self.ticker_symbols = symbols;
        }
        self
    }

    async fn grounded(&self, domain: Domain, prompt: Prompt) -> Result<GenerateResponse, UplinkError> {
        ensure_metrics_described();
        counter!("uplink_fetch_total", "domain" => domain.as_str()).increment(1);

        let req = GenerateRequest::grounded(&self.model, &prompt.instruction, prompt.system);
        let started = Instant::now();
        let result = self
            .retry
            .run(domain.as_str(), || self.backend.generate(&req))
            .await;
        histogram!("uplink_fetch_ms", "domain" => domain.as_str())
            .record(started.elapsed().as_secs_f64() * 1000.0);

        if let Err(e) = &result {
            counter!(
                "uplink_fetch_failures_total",
                "domain" => domain.as_str(),
                "kind" => e.kind().as_str()
            )
            .increment(1);
        }
        result
    }

    fn finish<T>(domain: Domain, resp: &GenerateResponse, records: Vec<T>) -> FeedSnapshot<T> {
        counter!("uplink_records_total", "domain" => domain.as_str()).increment(records.len() as u64);
        debug!(
            target: "uplink",
            domain = domain.as_str(),
            records = records.len(),
            chars = resp.text.len(),
            "feed parsed"
        );
        FeedSnapshot {
            records,
            sources: citations::extract(&resp.grounding, citations::FEED_SOURCE_TITLE),
        }
    }

    pub async fn fetch_ticker(&self) -> Result<FeedSnapshot<MarketTick>, UplinkError> {
        let resp = self
            .grounded(Domain::Ticker, prompts::ticker(&self.ticker_symbols))
            .await?;
        let ctx = ParseContext::now(Category::Markets);
        let records = self.parsers.ticker.parse(&resp.text, &ctx);
        Ok(Self::finish(Domain::Ticker, &resp, records))
    }

    pub async fn fetch_macro(&self) -> Result<FeedSnapshot<MacroSignal>, UplinkError> {
        let resp = self.grounded(Domain::Macro, prompts::macro_signals()).await?;
        let ctx = ParseContext::now(Category::Macro);
        let records = self.parsers.macro_signals.parse(&resp.text, &ctx);
        Ok(Self::finish(Domain::Macro, &resp, records))
    }

    pub async fn fetch_news(&self, category: Category) -> Result<FeedSnapshot<NewsStory>, UplinkError> {
        let resp = self.grounded(Domain::News, prompts::news(category)).await?;
        let ctx = ParseContext::now(category);
        let records = self.parsers.news.parse(&resp.text, &ctx);
        Ok(Self::finish(Domain::News, &resp, records))
    }

    pub async fn fetch_social(&self, query: Option<&str>) -> Result<FeedSnapshot<SocialPost>, UplinkError> {
        let resp = self.grounded(Domain::Social, prompts::social(query)).await?;
        let ctx = ParseContext::now(Category::Social);
        let records = self.parsers.social.parse(&resp.text, &ctx);
        Ok(Self::finish(Domain::Social, &resp, records))
    }

    pub async fn fetch_events(&self) -> Result<FeedSnapshot<GlobalEvent>, UplinkError> {
        let resp = self.grounded(Domain::Events, prompts::events()).await?;
        let ctx = ParseContext::now(Category::Markets);
        let records = self.parsers.events.parse(&resp.text, &ctx);
        Ok(Self::finish(Domain::Events, &resp, records))
    }
}
