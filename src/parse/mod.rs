// src/parse/mod.rs
//! Text-to-record parsers for the free-text answers of the upstream model.
//!
//! Parsing is total: malformed lines or blocks are dropped or defaulted, never
//! reported as errors. An unparseable answer is simply an empty feed.

pub mod blocks;
pub mod fields;
pub mod lines;

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::model::{Category, GlobalEvent, MacroSignal, MarketTick, NewsStory, SocialPost};

pub use blocks::{BlockLayout, EventParser, NewsParser, SocialParser};
pub use lines::{MacroParser, TickerParser};

/// Request-side facts a parser may stamp onto its records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseContext {
    pub category: Category,
    pub fetched_at: DateTime<Utc>,
}

impl ParseContext {
    pub fn now(category: Category) -> Self {
        Self {
            category,
            fetched_at: Utc::now(),
        }
    }

    pub fn at_millis(category: Category, epoch_millis: i64) -> Self {
        Self {
            category,
            fetched_at: Utc
                .timestamp_millis_opt(epoch_millis)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }

    /// Local `HH:MM` of the fetch, as shown next to news items.
    pub fn short_time(&self) -> String {
        self.fetched_at.with_timezone(&Local).format("%H:%M").to_string()
    }
}

/// Turns one free-text answer into records. Implementations must not panic
/// and must not fail; noise yields fewer records.
pub trait RecordParser: Send + Sync {
    type Record;

    fn parse(&self, text: &str, ctx: &ParseContext) -> Vec<Self::Record>;
}

/// The parser used for each feed. Swap an entry to change the text contract
/// without touching acquisition or orchestration.
pub struct ParserSet {
    pub ticker: Box<dyn RecordParser<Record = MarketTick>>,
    pub macro_signals: Box<dyn RecordParser<Record = MacroSignal>>,
    pub news: Box<dyn RecordParser<Record = NewsStory>>,
    pub social: Box<dyn RecordParser<Record = SocialPost>>,
    pub events: Box<dyn RecordParser<Record = GlobalEvent>>,
}

impl Default for ParserSet {
    fn default() -> Self {
        Self {
            ticker: Box::new(TickerParser),
            macro_signals: Box::new(MacroParser),
            news: Box::new(NewsParser::default()),
            social: Box::new(SocialParser::default()),
            events: Box::new(EventParser::default()),
        }
    }
}

impl std::fmt::Debug for ParserSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserSet").finish_non_exhaustive()
    }
}
