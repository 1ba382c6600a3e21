//! # Data model
//! Records produced by the feed parsers plus the small closed enums they carry.
//!
//! Every record is created fresh per fetch and replaced wholesale on the next
//! successful fetch of the same domain. Ids are only unique inside one batch.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dashboard category. Selects both the view and the news topic framing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    #[default]
    Markets,
    Macro,
    Defi,
    Altcoins,
    Regulation,
    Politics,
    Social,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Markets,
        Category::Macro,
        Category::Defi,
        Category::Altcoins,
        Category::Regulation,
        Category::Politics,
        Category::Social,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Markets => "MARKETS",
            Category::Macro => "MACRO",
            Category::Defi => "DEFI",
            Category::Altcoins => "ALTCOINS",
            Category::Regulation => "REGULATION",
            Category::Politics => "POLITICS",
            Category::Social => "SOCIAL",
        }
    }

    /// Which feed a category switch loads.
    pub fn feed_domain(&self) -> Domain {
        match self {
            Category::Social => Domain::Social,
            Category::Macro => Domain::Macro,
            _ => Domain::News,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow::anyhow!("unknown category: {wanted}"))
    }
}

/// One of the five independently fetched feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Ticker,
    Macro,
    News,
    Social,
    Events,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Ticker => "ticker",
            Domain::Macro => "macro",
            Domain::News => "news",
            Domain::Social => "social",
            Domain::Events => "events",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A web reference the upstream model used to ground its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTick {
    pub symbol: String,
    pub price: String,
    pub change_text: String,
    pub is_positive: bool,
    pub observed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MacroGroup {
    Equities,
    Commodities,
    Indicators,
    CryptoMacro,
}

impl MacroGroup {
    /// Unknown groups land in INDICATORS.
    pub fn parse_lenient(raw: &str) -> Self {
        match enum_token(raw).as_str() {
            "EQUITIES" => MacroGroup::Equities,
            "COMMODITIES" => MacroGroup::Commodities,
            "CRYPTO_MACRO" => MacroGroup::CryptoMacro,
            _ => MacroGroup::Indicators,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Impact {
    Critical,
    High,
    Moderate,
    Low,
}

impl Impact {
    pub fn parse_lenient(raw: &str) -> Self {
        match enum_token(raw).as_str() {
            "CRITICAL" => Impact::Critical,
            "HIGH" => Impact::High,
            "MODERATE" => Impact::Moderate,
            _ => Impact::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroSignal {
    pub group: MacroGroup,
    pub label: String,
    pub value: String,
    pub change_text: String,
    pub is_positive: bool,
    pub impact: Impact,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsStory {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub category: Category,
    /// Short display time (`HH:MM`) of the fetch.
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    pub fn parse_lenient(raw: &str) -> Self {
        match enum_token(raw).as_str() {
            "BULLISH" => Sentiment::Bullish,
            "BEARISH" => Sentiment::Bearish,
            _ => Sentiment::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialPost {
    pub id: String,
    pub user: String,
    pub handle: String,
    pub content: String,
    pub sentiment: Sentiment,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Critical,
    High,
    Stable,
}

impl EventStatus {
    pub fn parse_lenient(raw: &str) -> Self {
        match enum_token(raw).as_str() {
            "CRITICAL" => EventStatus::Critical,
            "HIGH" => EventStatus::High,
            _ => EventStatus::Stable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalEvent {
    pub id: String,
    pub label: String,
    pub date: String,
    pub status: EventStatus,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Citation>>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            timestamp: Utc::now(),
            sources: None,
        }
    }

    pub fn model(text: impl Into<String>, sources: Vec<Citation>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
            timestamp: Utc::now(),
            sources: (!sources.is_empty()).then_some(sources),
        }
    }
}

/// `true` only for a direction token equal to "UP" (any case).
pub fn is_up(direction: Option<&str>) -> bool {
    direction.is_some_and(|d| d.trim().eq_ignore_ascii_case("UP"))
}

/// First word of an enum-ish segment, uppercased: "(bullish)." -> "BULLISH".
fn enum_token(raw: &str) -> String {
    raw.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .find(|w| !w.is_empty())
        .unwrap_or_default()
        .to_ascii_uppercase()
}
