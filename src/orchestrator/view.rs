//! Read model handed to the presentation layer.

use chrono::Local;
use serde::{Serialize, Serializer};

use crate::acquire::FeedSnapshot;
use crate::error::ErrorKind;
use crate::model::{
    Category, Citation, Domain, GlobalEvent, MacroSignal, MarketTick, NewsStory, SocialPost,
};

pub const NEVER_SYNCED: &str = "NEVER";

/// Banner shown after a failed content fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedAlert {
    CoolingDown,
    UplinkFailure,
}

impl FeedAlert {
    pub fn from_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::RateLimited => FeedAlert::CoolingDown,
            ErrorKind::Other => FeedAlert::UplinkFailure,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            FeedAlert::CoolingDown => "NODE_COOLING_DOWN: RETRY_IN_60S",
            FeedAlert::UplinkFailure => "UPLINK_FAILURE: PACKET_LOSS",
        }
    }
}

impl Serialize for FeedAlert {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedView<T> {
    pub records: Vec<T>,
    pub sources: Vec<Citation>,
    pub loading: bool,
    /// Local `HH:MM:SS` of the last successful fetch, or "NEVER".
    pub last_sync_time: String,
}

impl<T> Default for FeedView<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            sources: Vec::new(),
            loading: false,
            last_sync_time: NEVER_SYNCED.to_string(),
        }
    }
}

impl<T> FeedView<T> {
    pub fn replace(&mut self, snapshot: FeedSnapshot<T>) {
        self.records = snapshot.records;
        self.sources = snapshot.sources;
        self.last_sync_time = Local::now().format("%H:%M:%S").to_string();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    Syncing,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub label: &'static str,
    pub status: NodeState,
}

fn node(label: &'static str, syncing: bool) -> NodeStatus {
    NodeStatus {
        label,
        status: if syncing { NodeState::Syncing } else { NodeState::Active },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub active_category: Category,
    pub search_query: Option<String>,
    pub auto_refresh_enabled: bool,
    pub alert: Option<FeedAlert>,
    pub ticker: FeedView<MarketTick>,
    #[serde(rename = "macro")]
    pub macro_signals: FeedView<MacroSignal>,
    pub news: FeedView<NewsStory>,
    pub social: FeedView<SocialPost>,
    pub events: FeedView<GlobalEvent>,
    pub nodes: Vec<NodeStatus>,
}

impl Default for DashboardView {
    fn default() -> Self {
        let mut view = Self {
            active_category: Category::default(),
            search_query: None,
            auto_refresh_enabled: true,
            alert: None,
            ticker: FeedView::default(),
            macro_signals: FeedView::default(),
            news: FeedView::default(),
            social: FeedView::default(),
            events: FeedView::default(),
            nodes: Vec::new(),
        };
        view.refresh_nodes();
        view
    }
}

impl DashboardView {
    pub fn is_loading(&self, domain: Domain) -> bool {
        match domain {
            Domain::Ticker => self.ticker.loading,
            Domain::Macro => self.macro_signals.loading,
            Domain::News => self.news.loading,
            Domain::Social => self.social.loading,
            Domain::Events => self.events.loading,
        }
    }

    pub(crate) fn set_loading(&mut self, domain: Domain, loading: bool) {
        match domain {
            Domain::Ticker => self.ticker.loading = loading,
            Domain::Macro => self.macro_signals.loading = loading,
            Domain::News => self.news.loading = loading,
            Domain::Social => self.social.loading = loading,
            Domain::Events => self.events.loading = loading,
        }
        self.refresh_nodes();
    }

    /// The feed behind the active category is loading.
    pub fn content_loading(&self) -> bool {
        self.is_loading(self.active_category.feed_domain())
    }

    pub(crate) fn refresh_nodes(&mut self) {
        let content = self.content_loading();
        self.nodes = vec![
            node("GROUNDING_NODE", content),
            node("MARKET_DATA_L1", self.ticker.loading),
            node(
                "SOCIAL_INTERCEPT",
                self.active_category == Category::Social && content,
            ),
        ];
    }
}
