// src/orchestrator/mod.rs
//! Refresh scheduling for the five feeds.
//!
//! Every timer is a [`TaskSlot`] owned here; rescheduling and shutdown go
//! through `TaskSlot::cancel`. Each domain carries a monotonic request sequence
//! so a response that lost the race to a newer request is dropped instead of
//! overwriting fresher data.
//!
//! Lock order: `timers` before `state`. Neither lock is held across an await.

pub mod slot;
pub mod view;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use metrics::counter;
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::acquire::{AcquisitionClient, FeedSnapshot};
use crate::error::UplinkError;
use crate::model::{
    Category, Domain, GlobalEvent, MacroSignal, MarketTick, NewsStory, SocialPost,
};

pub use slot::TaskSlot;
pub use view::{DashboardView, FeedAlert, FeedView, NodeState, NodeStatus};

/// Timer settings of the refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub ticker_interval: Duration,
    /// Delay after the first ticker load before events are fetched once.
    pub events_delay: Duration,
    pub social_interval: Duration,
    pub category_debounce: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            ticker_interval: Duration::from_secs(180),
            events_delay: Duration::from_secs(10),
            social_interval: Duration::from_secs(150),
            category_debounce: Duration::from_millis(1000),
        }
    }
}

/// What to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedRequest {
    Ticker,
    Macro,
    News(Category),
    Social(Option<String>),
    Events,
}

impl FeedRequest {
    /// The content load behind a category view.
    pub fn for_category(category: Category) -> Self {
        match category.feed_domain() {
            Domain::Social => FeedRequest::Social(None),
            Domain::Macro => FeedRequest::Macro,
            _ => FeedRequest::News(category),
        }
    }

    pub fn domain(&self) -> Domain {
        match self {
            FeedRequest::Ticker => Domain::Ticker,
            FeedRequest::Macro => Domain::Macro,
            FeedRequest::News(_) => Domain::News,
            FeedRequest::Social(_) => Domain::Social,
            FeedRequest::Events => Domain::Events,
        }
    }
}

/// Content feeds raise the banner alert on failure; ticker and events only log.
fn raises_alert(domain: Domain) -> bool {
    matches!(domain, Domain::Macro | Domain::News | Domain::Social)
}

/// How a new request treats one already in flight for the same domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Timer and manual triggers: do nothing while the domain is busy.
    SkipIfBusy,
    /// User-driven loads: take over, the older response becomes stale.
    Supersede,
}

enum FeedPayload {
    Ticker(FeedSnapshot<MarketTick>),
    Macro(FeedSnapshot<MacroSignal>),
    News(FeedSnapshot<NewsStory>),
    Social(FeedSnapshot<SocialPost>),
    Events(FeedSnapshot<GlobalEvent>),
}

#[derive(Debug, Default, Clone, Copy)]
struct Gate {
    seq: u64,
    in_flight: bool,
}

#[derive(Debug, Default)]
struct State {
    view: DashboardView,
    gates: HashMap<Domain, Gate>,
}

impl State {
    /// Clears the in-flight mark of `domain` if `seq` is still its latest request.
    fn release(&mut self, domain: Domain, seq: u64) -> bool {
        let gate = self.gates.entry(domain).or_default();
        if gate.seq != seq || !gate.in_flight {
            return false;
        }
        gate.in_flight = false;
        self.view.set_loading(domain, false);
        true
    }
}

#[derive(Debug, Default)]
struct Timers {
    startup: TaskSlot,
    ticker_interval: TaskSlot,
    events_once: TaskSlot,
    social_interval: TaskSlot,
    category_debounce: TaskSlot,
    fetches: HashMap<Domain, TaskSlot>,
}

impl Timers {
    fn cancel_all(&mut self) -> usize {
        let mut stopped = [
            self.startup.cancel(),
            self.ticker_interval.cancel(),
            self.events_once.cancel(),
            self.social_interval.cancel(),
            self.category_debounce.cancel(),
        ]
        .into_iter()
        .filter(|s| *s)
        .count();
        stopped += self
            .fetches
            .values_mut()
            .map(TaskSlot::cancel)
            .filter(|s| *s)
            .count();
        stopped
    }
}

struct Inner {
    client: AcquisitionClient,
    cadence: Cadence,
    state: Mutex<State>,
    timers: Mutex<Timers>,
}

/// Proof of admission for one request. Dropping it (completion, failure or
/// abort) clears the loading flag unless a newer request took over.
struct FetchTicket {
    inner: Arc<Inner>,
    domain: Domain,
    seq: u64,
}

impl Drop for FetchTicket {
    fn drop(&mut self) {
        if let Ok(mut st) = self.inner.state.lock() {
            st.release(self.domain, self.seq);
        }
    }
}

impl Inner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("orchestrator state poisoned")
    }

    fn lock_timers(&self) -> std::sync::MutexGuard<'_, Timers> {
        self.timers.lock().expect("orchestrator timers poisoned")
    }

    fn begin(self: &Arc<Self>, domain: Domain, admission: Admission) -> Option<FetchTicket> {
        let mut st = self.lock_state();
        let gate = st.gates.entry(domain).or_default();
        if gate.in_flight && admission == Admission::SkipIfBusy {
            debug!(target: "orchestrator", domain = domain.as_str(), "skipped: request already in flight");
            return None;
        }
        gate.seq += 1;
        gate.in_flight = true;
        let seq = gate.seq;

        st.view.set_loading(domain, true);
        if raises_alert(domain) {
            st.view.alert = None;
        }
        Some(FetchTicket {
            inner: self.clone(),
            domain,
            seq,
        })
    }

    async fn fetch(&self, req: &FeedRequest) -> Result<FeedPayload, UplinkError> {
        Ok(match req {
            FeedRequest::Ticker => FeedPayload::Ticker(self.client.fetch_ticker().await?),
            FeedRequest::Macro => FeedPayload::Macro(self.client.fetch_macro().await?),
            FeedRequest::News(c) => FeedPayload::News(self.client.fetch_news(*c).await?),
            FeedRequest::Social(q) => {
                FeedPayload::Social(self.client.fetch_social(q.as_deref()).await?)
            }
            FeedRequest::Events => FeedPayload::Events(self.client.fetch_events().await?),
        })
    }

    async fn load(self: Arc<Self>, ticket: FetchTicket, req: FeedRequest) {
        let result = self.fetch(&req).await;
        self.commit(&ticket, result);
    }

    fn commit(&self, ticket: &FetchTicket, result: Result<FeedPayload, UplinkError>) {
        let domain = ticket.domain;
        let mut st = self.lock_state();
        let latest = st.gates.get(&domain).map(|g| g.seq).unwrap_or_default();
        if latest != ticket.seq {
            counter!("uplink_stale_responses_total", "domain" => domain.as_str()).increment(1);
            debug!(
                target: "orchestrator",
                domain = domain.as_str(),
                seq = ticket.seq,
                latest,
                "discarding superseded response"
            );
            return;
        }

        match result {
            Ok(FeedPayload::Ticker(snap)) => {
                // An empty answer keeps the last known prices on screen.
                if !snap.records.is_empty() {
                    st.view.ticker.replace(snap);
                }
            }
            Ok(FeedPayload::Macro(snap)) => st.view.macro_signals.replace(snap),
            Ok(FeedPayload::News(snap)) => st.view.news.replace(snap),
            Ok(FeedPayload::Social(snap)) => st.view.social.replace(snap),
            Ok(FeedPayload::Events(snap)) => st.view.events.replace(snap),
            Err(e) => {
                warn!(
                    target: "orchestrator",
                    domain = domain.as_str(),
                    kind = ?e.kind(),
                    error = %e,
                    "feed load failed"
                );
                if raises_alert(domain) {
                    st.view.alert = Some(FeedAlert::from_kind(e.kind()));
                }
            }
        }
        st.release(domain, ticket.seq);
    }

    /// Admit and spawn a load, keeping its handle in the domain's fetch slot.
    /// The receiver resolves when the load ends, whether it completed or was
    /// aborted by a superseding request.
    fn try_spawn(
        self: &Arc<Self>,
        req: FeedRequest,
        admission: Admission,
    ) -> Option<oneshot::Receiver<()>> {
        let mut timers = self.lock_timers();
        let ticket = self.begin(req.domain(), admission)?;
        let domain = req.domain();
        let (done_tx, done_rx) = oneshot::channel();
        let inner = self.clone();
        let task = tokio::spawn(async move {
            inner.load(ticket, req).await;
            let _ = done_tx.send(());
        });
        timers.fetches.entry(domain).or_default().replace(task);
        Some(done_rx)
    }

    /// Timer-driven load: skipped while the domain is busy, otherwise awaited
    /// so the next period starts after it ends.
    async fn run_scheduled(self: &Arc<Self>, req: FeedRequest) {
        if let Some(done) = self.try_spawn(req, Admission::SkipIfBusy) {
            let _ = done.await;
        }
    }

    /// The fetch targets whatever category is active when the debounce fires.
    fn schedule_category_fetch(self: &Arc<Self>) {
        let inner = self.clone();
        let debounce = self.cadence.category_debounce;
        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let category = inner.lock_state().view.active_category;
            inner.try_spawn(FeedRequest::for_category(category), Admission::Supersede);
        });
        self.lock_timers().category_debounce.replace(task);
    }

    /// Cancel the social timer and arm it again from zero if the view calls for it.
    fn rearm_social(self: &Arc<Self>) {
        let (category, enabled) = {
            let st = self.lock_state();
            (st.view.active_category, st.view.auto_refresh_enabled)
        };
        let mut timers = self.lock_timers();
        timers.social_interval.cancel();
        if category != Category::Social || !enabled {
            return;
        }
        let inner = self.clone();
        let period = self.cadence.social_interval;
        timers.social_interval.replace(tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                inner.run_scheduled(FeedRequest::Social(None)).await;
            }
        }));
    }

    fn arm_after_first_ticker(self: &Arc<Self>) {
        let mut timers = self.lock_timers();

        let inner = self.clone();
        let delay = self.cadence.events_delay;
        timers.events_once.replace(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.run_scheduled(FeedRequest::Events).await;
        }));

        let inner = self.clone();
        let period = self.cadence.ticker_interval;
        timers.ticker_interval.replace(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                inner.run_scheduled(FeedRequest::Ticker).await;
            }
        }));
    }
}

/// Cheap to clone; all clones drive the same schedule and view.
#[derive(Clone)]
pub struct RefreshOrchestrator {
    inner: Arc<Inner>,
}

impl RefreshOrchestrator {
    pub fn new(client: AcquisitionClient, cadence: Cadence) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                cadence,
                state: Mutex::new(State::default()),
                timers: Mutex::new(Timers::default()),
            }),
        }
    }

    pub fn cadence(&self) -> Cadence {
        self.inner.cadence
    }

    /// Staggered startup: ticker now; once it settles, events after the
    /// configured delay and the ticker interval. The active category is
    /// loaded through the regular debounce.
    pub fn start(&self) {
        info!(target: "orchestrator", cadence = ?self.inner.cadence, "starting refresh cycle");
        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            inner.run_scheduled(FeedRequest::Ticker).await;
            inner.arm_after_first_ticker();
        });
        self.inner.lock_timers().startup.replace(task);

        self.inner.schedule_category_fetch();
        self.inner.rearm_social();
    }

    /// Debounced switch. Returns `false` when `category` is already active.
    pub fn set_category(&self, category: Category) -> bool {
        {
            let mut st = self.inner.lock_state();
            if st.view.active_category == category {
                return false;
            }
            st.view.active_category = category;
            st.view.refresh_nodes();
        }
        self.inner.schedule_category_fetch();
        self.inner.rearm_social();
        true
    }

    /// Returns `false` when the setting did not change.
    pub fn set_auto_refresh(&self, enabled: bool) -> bool {
        {
            let mut st = self.inner.lock_state();
            if st.view.auto_refresh_enabled == enabled {
                return false;
            }
            st.view.auto_refresh_enabled = enabled;
        }
        self.inner.rearm_social();
        true
    }

    /// Immediate social fetch framed around `query`. Blank queries are ignored.
    pub fn search_social(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }
        self.inner.lock_state().view.search_query = Some(query.to_string());
        self.inner
            .try_spawn(FeedRequest::Social(Some(query.to_string())), Admission::Supersede)
            .is_some()
    }

    /// Manual reload of the active category. `false` while that feed is in flight.
    pub fn resync(&self) -> bool {
        let category = self.inner.lock_state().view.active_category;
        self.inner
            .try_spawn(FeedRequest::for_category(category), Admission::SkipIfBusy)
            .is_some()
    }

    pub fn snapshot(&self) -> DashboardView {
        self.inner.lock_state().view.clone()
    }

    /// Stop every timer and in-flight load. The view keeps its last contents.
    pub fn shutdown(&self) {
        let stopped = self.inner.lock_timers().cancel_all();
        info!(target: "orchestrator", stopped, "refresh cycle stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::MockBackend;

    fn orchestrator() -> RefreshOrchestrator {
        let backend = Arc::new(MockBackend::fixed(""));
        RefreshOrchestrator::new(AcquisitionClient::new(backend, "test"), Cadence::default())
    }

    fn social(user: &str) -> FeedPayload {
        FeedPayload::Social(FeedSnapshot {
            records: vec![SocialPost {
                id: "t-0".into(),
                user: user.into(),
                handle: "@x".into(),
                content: "...".into(),
                sentiment: crate::model::Sentiment::Neutral,
                timestamp: "LIVE".into(),
            }],
            sources: vec![],
        })
    }

    #[test]
    fn superseded_response_is_discarded() {
        let o = orchestrator();
        let first = o.inner.begin(Domain::Social, Admission::SkipIfBusy).unwrap();
        let second = o.inner.begin(Domain::Social, Admission::Supersede).unwrap();

        o.inner.commit(&second, Ok(social("fresh")));
        o.inner.commit(&first, Ok(social("stale")));

        let view = o.snapshot();
        assert_eq!(view.social.records[0].user, "fresh");
        assert!(!view.social.loading);
    }

    #[test]
    fn busy_domain_rejects_skip_if_busy() {
        let o = orchestrator();
        let t = o.inner.begin(Domain::News, Admission::SkipIfBusy).unwrap();
        assert!(o.inner.begin(Domain::News, Admission::SkipIfBusy).is_none());
        assert!(o.snapshot().news.loading);
        drop(t);
        assert!(!o.snapshot().news.loading);
        assert!(o.inner.begin(Domain::News, Admission::SkipIfBusy).is_some());
    }

    #[test]
    fn stale_ticket_drop_leaves_newer_loading_flag() {
        let o = orchestrator();
        let old = o.inner.begin(Domain::Macro, Admission::Supersede).unwrap();
        let _new = o.inner.begin(Domain::Macro, Admission::Supersede).unwrap();
        drop(old);
        assert!(o.snapshot().macro_signals.loading);
    }

    #[test]
    fn empty_ticker_keeps_previous_ticks() {
        let o = orchestrator();
        let tick = MarketTick {
            symbol: "BTC".into(),
            price: "$1".into(),
            change_text: "+1%".into(),
            is_positive: true,
            observed_at: None,
        };
        let t = o.inner.begin(Domain::Ticker, Admission::SkipIfBusy).unwrap();
        o.inner.commit(
            &t,
            Ok(FeedPayload::Ticker(FeedSnapshot {
                records: vec![tick],
                sources: vec![],
            })),
        );
        drop(t);
        let t = o.inner.begin(Domain::Ticker, Admission::SkipIfBusy).unwrap();
        o.inner.commit(&t, Ok(FeedPayload::Ticker(FeedSnapshot::default())));
        assert_eq!(o.snapshot().ticker.records.len(), 1);
        assert_ne!(o.snapshot().ticker.last_sync_time, view::NEVER_SYNCED);
    }

    #[test]
    fn content_failure_sets_alert_and_next_start_clears_it() {
        let o = orchestrator();
        let t = o.inner.begin(Domain::News, Admission::SkipIfBusy).unwrap();
        o.inner.commit(&t, Err(UplinkError::RateLimited("429".into())));
        assert_eq!(o.snapshot().alert, Some(FeedAlert::CoolingDown));
        drop(t);

        let t = o.inner.begin(Domain::Events, Admission::SkipIfBusy).unwrap();
        o.inner.commit(&t, Err(UplinkError::Payload("bad".into())));
        assert_eq!(o.snapshot().alert, Some(FeedAlert::CoolingDown), "events never touch the banner");

        let _t = o.inner.begin(Domain::Macro, Admission::SkipIfBusy).unwrap();
        assert_eq!(o.snapshot().alert, None);
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_loads_category_active_when_it_fires() {
        let mock = Arc::new(MockBackend::fixed(""));
        let o = RefreshOrchestrator::new(AcquisitionClient::new(mock.clone(), "test"), Cadence::default());

        assert!(o.set_category(Category::Social));
        // A concurrent switch whose debounce arming lost the race to ours.
        o.inner.lock_state().view.active_category = Category::Defi;
        tokio::time::sleep(Duration::from_secs(2)).await;

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        let req = &calls[0].request;
        assert_eq!(req.system_instruction.as_deref(), Some(crate::acquire::prompts::NEWS_FORMAT));
        assert_eq!(req.prompt(), crate::acquire::prompts::news(Category::Defi).instruction);
        o.shutdown();
    }
}
