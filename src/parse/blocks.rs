//! Keyword-block grammar used by the news, social and events feeds.
//!
//! A block starts at its record marker (`TITLE:`, `USER:`, `EVENT:`) and its
//! fields follow in a fixed order, each introduced by its own marker. Anything
//! before the first record marker is preamble and is discarded.

use regex::Regex;

use super::fields::{field_or, marker};
use super::{ParseContext, RecordParser};
use crate::model::{EventStatus, GlobalEvent, NewsStory, Sentiment, SocialPost};

const NEWS_UNKNOWN_TITLE: &str = "Intelligence Update";
const SOCIAL_UNKNOWN_USER: &str = "Unknown";
const EVENT_UNKNOWN_LABEL: &str = "Unknown";

/// Record marker plus the ordered field markers that follow it.
#[derive(Debug, Clone)]
pub struct BlockLayout {
    record: Regex,
    fields: Vec<Regex>,
}

impl BlockLayout {
    pub fn new(record: &str, fields: &[&str]) -> Self {
        Self {
            record: marker(record),
            fields: fields.iter().map(|f| marker(f)).collect(),
        }
    }

    /// One segment list per block: `[primary, field_1, .., field_n]`.
    ///
    /// Markers are searched in declared order. A missing marker leaves its
    /// segment empty and the search continues with the next one.
    pub fn split<'t>(&self, text: &'t str) -> Vec<Vec<&'t str>> {
        self.record
            .split(text)
            .skip(1)
            .filter(|chunk| !chunk.trim().is_empty())
            .map(|chunk| {
                let mut segments = vec![""; self.fields.len() + 1];
                let mut current = 0;
                let mut rest = chunk;
                for (i, field) in self.fields.iter().enumerate() {
                    if let Some(m) = field.find(rest) {
                        segments[current] = &rest[..m.start()];
                        rest = &rest[m.end()..];
                        current = i + 1;
                    }
                }
                segments[current] = rest;
                segments
            })
            .collect()
    }
}

/// `TITLE: .. SUMMARY: .. CATEGORY: ..`
///
/// The category always comes from the request, never from the CATEGORY text.
#[derive(Debug, Clone)]
pub struct NewsParser {
    layout: BlockLayout,
}

impl Default for NewsParser {
    fn default() -> Self {
        Self {
            layout: BlockLayout::new("TITLE:", &["SUMMARY:", "CATEGORY:"]),
        }
    }
}

impl RecordParser for NewsParser {
    type Record = NewsStory;

    fn parse(&self, text: &str, ctx: &ParseContext) -> Vec<NewsStory> {
        let millis = ctx.fetched_at.timestamp_millis();
        let display = ctx.short_time();
        self.layout
            .split(text)
            .into_iter()
            .map(|s| {
                (
                    field_or(s.first().copied(), NEWS_UNKNOWN_TITLE),
                    field_or(s.get(1).copied(), "Data corrupted."),
                )
            })
            .filter(|(title, _)| title != NEWS_UNKNOWN_TITLE)
            .enumerate()
            .map(|(i, (title, summary))| NewsStory {
                id: format!("n-{i}-{millis}"),
                title,
                summary,
                category: ctx.category,
                timestamp: display.clone(),
            })
            .collect()
    }
}

/// `USER: .. HANDLE: .. CONTENT: .. SENTIMENT: ..`
#[derive(Debug, Clone)]
pub struct SocialParser {
    layout: BlockLayout,
}

impl Default for SocialParser {
    fn default() -> Self {
        Self {
            layout: BlockLayout::new("USER:", &["HANDLE:", "CONTENT:", "SENTIMENT:"]),
        }
    }
}

impl RecordParser for SocialParser {
    type Record = SocialPost;

    fn parse(&self, text: &str, _ctx: &ParseContext) -> Vec<SocialPost> {
        self.layout
            .split(text)
            .into_iter()
            .map(|s| {
                (
                    field_or(s.first().copied(), SOCIAL_UNKNOWN_USER),
                    field_or(s.get(1).copied(), "@anon"),
                    field_or(s.get(2).copied(), "..."),
                    Sentiment::parse_lenient(s.get(3).copied().unwrap_or_default()),
                )
            })
            .filter(|(user, ..)| user != SOCIAL_UNKNOWN_USER)
            .enumerate()
            .map(|(i, (user, handle, content, sentiment))| SocialPost {
                id: format!("t-{i}"),
                user,
                handle,
                content,
                sentiment,
                timestamp: "LIVE".to_string(),
            })
            .collect()
    }
}

/// `EVENT: .. DATE: .. STATUS: .. INFO: ..`
#[derive(Debug, Clone)]
pub struct EventParser {
    layout: BlockLayout,
}

impl Default for EventParser {
    fn default() -> Self {
        Self {
            layout: BlockLayout::new("EVENT:", &["DATE:", "STATUS:", "INFO:"]),
        }
    }
}

impl RecordParser for EventParser {
    type Record = GlobalEvent;

    fn parse(&self, text: &str, _ctx: &ParseContext) -> Vec<GlobalEvent> {
        self.layout
            .split(text)
            .into_iter()
            .map(|s| {
                (
                    field_or(s.first().copied(), EVENT_UNKNOWN_LABEL),
                    field_or(s.get(1).copied(), "TBD"),
                    EventStatus::parse_lenient(s.get(2).copied().unwrap_or_default()),
                    field_or(s.get(3).copied(), "..."),
                )
            })
            .filter(|(label, ..)| label != EVENT_UNKNOWN_LABEL)
            .enumerate()
            .map(|(i, (label, date, status, description))| GlobalEvent {
                id: format!("e-{i}"),
                label,
                date,
                status,
                description,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use std::collections::HashSet;

    fn ctx(category: Category) -> ParseContext {
        ParseContext::at_millis(category, 1_700_000_000_000)
    }

    #[test]
    fn news_block_is_trimmed_and_category_comes_from_request() {
        let text = "TITLE: ETF Inflows Surge\nSUMMARY: Institutional demand rises.\nCATEGORY: MARKETS";
        let out = NewsParser::default().parse(text, &ctx(Category::Defi));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "ETF Inflows Surge");
        assert_eq!(out[0].summary, "Institutional demand rises.");
        assert_eq!(out[0].category, Category::Defi);
        assert_eq!(out[0].id, "n-0-1700000000000");
    }

    #[test]
    fn news_markers_are_case_insensitive_and_preamble_is_dropped() {
        let text = "Here are today's stories:\n\n\
            **Title:** Fed holds rates\n**Summary:** No change in June.\n\n\
            title: SEC sues exchange\nsummary: Filing lands Friday.\ncategory: REGULATION";
        let out = NewsParser::default().parse(text, &ctx(Category::Regulation));
        let titles: Vec<&str> = out.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Fed holds rates", "SEC sues exchange"]);
        assert_eq!(out[0].summary, "No change in June.");
        assert_eq!(out[1].id, "n-1-1700000000000");
    }

    #[test]
    fn news_without_summary_defaults_and_blank_title_is_dropped() {
        let text = "TITLE:\nSUMMARY: orphan summary\nTITLE: Lone headline";
        let out = NewsParser::default().parse(text, &ctx(Category::Markets));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Lone headline");
        assert_eq!(out[0].summary, "Data corrupted.");
    }

    #[test]
    fn social_blocks_parse_with_sentiment_fallback() {
        let text = "USER: Crypto Whale\nHANDLE: @whale\nCONTENT: Accumulating.\nSENTIMENT: bullish\n\
                    USER: Anon Trader\nCONTENT: Not sure.\nSENTIMENT: confused\n\
                    USER:\nHANDLE: @ghost\nCONTENT: ???";
        let out = SocialParser::default().parse(text, &ctx(Category::Social));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].user, "Crypto Whale");
        assert_eq!(out[0].handle, "@whale");
        assert_eq!(out[0].sentiment, Sentiment::Bullish);
        assert_eq!(out[0].timestamp, "LIVE");
        assert_eq!(out[1].user, "Anon Trader");
        assert_eq!(out[1].handle, "@anon");
        assert_eq!(out[1].content, "Not sure.");
        assert_eq!(out[1].sentiment, Sentiment::Neutral);
        assert!(out.iter().all(|p| p.user != SOCIAL_UNKNOWN_USER));
        assert_eq!(out[1].id, "t-1");
    }

    #[test]
    fn event_blocks_default_status_and_fields() {
        let text = "EVENT: ETH Upgrade\nDATE: Thursday\nSTATUS: CRITICAL\nINFO: Mainnet fork.\n\
                    EVENT: Token unlock\nSTATUS: pending";
        let out = EventParser::default().parse(text, &ctx(Category::Markets));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].status, EventStatus::Critical);
        assert_eq!(out[0].description, "Mainnet fork.");
        assert_eq!(out[1].label, "Token unlock");
        assert_eq!(out[1].date, "TBD");
        assert_eq!(out[1].status, EventStatus::Stable);
        assert_eq!(out[1].description, "...");
    }

    #[test]
    fn block_parsers_never_emit_sentinel_records() {
        let noisy = [
            "",
            "no markers here at all",
            "EVENT:\nEVENT:   \nEVENT: DATE: today",
            "USER: USER: HANDLE: @x",
            "TITLE: TITLE: SUMMARY: s",
        ];
        for text in noisy {
            let events = EventParser::default().parse(text, &ctx(Category::Markets));
            assert!(events.iter().all(|e| e.label != EVENT_UNKNOWN_LABEL), "{text}");
            let posts = SocialParser::default().parse(text, &ctx(Category::Social));
            assert!(posts.iter().all(|p| p.user != SOCIAL_UNKNOWN_USER), "{text}");
            let news = NewsParser::default().parse(text, &ctx(Category::Markets));
            assert!(news.iter().all(|n| n.title != NEWS_UNKNOWN_TITLE), "{text}");
        }
    }

    #[test]
    fn ids_are_unique_within_a_batch() {
        let text = (0..5)
            .map(|i| format!("EVENT: e{i}\nDATE: d\nSTATUS: HIGH\nINFO: x\n"))
            .collect::<String>();
        let out = EventParser::default().parse(&text, &ctx(Category::Markets));
        let ids: HashSet<&str> = out.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids.len(), 5);
    }
}
