//! Colon-delimited single-line grammar used by the ticker and macro feeds.
//!
//! Each non-empty line with at least one `:` is one record; fields are positional.
//! Lines without a colon contribute nothing.

use super::fields::{clean_field, field_or, strip_bullet};
use super::{ParseContext, RecordParser};
use crate::model::{is_up, Impact, MacroGroup, MacroSignal, MarketTick};

const TICKER_UNKNOWN_SYMBOL: &str = "ERR";
const MACRO_UNKNOWN_LABEL: &str = "UNKNOWN";
const MACRO_PENDING_CONTEXT: &str = "Intelligence signal pending...";

/// Positional fields of every colon line in `text`.
fn colon_records(text: &str) -> impl Iterator<Item = Vec<&str>> {
    text.lines()
        .map(strip_bullet)
        .filter(|l| !l.trim().is_empty() && l.contains(':'))
        .map(|l| l.split(':').collect())
}

/// Lines that merely echo the requested format (`SYMBOL:PRICE:...`).
fn is_format_echo(first: Option<&&str>, key: &str) -> bool {
    first.is_some_and(|f| clean_field(f).eq_ignore_ascii_case(key))
}

/// `SYMBOL:PRICE:CHANGE:DIRECTION`
#[derive(Debug, Default, Clone, Copy)]
pub struct TickerParser;

impl RecordParser for TickerParser {
    type Record = MarketTick;

    fn parse(&self, text: &str, ctx: &ParseContext) -> Vec<MarketTick> {
        colon_records(text)
            .filter(|f| !is_format_echo(f.first(), "SYMBOL"))
            .map(|f| {
                let direction = f.get(3).map(|d| clean_field(d));
                MarketTick {
                    symbol: field_or(f.first().copied(), TICKER_UNKNOWN_SYMBOL),
                    price: field_or(f.get(1).copied(), "$0.00"),
                    change_text: field_or(f.get(2).copied(), "0%"),
                    is_positive: is_up(direction.as_deref()),
                    observed_at: Some(ctx.fetched_at),
                }
            })
            .filter(|t| t.symbol != TICKER_UNKNOWN_SYMBOL)
            .collect()
    }
}

/// `GROUP:LABEL:VALUE:CHANGE:DIRECTION:IMPACT:CONTEXT`
///
/// CONTEXT keeps any further colons (times such as `14:30` survive).
#[derive(Debug, Default, Clone, Copy)]
pub struct MacroParser;

impl RecordParser for MacroParser {
    type Record = MacroSignal;

    fn parse(&self, text: &str, _ctx: &ParseContext) -> Vec<MacroSignal> {
        colon_records(text)
            .filter(|f| !is_format_echo(f.first(), "GROUP"))
            .map(|f| {
                let direction = f.get(4).map(|d| clean_field(d));
                let context = (f.len() > 6).then(|| f[6..].join(":"));
                MacroSignal {
                    group: MacroGroup::parse_lenient(f.first().copied().unwrap_or_default()),
                    label: field_or(f.get(1).copied(), MACRO_UNKNOWN_LABEL),
                    value: field_or(f.get(2).copied(), "N/A"),
                    change_text: field_or(f.get(3).copied(), "0%"),
                    is_positive: is_up(direction.as_deref()),
                    impact: Impact::parse_lenient(f.get(5).copied().unwrap_or_default()),
                    context: field_or(context.as_deref(), MACRO_PENDING_CONTEXT),
                }
            })
            .filter(|m| m.label != MACRO_UNKNOWN_LABEL)
            .collect()
    }
}
