//! Instructions and output-format contracts sent with each feed request.
//!
//! The system instruction of every feed is the contract the matching parser in
//! [`crate::parse`] expects; change them together.

use crate::model::Category;

pub const TICKER_FORMAT: &str = "Format output as: 'SYMBOL:PRICE:CHANGE:DIRECTION(UP/DOWN)'. Be precise.";
pub const MACRO_FORMAT: &str = "Format strictly as: 'GROUP:LABEL:VALUE:CHANGE:DIRECTION(UP/DOWN):IMPACT(CRITICAL/HIGH/MODERATE/LOW):CONTEXT'. Groups must be EQUITIES, COMMODITIES, INDICATORS, or CRYPTO_MACRO.";
pub const NEWS_FORMAT: &str = "Return: 'TITLE:', 'SUMMARY:', 'CATEGORY:'. Use high-density intelligence style.";
pub const SOCIAL_FORMAT: &str = "Format: 'USER:', 'HANDLE:', 'CONTENT:', 'SENTIMENT:' (BULLISH/BEARISH/NEUTRAL).";
pub const EVENTS_FORMAT: &str = "Format: 'EVENT:', 'DATE:', 'STATUS:', 'INFO:'.";

pub const DEFAULT_TICKER_SYMBOLS: [&str; 8] = ["BTC", "ETH", "SOL", "BNB", "XRP", "DOGE", "PEPE", "LINK"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub instruction: String,
    pub system: &'static str,
}

/// "A, B, and C"
fn human_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [a, b] => format!("{a} and {b}"),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}

pub fn ticker(symbols: &[String]) -> Prompt {
    Prompt {
        instruction: format!(
            "Get the current real-time prices and 24h percentage change for {}. Return in a list format.",
            human_list(symbols)
        ),
        system: TICKER_FORMAT,
    }
}

pub fn macro_signals() -> Prompt {
    Prompt {
        instruction: "Search for current real-time values of: S&P 500, Nasdaq 100, FTSE 100, \
            Nikkei 225, DXY Index, US 10Y Bond Yield, Gold, Silver, Crude Oil, BTC Dominance, \
            Total Crypto Market Cap, and US Fed Interest Rate. Assess their current impact on \
            the digital asset ecosystem."
            .to_string(),
        system: MACRO_FORMAT,
    }
}

/// Topic framing used for the news search of each category.
pub fn category_context(category: Category) -> &'static str {
    match category {
        Category::Markets => "Global cryptocurrency markets and institutional Bitcoin/Ethereum ETFs.",
        Category::Macro => {
            "Global macroeconomic trends, inflation, central bank policies, and trad-fi indices."
        }
        Category::Defi => "Decentralized Finance protocols and DEX volume trends.",
        Category::Altcoins => "Emerging layer-1/layer-2 blockchains and AI-centric digital assets.",
        Category::Regulation => "Global crypto legislation and enforcement actions.",
        Category::Politics => "Geopolitical shifts affecting finance.",
        Category::Social => "Social media sentiment trends.",
    }
}

pub fn news(category: Category) -> Prompt {
    Prompt {
        instruction: format!(
            "Search for 5 major breaking news stories from the last 24 hours regarding: {}.",
            category_context(category)
        ),
        system: NEWS_FORMAT,
    }
}

/// A blank query counts as no query.
pub fn social(query: Option<&str>) -> Prompt {
    let instruction = match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => format!("Search X (Twitter) for recent viral posts regarding: {q}."),
        None => "Search for the latest viral crypto social media posts from the last 12 hours."
            .to_string(),
    };
    Prompt {
        instruction,
        system: SOCIAL_FORMAT,
    }
}

pub fn events() -> Prompt {
    Prompt {
        instruction: "Search for 5 high-impact upcoming crypto events this week.".to_string(),
        system: EVENTS_FORMAT,
    }
}
