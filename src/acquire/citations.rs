use crate::model::Citation;
use crate::upstream::GroundingChunk;

pub const FEED_SOURCE_TITLE: &str = "Source";
pub const CHAT_SOURCE_TITLE: &str = "Grounding Point";

/// Web references from grounding metadata. Chunks without a usable uri
/// (missing, blank or the `#` placeholder) are dropped.
pub fn extract(chunks: &[GroundingChunk], default_title: &str) -> Vec<Citation> {
    chunks
        .iter()
        .filter_map(|c| {
            let uri = c.uri.as_deref().map(str::trim).unwrap_or_default();
            if uri.is_empty() || uri == "#" {
                return None;
            }
            let title = c
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(default_title);
            Some(Citation {
                title: title.to_string(),
                uri: uri.to_string(),
            })
        })
        .collect()
}
