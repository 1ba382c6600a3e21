//! Local tools the chat model may call. Results are canned snapshots.

use metrics::counter;
use serde_json::{json, Value};

use crate::upstream::FunctionDeclaration;

pub const MARKET_INDICATORS: &str = "get_market_indicators";
pub const NETWORK_METRICS: &str = "get_network_metrics";

/// Registry the conversation loop dispatches function calls to.
///
/// Execution never fails outward: problems come back as an `{"error": ..}`
/// payload for the model to read.
pub trait ToolRegistry: Send + Sync {
    fn declarations(&self) -> Vec<FunctionDeclaration>;

    fn execute(&self, name: &str, args: &Value) -> Value;
}

fn string_param(name: &str, description: &str, allowed: &[&str]) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            (name): {
                "type": "STRING",
                "description": description,
                "enum": allowed,
            }
        },
        "required": [name],
    })
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedTools;

impl SimulatedTools {
    fn market_indicator(metric: &str) -> Value {
        match metric {
            "SENTIMENT" => json!({ "value": 72, "label": "Greed", "trend": "Up" }),
            "DOMINANCE" => json!({ "value": "55.1%", "asset": "BTC", "trend": "Rising" }),
            "VOLUME" => json!({ "value": "$112B", "window": "24h", "change": "+8%" }),
            _ => json!({ "error": "Node busy" }),
        }
    }

    fn network_metric(metric_type: &str) -> Value {
        match metric_type {
            "GAS" => json!({ "base": "22 gwei", "priority": "High", "status": "Moderate" }),
            "WHALES" => json!({
                "recent": "3 transfers > 10k BTC detected",
                "destination": "Cold Wallet",
                "risk": "Low"
            }),
            "LIQUIDATIONS" => json!({ "total": "$142M", "side": "Shorts", "ratio": "68%" }),
            _ => json!({ "error": "Signal lost" }),
        }
    }
}

impl ToolRegistry for SimulatedTools {
    fn declarations(&self) -> Vec<FunctionDeclaration> {
        vec![
            FunctionDeclaration {
                name: MARKET_INDICATORS.to_string(),
                description: "Fetch global market sentiment and dominance indicators.".to_string(),
                parameters: string_param(
                    "metric",
                    "Fetch: \"SENTIMENT\", \"DOMINANCE\", or \"VOLUME\".",
                    &["SENTIMENT", "DOMINANCE", "VOLUME"],
                ),
            },
            FunctionDeclaration {
                name: NETWORK_METRICS.to_string(),
                description: "Fetch real-time blockchain network metrics like GAS, WHALE_ALERTS, or LIQUIDATIONS."
                    .to_string(),
                parameters: string_param(
                    "metricType",
                    "The type of data: \"GAS\", \"WHALES\", \"LIQUIDATIONS\".",
                    &["GAS", "WHALES", "LIQUIDATIONS"],
                ),
            },
        ]
    }

    fn execute(&self, name: &str, args: &Value) -> Value {
        let arg = |key: &str| {
            args.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_ascii_uppercase()
        };
        let result = match name {
            MARKET_INDICATORS => Self::market_indicator(&arg("metric")),
            NETWORK_METRICS => Self::network_metric(&arg("metricType")),
            _ => json!({ "error": "Unknown tool" }),
        };
        counter!("chat_tool_calls_total", "tool" => name.to_string()).increment(1);
        tracing::debug!(target: "chat", tool = name, %args, "tool executed");
        result
    }
}
