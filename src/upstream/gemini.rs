//! Gemini `generateContent` over REST. Requires an API key.
//!
//! Quota refusals are classified here, once, from the HTTP status and body.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{
    Content, FunctionCall, FunctionDeclaration, GenerateRequest, GenerateResponse,
    GenerativeBackend, GroundingChunk, Part, Role,
};
use crate::config::uplink::UplinkConfig;
use crate::error::UplinkError;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiBackend {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self, UplinkError> {
        let http = reqwest::Client::builder()
            .user_agent("intel-terminal/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(cfg: &UplinkConfig) -> Result<Self, UplinkError> {
        Self::new(
            &cfg.endpoint,
            &cfg.api_key,
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }
}

#[async_trait::async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, UplinkError> {
        if self.api_key.is_empty() {
            return Err(UplinkError::MissingCredential);
        }

        let url = format!("{}/models/{}:generateContent", self.endpoint, req.model);
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&encode_request(req))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(UplinkError::from_status(status.as_u16(), &body));
        }
        decode_response(&body)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// Wire format
// ------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
    /// Thinking models tag their reasoning parts; those are not answer text.
    #[serde(default, skip_serializing)]
    thought: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    google_search: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_declarations: Option<&'a [FunctionDeclaration]>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    #[serde(default)]
    content: Option<WireContent>,
    #[serde(default)]
    grounding_metadata: Option<WireGroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<WireChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct WireChunk {
    #[serde(default)]
    web: Option<WireWeb>,
}

#[derive(Debug, Default, Deserialize)]
struct WireWeb {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uri: Option<String>,
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
    }
}

fn encode_part(part: &Part) -> WirePart {
    match part {
        Part::Text(t) => WirePart {
            text: Some(t.clone()),
            ..WirePart::default()
        },
        Part::FunctionCall(fc) => WirePart {
            function_call: Some(WireFunctionCall {
                id: fc.id.clone(),
                name: fc.name.clone(),
                args: fc.args.clone(),
            }),
            ..WirePart::default()
        },
        Part::FunctionResponse(fr) => WirePart {
            function_response: Some(WireFunctionResponse {
                id: fr.id.clone(),
                name: fr.name.clone(),
                response: fr.response.clone(),
            }),
            ..WirePart::default()
        },
    }
}

fn encode_content(c: &Content) -> WireContent {
    WireContent {
        role: Some(role_str(c.role).to_string()),
        parts: c.parts.iter().map(encode_part).collect(),
    }
}

/// JSON body for `models/{model}:generateContent`.
pub fn encode_request(req: &GenerateRequest) -> Value {
    let mut tools = Vec::new();
    if req.web_search {
        tools.push(WireTool {
            google_search: Some(json!({})),
            function_declarations: None,
        });
    }
    if !req.functions.is_empty() {
        tools.push(WireTool {
            google_search: None,
            function_declarations: Some(&req.functions),
        });
    }

    let mut body = json!({
        "contents": req.contents.iter().map(encode_content).collect::<Vec<_>>(),
    });
    if let Some(sys) = &req.system_instruction {
        body["systemInstruction"] = json!({ "parts": [{ "text": sys }] });
    }
    if !tools.is_empty() {
        body["tools"] = json!(tools);
    }
    if let Some(t) = req.temperature {
        body["generationConfig"] = json!({ "temperature": t });
    }
    body
}

/// Decode a successful `generateContent` body. Only the first candidate counts.
pub fn decode_response(body: &str) -> Result<GenerateResponse, UplinkError> {
    let wire: WireResponse = serde_json::from_str(body)
        .map_err(|e| UplinkError::Payload(format!("generateContent body: {e}")))?;

    let Some(candidate) = wire.candidates.into_iter().next() else {
        return Ok(GenerateResponse::default());
    };

    let mut out = GenerateResponse::default();
    if let Some(content) = candidate.content {
        for part in content.parts {
            if part.thought == Some(true) {
                continue;
            }
            if let Some(t) = part.text {
                out.text.push_str(&t);
            }
            if let Some(fc) = part.function_call {
                out.function_calls.push(FunctionCall {
                    id: fc.id,
                    name: fc.name,
                    args: fc.args,
                });
            }
            if let Some(fr) = part.function_response {
                // Never expected from the model; kept out of the answer.
                tracing::debug!(target: "uplink", name = %fr.name, "ignoring functionResponse part in model output");
            }
        }
    }
    if let Some(meta) = candidate.grounding_metadata {
        out.grounding = meta
            .grounding_chunks
            .into_iter()
            .filter_map(|c| c.web)
            .map(|w| GroundingChunk {
                title: w.title,
                uri: w.uri,
            })
            .collect();
    }
    Ok(out)
}
