// src/upstream/mod.rs
//! Provider abstraction for the search-grounded generation call.
//!
//! The rest of the crate only sees [`GenerativeBackend`] and the plain request /
//! response types below; wire formats live in the concrete providers.

pub mod gemini;
pub mod mock;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::UplinkError;

pub use gemini::GeminiBackend;
pub use mock::MockBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub id: Option<String>,
    pub name: String,
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub id: Option<String>,
    pub name: String,
    pub response: Value,
}

impl FunctionResponse {
    /// Answer to `call`, wrapped as `{ "result": .. }`.
    pub fn result_of(call: &FunctionCall, result: Value) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            response: serde_json::json!({ "result": result }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Part {
    Text(String),
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
}

/// One conversation entry as the upstream sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }
}

/// Schema of a locally executed tool, advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    /// JSON-schema object describing the arguments.
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub contents: Vec<Content>,
    pub system_instruction: Option<String>,
    /// Enable live web search grounding.
    pub web_search: bool,
    pub functions: Vec<FunctionDeclaration>,
    pub temperature: Option<f32>,
}

impl GenerateRequest {
    /// Single-shot prompt with web search on.
    pub fn grounded(model: &str, prompt: &str, system_instruction: &str) -> Self {
        Self {
            model: model.to_string(),
            contents: vec![Content::user_text(prompt)],
            system_instruction: Some(system_instruction.to_string()),
            web_search: true,
            functions: Vec::new(),
            temperature: None,
        }
    }

    /// Text of the first user turn; handy for routing in test doubles.
    pub fn prompt(&self) -> &str {
        self.contents
            .iter()
            .filter(|c| c.role == Role::User)
            .flat_map(|c| c.parts.iter())
            .find_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .unwrap_or_default()
    }
}

/// Raw grounding chunk; either side may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    pub title: Option<String>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    /// Concatenated text parts of the first candidate.
    pub text: String,
    pub grounding: Vec<GroundingChunk>,
    pub function_calls: Vec<FunctionCall>,
}

impl GenerateResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_grounding(mut self, title: &str, uri: &str) -> Self {
        self.grounding.push(GroundingChunk {
            title: Some(title.to_string()),
            uri: Some(uri.to_string()),
        });
        self
    }

    pub fn calls(calls: Vec<FunctionCall>) -> Self {
        Self {
            function_calls: calls,
            ..Self::default()
        }
    }

    /// The model turn to append to a conversation history.
    pub fn to_content(&self) -> Content {
        let mut parts = Vec::new();
        if !self.text.is_empty() {
            parts.push(Part::Text(self.text.clone()));
        }
        parts.extend(self.function_calls.iter().cloned().map(Part::FunctionCall));
        Content {
            role: Role::Model,
            parts,
        }
    }
}

/// Low-level provider: one remote generation call, no retries.
#[async_trait::async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, UplinkError>;

    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynBackend = Arc<dyn GenerativeBackend>;
