// src/chat/mod.rs
//! Analyst chat: multi-turn conversation with local tool round trips.
//!
//! Two histories are kept. `contents` is what the upstream sees (including
//! function calls and their results); the transcript is what a reader sees.
//! A failed or abandoned exchange never reaches `contents` but stays in the
//! transcript.

pub mod tools;

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, warn};

use crate::acquire::citations::{self, CHAT_SOURCE_TITLE};
use crate::config::uplink::UplinkConfig;
use crate::error::UplinkError;
use crate::model::ChatTurn;
use crate::upstream::{Content, DynBackend, FunctionResponse, GenerateRequest, Part, Role};

use self::tools::{SimulatedTools, ToolRegistry};

pub const GREETING: &str =
    "METAMEDIA INTELLIGENCE UPLINK ESTABLISHED. ALL LIVE NODES SYNCED. READY FOR COMMAND INPUT.";
pub const LINK_ERROR: &str = "NEURAL_LINK_ERROR: RE-SYNC REQUIRED.";
pub const EMPTY_REPLY: &str = "COMM_LINK_ERROR";
pub const TOOL_BUDGET_EXHAUSTED: &str = "TOOL_BUDGET_EXHAUSTED: ANALYSIS HALTED. NARROW THE QUERY.";

const SYSTEM_INSTRUCTION: &str = "You are the METAMEDIA CORP Senior Intelligence Analyst. \
You have access to Google Search and proprietary network tools.
Current Node Capabilities:
- 'get_network_metrics': High-signal blockchain data (Gas, Whale moves).
- 'get_market_indicators': Macro sentiment.
Always emphasize data integrity and provide timestamps if possible.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingModelResponse,
    ExecutingTools,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tool_rounds: u32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: "gemini-3-pro-preview".to_string(),
            temperature: 0.7,
            max_tool_rounds: 5,
        }
    }
}

impl ChatOptions {
    pub fn from_config(cfg: &UplinkConfig) -> Self {
        Self {
            model: cfg.chat_model.clone(),
            temperature: cfg.chat_temperature,
            max_tool_rounds: cfg.chat.max_tool_rounds,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatSnapshot {
    pub state: SessionState,
    pub turns: Vec<ChatTurn>,
}

/// Read side of a session; readable while a message is being processed.
#[derive(Debug, Clone, Default)]
pub struct TranscriptHandle(Arc<Mutex<ChatSnapshot>>);

impl TranscriptHandle {
    pub fn snapshot(&self) -> ChatSnapshot {
        self.0.lock().expect("transcript poisoned").clone()
    }

    fn push(&self, turn: ChatTurn) {
        self.0.lock().expect("transcript poisoned").turns.push(turn);
    }

    /// Append the reply and go idle in one step.
    fn finish(&self, turn: ChatTurn) {
        let mut snap = self.0.lock().expect("transcript poisoned");
        snap.turns.push(turn);
        snap.state = SessionState::Idle;
    }

    fn set_state(&self, state: SessionState) {
        self.0.lock().expect("transcript poisoned").state = state;
    }
}

enum Exchange {
    Reply(ChatTurn),
    BudgetExhausted,
}

pub struct ConversationSession {
    backend: DynBackend,
    tools: Box<dyn ToolRegistry>,
    options: ChatOptions,
    contents: Vec<Content>,
    transcript: TranscriptHandle,
}

impl ConversationSession {
    /// Starts with the greeting turn and the simulated tool set.
    pub fn new(backend: DynBackend, options: ChatOptions) -> Self {
        let transcript = TranscriptHandle::default();
        transcript.push(ChatTurn::model(GREETING, Vec::new()));
        Self {
            backend,
            tools: Box::new(SimulatedTools),
            options,
            contents: Vec::new(),
            transcript,
        }
    }

    pub fn transcript_handle(&self) -> TranscriptHandle {
        self.transcript.clone()
    }

    pub fn transcript(&self) -> Vec<ChatTurn> {
        self.transcript.snapshot().turns
    }

    pub fn state(&self) -> SessionState {
        self.transcript.snapshot().state
    }

    /// Upstream-side history, function round trips included.
    pub fn history(&self) -> &[Content] {
        &self.contents
    }

    /// Returns the model turn appended for this message, or `None` for a blank
    /// message (nothing is sent or recorded).
    ///
    /// The exchange runs on a scratch copy of the history that replaces it
    /// only on success. If this future is dropped halfway, history is left as
    /// it was and the transcript gets the link-error turn.
    pub async fn send_user_message(&mut self, text: &str) -> Option<ChatTurn> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.transcript.push(ChatTurn::user(text.to_uppercase()));
        let pending = PendingReply::new(self.transcript.clone());
        let mut working = self.contents.clone();
        working.push(Content::user_text(text));

        let turn = match self.exchange(&mut working).await {
            Ok(Exchange::Reply(turn)) => {
                self.contents = working;
                turn
            }
            Ok(Exchange::BudgetExhausted) => {
                warn!(
                    target: "chat",
                    rounds = self.options.max_tool_rounds,
                    "tool round budget exhausted"
                );
                ChatTurn::model(TOOL_BUDGET_EXHAUSTED, Vec::new())
            }
            Err(e) => {
                warn!(target: "chat", error = %e, kind = ?e.kind(), "chat exchange failed");
                ChatTurn::model(LINK_ERROR, Vec::new())
            }
        };

        pending.settle(&turn);
        Some(turn)
    }

    fn request(&self, contents: &[Content]) -> GenerateRequest {
        GenerateRequest {
            model: self.options.model.clone(),
            contents: contents.to_vec(),
            system_instruction: Some(SYSTEM_INSTRUCTION.to_string()),
            web_search: true,
            functions: self.tools.declarations(),
            temperature: Some(self.options.temperature),
        }
    }

    async fn exchange(&self, working: &mut Vec<Content>) -> Result<Exchange, UplinkError> {
        let mut rounds = 0;
        loop {
            self.transcript.set_state(SessionState::AwaitingModelResponse);
            let resp = self.backend.generate(&self.request(working)).await?;

            if resp.function_calls.is_empty() {
                // Upstream keeps what the model actually said; only the
                // displayed turn gets the empty-reply marker.
                working.push(resp.to_content());
                let text = match resp.text.trim() {
                    "" => EMPTY_REPLY,
                    t => t,
                };
                let sources = citations::extract(&resp.grounding, CHAT_SOURCE_TITLE);
                return Ok(Exchange::Reply(ChatTurn::model(text, sources)));
            }
            if rounds >= self.options.max_tool_rounds {
                return Ok(Exchange::BudgetExhausted);
            }
            rounds += 1;

            self.transcript.set_state(SessionState::ExecutingTools);
            working.push(resp.to_content());
            let results: Vec<Part> = resp
                .function_calls
                .iter()
                .map(|call| {
                    let result = self.tools.execute(&call.name, &call.args);
                    Part::FunctionResponse(FunctionResponse::result_of(call, result))
                })
                .collect();
            debug!(target: "chat", round = rounds, calls = results.len(), "tool results sent back");
            working.push(Content {
                role: Role::User,
                parts: results,
            });
        }
    }
}

/// Closes out the transcript for one user message. Dropped unsettled, it
/// records the link error and returns the session to idle.
struct PendingReply {
    transcript: TranscriptHandle,
    settled: bool,
}

impl PendingReply {
    fn new(transcript: TranscriptHandle) -> Self {
        Self {
            transcript,
            settled: false,
        }
    }

    fn settle(mut self, turn: &ChatTurn) {
        self.transcript.finish(turn.clone());
        self.settled = true;
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        if !self.settled {
            warn!(target: "chat", "chat exchange abandoned before completion");
            self.transcript.finish(ChatTurn::model(LINK_ERROR, Vec::new()));
        }
    }
}
