// tests/chat_session.rs
use std::sync::Arc;
use std::time::Duration;

use intel_terminal::chat::{
    ChatOptions, ConversationSession, SessionState, EMPTY_REPLY, GREETING, LINK_ERROR,
    TOOL_BUDGET_EXHAUSTED,
};
use intel_terminal::model::ChatRole;
use intel_terminal::upstream::{FunctionCall, GenerateResponse, MockBackend, Part, Role};
use intel_terminal::UplinkError;
use serde_json::json;

fn call(name: &str, args: serde_json::Value) -> FunctionCall {
    FunctionCall {
        id: Some(format!("{name}-1")),
        name: name.to_string(),
        args,
    }
}

fn session(mock: &Arc<MockBackend>, max_tool_rounds: u32) -> ConversationSession {
    ConversationSession::new(
        mock.clone(),
        ChatOptions {
            model: "chat-model".into(),
            temperature: 0.7,
            max_tool_rounds,
        },
    )
}

#[tokio::test]
async fn transcript_starts_with_greeting() {
    let mock = Arc::new(MockBackend::fixed("hi"));
    let s = session(&mock, 5);
    let turns = s.transcript();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].role, ChatRole::Model);
    assert_eq!(turns[0].text, GREETING);
    assert_eq!(s.state(), SessionState::Idle);
}

#[tokio::test]
async fn tool_calls_are_answered_in_one_batch_then_final_text_is_returned() {
    let mock = Arc::new(MockBackend::scripted(vec![
        Ok(GenerateResponse::calls(vec![
            call("get_network_metrics", json!({ "metricType": "GAS" })),
            call("get_market_indicators", json!({ "metric": "BOGUS" })),
        ])),
        Ok(GenerateResponse::text("Gas sits at 22 gwei.")
            .with_grounding("Etherscan", "https://etherscan.example/gas")
            .with_grounding("", "https://blog.example/gas")),
    ]));
    let mut s = session(&mock, 5);

    let turn = s.send_user_message("how is gas?").await.unwrap();
    assert_eq!(turn.text, "Gas sits at 22 gwei.");
    let sources = turn.sources.unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[1].title, "Grounding Point");

    let calls = mock.calls();
    assert_eq!(calls.len(), 2);
    let first = &calls[0].request;
    assert_eq!(first.model, "chat-model");
    assert_eq!(first.temperature, Some(0.7));
    assert!(first.web_search);
    assert_eq!(first.functions.len(), 2);

    // user, model(calls), user(results)
    let second = &calls[1].request;
    assert_eq!(second.contents.len(), 3);
    let results = &second.contents[2];
    assert_eq!(results.role, Role::User);
    assert_eq!(results.parts.len(), 2);
    match (&results.parts[0], &results.parts[1]) {
        (Part::FunctionResponse(gas), Part::FunctionResponse(bogus)) => {
            assert_eq!(gas.id.as_deref(), Some("get_network_metrics-1"));
            assert_eq!(gas.response["result"]["base"], "22 gwei");
            assert_eq!(bogus.response["result"]["error"], "Node busy");
        }
        other => panic!("expected function responses, got {other:?}"),
    }

    assert_eq!(s.history().len(), 4);
    assert_eq!(s.state(), SessionState::Idle);
}

#[tokio::test]
async fn tool_rounds_are_bounded() {
    let mock = Arc::new(MockBackend::new(|_, _| {
        Ok(GenerateResponse::calls(vec![call(
            "get_market_indicators",
            json!({ "metric": "VOLUME" }),
        )]))
    }));
    let mut s = session(&mock, 2);

    let turn = s.send_user_message("loop forever").await.unwrap();
    assert_eq!(turn.text, TOOL_BUDGET_EXHAUSTED);
    assert_eq!(mock.call_count(), 3);
    assert!(s.history().is_empty(), "unfinished round trips are rolled back");
}

#[tokio::test]
async fn upstream_failure_appends_fallback_and_keeps_history() {
    let mock = Arc::new(MockBackend::scripted(vec![
        Ok(GenerateResponse::text("first answer")),
        Err(UplinkError::from_status(500, "boom")),
        Ok(GenerateResponse::text("third answer")),
    ]));
    let mut s = session(&mock, 5);

    s.send_user_message("one").await.unwrap();
    let failed = s.send_user_message("two").await.unwrap();
    assert_eq!(failed.text, LINK_ERROR);
    assert_eq!(s.history().len(), 2, "failed exchange is not part of upstream history");

    s.send_user_message("three").await.unwrap();
    let third = &mock.calls()[2].request;
    assert_eq!(third.contents.len(), 3);
    assert_eq!(third.contents[2].parts, vec![Part::Text("three".into())]);

    let texts: Vec<String> = s.transcript().into_iter().map(|t| t.text).collect();
    assert_eq!(
        texts,
        vec![GREETING, "ONE", "first answer", "TWO", LINK_ERROR, "THREE", "third answer"]
    );
}

#[tokio::test]
async fn blank_messages_are_ignored_and_empty_replies_flagged() {
    let mock = Arc::new(MockBackend::fixed("   "));
    let mut s = session(&mock, 5);

    assert!(s.send_user_message("   ").await.is_none());
    assert_eq!(mock.call_count(), 0);
    assert_eq!(s.transcript().len(), 1);

    let turn = s.send_user_message("status?").await.unwrap();
    assert_eq!(turn.text, EMPTY_REPLY);
    assert!(turn.sources.is_none());
}

#[tokio::test]
async fn empty_reply_is_flagged_only_in_transcript() {
    let mock = Arc::new(MockBackend::fixed(""));
    let mut s = session(&mock, 5);

    let turn = s.send_user_message("status?").await.unwrap();
    assert_eq!(turn.text, EMPTY_REPLY);

    let history = s.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].role, Role::Model);
    assert!(
        !history[1].parts.contains(&Part::Text(EMPTY_REPLY.into())),
        "display marker must not be sent back upstream"
    );
}

#[tokio::test(start_paused = true)]
async fn abandoned_exchange_leaves_history_intact() {
    let mock = Arc::new(
        MockBackend::new(|_, i| {
            Ok(GenerateResponse::text(if i == 0 { "never seen" } else { "second answer" }))
        })
        .with_latency(Duration::from_secs(5)),
    );
    let mut s = session(&mock, 5);

    let out = tokio::time::timeout(Duration::from_secs(1), s.send_user_message("hello")).await;
    assert!(out.is_err(), "exchange should still be waiting on the upstream");

    assert_eq!(s.state(), SessionState::Idle);
    assert!(s.history().is_empty());
    let texts: Vec<String> = s.transcript().into_iter().map(|t| t.text).collect();
    assert_eq!(texts, vec![GREETING, "HELLO", LINK_ERROR]);

    let turn = s.send_user_message("again").await.unwrap();
    assert_eq!(turn.text, "second answer");
    let roles: Vec<Role> = mock.calls()[1].request.contents.iter().map(|c| c.role).collect();
    assert_eq!(roles, vec![Role::User]);
    assert_eq!(s.history().len(), 2);
}
