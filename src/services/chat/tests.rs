//! Tests for the chat service and the streaming decoder

use super::*;
use crate::credential::CredentialManager;
use crate::error::KnowledgeError;
use crate::executor::RequestExecutor;
use crate::logging::{LogGate, LogThreshold};
use crate::mocks::{CaptureSink, MockTransport, StreamScript};
use bytes::Bytes;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

fn service(transport: Arc<MockTransport>) -> (ChatService, Arc<CaptureSink>) {
    let sink = CaptureSink::new();
    let gate = Arc::new(LogGate::new(LogThreshold::from_numeric(4), sink.clone()));
    let executor = Arc::new(RequestExecutor::new(
        transport,
        gate.clone(),
        Duration::from_secs(5),
    ));
    let base = Url::parse("https://kb.intranet.example/").unwrap();
    let credentials = Arc::new(
        CredentialManager::new(
            executor.clone(),
            gate.clone(),
            &base,
            "console-admin".to_string(),
            SecretString::new("s3cret".to_string()),
            0,
        )
        .unwrap(),
    );
    let mut extend = HashMap::new();
    extend.insert("ext-tenant".to_string(), "ops".to_string());
    let service = ChatService::new(
        executor,
        credentials,
        gate,
        &base,
        "agent-42".to_string(),
        "console-admin".to_string(),
        extend,
    )
    .unwrap();
    (service, sink)
}

fn key_ok() -> serde_json::Value {
    json!({"resultCode": "0", "resultObject": {"appKey": "ak-1234567890"}})
}

fn delta(content: &str) -> String {
    format!("data: {}\n", json!({"choices": [{"delta": {"content": content}}]}))
}

#[tokio::test]
async fn invalid_request_is_rejected_before_any_network_call() {
    let transport = Arc::new(MockTransport::new());
    let (service, _sink) = service(transport.clone());

    let err = service
        .complete(ChatRequest::new(vec![ChatMessage::assistant("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(err, KnowledgeError::Validation(_)));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn complete_sends_credentialed_request_and_returns_content() {
    let transport = Arc::new(
        MockTransport::new()
            .with_json_response(key_ok())
            .with_json_response(json!({"choices": [{"message": {"content": "Hello there"}}]})),
    );
    let (service, _sink) = service(transport.clone());

    let request = ChatRequest::new(vec![ChatMessage::user("hi")])
        .with_max_tokens(512)
        .with_temperature(0.5);
    let completion = service.complete(request).await.unwrap();

    assert_eq!(completion.content(), Some("Hello there"));

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].url.path().ends_with("extSecret/generateAppKey"));
    assert!(requests[1].url.path().ends_with("extChatApi/v2/chat"));

    let headers = &requests[1].headers;
    assert_eq!(headers.get("appid").unwrap(), "console-admin");
    assert_eq!(headers.get("appkey").unwrap(), "ak-1234567890");
    assert_eq!(headers.get("ext-tenant").unwrap(), "ops");

    let body = requests[1].body_json();
    assert_eq!(body["agentId"], "agent-42");
    assert_eq!(body["stream"], false);
    assert_eq!(body["max_tokens"], 512);
    assert_eq!(body["messages"][0]["role"], "user");
}

#[tokio::test]
async fn credential_is_reused_across_calls() {
    let transport = Arc::new(
        MockTransport::new()
            .with_json_response(key_ok())
            .with_json_response(json!({"choices": [{"message": {"content": "one"}}]}))
            .with_json_response(json!({"choices": [{"message": {"content": "two"}}]})),
    );
    let (service, _sink) = service(transport.clone());

    service
        .complete(ChatRequest::new(vec![ChatMessage::user("a")]))
        .await
        .unwrap();
    service
        .complete(ChatRequest::new(vec![ChatMessage::user("b")]))
        .await
        .unwrap();

    // One key exchange, two chat calls.
    assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn malformed_chat_response_is_a_serialization_error() {
    let transport = Arc::new(
        MockTransport::new()
            .with_json_response(key_ok())
            .with_json_response(json!({"unexpected": true})),
    );
    let (service, _sink) = service(transport);

    let err = service
        .complete(ChatRequest::new(vec![ChatMessage::user("hi")]))
        .await
        .unwrap_err();
    assert!(matches!(err, KnowledgeError::Serialization(_)));
}

#[tokio::test]
async fn stream_reports_last_fragment_and_repeats_it_on_done() {
    // Chunk boundaries deliberately split lines to exercise the partial
    // buffer.
    let first = delta("He");
    let second = delta("llo");
    let (second_a, second_b) = second.split_at(4);
    let tail = format!("{}data: [DONE]\n", second_b);
    let transport = Arc::new(
        MockTransport::new()
            .with_json_response(key_ok())
            .with_stream(vec![first.as_str(), second_a, tail.as_str()]),
    );
    let (service, _sink) = service(transport);

    let mut stream = service
        .complete_stream(ChatRequest::new(vec![ChatMessage::user("hi")]))
        .await
        .unwrap();

    let mut events = Vec::new();
    stream
        .consume(|event| events.push(event.clone()), |_| {})
        .await
        .unwrap();

    assert_eq!(
        events,
        vec![
            StreamEvent { content: "He".to_string(), is_final: false },
            StreamEvent { content: "llo".to_string(), is_final: false },
            StreamEvent { content: "llo".to_string(), is_final: true },
        ]
    );
}

#[tokio::test]
async fn empty_delta_re_reports_previous_fragment() {
    // Pins the service's observed behavior: events carry the most recent
    // non-empty fragment, never an accumulation, and an empty delta does
    // not reset it. Collect mode therefore duplicates the re-reported
    // text. Callers expecting incremental concatenation will observe
    // this; do not "fix" it into accumulation.
    let transport = Arc::new(
        MockTransport::new()
            .with_json_response(key_ok())
            .with_stream(vec![&format!(
                "{}{}data: [DONE]\n",
                delta("He"),
                delta("")
            )]),
    );
    let (service, _sink) = service(transport);

    let mut stream = service
        .complete_stream(ChatRequest::new(vec![ChatMessage::user("hi")]))
        .await
        .unwrap();

    let collected = stream.collect().await.unwrap();
    assert_eq!(collected, "HeHe");
}

#[tokio::test]
async fn collect_concatenates_reported_fragments() {
    let transport = Arc::new(
        MockTransport::new()
            .with_json_response(key_ok())
            .with_stream(vec![&format!(
                "{}{}data: [DONE]\n",
                delta("He"),
                delta("llo")
            )]),
    );
    let (service, _sink) = service(transport);

    let mut stream = service
        .complete_stream(ChatRequest::new(vec![ChatMessage::user("hi")]))
        .await
        .unwrap();
    assert_eq!(stream.collect().await.unwrap(), "Hello");
}

#[tokio::test]
async fn info_frames_are_forwarded_out_of_band() {
    let transport = Arc::new(
        MockTransport::new()
            .with_json_response(key_ok())
            .with_stream(vec![&format!(
                "info: {{\"traceId\": \"t-1\"}}\n{}data: [DONE]\n",
                delta("hi")
            )]),
    );
    let (service, _sink) = service(transport);

    let mut stream = service
        .complete_stream(ChatRequest::new(vec![ChatMessage::user("hi")]))
        .await
        .unwrap();

    let mut infos = Vec::new();
    stream
        .consume(|_| {}, |info| infos.push(info.clone()))
        .await
        .unwrap();
    assert_eq!(infos, vec![json!({"traceId": "t-1"})]);
}

#[tokio::test]
async fn malformed_frames_are_logged_and_skipped() {
    let transport = Arc::new(
        MockTransport::new()
            .with_json_response(key_ok())
            .with_stream(vec![&format!(
                "info: not-json\ndata: also-not-json\n{}data: [DONE]\n",
                delta("ok")
            )]),
    );
    let (service, sink) = service(transport);

    let mut stream = service
        .complete_stream(ChatRequest::new(vec![ChatMessage::user("hi")]))
        .await
        .unwrap();

    let mut events = Vec::new();
    stream
        .consume(|event| events.push(event.clone()), |_| {})
        .await
        .unwrap();

    // Both malformed frames dropped, stream still terminates normally.
    assert_eq!(events.last().unwrap().content, "ok");
    assert!(events.last().unwrap().is_final);
    assert_eq!(sink.error_lines().len(), 2);
}

#[tokio::test]
async fn read_failure_aborts_decoding() {
    let transport = Arc::new(
        MockTransport::new()
            .with_json_response(key_ok())
            .with_stream_script(StreamScript {
                status: 200,
                chunks: vec![
                    Ok(Bytes::from(delta("He"))),
                    Err(KnowledgeError::Network("connection reset".to_string())),
                ],
            }),
    );
    let (service, _sink) = service(transport);

    let mut stream = service
        .complete_stream(ChatRequest::new(vec![ChatMessage::user("hi")]))
        .await
        .unwrap();

    let err = stream.collect().await.unwrap_err();
    assert!(matches!(err, KnowledgeError::Network(_)));
}

#[tokio::test]
async fn natural_end_without_done_completes() {
    let transport = Arc::new(
        MockTransport::new()
            .with_json_response(key_ok())
            .with_stream(vec![&delta("partial")]),
    );
    let (service, _sink) = service(transport);

    let mut stream = service
        .complete_stream(ChatRequest::new(vec![ChatMessage::user("hi")]))
        .await
        .unwrap();
    assert_eq!(stream.collect().await.unwrap(), "partial");
}

#[tokio::test]
async fn second_consumption_is_rejected() {
    let transport = Arc::new(
        MockTransport::new()
            .with_json_response(key_ok())
            .with_stream(vec!["data: [DONE]\n"]),
    );
    let (service, _sink) = service(transport);

    let mut stream = service
        .complete_stream(ChatRequest::new(vec![ChatMessage::user("hi")]))
        .await
        .unwrap();

    stream.collect().await.unwrap();
    let err = stream.collect().await.unwrap_err();
    assert!(matches!(err, KnowledgeError::Stream(_)));
    assert!(err.to_string().contains("already consumed"));
}
