use std::time::Duration;
use testdeck_core::artifact::NodeId;
use testdeck_core::engine::{EngineErrorKind, GenerationEngine, GenerationRequest};
use testdeck_core::session::EntryId;
use testdeck_interaction::HttpEngine;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Request as seen by the stub server.
struct Captured {
    head: String,
    body: String,
}

/// Serves exactly one HTTP exchange with the given status and body.
async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
        }
        let request_body = String::from_utf8_lossy(&buf[header_end..]).to_string();

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        let _ = tx.send(Captured {
            head,
            body: request_body,
        });
    });

    (format!("http://{}/generate", addr), rx)
}

fn request() -> GenerationRequest {
    GenerationRequest {
        request_id: EntryId::new(4),
        text: "add login test".to_string(),
        selection_context: Some(NodeId::from("3")),
        selection_path: Some("Project Root/src/login.test.js".to_string()),
    }
}

#[tokio::test]
async fn success_body_becomes_content() {
    let (endpoint, captured) = serve_once("200 OK", r#"{"content":"generated 3 tests"}"#).await;
    let engine = HttpEngine::new(endpoint)
        .unwrap()
        .with_bearer_token(Some("secret".to_string()));

    let response = engine
        .generate(request(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.content, "generated 3 tests");

    let captured = captured.await.unwrap();
    assert!(captured.head.starts_with("POST /generate"));
    assert!(captured.head.to_ascii_lowercase().contains("authorization: bearer secret"));
    let sent: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(sent["text"], "add login test");
    assert_eq!(sent["selection_context"], "3");
}

#[tokio::test]
async fn failure_body_keeps_error_kind() {
    let (endpoint, _captured) = serve_once(
        "422 Unprocessable Entity",
        r#"{"error_kind":"rejected","message":"selection is not a test file"}"#,
    )
    .await;
    let engine = HttpEngine::new(endpoint).unwrap();

    let err = engine
        .generate(request(), CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, EngineErrorKind::Rejected);
    assert_eq!(err.message, "selection is not a test file");
}

#[tokio::test]
async fn non_success_status_is_rejected() {
    let (endpoint, _captured) = serve_once("503 Service Unavailable", "overloaded").await;
    let engine = HttpEngine::new(endpoint).unwrap();

    let err = engine
        .generate(request(), CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, EngineErrorKind::Rejected);
    assert!(err.message.contains("503"));
}

#[tokio::test]
async fn unreadable_body_is_protocol_error() {
    let (endpoint, _captured) = serve_once("200 OK", r#"{"unexpected":true}"#).await;
    let engine = HttpEngine::new(endpoint).unwrap();

    let err = engine
        .generate(request(), CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, EngineErrorKind::Protocol);
}

#[tokio::test]
async fn unreachable_endpoint_is_unavailable() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let engine = HttpEngine::new(format!("http://{}/generate", addr)).unwrap();
    let err = engine
        .generate(request(), CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, EngineErrorKind::Unavailable);
}

#[tokio::test]
async fn cancellation_wins_over_slow_server() {
    // Accepts but never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let engine = HttpEngine::new(format!("http://{}/generate", addr)).unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = engine.generate(request(), cancel).await.unwrap_err();
    assert!(err.is_cancelled());
}
