//! Mock provider API bound on an ephemeral local port.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use tokio::net::TcpListener;

pub const CHAT_ANSWER: &str =
    r#"{"choices":[{"message":{"content":"4"}}],"usage":{"prompt_tokens":9,"completion_tokens":1}}"#;

pub const MESSAGE_STREAM: &str = concat!(
    "event: message_start\n",
    "data: {\"type\":\"message_start\",\"message\":{\"usage\":{\"input_tokens\":11,\"output_tokens\":1}}}\n\n",
    "event: content_block_delta\n",
    "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n\n",
    "event: message_delta\n",
    "data: {\"type\":\"message_delta\",\"usage\":{\"output_tokens\":4}}\n\n",
    "event: message_stop\n",
    "data: {\"type\":\"message_stop\"}\n\n",
);

#[derive(Default)]
pub struct Recorded {
    hits: AtomicUsize,
    headers: Mutex<Vec<HeaderMap>>,
    bodies: Mutex<Vec<Bytes>>,
}

impl Recorded {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_headers(&self) -> HeaderMap {
        self.headers.lock().unwrap().last().cloned().unwrap()
    }

    pub fn last_body(&self) -> Bytes {
        self.bodies.lock().unwrap().last().cloned().unwrap()
    }

    fn record(&self, headers: HeaderMap, body: Bytes) {
        self.hits.fetch_add(1, Ordering::SeqCst);
        self.headers.lock().unwrap().push(headers);
        self.bodies.lock().unwrap().push(body);
    }
}

pub struct MockUpstream {
    pub base_url: String,
    pub recorded: Arc<Recorded>,
}

pub async fn spawn() -> MockUpstream {
    let recorded = Arc::new(Recorded::default());
    let app = Router::new()
        .route("/v1/chat/completions", post(chat))
        .route("/v1/messages", post(messages))
        .route("/v1/fail", post(fail))
        .with_state(Arc::clone(&recorded));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockUpstream {
        base_url: format!("http://{addr}"),
        recorded,
    }
}

async fn chat(State(rec): State<Arc<Recorded>>, headers: HeaderMap, body: Bytes) -> Response {
    rec.record(headers, body);
    (
        [("content-type", "application/json"), ("x-upstream", "mock")],
        CHAT_ANSWER,
    )
        .into_response()
}

async fn messages(State(rec): State<Arc<Recorded>>, headers: HeaderMap, body: Bytes) -> Response {
    rec.record(headers, body);
    let chunks: Vec<Result<Bytes, std::io::Error>> = MESSAGE_STREAM
        .split_inclusive("\n\n")
        .map(|frame| Ok(Bytes::from(frame.to_string())))
        .collect();
    (
        [("content-type", "text/event-stream")],
        Body::from_stream(futures_util::stream::iter(chunks)),
    )
        .into_response()
}

async fn fail(State(rec): State<Arc<Recorded>>, headers: HeaderMap, body: Bytes) -> Response {
    rec.record(headers, body);
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({"error": {"type": "rate_limit_error"}})),
    )
        .into_response()
}
