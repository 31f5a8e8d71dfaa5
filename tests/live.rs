//! End-to-end checks of the `reqwest` transport against an in-process server.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::Query;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use birdwire::{Client, ClientConfig, ClientError, Credentials, Params, Request, StreamState};
use futures::StreamExt;
use tokio::sync::mpsc;

const USER_AGENT: &str = "birdwire-live/1.0";

// =========================================================================
// Server
// =========================================================================

fn signed(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("OAuth ") && value.contains("oauth_signature=\""))
}

async fn show(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Response {
    if !signed(&headers) {
        return (StatusCode::UNAUTHORIZED, "missing signature").into_response();
    }
    let agent = headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()).unwrap_or_default();
    let mut out = HeaderMap::new();
    out.append("x-trace", HeaderValue::from_static("a"));
    out.append("x-trace", HeaderValue::from_static("b"));
    out.insert("x-agent", HeaderValue::from_str(agent).unwrap());
    let id = query.get("id").cloned().unwrap_or_default();
    (out, format!("{{\"id\":{id}}}")).into_response()
}

async fn update(headers: HeaderMap, body: String) -> Response {
    let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or_default();
    if content_type != "application/x-www-form-urlencoded" || !signed(&headers) {
        return StatusCode::BAD_REQUEST.into_response();
    }
    body.into_response()
}

async fn protected() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::CONTENT_TYPE, "application/json")],
        r#"{"errors":[{"code":32,"message":"Could not authenticate you."}]}"#,
    )
        .into_response()
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(3)).await;
    "late"
}

async fn finite_stream() -> Response {
    let chunks = futures::stream::iter(vec![Ok::<_, std::io::Error>("one\r\n\r\ntw"), Ok("o\r\n")]);
    Body::from_stream(chunks).into_response()
}

async fn endless_stream() -> Response {
    let chunks = futures::stream::iter(vec![Ok::<_, std::io::Error>("hello\r\n")]).chain(futures::stream::pending());
    Body::from_stream(chunks).into_response()
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/1.1/statuses/show.json", get(show))
        .route("/1.1/statuses/update.json", post(update))
        .route("/1.1/protected.json", get(protected))
        .route("/1.1/slow.json", get(slow))
        .route("/1.1/moved.json", get(|| async { Redirect::temporary("/1.1/statuses/show.json?id=7") }))
        .route("/stream/finite.json", post(finite_stream))
        .route("/stream/endless.json", post(endless_stream));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
}

fn client(config: ClientConfig) -> Arc<Client> {
    let credentials = Credentials::new("ck", "cs", "at", "ats");
    Arc::new(Client::new(&config, Some(credentials)).unwrap())
}

fn config() -> ClientConfig {
    ClientConfig { user_agent: USER_AGENT.into(), ..ClientConfig::default() }
}

// =========================================================================
// Bounded calls
// =========================================================================

#[tokio::test]
async fn signed_get_returns_body_and_headers() {
    let addr = spawn_server().await;
    let client = client(config());
    let url = format!("http://{addr}/1.1/statuses/show.json");

    let response = client.execute(&Request::get(&url).param("id", "42")).await.unwrap();

    assert_eq!(response.body, r#"{"id":42}"#);
    assert_eq!(response.url, format!("{url}?id=42"));
    assert_eq!(response.header("X-Trace"), Some("a, b"));
    assert_eq!(response.header("x-agent"), Some(USER_AGENT));
    assert_eq!(client.last_url(), Some(format!("{url}?id=42")));
}

#[tokio::test]
async fn redirect_records_resolved_url() {
    let addr = spawn_server().await;
    let client = client(config());

    let response = client.execute(&Request::get(format!("http://{addr}/1.1/moved.json"))).await.unwrap();

    assert_eq!(response.body, r#"{"id":7}"#);
    assert_eq!(client.last_url(), Some(format!("http://{addr}/1.1/statuses/show.json?id=7")));
}

#[tokio::test]
async fn signed_post_sends_form_body() {
    let addr = spawn_server().await;
    let client = client(config());
    let request = Request::post(format!("http://{addr}/1.1/statuses/update.json"))
        .params(Params::new().with("status", "Hello Ladies + Gentlemen").with_opt("in_reply_to", None::<String>));

    let response = client.execute(&request).await.unwrap();

    assert_eq!(response.body, "status=Hello+Ladies+%2B+Gentlemen");
}

#[tokio::test]
async fn structured_error_payload_is_classified() {
    let addr = spawn_server().await;
    let client = client(config());

    let err = client.execute(&Request::get(format!("http://{addr}/1.1/protected.json"))).await.unwrap_err();

    match err {
        ClientError::RemoteProtocol { status, errors, .. } => {
            assert_eq!(status, 401);
            assert_eq!(errors[0].code, 32);
            assert_eq!(errors[0].message, "Could not authenticate you.");
        }
        other => panic!("expected RemoteProtocol, got {other:?}"),
    }
    assert_eq!(client.last_url(), Some(format!("http://{addr}/1.1/protected.json")));
}

#[tokio::test]
async fn bounded_call_times_out() {
    let addr = spawn_server().await;
    let client = client(ClientConfig { timeout_secs: 1, ..config() });

    let err = client.execute(&Request::get(format!("http://{addr}/1.1/slow.json"))).await.unwrap_err();

    assert!(matches!(err, ClientError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn refused_connection_is_connectivity() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = client(config());

    let err = client.execute(&Request::get(format!("http://{addr}/1.1/statuses/show.json"))).await.unwrap_err();

    assert!(matches!(err, ClientError::Connectivity(_)), "got {err:?}");
}

// =========================================================================
// Streaming
// =========================================================================

#[tokio::test]
async fn stream_end_is_connectivity_error() {
    let addr = spawn_server().await;
    let client = client(ClientConfig { stream_chunk_size: 3, ..config() });
    let mut lines = Vec::new();

    let err = client
        .stream(&format!("http://{addr}/stream/finite.json"), &Params::new(), |line| lines.push(line.to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Connectivity(_)), "got {err:?}");
    assert_eq!(lines, vec!["one", "", "two"]);
    assert_eq!(client.stream_state(), StreamState::Idle);
}

#[tokio::test]
async fn stop_ends_endless_stream() {
    let addr = spawn_server().await;
    let client = client(config());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let task = {
        let client = client.clone();
        let url = format!("http://{addr}/stream/endless.json");
        tokio::spawn(async move {
            let params = Params::new().with("track", "rust");
            client
                .stream(&url, &params, move |line: &str| {
                    let _ = tx.send(line.to_string());
                })
                .await
        })
    };

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
    assert_eq!(first.as_deref(), Some("hello"));
    assert_eq!(client.stream_state(), StreamState::Streaming);

    client.request_stop();
    let outcome = tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();

    assert!(outcome.is_ok(), "got {outcome:?}");
    assert_eq!(client.stream_state(), StreamState::Idle);
}
