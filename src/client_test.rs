use super::*;
use crate::request::Method;
use crate::signer::Signer;
use crate::transport::{BodyReader, HttpRequest, HttpResponse, StreamResponse};
use std::sync::Mutex;

#[derive(Default)]
struct EchoTransport {
    sent: Mutex<Vec<HttpRequest>>,
}

#[async_trait::async_trait]
impl Transport for EchoTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let url = request.url.clone();
        self.sent.lock().unwrap().push(request);
        Ok(HttpResponse { status: 200, url, headers: Vec::new(), body: "{}".into() })
    }

    async fn open(&self, request: HttpRequest) -> Result<StreamResponse, ClientError> {
        let url = request.url.clone();
        self.sent.lock().unwrap().push(request);
        Ok(StreamResponse { status: 200, url, headers: Vec::new(), body: Box::new(OneLine(Some(&b"hi\r\n"[..]))) })
    }
}

struct OneLine(Option<&'static [u8]>);

#[async_trait::async_trait]
impl BodyReader for OneLine {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ClientError> {
        match self.0.take() {
            Some(bytes) => {
                buf[..bytes.len()].copy_from_slice(bytes);
                Ok(bytes.len())
            }
            None => Ok(0),
        }
    }
}

struct FixedSigner;

impl Signer for FixedSigner {
    fn sign(&self, _: Method, _: &str, _: &[(&str, &str)], _: &Credentials) -> Result<String, ClientError> {
        Ok("OAuth token=abc".into())
    }
}

fn signed() -> Authorizer {
    Authorizer::new(Arc::new(FixedSigner), Some(Credentials::new("ck", "cs", "at", "ats")))
}

#[tokio::test]
async fn diagnostics_reach_both_executors() {
    let transport = Arc::new(EchoTransport::default());
    let labels = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let labels = labels.clone();
        move |_: &str, label: &str| labels.lock().unwrap().push(label.to_string())
    };
    let client = Client::with_transport(transport.clone(), signed(), &ClientConfig::default())
        .with_diagnostics(Arc::new(sink));

    client.execute(&Request::get("https://api.example/1.1/a.json")).await.unwrap();
    client.execute(&Request::post("https://api.example/1.1/b.json").param("k", "v")).await.unwrap();
    let mut lines = Vec::new();
    let _ = client.stream("https://stream.example/1.1/s.json", &Params::new(), |l| lines.push(l.to_string())).await;

    assert_eq!(*labels.lock().unwrap(), vec!["get", "post", "stream"]);
    assert_eq!(lines, vec!["hi"]);
    assert_eq!(transport.sent.lock().unwrap().len(), 3);
    assert_eq!(client.last_url().as_deref(), Some("https://api.example/1.1/b.json"));
    assert_eq!(client.stream_state(), StreamState::Idle);
}

#[tokio::test]
async fn missing_credentials_fail_every_call() {
    let transport = Arc::new(EchoTransport::default());
    let client = Client::with_transport(
        transport.clone(),
        Authorizer::new(Arc::new(FixedSigner), None),
        &ClientConfig::default(),
    );

    let get = client.execute(&Request::get("https://api.example/1.1/a.json")).await;
    let stream = client.stream("https://stream.example/1.1/s.json", &Params::new(), |_| {}).await;

    assert!(matches!(get, Err(ClientError::Authorization(_))));
    assert!(matches!(stream, Err(ClientError::Authorization(_))));
    assert!(transport.sent.lock().unwrap().is_empty());
    assert!(client.last_url().is_none());
}

#[test]
fn new_rejects_invalid_config() {
    let config = ClientConfig { stream_chunk_size: 0, ..ClientConfig::default() };
    assert!(matches!(Client::new(&config, None), Err(ClientError::ConfigParse(_))));
}

#[test]
fn stop_without_stream_is_harmless() {
    let client = Client::with_transport(Arc::new(EchoTransport::default()), signed(), &ClientConfig::default());
    client.request_stop();
    assert_eq!(client.stream_state(), StreamState::Idle);
    assert!(!client.streams().is_closed());
}
