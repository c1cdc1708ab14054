//! Local stand-in for the SOAP-controlled player

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const PLAY_RESPONSE: &str = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body><u:PlayResponse xmlns:u="urn:soapi:service:Playback:1"/></s:Body>
</s:Envelope>"#;

/// How the endpoint answers
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with a PlayResponse
    Accept,
    /// 500 with a SOAP Fault
    Fault { code: String, message: String },
    /// Bare status code, no SOAP body
    Status(StatusCode),
    /// Sleep before accepting
    Delay(Duration),
    /// Accept, then fetch the stream URL like a real player
    FetchStream,
}

/// One request as the endpoint saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub soap_action: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    /// Text of the first `<name>` element in the body
    pub fn argument(&self, name: &str) -> Option<String> {
        let open = format!("<{}>", name);
        let close = format!("</{}>", name);
        let start = self.body.find(&open)? + open.len();
        let len = self.body[start..].find(&close)?;
        Some(self.body[start..start + len].to_string())
    }
}

#[derive(Clone)]
struct EndpointState {
    reply: Reply,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    fetch: Arc<Mutex<Option<JoinHandle<Vec<u8>>>>>,
}

pub struct FakeSoapEndpoint {
    pub addr: SocketAddr,
    state: EndpointState,
    shutdown: CancellationToken,
}

impl FakeSoapEndpoint {
    pub async fn start(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = EndpointState {
            reply,
            requests: Arc::new(Mutex::new(Vec::new())),
            fetch: Arc::new(Mutex::new(None)),
        };
        let shutdown = CancellationToken::new();

        let app = Router::new()
            .route("/", post(handle))
            .route("/*path", post(handle))
            .with_state(state.clone());
        let stop = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await
                .unwrap();
        });

        Self { addr, state, shutdown }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Bytes fetched from the stream URL (`Reply::FetchStream` only)
    pub async fn fetched_stream(&self) -> Option<Vec<u8>> {
        let handle = self.state.fetch.lock().unwrap().take()?;
        Some(handle.await.unwrap())
    }
}

impl Drop for FakeSoapEndpoint {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle(
    State(state): State<EndpointState>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let header_text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let request = RecordedRequest {
        path: uri.path().to_string(),
        soap_action: header_text("soapaction"),
        content_type: header_text(header::CONTENT_TYPE.as_str()),
        body,
    };
    let stream_url = request.argument("StreamUrl");
    state.requests.lock().unwrap().push(request);

    match state.reply {
        Reply::Accept => (StatusCode::OK, PLAY_RESPONSE).into_response(),
        Reply::Fault { code, message } => {
            let body = format!(
                r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <s:Fault>
      <faultcode>{}</faultcode>
      <faultstring>{}</faultstring>
    </s:Fault>
  </s:Body>
</s:Envelope>"#,
                code, message
            );
            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
        Reply::Status(status) => (status, "no SOAP here").into_response(),
        Reply::Delay(delay) => {
            tokio::time::sleep(delay).await;
            (StatusCode::OK, PLAY_RESPONSE).into_response()
        }
        Reply::FetchStream => {
            let Some(url) = stream_url else {
                return (StatusCode::BAD_REQUEST, "missing StreamUrl").into_response();
            };
            let handle = tokio::spawn(async move {
                let response = reqwest::get(&url).await.unwrap();
                assert!(response.status().is_success(), "stream fetch returned {}", response.status());
                response.bytes().await.unwrap().to_vec()
            });
            *state.fetch.lock().unwrap() = Some(handle);
            (StatusCode::OK, PLAY_RESPONSE).into_response()
        }
    }
}
