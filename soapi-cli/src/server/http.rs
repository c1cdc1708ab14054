//! HTTP streaming serving resource
//!
//! Serves the playlist to the remote device over HTTP:
//! - `GET /health` - server status
//! - `GET /playlist` - track listing (JSON)
//! - `GET /playlist.m3u` - extended M3U with per-track URLs
//! - `GET /tracks/:index` - a single track
//! - `GET /stream` - the whole playlist as one continuous body
//! - `POST /stop` - explicit stop request
//!
//! Playback is driven by `/stream`: the first client claims it, tracks are
//! sent in playlist order, and delivering the last byte finishes playback.
//! A stop request lets the current track finish and skips the rest.

use super::{PlaybackSession, ServingResource};
use crate::error::{Error, Result};
use crate::playlist::{MediaReference, Playlist};
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Serving resource backed by an axum HTTP server
pub struct HttpStreamer {
    bind_addr: String,
    listener: Option<TcpListener>,
}

impl HttpStreamer {
    /// `bind_addr` is `host:port`; port 0 picks an ephemeral port
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            listener: None,
        }
    }
}

#[async_trait]
impl ServingResource for HttpStreamer {
    async fn bind(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|e| Error::ServerStart(format!("Failed to bind to {}: {}", self.bind_addr, e)))?;
        let addr = listener
            .local_addr()
            .map_err(|e| Error::ServerStart(format!("Failed to read bound address: {}", e)))?;

        info!("Starting HTTP stream server on {}", addr);
        self.listener = Some(listener);
        Ok(addr)
    }

    async fn serve(self: Box<Self>, session: PlaybackSession) -> Result<()> {
        let listener = self
            .listener
            .ok_or_else(|| Error::InvalidState("serve called before bind".to_string()))?;
        let stop = session.stop_token();
        let app = create_router(session);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { stop.cancelled().await })
            .await
            .map_err(|e| Error::Playback(format!("Server error: {}", e)))?;

        Ok(())
    }
}

/// Shared state for the streaming handlers
#[derive(Clone)]
struct StreamerContext {
    session: PlaybackSession,
    /// Set while a client owns `/stream`
    stream_claimed: Arc<AtomicBool>,
}

/// Build the router; public so tests can drive it without a socket
pub fn create_router(session: PlaybackSession) -> Router {
    let ctx = StreamerContext {
        session,
        stream_claimed: Arc::new(AtomicBool::new(false)),
    };

    Router::new()
        .route("/health", get(health))
        .route("/playlist", get(playlist_json))
        .route("/playlist.m3u", get(playlist_m3u))
        .route("/tracks/:index", get(track))
        .route("/stream", get(stream))
        .route("/stop", post(stop))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Serialize)]
struct TrackInfo {
    index: usize,
    name: String,
    content_type: &'static str,
    size_bytes: u64,
}

async fn health(State(ctx): State<StreamerContext>) -> Json<serde_json::Value> {
    let state = ctx.session.state();
    Json(json!({
        "status": "ok",
        "module": "soapcli",
        "version": env!("CARGO_PKG_VERSION"),
        "state": state.name(),
        "tracks": ctx.session.playlist().len(),
    }))
}

async fn playlist_json(State(ctx): State<StreamerContext>) -> Json<Vec<TrackInfo>> {
    let tracks = ctx
        .session
        .playlist()
        .iter()
        .enumerate()
        .map(|(index, media)| TrackInfo {
            index,
            name: media.name(),
            content_type: media.content_type(),
            size_bytes: media.size_bytes(),
        })
        .collect();
    Json(tracks)
}

async fn playlist_m3u(State(ctx): State<StreamerContext>, headers: HeaderMap) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");

    let mut body = String::from("#EXTM3U\n");
    for (index, media) in ctx.session.playlist().iter().enumerate() {
        body.push_str(&format!("#EXTINF:-1,{}\nhttp://{}/tracks/{}\n", media.name(), host, index));
    }

    ([(header::CONTENT_TYPE, "audio/x-mpegurl")], body).into_response()
}

async fn track(State(ctx): State<StreamerContext>, Path(index): Path<usize>) -> Response {
    let Some(media) = ctx.session.playlist().get(index) else {
        return (StatusCode::NOT_FOUND, format!("No track at index {}", index)).into_response();
    };

    match tokio::fs::File::open(media.path()).await {
        Ok(file) => (
            [
                (header::CONTENT_TYPE, media.content_type().to_string()),
                (header::CONTENT_LENGTH, media.size_bytes().to_string()),
            ],
            Body::from_stream(ReaderStream::new(file)),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to open {}: {}", media.path().display(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to open track").into_response()
        }
    }
}

async fn stream(State(ctx): State<StreamerContext>) -> Response {
    if ctx
        .stream_claimed
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        warn!("Rejected second stream client");
        return (StatusCode::CONFLICT, "Playlist is already being streamed").into_response();
    }

    info!("Stream client connected, starting playback");
    let content_type = ctx.session.playlist().stream_content_type();
    let claim = StreamClaim {
        claimed: Arc::clone(&ctx.stream_claimed),
        released: false,
    };

    (
        [(header::CONTENT_TYPE, content_type)],
        Body::from_stream(playlist_stream(ctx.session, claim)),
    )
        .into_response()
}

async fn stop(State(ctx): State<StreamerContext>) -> StatusCode {
    info!("Stop requested over HTTP");
    ctx.session.request_stop();
    StatusCode::ACCEPTED
}

/// Ownership of `/stream`; dropping it before the end frees the stream for a
/// reconnecting client
struct StreamClaim {
    claimed: Arc<AtomicBool>,
    released: bool,
}

impl StreamClaim {
    fn complete(mut self) {
        self.released = true;
    }
}

impl Drop for StreamClaim {
    fn drop(&mut self) {
        if !self.released {
            warn!("Stream client disconnected before the end of the playlist");
            self.claimed.store(false, Ordering::Release);
        }
    }
}

/// Report an unreadable track as a playback failure, then end the body
fn track_failed(session: &PlaybackSession, media: &MediaReference, err: std::io::Error) -> std::io::Error {
    session.fail(Error::Playback(format!("Failed to read {}: {}", media.path().display(), err)));
    err
}

/// Tracks in order as one byte stream
fn playlist_stream(
    session: PlaybackSession,
    claim: StreamClaim,
) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    let playlist: Arc<Playlist> = Arc::clone(session.playlist());
    async_stream::try_stream! {
        for (index, media) in playlist.iter().enumerate() {
            if session.is_stopping() {
                info!(remaining = playlist.len() - index, "Stop requested, skipping remaining tracks");
                break;
            }

            session.track_started(index);
            info!(track = index, name = %media.name(), "Now playing");

            let file = tokio::fs::File::open(media.path())
                .await
                .map_err(|e| track_failed(&session, media, e))?;
            let mut chunks = ReaderStream::new(file);
            while let Some(chunk) = chunks.next().await {
                yield chunk.map_err(|e| track_failed(&session, media, e))?;
            }
        }

        claim.complete();
        session.finished();
    }
}
