//! Test helpers for soapcli integration tests
//!
//! - `FakeResource`: scripted serving resource (bind delay, start failure,
//!   play duration) for orchestrator tests without sockets
//! - `RecordingActuator`: in-process actuator that records every call
//! - `FakeSoapEndpoint`: local axum server standing in for the SOAP device

#![allow(dead_code)]

pub mod fake_soap;

pub use fake_soap::{FakeSoapEndpoint, RecordedRequest, Reply};

use async_trait::async_trait;
use soapi_cli::controller::{Actuator, TriggerRequest};
use soapi_cli::playlist::{Playlist, PlaylistBuilder};
use soapi_cli::server::{PlaybackSession, ServingResource};
use soapi_cli::{Error, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Write `(name, contents)` files into `dir` and return their paths in order
pub fn write_songs(dir: &TempDir, songs: &[(&str, &[u8])]) -> Vec<PathBuf> {
    songs
        .iter()
        .map(|(name, contents)| {
            let path = dir.path().join(name);
            std::fs::write(&path, contents).unwrap();
            path
        })
        .collect()
}

/// The `a.mp3`, `b.mp3` playlist used by most scenarios
pub fn two_song_playlist(dir: &TempDir) -> Playlist {
    let paths = write_songs(dir, &[("a.mp3", b"song-a"), ("b.mp3", b"song-b")]);
    PlaylistBuilder::build(paths.iter().map(|p| p.to_string_lossy())).unwrap()
}

/// Serving resource with scripted timing
///
/// With a play duration the session is `Playing` from the start of `serve`;
/// without one it stays `Listening` as if no device ever connected.
pub struct FakeResource {
    bind_delay: Duration,
    bind_error: Option<String>,
    /// `None` plays until stopped
    play_for: Option<Duration>,
    stopped_early: Arc<AtomicBool>,
}

impl FakeResource {
    /// Ready after `bind_delay`, plays for `play_for`
    pub fn new(bind_delay: Duration, play_for: Option<Duration>) -> Self {
        Self {
            bind_delay,
            bind_error: None,
            play_for,
            stopped_early: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing(cause: &str) -> Self {
        Self {
            bind_error: Some(cause.to_string()),
            ..Self::new(Duration::ZERO, Some(Duration::ZERO))
        }
    }

    /// Set when a stop request ended playback before it finished
    pub fn stopped_early(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stopped_early)
    }
}

#[async_trait]
impl ServingResource for FakeResource {
    async fn bind(&mut self) -> Result<SocketAddr> {
        tokio::time::sleep(self.bind_delay).await;
        match &self.bind_error {
            Some(cause) => Err(Error::ServerStart(cause.clone())),
            None => Ok("127.0.0.1:5780".parse().unwrap()),
        }
    }

    async fn serve(self: Box<Self>, session: PlaybackSession) -> Result<()> {
        let stop = session.stop_token();
        let Some(play_for) = self.play_for else {
            stop.cancelled().await;
            self.stopped_early.store(true, Ordering::SeqCst);
            return Ok(());
        };

        session.track_started(0);
        tokio::select! {
            _ = tokio::time::sleep(play_for) => {
                for index in 1..session.playlist().len() {
                    session.track_started(index);
                }
                session.finished();
            }
            _ = stop.cancelled() => {
                self.stopped_early.store(true, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}

/// Actuator that records each call with its arrival time
#[derive(Clone, Default)]
pub struct RecordingActuator {
    calls: Arc<Mutex<Vec<(Instant, TriggerRequest)>>>,
    fail_with: Option<String>,
    delay: Duration,
}

impl RecordingActuator {
    pub fn failing(cause: &str) -> Self {
        Self {
            fail_with: Some(cause.to_string()),
            ..Default::default()
        }
    }

    /// Fails only after `delay`, once the server had time to begin serving
    pub fn failing_after(cause: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::failing(cause)
        }
    }

    pub fn calls(&self) -> Vec<(Instant, TriggerRequest)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Actuator for RecordingActuator {
    async fn actuate(&self, request: &TriggerRequest) -> Result<()> {
        self.calls.lock().unwrap().push((Instant::now(), request.clone()));
        tokio::time::sleep(self.delay).await;
        match &self.fail_with {
            Some(cause) => Err(Error::ActuationFailed(cause.clone())),
            None => Ok(()),
        }
    }
}
