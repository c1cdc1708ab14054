//! # soapcli library (soapi-cli)
//!
//! Serves an ordered playlist over HTTP and, once the server is accepting
//! connections, asks a SOAP-controlled player at a chosen location to fetch
//! and play the stream.
//!
//! **Architecture:** two concurrent units joined by a readiness latch
//! - [`server::PlaybackServer`] binds and serves the playlist
//! - [`controller::RemoteController`] waits for readiness, then triggers once
//! - [`orchestrator::Orchestrator`] runs both and aggregates their outcomes

pub mod cli;
pub mod controller;
pub mod error;
pub mod orchestrator;
pub mod playlist;
pub mod server;

pub use error::{Error, Result};
