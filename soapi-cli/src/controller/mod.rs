//! Remote controller
//!
//! Waits for the playback server to become ready, then sends exactly one
//! trigger to the actuation endpoint telling the device at the selected
//! location to start playing the stream.

pub mod client;
pub mod soap;

use crate::error::{Error, Result};
use crate::server::ReadinessWaiter;
use async_trait::async_trait;
use soapi_common::config::{SoapSettings, DEFAULT_SERVICE_URN};
use soapi_common::Location;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use client::SoapActuator;

/// Where the trigger call is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEndpoint {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub service_urn: String,
}

impl TriggerEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            path: "/".to_string(),
            service_urn: DEFAULT_SERVICE_URN.to_string(),
        }
    }

    pub fn from_settings(settings: &SoapSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            path: settings.path.clone(),
            service_urn: settings.service_urn.clone(),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}{}", url_host(&self.host), self.port, self.path)
    }
}

/// Bracket bare IPv6 literals for use in a URL authority
fn url_host(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}

/// Payload of one trigger call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRequest {
    pub location: Location,
    pub stream_url: String,
}

/// Something that can perform the trigger call
#[async_trait]
pub trait Actuator: Send + Sync {
    async fn actuate(&self, request: &TriggerRequest) -> Result<()>;
}

/// Sends the trigger once the playback server is ready
pub struct RemoteController {
    readiness: ReadinessWaiter,
    actuator: Box<dyn Actuator>,
    location: Location,
    advertise_host: String,
}

impl RemoteController {
    /// `advertise_host` is the host the device uses to reach the server
    pub fn new(
        readiness: ReadinessWaiter,
        actuator: impl Actuator + 'static,
        location: Location,
        advertise_host: impl Into<String>,
    ) -> Self {
        Self {
            readiness,
            actuator: Box::new(actuator),
            location,
            advertise_host: advertise_host.into(),
        }
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// URL of the continuous stream on the bound server
    pub fn stream_url(&self, bound: SocketAddr) -> String {
        format!("http://{}:{}/stream", url_host(&self.advertise_host), bound.port())
    }

    /// Wait for readiness, then trigger once
    ///
    /// A start failure is returned unchanged and the endpoint is never
    /// contacted. Cancellation only takes effect while still waiting; a call
    /// already in flight runs to completion.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        info!(location = %self.location, "Waiting for playback server to start");

        let bound = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Cancelled before the playback server was ready");
                return Err(Error::Cancelled);
            }
            ready = self.readiness.wait() => match ready {
                Ok(addr) => addr,
                Err(err) => {
                    warn!("Not triggering: {}", err);
                    return Err(err);
                }
            },
        };

        let request = TriggerRequest {
            location: self.location,
            stream_url: self.stream_url(bound),
        };
        info!(location = %request.location, stream_url = %request.stream_url, "Triggering playback");

        self.actuator.actuate(&request).await.map_err(|err| match err {
            Error::ActuationFailed(_) => err,
            other => Error::ActuationFailed(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ReadinessSignal;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    /// Records every call with its arrival time
    #[derive(Clone, Default)]
    struct RecordingActuator {
        calls: Arc<Mutex<Vec<(Instant, TriggerRequest)>>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl Actuator for RecordingActuator {
        async fn actuate(&self, request: &TriggerRequest) -> Result<()> {
            self.calls.lock().unwrap().push((Instant::now(), request.clone()));
            match &self.fail_with {
                Some(cause) => Err(Error::ActuationFailed(cause.clone())),
                None => Ok(()),
            }
        }
    }

    fn bound() -> SocketAddr {
        "0.0.0.0:6123".parse().unwrap()
    }

    #[tokio::test]
    async fn test_trigger_waits_for_readiness() {
        let signal = ReadinessSignal::new();
        let actuator = RecordingActuator::default();
        let controller = RemoteController::new(signal.waiter(), actuator.clone(), Location::SouthVader, "10.0.0.5");

        let run = tokio::spawn(async move { controller.run(CancellationToken::new()).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(actuator.calls.lock().unwrap().is_empty(), "triggered before readiness");

        let fired_at = Instant::now();
        signal.fire(bound());
        run.await.unwrap().unwrap();

        let calls = actuator.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0 >= fired_at);
        assert_eq!(
            calls[0].1,
            TriggerRequest {
                location: Location::SouthVader,
                stream_url: "http://10.0.0.5:6123/stream".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_start_failure_skips_trigger() {
        let signal = ReadinessSignal::new();
        let actuator = RecordingActuator::default();
        let controller = RemoteController::new(signal.waiter(), actuator.clone(), Location::TheL, "localhost");

        signal.fail("address in use");
        let err = controller.run(CancellationToken::new()).await.unwrap_err();

        assert_eq!(err, Error::ServerStart("address in use".to_string()));
        assert!(actuator.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_skips_trigger() {
        let signal = ReadinessSignal::new();
        let actuator = RecordingActuator::default();
        let controller = RemoteController::new(signal.waiter(), actuator.clone(), Location::TheL, "localhost");
        let cancel = CancellationToken::new();

        let run = {
            let cancel = cancel.clone();
            tokio::spawn(async move { controller.run(cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        assert_eq!(run.await.unwrap(), Err(Error::Cancelled));
        signal.fire(bound());
        assert!(actuator.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_endpoint_failure_is_actuation_failed() {
        let signal = ReadinessSignal::new();
        signal.fire(bound());
        let actuator = RecordingActuator {
            fail_with: Some("connection refused".to_string()),
            ..Default::default()
        };
        let controller = RemoteController::new(signal.waiter(), actuator.clone(), Location::NorthStairs, "localhost");

        let err = controller.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, Error::ActuationFailed("connection refused".to_string()));
        assert_eq!(actuator.calls.lock().unwrap().len(), 1, "no retry");
    }

    #[test]
    fn test_urls_bracket_ipv6_hosts() {
        let endpoint = TriggerEndpoint::new("::1", 8080);
        assert_eq!(endpoint.url(), "http://[::1]:8080/");

        let signal = ReadinessSignal::new();
        let controller =
            RemoteController::new(signal.waiter(), RecordingActuator::default(), Location::SouthVader, "fe80::2");
        assert_eq!(controller.stream_url(bound()), "http://[fe80::2]:6123/stream");
    }

    #[test]
    fn test_endpoint_from_settings() {
        let settings = SoapSettings {
            host: "soap.local".to_string(),
            port: 9000,
            path: "/control".to_string(),
            service_urn: "urn:test:1".to_string(),
            timeout: None,
        };
        let endpoint = TriggerEndpoint::from_settings(&settings);
        assert_eq!(endpoint.url(), "http://soap.local:9000/control");
        assert_eq!(endpoint.service_urn, "urn:test:1");
    }
}
