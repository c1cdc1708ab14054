//! SOAP-over-HTTP actuator
//!
//! One POST per trigger; no retries. Any transport error, non-2xx status or
//! SOAP Fault in the response is a failure.

use super::soap::{build_soap_request, parse_soap_fault, PLAY_ACTION};
use super::{Actuator, TriggerEndpoint, TriggerRequest};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, info};

/// Actuator that calls the remote SOAP service
pub struct SoapActuator {
    http_client: reqwest::Client,
    endpoint: TriggerEndpoint,
}

impl SoapActuator {
    /// `timeout` bounds the whole request; `None` waits indefinitely
    pub fn new(endpoint: TriggerEndpoint, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(concat!("soapcli/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &TriggerEndpoint {
        &self.endpoint
    }
}

#[async_trait]
impl Actuator for SoapActuator {
    async fn actuate(&self, request: &TriggerRequest) -> Result<()> {
        let body = build_soap_request(
            &self.endpoint.service_urn,
            PLAY_ACTION,
            &[
                ("Location", request.location.wire_id()),
                ("StreamUrl", &request.stream_url),
            ],
        )
        .map_err(|e| Error::ActuationFailed(format!("Failed to encode SOAP request: {}", e)))?;

        let url = self.endpoint.url();
        let soap_action = format!("\"{}#{}\"", self.endpoint.service_urn, PLAY_ACTION);
        debug!(%url, soap_action = %soap_action, "Sending SOAP trigger");

        let response = self
            .http_client
            .post(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static("text/xml; charset=\"utf-8\""))
            .header("SOAPAction", soap_action)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::ActuationFailed(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        let raw_body = response
            .bytes()
            .await
            .map_err(|e| Error::ActuationFailed(format!("Failed to read response from {}: {}", url, e)))?;

        if let Some(fault) = parse_soap_fault(&raw_body) {
            return Err(Error::ActuationFailed(format!(
                "SOAP fault {}: {}",
                fault.fault_code, fault.fault_string
            )));
        }
        if !status.is_success() {
            return Err(Error::ActuationFailed(format!("{} returned HTTP {}", url, status)));
        }

        info!(location = %request.location, "Trigger accepted by {}", url);
        Ok(())
    }
}
