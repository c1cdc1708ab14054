//! SOAP 1.1 envelopes for the trigger call
//!
//! Request body:
//!
//! ```xml
//! <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"
//!             s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
//!   <s:Body>
//!     <u:Play xmlns:u="{service urn}">
//!       <Location>SOUTH_VADER</Location>
//!       <StreamUrl>http://host:port/stream</StreamUrl>
//!     </u:Play>
//!   </s:Body>
//! </s:Envelope>
//! ```

use std::io::BufReader;
use xmltree::{Element, EmitterConfig, XMLNode};

const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const SOAP_ENCODING: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// Action name of the trigger call
pub const PLAY_ACTION: &str = "Play";

/// Fault returned by the endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    pub fault_code: String,
    pub fault_string: String,
}

fn text_element(name: &str, value: &str) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(value.to_string()));
    elem
}

/// Build a request envelope for `action` with ordered arguments
pub fn build_soap_request(
    service_urn: &str,
    action: &str,
    args: &[(&str, &str)],
) -> Result<String, xmltree::Error> {
    let mut action_elem = Element::new(&format!("u:{}", action));
    action_elem
        .attributes
        .insert("xmlns:u".to_string(), service_urn.to_string());
    for (name, value) in args {
        action_elem
            .children
            .push(XMLNode::Element(text_element(name, value)));
    }

    let mut body = Element::new("s:Body");
    body.children.push(XMLNode::Element(action_elem));

    let mut envelope = Element::new("s:Envelope");
    envelope
        .attributes
        .insert("xmlns:s".to_string(), SOAP_ENVELOPE_NS.to_string());
    envelope
        .attributes
        .insert("s:encodingStyle".to_string(), SOAP_ENCODING.to_string());
    envelope.children.push(XMLNode::Element(body));

    let mut buf = Vec::new();
    let config = EmitterConfig::new()
        .write_document_declaration(true)
        .perform_indent(true)
        .indent_string("  ");
    envelope.write_with_config(&mut buf, config)?;

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Extract a SOAP Fault from a response body, if it carries one
///
/// Bodies that are not SOAP at all return `None`; the caller decides from the
/// HTTP status whether that is a failure.
pub fn parse_soap_fault(xml: &[u8]) -> Option<SoapFault> {
    let root = Element::parse(BufReader::new(xml)).ok()?;
    if root.name != "Envelope" {
        return None;
    }
    let fault = root.get_child("Body")?.get_child("Fault")?;

    let child_text = |name: &str| {
        fault
            .get_child(name)
            .and_then(|e| e.get_text())
            .map(|t| t.trim().to_string())
            .unwrap_or_default()
    };

    Some(SoapFault {
        fault_code: child_text("faultcode"),
        fault_string: child_text("faultstring"),
    })
}
