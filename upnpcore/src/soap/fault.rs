//! SOAP Faults pour UPnP

use super::builder::{build_envelope, text_element};
use super::error_codes;
use super::parser::{SoapParseError, parse_soap_envelope};
use xmltree::{Element, XMLNode};

/// Erreur SOAP (Fault)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    /// Code du fault (ex: "s:Client")
    pub fault_code: String,

    /// Description de l'erreur
    pub fault_string: String,

    /// Détails UPnP optionnels
    pub upnp_error: Option<UpnpError>,
}

/// Erreur UPnP spécifique (`detail/UPnPError`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpnpError {
    pub error_code: String,
    pub error_description: String,
}

impl SoapFault {
    pub fn new(fault_code: &str, fault_string: &str) -> Self {
        Self {
            fault_code: fault_code.to_string(),
            fault_string: fault_string.to_string(),
            upnp_error: None,
        }
    }

    /// Fault `s:Client` / `UPnPError` portant un code d'erreur UPnP
    pub fn upnp(error_code: &str, error_description: &str) -> Self {
        Self {
            fault_code: "s:Client".to_string(),
            fault_string: "UPnPError".to_string(),
            upnp_error: Some(UpnpError {
                error_code: error_code.to_string(),
                error_description: error_description.to_string(),
            }),
        }
    }

    pub fn invalid_action(action: &str) -> Self {
        Self::upnp(
            error_codes::INVALID_ACTION,
            &format!("Invalid Action '{}'", action),
        )
    }

    pub fn invalid_args(description: &str) -> Self {
        Self::upnp(error_codes::INVALID_ARGS, description)
    }

    pub fn action_failed(description: &str) -> Self {
        Self::upnp(error_codes::ACTION_FAILED, description)
    }

    /// Code d'erreur UPnP, s'il y en a un
    pub fn error_code(&self) -> Option<&str> {
        self.upnp_error.as_ref().map(|e| e.error_code.as_str())
    }

    /// Sérialise le fault en enveloppe SOAP
    pub fn to_xml(&self) -> Result<String, xmltree::Error> {
        build_soap_fault(
            &self.fault_code,
            &self.fault_string,
            self.upnp_error.as_ref().map(|e| e.error_code.as_str()),
            self.upnp_error.as_ref().map(|e| e.error_description.as_str()),
        )
    }
}

impl std::fmt::Display for SoapFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.upnp_error {
            Some(e) => write!(f, "UPnP error {}: {}", e.error_code, e.error_description),
            None => write!(f, "{}: {}", self.fault_code, self.fault_string),
        }
    }
}

/// Construit un SOAP Fault XML
pub fn build_soap_fault(
    fault_code: &str,
    fault_string: &str,
    upnp_error_code: Option<&str>,
    upnp_error_desc: Option<&str>,
) -> Result<String, xmltree::Error> {
    let mut fault = Element::new("s:Fault");
    fault
        .children
        .push(XMLNode::Element(text_element("faultcode", fault_code)));
    fault
        .children
        .push(XMLNode::Element(text_element("faultstring", fault_string)));

    if let (Some(code), Some(desc)) = (upnp_error_code, upnp_error_desc) {
        let mut upnp_error = Element::new("UPnPError");
        upnp_error.attributes.insert(
            "xmlns".to_string(),
            "urn:schemas-upnp-org:control-1-0".to_string(),
        );
        upnp_error
            .children
            .push(XMLNode::Element(text_element("errorCode", code)));
        upnp_error
            .children
            .push(XMLNode::Element(text_element("errorDescription", desc)));

        let mut detail = Element::new("detail");
        detail.children.push(XMLNode::Element(upnp_error));
        fault.children.push(XMLNode::Element(detail));
    }

    build_envelope(fault, false)
}

/// Extrait un fault d'une réponse SOAP, `Ok(None)` si le corps n'en contient pas
pub fn parse_soap_fault(xml: &[u8]) -> Result<Option<SoapFault>, SoapParseError> {
    let envelope = parse_soap_envelope(xml)?;
    let Some(fault) = envelope.body.first_element().filter(|e| e.name == "Fault") else {
        return Ok(None);
    };

    let text = |elem: &Element, name: &str| {
        elem.get_child(name)
            .and_then(|c| c.get_text())
            .map(|t| t.trim().to_string())
            .unwrap_or_default()
    };

    let upnp_error = fault
        .get_child("detail")
        .and_then(|d| d.get_child("UPnPError"))
        .map(|e| UpnpError {
            error_code: text(e, "errorCode"),
            error_description: text(e, "errorDescription"),
        });

    Ok(Some(SoapFault {
        fault_code: text(fault, "faultcode"),
        fault_string: text(fault, "faultstring"),
        upnp_error,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_simple_fault() {
        let xml = build_soap_fault("s:Client", "Invalid Action", None, None).unwrap();

        assert!(xml.contains("<s:Fault>"));
        assert!(xml.contains("<faultcode>s:Client</faultcode>"));
        assert!(!xml.contains("UPnPError"));
    }

    #[test]
    fn test_fault_survives_parsing() {
        let fault = SoapFault::invalid_action("Explode");
        let xml = fault.to_xml().unwrap();

        let parsed = parse_soap_fault(xml.as_bytes()).unwrap().unwrap();
        assert_eq!(parsed.error_code(), Some("401"));
        assert_eq!(parsed.fault_code, "s:Client");
    }

    #[test]
    fn test_no_fault_in_regular_response() {
        let xml = crate::soap::build_soap_response("urn:x:service:Y:1", "Z", Vec::new()).unwrap();
        assert_eq!(parse_soap_fault(xml.as_bytes()).unwrap(), None);
    }
}
