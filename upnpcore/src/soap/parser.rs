//! Parser SOAP pour actions UPnP

use super::{SoapBody, SoapEnvelope};
use std::io::BufReader;
use xmltree::Element;

/// Action UPnP extraite d'une enveloppe SOAP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapAction {
    /// Nom de l'action (ex: "SetTarget")
    pub name: String,

    /// Namespace de l'action (type du service)
    pub namespace: Option<String>,

    /// Arguments, dans l'ordre du document
    pub args: Vec<(String, String)>,
}

impl SoapAction {
    /// Valeur d'un argument par nom
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Erreur de parsing SOAP
#[derive(Debug, thiserror::Error)]
pub enum SoapParseError {
    #[error("XML parse error: {0}")]
    XmlError(#[from] xmltree::ParseError),

    #[error("Missing SOAP Envelope")]
    MissingEnvelope,

    #[error("Missing SOAP Body")]
    MissingBody,

    #[error("No action found in SOAP Body")]
    NoAction,
}

/// Parse une action SOAP à partir de bytes XML
pub fn parse_soap_action(xml: &[u8]) -> Result<SoapAction, SoapParseError> {
    let envelope = parse_soap_envelope(xml)?;
    extract_action_from_body(&envelope.body)
}

/// Parse une enveloppe SOAP complète
pub fn parse_soap_envelope(xml: &[u8]) -> Result<SoapEnvelope, SoapParseError> {
    let root = Element::parse(BufReader::new(xml))?;

    if root.name != "Envelope" && !root.name.ends_with(":Envelope") {
        return Err(SoapParseError::MissingEnvelope);
    }

    let child = |suffix: &str| {
        root.children
            .iter()
            .filter_map(|n| n.as_element())
            .find(|e| e.name == suffix || e.name.ends_with(&format!(":{}", suffix)))
    };

    let body = child("Body")
        .map(|e| SoapBody { content: e.clone() })
        .ok_or(SoapParseError::MissingBody)?;

    Ok(SoapEnvelope { body })
}

/// Extrait l'action UPnP du corps SOAP
///
/// Format: `<u:ActionName xmlns:u="service-urn">...</u:ActionName>`
fn extract_action_from_body(body: &SoapBody) -> Result<SoapAction, SoapParseError> {
    let action_elem = body.first_element().ok_or(SoapParseError::NoAction)?;

    let args = action_elem
        .children
        .iter()
        .filter_map(|n| n.as_element())
        .map(|e| (e.name.clone(), e.get_text().unwrap_or_default().to_string()))
        .collect();

    Ok(SoapAction {
        name: action_elem.name.clone(),
        namespace: action_elem.namespace.clone(),
        args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action_with_ordered_args() {
        let xml = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <u:SetTarget xmlns:u="urn:schemas-upnp-org:service:SwitchPower:1">
      <newTargetValue>1</newTargetValue>
      <Comment>salon</Comment>
    </u:SetTarget>
  </s:Body>
</s:Envelope>"#;

        let action = parse_soap_action(xml.as_bytes()).unwrap();
        assert_eq!(action.name, "SetTarget");
        assert_eq!(
            action.namespace.as_deref(),
            Some("urn:schemas-upnp-org:service:SwitchPower:1")
        );
        assert_eq!(action.arg("newTargetValue"), Some("1"));
        assert_eq!(action.args[1].0, "Comment");
    }

    #[test]
    fn test_parse_action_no_args() {
        let xml = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <u:GetStatus xmlns:u="urn:schemas-upnp-org:service:SwitchPower:1"/>
  </s:Body>
</s:Envelope>"#;

        let action = parse_soap_action(xml.as_bytes()).unwrap();
        assert_eq!(action.name, "GetStatus");
        assert!(action.args.is_empty());
    }

    #[test]
    fn test_header_does_not_hide_body() {
        let xml = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Header>
    <t:Session xmlns:t="urn:vendor-com:session">42</t:Session>
  </s:Header>
  <s:Body>
    <u:GetStatus xmlns:u="urn:schemas-upnp-org:service:SwitchPower:1"/>
  </s:Body>
</s:Envelope>"#;

        let action = parse_soap_action(xml.as_bytes()).unwrap();
        assert_eq!(action.name, "GetStatus");
        assert!(action.args.is_empty());
    }

    #[test]
    fn test_not_an_envelope() {
        let err = parse_soap_action(b"<root/>").unwrap_err();
        assert!(matches!(err, SoapParseError::MissingEnvelope));
    }
}
