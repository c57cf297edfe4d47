//! Construction des enveloppes SOAP

use super::{SOAP_ENCODING_STYLE, SOAP_ENVELOPE_NS};
use xmltree::{Element, XMLNode};

pub(crate) fn text_element(name: &str, text: &str) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(text.to_string()));
    elem
}

pub(crate) fn build_envelope(
    body_child: Element,
    encoding: bool,
) -> Result<String, xmltree::Error> {
    let mut body = Element::new("s:Body");
    body.children.push(XMLNode::Element(body_child));

    let mut envelope = Element::new("s:Envelope");
    envelope
        .attributes
        .insert("xmlns:s".to_string(), SOAP_ENVELOPE_NS.to_string());
    if encoding {
        envelope
            .attributes
            .insert("s:encodingStyle".to_string(), SOAP_ENCODING_STYLE.to_string());
    }
    envelope.children.push(XMLNode::Element(body));

    let mut buf = Vec::new();
    let config = xmltree::EmitterConfig::new()
        .write_document_declaration(true)
        .perform_indent(true)
        .indent_string("  ");
    envelope.write_with_config(&mut buf, config)?;

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn action_element(name: String, service_urn: &str, args: &[(&str, &str)]) -> Element {
    let mut elem = Element::new(&name);
    elem.attributes
        .insert("xmlns:u".to_string(), service_urn.to_string());
    for (key, value) in args {
        elem.children
            .push(XMLNode::Element(text_element(key, value)));
    }
    elem
}

/// Construit une réponse SOAP UPnP `u:{action}Response`
pub fn build_soap_response(
    service_urn: &str,
    action: &str,
    values: Vec<(String, String)>,
) -> Result<String, xmltree::Error> {
    let args: Vec<(&str, &str)> = values
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let elem = action_element(format!("u:{}Response", action), service_urn, &args);
    build_envelope(elem, true)
}

/// Construit une requête SOAP UPnP `u:{action}`
pub fn build_soap_request(
    service_urn: &str,
    action: &str,
    args: &[(&str, &str)],
) -> Result<String, xmltree::Error> {
    let elem = action_element(format!("u:{}", action), service_urn, args);
    build_envelope(elem, true)
}
