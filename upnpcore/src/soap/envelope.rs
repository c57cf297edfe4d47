//! Structures de l'enveloppe SOAP

use xmltree::Element;

/// Enveloppe SOAP ; un éventuel `Header` est ignoré
#[derive(Debug, Clone)]
pub struct SoapEnvelope {
    pub body: SoapBody,
}

/// Corps SOAP (contenu XML brut)
#[derive(Debug, Clone)]
pub struct SoapBody {
    pub content: Element,
}

impl SoapBody {
    /// Premier élément enfant du corps (action, réponse ou fault)
    pub fn first_element(&self) -> Option<&Element> {
        self.content.children.iter().find_map(|n| n.as_element())
    }
}
