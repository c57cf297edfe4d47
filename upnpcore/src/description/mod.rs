//! # Module Description
//!
//! Génération paresseuse des documents de description UPnP (description de
//! device et SCPD de service).
//!
//! Chaque nœud sait produire ses propres fragments ([`Describe::description`])
//! et énumérer ses listes d'enfants ([`Describe::list`]) sans jamais
//! matérialiser le XML de ses descendants. [`DescriptionStream`] assemble le
//! document morceau par morceau à partir de ces deux primitives.

mod stream;

pub use stream::DescriptionStream;

use xmltree::{Element, XMLNode};

use crate::devices::{DeviceRef, Icon, ServiceRef};
use crate::fields::{DeviceField, ServiceField};
use crate::services::{ActionDescriptor, StateVariableDescriptor};

/// Espace de noms des descriptions de device
pub const DEVICE_NS: &str = "urn:schemas-upnp-org:device-1-0";

/// Espace de noms des SCPD
pub const SERVICE_NS: &str = "urn:schemas-upnp-org:service-1-0";

/// Fragment demandé à un nœud
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescType {
    /// Élément racine du document (`root` ou `scpd`), laissé ouvert
    Header,
    /// Champs du nœud décrit par le document
    Content,
    /// Champs d'un nœud imbriqué dans la description d'un parent
    Embedded,
}

/// Objet pouvant être décrit dans un document.
///
/// `'a` est la durée de vie des données décrites : les énumérateurs retournés
/// par [`Describe::list`] n'empruntent pas le nœud lui-même, ce qui permet au
/// rendu de les conserver pendant qu'il parcourt les enfants.
pub trait Describe<'a> {
    /// Fragment XML du nœud, sans ses listes d'enfants
    fn description(&self, desc_type: DescType) -> Option<Element>;

    /// Liste d'enfants numéro `index`, `None` au-delà de la dernière liste
    fn list(&self, _desc_type: DescType, _index: usize) -> Option<ItemList<'a>> {
        None
    }
}

/// Objet décrivable, en boîte
pub type DescribeBox<'a> = Box<dyn Describe<'a> + 'a>;

/// Séquence paresseuse des enfants d'une liste
pub type ItemEnumerator<'a> = Box<dyn Iterator<Item = DescribeBox<'a>> + 'a>;

/// Liste nommée d'enfants (`serviceList`, `deviceList`, ...)
pub struct ItemList<'a> {
    pub name: &'static str,
    pub items: ItemEnumerator<'a>,
}

impl<'a> ItemList<'a> {
    fn new<I, T>(name: &'static str, items: I) -> Self
    where
        I: Iterator<Item = T> + 'a,
        T: Describe<'a> + 'a,
    {
        Self {
            name,
            items: Box::new(items.map(|item| Box::new(item) as DescribeBox<'a>)),
        }
    }
}

pub(crate) fn text_element(name: &str, text: &str) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(text.to_string()));
    elem
}

fn push_text(parent: &mut Element, name: &str, text: &str) {
    parent
        .children
        .push(XMLNode::Element(text_element(name, text)));
}

fn document_root(name: &str, namespace: &str) -> Element {
    let mut root = Element::new(name);
    root.attributes
        .insert("xmlns".to_string(), namespace.to_string());

    let mut spec_version = Element::new("specVersion");
    push_text(&mut spec_version, "major", "1");
    push_text(&mut spec_version, "minor", "0");
    root.children.push(XMLNode::Element(spec_version));
    root
}

impl<'a> Describe<'a> for DeviceRef<'a> {
    fn description(&self, desc_type: DescType) -> Option<Element> {
        match desc_type {
            DescType::Header => Some(document_root("root", DEVICE_NS)),
            DescType::Content | DescType::Embedded => {
                let mut device = Element::new("device");
                for field in DeviceField::DESCRIBED {
                    if let Some(value) = self.field(*field).filter(|v| !v.is_empty()) {
                        push_text(&mut device, field.name(), &value);
                    }
                }
                Some(device)
            }
        }
    }

    fn list(&self, _desc_type: DescType, index: usize) -> Option<ItemList<'a>> {
        match index {
            0 => Some(ItemList::new("serviceList", self.services())),
            1 => Some(ItemList::new("deviceList", self.devices())),
            2 => Some(ItemList::new("iconList", self.icons().iter())),
            _ => None,
        }
    }
}

impl<'a> Describe<'a> for ServiceRef<'a> {
    fn description(&self, desc_type: DescType) -> Option<Element> {
        match desc_type {
            DescType::Header => Some(document_root("scpd", SERVICE_NS)),
            // Le SCPD ne répète pas les champs du service
            DescType::Content => None,
            DescType::Embedded => {
                let mut service = Element::new("service");
                for field in ServiceField::DESCRIBED {
                    if let Some(value) = self.field(*field).filter(|v| !v.is_empty()) {
                        push_text(&mut service, field.name(), &value);
                    }
                }
                Some(service)
            }
        }
    }

    fn list(&self, desc_type: DescType, index: usize) -> Option<ItemList<'a>> {
        if desc_type != DescType::Content {
            return None;
        }
        let profile = self.profile();
        match index {
            0 => Some(ItemList::new("actionList", profile.actions().iter())),
            1 => Some(ItemList::new(
                "serviceStateTable",
                profile.state_variables().iter(),
            )),
            _ => None,
        }
    }
}

impl<'a> Describe<'a> for &'a Icon {
    fn description(&self, _desc_type: DescType) -> Option<Element> {
        let mut icon = Element::new("icon");
        push_text(&mut icon, "mimetype", &self.mimetype);
        push_text(&mut icon, "width", &self.width.to_string());
        push_text(&mut icon, "height", &self.height.to_string());
        push_text(&mut icon, "depth", &self.depth.to_string());
        push_text(&mut icon, "url", &self.url);
        Some(icon)
    }
}

impl<'a> Describe<'a> for &'a ActionDescriptor {
    fn description(&self, _desc_type: DescType) -> Option<Element> {
        let mut action = Element::new("action");
        push_text(&mut action, "name", &self.name);

        if !self.arguments.is_empty() {
            let mut list = Element::new("argumentList");
            for arg in &self.arguments {
                let mut argument = Element::new("argument");
                push_text(&mut argument, "name", &arg.name);
                push_text(&mut argument, "direction", arg.direction.as_str());
                push_text(
                    &mut argument,
                    "relatedStateVariable",
                    &arg.related_state_variable,
                );
                list.children.push(XMLNode::Element(argument));
            }
            action.children.push(XMLNode::Element(list));
        }
        Some(action)
    }
}

impl<'a> Describe<'a> for &'a StateVariableDescriptor {
    fn description(&self, _desc_type: DescType) -> Option<Element> {
        let mut variable = Element::new("stateVariable");
        variable.attributes.insert(
            "sendEvents".to_string(),
            if self.send_events { "yes" } else { "no" }.to_string(),
        );
        push_text(&mut variable, "name", &self.name);
        push_text(&mut variable, "dataType", &self.data_type);
        if let Some(default) = &self.default_value {
            push_text(&mut variable, "defaultValue", default);
        }
        if !self.allowed_values.is_empty() {
            let mut list = Element::new("allowedValueList");
            for value in &self.allowed_values {
                push_text(&mut list, "allowedValue", value);
            }
            variable.children.push(XMLNode::Element(list));
        }
        Some(variable)
    }
}
