//! Parsing des descriptions distantes : document de device et SCPD.

use tracing::{debug, warn};
use url::Url;
use xmltree::Element;

use crate::errors::ControlPointError;

/// Document de description d'un device racine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDescription {
    /// `URLBase` des documents UPnP 1.0, prioritaire sur l'URL du document
    pub url_base: Option<String>,
    pub device: DeviceDescription,
}

impl RootDescription {
    /// Base de résolution des URLs relatives du document
    pub fn base<'a>(&'a self, location: &'a str) -> &'a str {
        self.url_base.as_deref().unwrap_or(location)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDescription {
    pub device_type: String,
    pub friendly_name: String,
    pub manufacturer: String,
    pub model_name: String,
    pub udn: String,
    pub services: Vec<ServiceDescription>,
    pub devices: Vec<DeviceDescription>,
}

impl DeviceDescription {
    /// Le device puis ses sous-devices, en profondeur
    pub fn walk(&self) -> Vec<&DeviceDescription> {
        let mut out = vec![self];
        for child in &self.devices {
            out.extend(child.walk());
        }
        out
    }

    /// Types de devices et de services déclarés par le sous-arbre, dans
    /// l'ordre du document
    pub fn declared_types(&self) -> Vec<&str> {
        let mut types = Vec::new();
        for device in self.walk() {
            types.push(device.device_type.as_str());
            types.extend(device.services.iter().map(|s| s.service_type.as_str()));
        }
        types
    }

    pub fn service(&self, service_type: &str) -> Option<&ServiceDescription> {
        self.services.iter().find(|s| s.service_type == service_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDescription {
    pub service_type: String,
    pub service_id: String,
    pub scpd_url: String,
    pub control_url: String,
    pub event_sub_url: String,
}

impl ServiceDescription {
    /// Copie dont les URLs sont absolues par rapport à `base`
    pub fn resolved(&self, base: &str) -> Result<Self, ControlPointError> {
        let resolve = |u: &str| {
            if u.is_empty() {
                Ok(String::new())
            } else {
                resolve_url(base, u)
            }
        };
        Ok(Self {
            service_type: self.service_type.clone(),
            service_id: self.service_id.clone(),
            scpd_url: resolve(&self.scpd_url)?,
            control_url: resolve(&self.control_url)?,
            event_sub_url: resolve(&self.event_sub_url)?,
        })
    }
}

/// Description SCPD d'un service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScpdDescription {
    pub actions: Vec<ActionDescription>,
    pub state_variables: Vec<StateVariableDescription>,
}

impl ScpdDescription {
    pub fn action(&self, name: &str) -> Option<&ActionDescription> {
        self.actions.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDescription {
    pub name: String,
    pub direction: Direction,
    pub related_state_variable: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescription {
    pub name: String,
    pub arguments: Vec<ArgumentDescription>,
}

impl ActionDescription {
    pub fn inputs(&self) -> impl Iterator<Item = &ArgumentDescription> {
        self.arguments.iter().filter(|a| a.direction == Direction::In)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &ArgumentDescription> {
        self.arguments
            .iter()
            .filter(|a| a.direction == Direction::Out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateVariableDescription {
    pub name: String,
    pub data_type: String,
    pub send_events: bool,
    pub allowed_values: Vec<String>,
}

/// Résout `reference` par rapport à l'URL absolue `base`.
///
/// Une référence déjà absolue est retournée telle quelle.
pub fn resolve_url(base: &str, reference: &str) -> Result<String, ControlPointError> {
    let base_url = Url::parse(base).map_err(|e| ControlPointError::invalid_url(base, e))?;
    base_url
        .join(reference.trim())
        .map(String::from)
        .map_err(|e| ControlPointError::invalid_url(reference, e))
}

fn child_text(elem: &Element, name: &str) -> Option<String> {
    elem.get_child(name)
        .and_then(|c| c.get_text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn children<'a>(elem: &'a Element, list: &str, item: &'a str) -> impl Iterator<Item = &'a Element> {
    elem.get_child(list)
        .into_iter()
        .flat_map(move |l| l.children.iter().filter_map(|n| n.as_element()))
        .filter(move |e| e.name == item)
}

/// Parse un document de description de device.
///
/// Seul le `deviceType` du device racine est exigé : un sous-device sans
/// `deviceType` ou un service sans `serviceType` est ignoré, le reste du
/// document est conservé.
pub fn parse_device_description(xml: &[u8]) -> Result<RootDescription, ControlPointError> {
    let root = Element::parse(xml)?;
    let device = root
        .get_child("device")
        .ok_or(ControlPointError::MissingElement("device"))?;
    let device = parse_device(device).ok_or(ControlPointError::MissingElement("deviceType"))?;

    Ok(RootDescription {
        url_base: child_text(&root, "URLBase"),
        device,
    })
}

fn parse_device(elem: &Element) -> Option<DeviceDescription> {
    let Some(device_type) = child_text(elem, "deviceType") else {
        warn!("❌ Device without deviceType ignored");
        return None;
    };

    let services = children(elem, "serviceList", "service")
        .filter_map(|s| {
            let parsed = parse_service(s);
            if parsed.is_none() {
                debug!("Service without serviceType ignored in {}", device_type);
            }
            parsed
        })
        .collect();

    let devices = children(elem, "deviceList", "device")
        .filter_map(parse_device)
        .collect();

    Some(DeviceDescription {
        friendly_name: child_text(elem, "friendlyName").unwrap_or_default(),
        manufacturer: child_text(elem, "manufacturer").unwrap_or_default(),
        model_name: child_text(elem, "modelName").unwrap_or_default(),
        udn: child_text(elem, "UDN").unwrap_or_default(),
        device_type,
        services,
        devices,
    })
}

fn parse_service(elem: &Element) -> Option<ServiceDescription> {
    Some(ServiceDescription {
        service_type: child_text(elem, "serviceType")?,
        service_id: child_text(elem, "serviceId").unwrap_or_default(),
        scpd_url: child_text(elem, "SCPDURL").unwrap_or_default(),
        control_url: child_text(elem, "controlURL").unwrap_or_default(),
        event_sub_url: child_text(elem, "eventSubURL").unwrap_or_default(),
    })
}

/// Parse un document SCPD.
///
/// Les actions et variables sans nom sont ignorées.
pub fn parse_scpd(xml: &[u8]) -> Result<ScpdDescription, ControlPointError> {
    let root = Element::parse(xml)?;
    if root.name != "scpd" {
        return Err(ControlPointError::MissingElement("scpd"));
    }

    let actions = children(&root, "actionList", "action")
        .filter_map(|a| {
            Some(ActionDescription {
                name: child_text(a, "name")?,
                arguments: children(a, "argumentList", "argument")
                    .filter_map(|arg| {
                        let direction = match child_text(arg, "direction")?.as_str() {
                            "out" => Direction::Out,
                            _ => Direction::In,
                        };
                        Some(ArgumentDescription {
                            name: child_text(arg, "name")?,
                            direction,
                            related_state_variable: child_text(arg, "relatedStateVariable")
                                .unwrap_or_default(),
                        })
                    })
                    .collect(),
            })
        })
        .collect();

    let state_variables = children(&root, "serviceStateTable", "stateVariable")
        .filter_map(|v| {
            Some(StateVariableDescription {
                name: child_text(v, "name")?,
                data_type: child_text(v, "dataType").unwrap_or_default(),
                send_events: v
                    .attributes
                    .get("sendEvents")
                    .is_some_and(|s| s.eq_ignore_ascii_case("yes")),
                allowed_values: children(v, "allowedValueList", "allowedValue")
                    .filter_map(|a| a.get_text().map(|t| t.trim().to_string()))
                    .collect(),
            })
        })
        .collect();

    Ok(ScpdDescription {
        actions,
        state_variables,
    })
}
