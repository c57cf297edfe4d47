//! Arène de l'arbre des devices et poignées de navigation.

use tracing::debug;

use super::{DeviceError, DeviceProfile, Icon};
use crate::fields::{DeviceField, REQUIRED_FIELD, ServiceField};
use crate::services::ServiceProfile;
use crate::urn::{SCHEMAS_UPNP_ORG, UPNP_ORG, UrnKind};

const DEFAULT_DEVICE_TYPE: &str = "Basic";
const DEFAULT_VERSION: &str = "1";

/// Identifiant d'un device dans son arbre
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(usize);

/// Identifiant d'un service dans son arbre
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceId(usize);

/// Identifiant d'un nœud quelconque
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Device(DeviceId),
    Service(ServiceId),
}

struct DeviceNode {
    parent: Option<DeviceId>,
    profile: Box<dyn DeviceProfile>,
    services: Vec<ServiceId>,
    devices: Vec<DeviceId>,
}

struct ServiceNode {
    device: DeviceId,
    profile: Box<dyn ServiceProfile>,
}

/// Racine d'un arbre de devices.
///
/// Possède tous les nœuds de l'arbre, l'identité serveur (`serverId`), le
/// préfixe des URLs relatives et l'URL HTTP absolue de l'hôte. Le device
/// racine a toujours l'identifiant [`RootDevice::ROOT`].
///
/// La composition est statique : les nœuds sont ajoutés au démarrage puis
/// l'arbre est partagé en lecture seule.
pub struct RootDevice {
    base_url: String,
    server_id: String,
    host_url: String,
    manufacturer: String,
    devices: Vec<DeviceNode>,
    services: Vec<ServiceNode>,
}

impl RootDevice {
    pub const ROOT: DeviceId = DeviceId(0);

    pub fn new(profile: impl DeviceProfile + 'static) -> Self {
        Self {
            base_url: "/".to_string(),
            server_id: String::new(),
            host_url: String::new(),
            manufacturer: String::new(),
            devices: vec![DeviceNode {
                parent: None,
                profile: Box::new(profile),
                services: Vec::new(),
                devices: Vec::new(),
            }],
            services: Vec::new(),
        }
    }

    /// Préfixe des URLs de l'arbre (toujours terminé par `/`)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let mut base = base_url.trim().to_string();
        if !base.starts_with('/') {
            base.insert(0, '/');
        }
        if !base.ends_with('/') {
            base.push('/');
        }
        self.base_url = base;
        self
    }

    /// Identité `SERVER` annoncée par tous les nœuds
    pub fn with_server_id(mut self, server_id: &str) -> Self {
        self.server_id = server_id.to_string();
        self
    }

    /// URL HTTP absolue de l'hôte (ex: `http://192.168.1.10:8080`)
    pub fn with_host_url(mut self, host_url: &str) -> Self {
        self.host_url = host_url.trim_end_matches('/').to_string();
        self
    }

    pub fn set_host_url(&mut self, host_url: &str) {
        self.host_url = host_url.trim_end_matches('/').to_string();
    }

    pub fn set_server_id(&mut self, server_id: &str) {
        self.server_id = server_id.to_string();
    }

    /// Fabricant des devices dont le profil n'en déclare pas
    pub fn set_manufacturer(&mut self, manufacturer: &str) {
        self.manufacturer = manufacturer.to_string();
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn host_url(&self) -> &str {
        &self.host_url
    }

    /// URL absolue d'un chemin servi par l'hôte
    pub fn get_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.host_url, path)
        } else {
            format!("{}/{}", self.host_url, path)
        }
    }

    /// Ajoute un service au device `device`
    pub fn add_service(
        &mut self,
        device: DeviceId,
        profile: impl ServiceProfile + 'static,
    ) -> Result<ServiceId, DeviceError> {
        if device.0 >= self.devices.len() {
            return Err(DeviceError::UnknownDevice(device));
        }
        let id = ServiceId(self.services.len());
        self.services.push(ServiceNode {
            device,
            profile: Box::new(profile),
        });
        self.devices[device.0].services.push(id);
        Ok(id)
    }

    /// Ajoute un sous-device (embedded device) au device `parent`
    pub fn add_device(
        &mut self,
        parent: DeviceId,
        profile: impl DeviceProfile + 'static,
    ) -> Result<DeviceId, DeviceError> {
        if parent.0 >= self.devices.len() {
            return Err(DeviceError::UnknownDevice(parent));
        }
        let id = DeviceId(self.devices.len());
        self.devices.push(DeviceNode {
            parent: Some(parent),
            profile: Box::new(profile),
            services: Vec::new(),
            devices: Vec::new(),
        });
        self.devices[parent.0].devices.push(id);
        Ok(id)
    }

    /// Le device racine
    pub fn root(&self) -> DeviceRef<'_> {
        DeviceRef {
            tree: self,
            id: Self::ROOT,
        }
    }

    pub fn device(&self, id: DeviceId) -> Option<DeviceRef<'_>> {
        (id.0 < self.devices.len()).then_some(DeviceRef { tree: self, id })
    }

    pub fn service(&self, id: ServiceId) -> Option<ServiceRef<'_>> {
        (id.0 < self.services.len()).then_some(ServiceRef { tree: self, id })
    }

    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        match id {
            NodeId::Device(id) => self.device(id).map(NodeRef::Device),
            NodeId::Service(id) => self.service(id).map(NodeRef::Service),
        }
    }

    /// Nombre total de nœuds (devices et services)
    pub fn len(&self) -> usize {
        self.devices.len() + self.services.len()
    }

    /// Un arbre contient toujours au moins son device racine
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Tous les devices de l'arbre, dans l'ordre de création
    pub fn all_devices(&self) -> impl Iterator<Item = DeviceRef<'_>> + '_ {
        (0..self.devices.len()).map(move |i| DeviceRef {
            tree: self,
            id: DeviceId(i),
        })
    }
}

/// Poignée vers un device d'un arbre
#[derive(Clone, Copy)]
pub struct DeviceRef<'a> {
    tree: &'a RootDevice,
    id: DeviceId,
}

impl<'a> DeviceRef<'a> {
    fn node(&self) -> &'a DeviceNode {
        &self.tree.devices[self.id.0]
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn tree(&self) -> &'a RootDevice {
        self.tree
    }

    pub fn is_root(&self) -> bool {
        self.node().parent.is_none()
    }

    pub fn parent(&self) -> Option<DeviceRef<'a>> {
        self.node().parent.map(|id| DeviceRef {
            tree: self.tree,
            id,
        })
    }

    pub fn profile(&self) -> &'a dyn DeviceProfile {
        self.node().profile.as_ref()
    }

    /// Services du device, dans l'ordre d'insertion
    pub fn services(&self) -> impl Iterator<Item = ServiceRef<'a>> + use<'a> {
        let tree = self.tree;
        self.node()
            .services
            .iter()
            .map(move |&id| ServiceRef { tree, id })
    }

    /// Sous-devices, dans l'ordre d'insertion
    pub fn devices(&self) -> impl Iterator<Item = DeviceRef<'a>> + use<'a> {
        let tree = self.tree;
        self.node()
            .devices
            .iter()
            .map(move |&id| DeviceRef { tree, id })
    }

    pub fn icons(&self) -> &'a [Icon] {
        self.node().profile.icons()
    }

    /// Valeur d'un champ : surcharge du profil, sinon valeur par défaut.
    ///
    /// - `deviceType` : `urn:{domain}:device:{type}:{version}`
    /// - `manufacturer` : fabricant de la racine s'il est défini
    /// - champs obligatoires absents : [`REQUIRED_FIELD`]
    /// - `baseURL` : préfixe de la racine + type + `/`
    /// - `descriptionURL` : `baseURL` + `desc.xml`
    /// - `serverId` : identité de la racine
    pub fn field(&self, field: DeviceField) -> Option<String> {
        if let Some(value) = self.node().profile.field(field) {
            return Some(value);
        }

        match field {
            DeviceField::DeviceType => Some(format!(
                "urn:{}:{}:{}:{}",
                self.field_or_empty(DeviceField::Domain),
                UrnKind::Device.as_str(),
                self.field_or_empty(DeviceField::Type),
                self.field_or_empty(DeviceField::Version),
            )),
            DeviceField::Manufacturer if !self.tree.manufacturer.is_empty() => {
                Some(self.tree.manufacturer.clone())
            }
            DeviceField::FriendlyName
            | DeviceField::Manufacturer
            | DeviceField::ModelName
            | DeviceField::Udn => Some(REQUIRED_FIELD.to_string()),
            DeviceField::Domain => Some(SCHEMAS_UPNP_ORG.to_string()),
            DeviceField::Type => Some(DEFAULT_DEVICE_TYPE.to_string()),
            DeviceField::Version => Some(DEFAULT_VERSION.to_string()),
            DeviceField::BaseUrl => Some(format!(
                "{}{}/",
                self.tree.base_url,
                self.field_or_empty(DeviceField::Type)
            )),
            DeviceField::DescriptionUrl => {
                Some(format!("{}desc.xml", self.field_or_empty(DeviceField::BaseUrl)))
            }
            DeviceField::ServerId => Some(self.tree.server_id.clone()),
            _ => None,
        }
    }

    pub fn field_or_empty(&self, field: DeviceField) -> String {
        self.field(field).unwrap_or_default()
    }

    pub fn device_type(&self) -> String {
        self.field_or_empty(DeviceField::DeviceType)
    }

    pub fn udn(&self) -> String {
        self.field_or_empty(DeviceField::Udn)
    }

    pub fn description_url(&self) -> String {
        self.field_or_empty(DeviceField::DescriptionUrl)
    }
}

impl std::fmt::Debug for DeviceRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRef")
            .field("id", &self.id)
            .field("type", &self.device_type())
            .finish()
    }
}

/// Poignée vers un service d'un arbre
#[derive(Clone, Copy)]
pub struct ServiceRef<'a> {
    tree: &'a RootDevice,
    id: ServiceId,
}

impl<'a> ServiceRef<'a> {
    fn node(&self) -> &'a ServiceNode {
        &self.tree.services[self.id.0]
    }

    pub fn id(&self) -> ServiceId {
        self.id
    }

    pub fn tree(&self) -> &'a RootDevice {
        self.tree
    }

    /// Device propriétaire du service
    pub fn device(&self) -> DeviceRef<'a> {
        DeviceRef {
            tree: self.tree,
            id: self.node().device,
        }
    }

    pub fn profile(&self) -> &'a dyn ServiceProfile {
        self.node().profile.as_ref()
    }

    /// Valeur d'un champ : surcharge du profil, sinon valeur par défaut.
    ///
    /// Les URLs par défaut sont relatives au `baseURL` du service
    /// (`baseURL` du device + type + `/`).
    pub fn field(&self, field: ServiceField) -> Option<String> {
        if let Some(value) = self.node().profile.field(field) {
            return Some(value);
        }

        match field {
            ServiceField::ServiceType => Some(format!(
                "urn:{}:{}:{}:{}",
                self.field_or_empty(ServiceField::Domain),
                UrnKind::Service.as_str(),
                self.field_or_empty(ServiceField::Type),
                self.field_or_empty(ServiceField::Version),
            )),
            ServiceField::ServiceId => {
                let domain = self.field_or_empty(ServiceField::Domain);
                let id_domain = if domain == SCHEMAS_UPNP_ORG {
                    UPNP_ORG.to_string()
                } else {
                    domain
                };
                Some(format!(
                    "urn:{}:serviceId:{}",
                    id_domain,
                    self.field_or_empty(ServiceField::Type)
                ))
            }
            ServiceField::ScpdUrl => Some(self.relative_url("scpd.xml")),
            ServiceField::ControlUrl => Some(self.relative_url("control")),
            ServiceField::EventSubUrl => Some(self.relative_url("event")),
            ServiceField::Domain => Some(SCHEMAS_UPNP_ORG.to_string()),
            ServiceField::Type => {
                debug!("Service {:?} has no type", self.id);
                Some(REQUIRED_FIELD.to_string())
            }
            ServiceField::Version => Some(DEFAULT_VERSION.to_string()),
            ServiceField::BaseUrl => Some(format!(
                "{}{}/",
                self.device().field_or_empty(DeviceField::BaseUrl),
                self.field_or_empty(ServiceField::Type)
            )),
        }
    }

    fn relative_url(&self, leaf: &str) -> String {
        format!("{}{}", self.field_or_empty(ServiceField::BaseUrl), leaf)
    }

    pub fn field_or_empty(&self, field: ServiceField) -> String {
        self.field(field).unwrap_or_default()
    }

    pub fn service_type(&self) -> String {
        self.field_or_empty(ServiceField::ServiceType)
    }
}

impl std::fmt::Debug for ServiceRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRef")
            .field("id", &self.id)
            .field("type", &self.service_type())
            .finish()
    }
}

/// Poignée vers un nœud quelconque
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Device(DeviceRef<'a>),
    Service(ServiceRef<'a>),
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        match self {
            NodeRef::Device(d) => NodeId::Device(d.id()),
            NodeRef::Service(s) => NodeId::Service(s.id()),
        }
    }

    pub fn tree(&self) -> &'a RootDevice {
        match self {
            NodeRef::Device(d) => d.tree(),
            NodeRef::Service(s) => s.tree(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::BasicDevice;
    use crate::services::BasicService;

    fn sample_tree() -> RootDevice {
        let mut root = RootDevice::new(
            BasicDevice::new("Basic", 1)
                .with_friendly_name("Salon")
                .with_udn("abc"),
        )
        .with_host_url("http://10.0.0.2:8080/")
        .with_server_id("Linux/6.1 UPnP/1.1 upnpkit/0.1");
        root.add_service(RootDevice::ROOT, BasicService::new("SwitchPower", 1))
            .unwrap();
        root.add_device(RootDevice::ROOT, BasicDevice::new("DimmableLight", 2))
            .unwrap();
        root
    }

    #[test]
    fn test_device_defaults() {
        let tree = sample_tree();
        let root = tree.root();
        assert_eq!(root.device_type(), "urn:schemas-upnp-org:device:Basic:1");
        assert_eq!(root.udn(), "uuid:abc");
        assert_eq!(root.field_or_empty(DeviceField::Manufacturer), REQUIRED_FIELD);
        assert_eq!(root.field(DeviceField::Upc), None);
        assert_eq!(root.field_or_empty(DeviceField::BaseUrl), "/Basic/");
        assert_eq!(root.description_url(), "/Basic/desc.xml");
        assert_eq!(
            root.field_or_empty(DeviceField::ServerId),
            "Linux/6.1 UPnP/1.1 upnpkit/0.1"
        );
    }

    #[test]
    fn test_service_defaults() {
        let tree = sample_tree();
        let service = tree.root().services().next().unwrap();
        assert_eq!(
            service.service_type(),
            "urn:schemas-upnp-org:service:SwitchPower:1"
        );
        assert_eq!(
            service.field_or_empty(ServiceField::ServiceId),
            "urn:upnp-org:serviceId:SwitchPower"
        );
        assert_eq!(
            service.field_or_empty(ServiceField::ScpdUrl),
            "/Basic/SwitchPower/scpd.xml"
        );
        assert_eq!(
            service.field_or_empty(ServiceField::ControlUrl),
            "/Basic/SwitchPower/control"
        );
        assert_eq!(service.device().id(), RootDevice::ROOT);
    }

    #[test]
    fn test_vendor_service_id() {
        let mut tree = RootDevice::new(BasicDevice::new("Basic", 1));
        let id = tree
            .add_service(
                RootDevice::ROOT,
                BasicService::new("Relay", 1).with_domain("sillyhouse-net"),
            )
            .unwrap();
        let service = tree.service(id).unwrap();
        assert_eq!(
            service.field_or_empty(ServiceField::ServiceId),
            "urn:sillyhouse-net:serviceId:Relay"
        );
    }

    #[test]
    fn test_parent_links_and_absolute_urls() {
        let tree = sample_tree();
        let child = tree.root().devices().next().unwrap();
        assert!(!child.is_root());
        assert_eq!(child.parent().map(|p| p.id()), Some(RootDevice::ROOT));
        assert_eq!(child.description_url(), "/DimmableLight/desc.xml");
        assert_eq!(
            tree.get_url(&child.description_url()),
            "http://10.0.0.2:8080/DimmableLight/desc.xml"
        );
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_base_url_prefix_is_normalized() {
        let tree = RootDevice::new(BasicDevice::new("Basic", 1)).with_base_url("upnp");
        assert_eq!(tree.root().description_url(), "/upnp/Basic/desc.xml");
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let mut tree = RootDevice::new(BasicDevice::new("Basic", 1));
        let err = tree
            .add_device(DeviceId(7), BasicDevice::new("Basic", 1))
            .unwrap_err();
        assert!(matches!(err, DeviceError::UnknownDevice(_)));
    }
}
