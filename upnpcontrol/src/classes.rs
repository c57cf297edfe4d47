//! # Registre des classes de contrôle
//!
//! Une [`DeviceClass`] ou une [`ServiceClass`] associe une URN de type à une
//! fabrique d'objets de contrôle. Le registre est rempli avant la découverte
//! puis n'est plus que lu : un type distant sans classe enregistrée est connu
//! mais n'est pas instancié. Les services et devices embarqués qui ont une
//! classe sont instanciés quel que soit le sort de leur parent.
//!
//! ```ignore
//! let mut registry = ClassRegistry::new();
//! registry.register_device(DeviceClass::generic(Urn::device("BinaryLight", 1)));
//! registry.register_service(ServiceClass::generic(Urn::service("SwitchPower", 1)));
//! init_class_registry(registry);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use tracing::{debug, warn};
use upnpcore::Urn;
use upnpcore::soap::{build_soap_request, parse_soap_envelope, parse_soap_fault};

use crate::description::{DeviceDescription, ServiceDescription};
use crate::errors::ControlPointError;
use crate::http::DescriptionClient;

/// Objet de contrôle d'un service distant
#[async_trait]
pub trait ServiceControl: Send + Sync {
    /// Service décrit, URLs absolues
    fn endpoint(&self) -> &ServiceDescription;

    /// Invoque `action` et retourne ses arguments de sortie
    async fn invoke(
        &self,
        action: &str,
        args: &[(&str, &str)],
    ) -> Result<Vec<(String, String)>, ControlPointError>;
}

/// Objet de contrôle d'un device distant
pub trait DeviceControl: Send + Sync {
    fn description(&self) -> &DeviceDescription;

    /// URL du document de description
    fn location(&self) -> &str;

    fn services(&self) -> &[Box<dyn ServiceControl>];

    /// Devices embarqués instanciés
    fn devices(&self) -> &[Box<dyn DeviceControl>];

    fn service(&self, service_type: &str) -> Option<&dyn ServiceControl> {
        self.services()
            .iter()
            .find(|s| s.endpoint().service_type == service_type)
            .map(|s| &**s)
    }

    fn device(&self, device_type: &str) -> Option<&dyn DeviceControl> {
        self.devices()
            .iter()
            .find(|d| d.description().device_type == device_type)
            .map(|d| &**d)
    }
}

/// Objets déjà instanciés sous un device
#[derive(Default)]
pub struct DeviceParts {
    pub services: Vec<Box<dyn ServiceControl>>,
    pub devices: Vec<Box<dyn DeviceControl>>,
}

impl DeviceParts {
    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.devices.is_empty()
    }
}

pub type ServiceFactory = Arc<
    dyn Fn(ServiceDescription, Arc<dyn DescriptionClient>) -> Box<dyn ServiceControl>
        + Send
        + Sync,
>;

pub type DeviceFactory =
    Arc<dyn Fn(&DeviceDescription, &str, DeviceParts) -> Box<dyn DeviceControl> + Send + Sync>;

pub struct ServiceClass {
    urn: Urn,
    factory: ServiceFactory,
}

impl ServiceClass {
    pub fn new<F>(urn: Urn, factory: F) -> Self
    where
        F: Fn(ServiceDescription, Arc<dyn DescriptionClient>) -> Box<dyn ServiceControl>
            + Send
            + Sync
            + 'static,
    {
        Self {
            urn,
            factory: Arc::new(factory),
        }
    }

    /// Classe dont les objets sont des [`ServiceProxy`]
    pub fn generic(urn: Urn) -> Self {
        Self::new(urn, |endpoint, client| {
            Box::new(ServiceProxy::new(endpoint, client))
        })
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn create_object(
        &self,
        endpoint: ServiceDescription,
        client: Arc<dyn DescriptionClient>,
    ) -> Box<dyn ServiceControl> {
        (self.factory)(endpoint, client)
    }
}

pub struct DeviceClass {
    urn: Urn,
    factory: DeviceFactory,
}

impl DeviceClass {
    pub fn new<F>(urn: Urn, factory: F) -> Self
    where
        F: Fn(&DeviceDescription, &str, DeviceParts) -> Box<dyn DeviceControl>
            + Send
            + Sync
            + 'static,
    {
        Self {
            urn,
            factory: Arc::new(factory),
        }
    }

    /// Classe dont les objets sont des [`GenericDevice`]
    pub fn generic(urn: Urn) -> Self {
        Self::new(urn, |description, location, parts| {
            Box::new(GenericDevice::new(description, location, parts))
        })
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn create_object(
        &self,
        description: &DeviceDescription,
        location: &str,
        parts: DeviceParts,
    ) -> Box<dyn DeviceControl> {
        (self.factory)(description, location, parts)
    }
}

/// Classes connues, indexées par URN
#[derive(Default)]
pub struct ClassRegistry {
    devices: HashMap<String, DeviceClass>,
    services: HashMap<String, ServiceClass>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_device(&mut self, class: DeviceClass) -> &mut Self {
        self.devices.insert(class.urn.to_string(), class);
        self
    }

    pub fn register_service(&mut self, class: ServiceClass) -> &mut Self {
        self.services.insert(class.urn.to_string(), class);
        self
    }

    pub fn device_class(&self, device_type: &str) -> Option<&DeviceClass> {
        self.devices.get(device_type)
    }

    pub fn service_class(&self, service_type: &str) -> Option<&ServiceClass> {
        self.services.get(service_type)
    }

    /// Instancie le device décrit, ses services et ses devices embarqués.
    ///
    /// Chaque nœud dont le type a une classe est instancié. Un device sans
    /// classe dont la descendance a produit des objets devient un
    /// [`GenericDevice`] qui les porte. `base` résout les URLs relatives du
    /// document. `None` si rien dans l'arbre n'a de classe.
    pub fn instantiate(
        &self,
        description: &DeviceDescription,
        location: &str,
        base: &str,
        client: Arc<dyn DescriptionClient>,
    ) -> Option<Box<dyn DeviceControl>> {
        let parts = DeviceParts {
            services: self.instantiate_services(description, base, &client),
            devices: description
                .devices
                .iter()
                .filter_map(|child| self.instantiate(child, location, base, client.clone()))
                .collect(),
        };

        match self.device_class(&description.device_type) {
            Some(class) => Some(class.create_object(description, location, parts)),
            None if parts.is_empty() => {
                debug!("No class for device type {}", description.device_type);
                None
            }
            None => {
                debug!(
                    "No class for device type {}, keeping its instantiated parts",
                    description.device_type
                );
                Some(Box::new(GenericDevice::new(description, location, parts)))
            }
        }
    }

    fn instantiate_services(
        &self,
        description: &DeviceDescription,
        base: &str,
        client: &Arc<dyn DescriptionClient>,
    ) -> Vec<Box<dyn ServiceControl>> {
        description
            .services
            .iter()
            .filter_map(|service| {
                let class = self.service_class(&service.service_type)?;
                match service.resolved(base) {
                    Ok(endpoint) => Some(class.create_object(endpoint, client.clone())),
                    Err(e) => {
                        warn!("❌ Cannot bind {}: {}", service.service_type, e);
                        None
                    }
                }
            })
            .collect()
    }
}

static CLASS_REGISTRY: OnceCell<ClassRegistry> = OnceCell::new();

/// Installe le registre global ; sans effet s'il l'est déjà.
///
/// Retourne `false` si un registre était déjà en place.
pub fn init_class_registry(registry: ClassRegistry) -> bool {
    CLASS_REGISTRY.set(registry).is_ok()
}

/// Registre global, vide s'il n'a pas été installé
pub fn class_registry() -> &'static ClassRegistry {
    CLASS_REGISTRY.get_or_init(ClassRegistry::new)
}

/// Device sans comportement propre : description et objets instanciés
pub struct GenericDevice {
    description: DeviceDescription,
    location: String,
    parts: DeviceParts,
}

impl GenericDevice {
    pub fn new(description: &DeviceDescription, location: &str, parts: DeviceParts) -> Self {
        Self {
            description: description.clone(),
            location: location.to_string(),
            parts,
        }
    }
}

impl DeviceControl for GenericDevice {
    fn description(&self) -> &DeviceDescription {
        &self.description
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn services(&self) -> &[Box<dyn ServiceControl>] {
        &self.parts.services
    }

    fn devices(&self) -> &[Box<dyn DeviceControl>] {
        &self.parts.devices
    }
}

/// Appels SOAP sur l'URL de contrôle d'un service
pub struct ServiceProxy {
    endpoint: ServiceDescription,
    client: Arc<dyn DescriptionClient>,
}

impl ServiceProxy {
    pub fn new(endpoint: ServiceDescription, client: Arc<dyn DescriptionClient>) -> Self {
        Self { endpoint, client }
    }
}

#[async_trait]
impl ServiceControl for ServiceProxy {
    fn endpoint(&self) -> &ServiceDescription {
        &self.endpoint
    }

    async fn invoke(
        &self,
        action: &str,
        args: &[(&str, &str)],
    ) -> Result<Vec<(String, String)>, ControlPointError> {
        let service_type = &self.endpoint.service_type;
        let body = build_soap_request(service_type, action, args)
            .map_err(|e| ControlPointError::SoapBuild(action.to_string(), e.to_string()))?;
        let soap_action = format!(r#""{}#{}""#, service_type, action);

        let response = self
            .client
            .post_soap(&self.endpoint.control_url, &soap_action, body)
            .await?;

        if !response.is_success() {
            if let Ok(Some(fault)) = parse_soap_fault(response.body.as_bytes()) {
                warn!("❌ {} on {}: {}", action, service_type, fault);
                return Err(ControlPointError::UpnpFault {
                    action: action.to_string(),
                    fault,
                    status: response.status,
                });
            }
            return Err(ControlPointError::http_status(
                &self.endpoint.control_url,
                response.status,
            ));
        }

        let envelope = parse_soap_envelope(response.body.as_bytes())?;
        let expected = format!("{}Response", action);
        let reply = envelope
            .body
            .first_element()
            .filter(|e| e.name == expected)
            .ok_or_else(|| ControlPointError::missing_return_value(&expected))?;

        Ok(reply
            .children
            .iter()
            .filter_map(|n| n.as_element())
            .map(|e| {
                let value = e.get_text().map(|t| t.trim().to_string()).unwrap_or_default();
                (e.name.clone(), value)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Unreachable;

    #[async_trait]
    impl DescriptionClient for Unreachable {
        async fn get(&self, url: &str) -> Result<HttpResponse, ControlPointError> {
            Err(ControlPointError::http(url, "unreachable"))
        }

        async fn post_soap(
            &self,
            url: &str,
            _soap_action: &str,
            _body: String,
        ) -> Result<HttpResponse, ControlPointError> {
            Err(ControlPointError::http(url, "unreachable"))
        }
    }

    fn light() -> DeviceDescription {
        DeviceDescription {
            device_type: "urn:schemas-upnp-org:device:BinaryLight:1".to_string(),
            udn: "uuid:light-1".to_string(),
            services: vec![
                ServiceDescription {
                    service_type: "urn:schemas-upnp-org:service:SwitchPower:1".to_string(),
                    control_url: "/BinaryLight/SwitchPower/control".to_string(),
                    ..Default::default()
                },
                ServiceDescription {
                    service_type: "urn:vendor-com:service:Unknown:1".to_string(),
                    ..Default::default()
                },
            ],
            devices: vec![DeviceDescription {
                device_type: "urn:schemas-upnp-org:device:Dimmer:1".to_string(),
                udn: "uuid:dimmer-1".to_string(),
                services: vec![ServiceDescription {
                    service_type: "urn:schemas-upnp-org:service:Dimming:1".to_string(),
                    control_url: "/Dimmer/Dimming/control".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_unknown_type_is_not_instantiated() {
        let registry = ClassRegistry::new();
        let client: Arc<dyn DescriptionClient> = Arc::new(Unreachable);
        assert!(
            registry
                .instantiate(&light(), "http://h:1/d.xml", "http://h:1/d.xml", client)
                .is_none()
        );
    }

    #[test]
    fn test_unknown_root_keeps_known_parts() {
        let mut registry = ClassRegistry::new();
        registry
            .register_service(ServiceClass::generic(Urn::service("SwitchPower", 1)))
            .register_device(DeviceClass::generic(Urn::device("Dimmer", 1)));

        let client: Arc<dyn DescriptionClient> = Arc::new(Unreachable);
        let device = registry
            .instantiate(&light(), "http://h:1/d.xml", "http://h:1/d.xml", client)
            .unwrap();

        assert_eq!(
            device.description().device_type,
            "urn:schemas-upnp-org:device:BinaryLight:1"
        );
        assert!(
            device
                .service("urn:schemas-upnp-org:service:SwitchPower:1")
                .is_some()
        );
        let dimmer = device.device("urn:schemas-upnp-org:device:Dimmer:1").unwrap();
        assert_eq!(dimmer.description().udn, "uuid:dimmer-1");
        assert!(dimmer.services().is_empty());
    }

    #[test]
    fn test_embedded_devices_are_instantiated() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();

        let mut registry = ClassRegistry::new();
        registry
            .register_device(DeviceClass::generic(Urn::device("BinaryLight", 1)))
            .register_device(DeviceClass::new(
                Urn::device("Dimmer", 1),
                move |description, location, parts| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Box::new(GenericDevice::new(description, location, parts))
                },
            ))
            .register_service(ServiceClass::generic(Urn::service("Dimming", 1)));

        let client: Arc<dyn DescriptionClient> = Arc::new(Unreachable);
        let device = registry
            .instantiate(&light(), "http://h:1/d.xml", "http://h:1/d.xml", client)
            .unwrap();

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(device.devices().len(), 1);
        let dimmer = &device.devices()[0];
        assert_eq!(dimmer.location(), "http://h:1/d.xml");
        assert_eq!(
            dimmer.services()[0].endpoint().control_url,
            "http://h:1/Dimmer/Dimming/control"
        );
    }

    #[test]
    fn test_instantiate_binds_known_services() {
        let mut registry = ClassRegistry::new();
        registry
            .register_device(DeviceClass::generic(Urn::device("BinaryLight", 1)))
            .register_service(ServiceClass::generic(Urn::service("SwitchPower", 1)));

        let client: Arc<dyn DescriptionClient> = Arc::new(Unreachable);
        let device = registry
            .instantiate(&light(), "http://h:1/d.xml", "http://h:1/d.xml", client)
            .unwrap();

        assert_eq!(device.location(), "http://h:1/d.xml");
        assert_eq!(device.services().len(), 1);
        let switch = device
            .service("urn:schemas-upnp-org:service:SwitchPower:1")
            .unwrap();
        assert_eq!(
            switch.endpoint().control_url,
            "http://h:1/BinaryLight/SwitchPower/control"
        );
        assert!(device.service("urn:vendor-com:service:Unknown:1").is_none());
    }

    #[tokio::test]
    async fn test_transport_error_surfaces() {
        let proxy = ServiceProxy::new(
            ServiceDescription {
                service_type: "urn:schemas-upnp-org:service:SwitchPower:1".to_string(),
                control_url: "http://h:1/control".to_string(),
                ..Default::default()
            },
            Arc::new(Unreachable),
        );
        let err = proxy.invoke("GetStatus", &[]).await.unwrap_err();
        assert!(err.is_transport());
    }
}
