//! # Module Host
//!
//! [`DeviceHost`] publie un ou plusieurs arbres de devices :
//!
//! - côté HTTP, il route chaque requête vers le nœud qui la réclame
//!   (description, SCPD, contrôle SOAP) ;
//! - côté SSDP, il répond aux M-SEARCH et émet les NOTIFY `ssdp:alive`
//!   périodiques et `ssdp:byebye` à l'arrêt.
//!
//! Les arbres sont enregistrés au démarrage puis partagés en lecture seule
//! (`Arc<RootDevice>`) entre les tâches de traitement.
//!
//! ```ignore
//! let socket = Arc::new(SsdpSocket::bind_server()?);
//! let mut host = DeviceHost::new(socket.clone(), HostConfig::from_config(&get_config()));
//! host.register_device(root)?;
//! let host = Arc::new(host);
//! host.clone().spawn_ssdp(socket);
//! host.serve(TcpListener::bind(("0.0.0.0", 8080)).await?).await?;
//! ```

mod advertise;
mod http;

pub use http::{HttpReply, HttpRequest, ReplyBody, Route};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use upnpconfig::Config;

use crate::config_ext::UpnpConfigExt;
use crate::devices::{DeviceError, DeviceRef, RootDevice};
use crate::fields::ServiceField;
use crate::ssdp::SsdpSender;

/// Paramètres d'un hôte de devices
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// `max-age` annoncé dans `CACHE-CONTROL` (secondes)
    pub max_age: u64,
    /// Période des annonces `ssdp:alive`
    pub advertise_interval: Duration,
    /// Borne du délai aléatoire avant réponse à un M-SEARCH
    pub max_response_delay: Duration,
    /// Valeur de l'en-tête `X-User-Agent`
    pub user_agent_marker: String,
    /// Identité `SERVER` donnée aux arbres qui n'en ont pas
    pub server_id: String,
    /// URL HTTP absolue donnée aux arbres qui n'en ont pas
    pub base_url: String,
    /// Fabricant des devices qui n'en déclarent pas
    pub manufacturer: String,
}

impl HostConfig {
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        let product = config
            .get_upnp_product()
            .unwrap_or_else(|_| "upnpkit".to_string());
        let version = config
            .get_upnp_product_version()
            .unwrap_or_else(|_| "0.1".to_string());

        Self {
            max_age: config.get_ssdp_max_age().unwrap_or(defaults.max_age),
            advertise_interval: config
                .get_ssdp_advertise_interval()
                .map(Duration::from_secs)
                .unwrap_or(defaults.advertise_interval),
            max_response_delay: config
                .get_ssdp_max_response_delay_ms()
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_response_delay),
            user_agent_marker: config
                .get_upnp_user_agent_marker()
                .unwrap_or(defaults.user_agent_marker),
            server_id: upnputils::server_string(&product, &version),
            base_url: config.get_base_url(),
            manufacturer: config
                .get_upnp_manufacturer()
                .unwrap_or(defaults.manufacturer),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_age: 1800,
            advertise_interval: Duration::from_secs(900),
            max_response_delay: Duration::from_millis(3000),
            user_agent_marker: "upnpkit/0.1".to_string(),
            server_id: upnputils::server_string("upnpkit", "0.1"),
            base_url: "http://127.0.0.1:8080".to_string(),
            manufacturer: "upnpkit".to_string(),
        }
    }
}

/// Hôte HTTP + SSDP des arbres de devices enregistrés
pub struct DeviceHost {
    roots: Vec<Arc<RootDevice>>,
    sender: Arc<dyn SsdpSender>,
    config: HostConfig,
}

impl DeviceHost {
    pub fn new(sender: Arc<dyn SsdpSender>, config: HostConfig) -> Self {
        Self {
            roots: Vec::new(),
            sender,
            config,
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn roots(&self) -> &[Arc<RootDevice>] {
        &self.roots
    }

    /// Enregistre un arbre de devices.
    ///
    /// Complète l'identité `SERVER`, l'URL de l'hôte et le fabricant si
    /// l'arbre n'en a pas, puis vérifie qu'aucune URL servie par l'arbre ne l'est déjà.
    pub fn register_device(
        &mut self,
        mut root: RootDevice,
    ) -> Result<Arc<RootDevice>, DeviceError> {
        if root.server_id().is_empty() {
            root.set_server_id(&self.config.server_id);
        }
        if root.host_url().is_empty() {
            root.set_host_url(&self.config.base_url);
        }
        if root.manufacturer().is_empty() {
            root.set_manufacturer(&self.config.manufacturer);
        }

        let mut taken: HashSet<String> = self
            .roots
            .iter()
            .flat_map(|r| served_urls(r.root()))
            .collect();
        for url in served_urls(root.root()) {
            if !taken.insert(url.clone()) {
                warn!("❌ URL {} is already registered", url);
                return Err(DeviceError::UrlAlreadyRegistered(url));
            }
        }

        let root = Arc::new(root);
        info!(
            "✅ Device {} registered at {}",
            root.root().udn(),
            root.get_url(&root.root().description_url())
        );
        self.roots.push(root.clone());
        Ok(root)
    }
}

/// URLs servies par un sous-arbre : descriptions, SCPD et URLs de contrôle
fn served_urls(device: DeviceRef<'_>) -> Vec<String> {
    let mut urls = vec![device.description_url()];
    for service in device.services() {
        urls.push(service.field_or_empty(ServiceField::ScpdUrl));
        urls.push(service.field_or_empty(ServiceField::ControlUrl));
    }
    for child in device.devices() {
        urls.extend(served_urls(child));
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::BasicDevice;
    use crate::fields::DeviceField;
    use crate::services::BasicService;
    use crate::ssdp::{SsdpError, SsdpMessage};
    use async_trait::async_trait;
    use std::net::SocketAddr;

    struct NullSender;

    #[async_trait]
    impl SsdpSender for NullSender {
        async fn send_to(&self, _msg: &SsdpMessage, _dest: SocketAddr) -> Result<(), SsdpError> {
            Ok(())
        }
    }

    fn host() -> DeviceHost {
        DeviceHost::new(Arc::new(NullSender), HostConfig::default())
    }

    #[test]
    fn test_register_fills_identity() {
        let mut host = host();
        let root = host
            .register_device(RootDevice::new(BasicDevice::new("Basic", 1).with_udn("abc")))
            .unwrap();
        assert_eq!(root.host_url(), "http://127.0.0.1:8080");
        assert!(root.server_id().ends_with("upnpkit/0.1"));
        assert_eq!(host.roots().len(), 1);
    }

    #[test]
    fn test_configured_manufacturer_is_the_default() {
        let config = Config::from_yaml_str("host: {upnp: {manufacturer: Acme}}").unwrap();
        let mut host = DeviceHost::new(Arc::new(NullSender), HostConfig::from_config(&config));

        let mut tree = RootDevice::new(BasicDevice::new("Basic", 1));
        tree.add_device(
            RootDevice::ROOT,
            BasicDevice::new("Dimmer", 1).with_manufacturer("Lumen"),
        )
        .unwrap();
        let root = host.register_device(tree).unwrap();

        assert_eq!(root.manufacturer(), "Acme");
        assert_eq!(root.root().field_or_empty(DeviceField::Manufacturer), "Acme");
        let dimmer = root.root().devices().next().unwrap();
        assert_eq!(dimmer.field_or_empty(DeviceField::Manufacturer), "Lumen");
    }

    #[test]
    fn test_duplicate_urls_are_rejected() {
        let mut host = host();
        host.register_device(RootDevice::new(BasicDevice::new("Basic", 1)))
            .unwrap();
        let err = host
            .register_device(RootDevice::new(BasicDevice::new("Basic", 1)))
            .err().unwrap();
        assert!(matches!(err, DeviceError::UrlAlreadyRegistered(url) if url == "/Basic/desc.xml"));

        // même type sous un autre préfixe : accepté
        let mut other = RootDevice::new(BasicDevice::new("Basic", 1)).with_base_url("/second/");
        other
            .add_service(RootDevice::ROOT, BasicService::new("SwitchPower", 1))
            .unwrap();
        assert!(host.register_device(other).is_ok());
    }
}
