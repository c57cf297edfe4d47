//! # upnpcore - Devices UPnP hébergés
//!
//! Cette crate fournit le côté « device » de la pile UPnP :
//!
//! - [`urn`] : types UPnP `urn:{domain}:{kind}:{type}:{version}`
//! - [`fields`] : schéma ordonné des champs des devices et services
//! - [`devices`] / [`services`] : arbre de composition (arène indexée) et profils
//! - [`description`] : rendu XML paresseux, morceau par morceau
//! - [`ssdp`] : messages SSDP, recherche dans l'arbre, construction ST/NT/USN
//! - [`soap`] : enveloppes SOAP des actions de contrôle
//! - [`host`] : [`host::DeviceHost`], point d'entrée HTTP et SSDP
//!
//! ## Exemple
//!
//! ```ignore
//! use upnpcore::devices::{BasicDevice, RootDevice};
//! use upnpcore::services::BasicService;
//!
//! let mut root = RootDevice::new(
//!     BasicDevice::new("Basic", 1)
//!         .with_friendly_name("Lampe du salon")
//!         .with_udn("2fac1234-31f8-11b4-a222-08002b34c003"),
//! );
//! root.add_service(RootDevice::ROOT, BasicService::new("SwitchPower", 1))?;
//! ```

pub mod config_ext;
pub mod description;
pub mod devices;
pub mod fields;
pub mod host;
pub mod logging;
pub mod services;
pub mod soap;
pub mod ssdp;
pub mod urn;

pub use config_ext::UpnpConfigExt;
pub use devices::{DeviceId, DeviceRef, NodeId, NodeRef, RootDevice, ServiceId, ServiceRef};
pub use fields::{DeviceField, REQUIRED_FIELD, ServiceField};
pub use host::{DeviceHost, HostConfig};
pub use urn::{Urn, UrnKind};
