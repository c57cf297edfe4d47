//! # Module SSDP - Simple Service Discovery Protocol
//!
//! Couche protocolaire sans état, partagée par l'hôte de devices et le
//! control point :
//!
//! - [`SsdpMessage`] : messages M-SEARCH, réponses et NOTIFY
//! - [`SearchTarget`] / [`SearchFilter`] : cibles de recherche et parcours de l'arbre
//! - [`MatchKind`] : axe d'identité sur lequel un nœud a été trouvé
//! - [`SsdpSender`] / [`SsdpSocket`] : transport UDP multicast
//!
//! ## Constantes SSDP
//!
//! - **Multicast Address**: 239.255.255.250:1900
//! - **Max-Age**: 1800 secondes (30 minutes)

mod errors;
mod message;
mod search;
mod socket;

pub use errors::SsdpError;
pub use message::{MessageType, SsdpMessage};
pub use search::{FilterTarget, MatchKind, SearchFilter, SearchTarget};
pub use socket::{SsdpSender, SsdpSocket, multicast_addr};

/// Adresse multicast SSDP
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250";

/// Port SSDP
pub const SSDP_PORT: u16 = 1900;

/// Durée de validité des annonces (en secondes)
pub const MAX_AGE: u32 = 1800;

/// Cible de recherche universelle
pub const SSDP_ALL: &str = "ssdp:all";

/// Cible désignant les devices racine
pub const UPNP_ROOTDEVICE: &str = "upnp:rootdevice";

pub const NTS_ALIVE: &str = "ssdp:alive";
pub const NTS_BYEBYE: &str = "ssdp:byebye";
