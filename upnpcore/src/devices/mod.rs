//! # Module Devices
//!
//! Arbre de composition des devices UPnP et profils des devices concrets.
//!
//! Un [`RootDevice`] possède une arène de nœuds : chaque device connaît son
//! parent par index et liste ses services et sous-devices dans l'ordre
//! d'insertion. Les accès se font via des poignées légères ([`DeviceRef`],
//! [`ServiceRef`]) qui calculent les champs par défaut.

mod errors;
mod profile;
mod tree;

pub use errors::DeviceError;
pub use profile::{BasicDevice, DeviceProfile, Icon};
pub use tree::{DeviceId, DeviceRef, NodeId, NodeRef, RootDevice, ServiceId, ServiceRef};
