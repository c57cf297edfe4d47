//! Erreurs relatives aux devices UPnP.

use thiserror::Error;

use super::DeviceId;

/// Erreurs de construction et d'enregistrement des arbres de devices.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Identifiant de device inconnu dans cet arbre
    #[error("Device {0:?} does not belong to this tree")]
    UnknownDevice(DeviceId),

    /// URL déjà servie par un autre device enregistré
    #[error("URL '{0}' is already registered")]
    UrlAlreadyRegistered(String),

    /// Version invalide
    #[error("Version must be > 0")]
    InvalidVersion,
}
