//! Erreurs SSDP.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SsdpError {
    /// Erreur de socket (liaison, envoi, réception)
    #[error("SSDP socket error: {0}")]
    Io(#[from] std::io::Error),

    /// Datagramme qui n'est pas un message SSDP reconnu
    #[error("Invalid SSDP message: {0}")]
    InvalidMessage(String),
}
