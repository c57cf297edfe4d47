//! Utilitaires réseau et système partagés par les crates UPnP.
//!
//! - [`guess_local_ip`] : devine l'adresse IP locale utilisée pour les connexions sortantes
//! - [`ipv4_interfaces`] : liste les interfaces IPv4 non-loopback (jonction multicast SSDP)
//! - [`server_string`] : identifiant `SERVER` des annonces et réponses HTTP
mod ip_utils;

pub use ip_utils::{guess_local_ip, ipv4_interfaces};

/// Construit l'identifiant `SERVER` UPnP : `OS/version UPnP/1.1 produit/version`.
///
/// Le système est celui de l'hôte courant (ex: `Ubuntu/22.04`,
/// `Macos/15.1`).
pub fn server_string(product: &str, product_version: &str) -> String {
    let info = os_info::get();
    let version = match info.version() {
        os_info::Version::Unknown => None,
        v => Some(v.to_string()),
    };
    format!(
        "{} UPnP/1.1 {}",
        product_token(&format!("{:?}", info.os_type()), version.as_deref()),
        product_token(product, Some(product_version)),
    )
}

/// Jeton `nom/version` d'un en-tête `SERVER`.
///
/// Les jetons sont séparés par des espaces : les blancs internes deviennent
/// des `-` et une version absente vaut `unknown`.
fn product_token(name: &str, version: Option<&str>) -> String {
    let clean = |s: &str| s.split_whitespace().collect::<Vec<_>>().join("-");
    let version = version
        .map(clean)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}/{}", clean(name), version)
}
