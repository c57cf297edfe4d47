//! Extension pour intégrer la configuration de l'hôte UPnP dans upnpconfig
//!
//! Ce module fournit le trait `UpnpConfigExt` qui ajoute à
//! `upnpconfig::Config` les clés `host.upnp.*` et `host.ssdp.*`.

use anyhow::Result;
use serde_yaml::{Number, Value};
use upnpconfig::Config;

const DEFAULT_MANUFACTURER: &str = "upnpkit";
const DEFAULT_PRODUCT: &str = "upnpkit";
const DEFAULT_PRODUCT_VERSION: &str = "0.1";
const DEFAULT_USER_AGENT_MARKER: &str = "upnpkit/0.1";
const DEFAULT_SSDP_MAX_AGE: u64 = 1800;
const DEFAULT_ADVERTISE_INTERVAL: u64 = 900;
const DEFAULT_MAX_RESPONSE_DELAY_MS: u64 = 3000;

/// Trait d'extension pour la configuration de l'hôte UPnP
///
/// # Exemple
///
/// ```rust,ignore
/// use upnpconfig::get_config;
/// use upnpcore::UpnpConfigExt;
///
/// let config = get_config();
/// let max_age = config.get_ssdp_max_age()?;
/// ```
pub trait UpnpConfigExt {
    /// Fabricant publié dans les descriptions (défaut: "upnpkit")
    fn get_upnp_manufacturer(&self) -> Result<String>;

    fn set_upnp_manufacturer(&self, manufacturer: String) -> Result<()>;

    /// Nom du produit dans l'en-tête `SERVER`
    fn get_upnp_product(&self) -> Result<String>;

    /// Version du produit dans l'en-tête `SERVER`
    fn get_upnp_product_version(&self) -> Result<String>;

    /// Valeur de l'en-tête `X-User-Agent` des réponses HTTP
    fn get_upnp_user_agent_marker(&self) -> Result<String>;

    /// Durée de validité des annonces en secondes (défaut: 1800)
    fn get_ssdp_max_age(&self) -> Result<u64>;

    fn set_ssdp_max_age(&self, seconds: u64) -> Result<()>;

    /// Période des annonces `ssdp:alive` en secondes (défaut: 900)
    fn get_ssdp_advertise_interval(&self) -> Result<u64>;

    fn set_ssdp_advertise_interval(&self, seconds: u64) -> Result<()>;

    /// Borne du délai aléatoire des réponses M-SEARCH (défaut: 3000 ms)
    fn get_ssdp_max_response_delay_ms(&self) -> Result<u64>;
}

impl UpnpConfigExt for Config {
    fn get_upnp_manufacturer(&self) -> Result<String> {
        Ok(self.get_string_or(&["host", "upnp", "manufacturer"], DEFAULT_MANUFACTURER))
    }

    fn set_upnp_manufacturer(&self, manufacturer: String) -> Result<()> {
        self.set_value(&["host", "upnp", "manufacturer"], Value::String(manufacturer))
    }

    fn get_upnp_product(&self) -> Result<String> {
        Ok(self.get_string_or(&["host", "upnp", "product"], DEFAULT_PRODUCT))
    }

    fn get_upnp_product_version(&self) -> Result<String> {
        Ok(self.get_string_or(&["host", "upnp", "product_version"], DEFAULT_PRODUCT_VERSION))
    }

    fn get_upnp_user_agent_marker(&self) -> Result<String> {
        Ok(self.get_string_or(
            &["host", "upnp", "user_agent_marker"],
            DEFAULT_USER_AGENT_MARKER,
        ))
    }

    fn get_ssdp_max_age(&self) -> Result<u64> {
        Ok(self.get_u64_or(&["host", "ssdp", "max_age"], DEFAULT_SSDP_MAX_AGE))
    }

    fn set_ssdp_max_age(&self, seconds: u64) -> Result<()> {
        self.set_value(
            &["host", "ssdp", "max_age"],
            Value::Number(Number::from(seconds)),
        )
    }

    fn get_ssdp_advertise_interval(&self) -> Result<u64> {
        Ok(self.get_u64_or(
            &["host", "ssdp", "advertise_interval"],
            DEFAULT_ADVERTISE_INTERVAL,
        ))
    }

    fn set_ssdp_advertise_interval(&self, seconds: u64) -> Result<()> {
        self.set_value(
            &["host", "ssdp", "advertise_interval"],
            Value::Number(Number::from(seconds)),
        )
    }

    fn get_ssdp_max_response_delay_ms(&self) -> Result<u64> {
        Ok(self.get_u64_or(
            &["host", "ssdp", "max_response_delay_ms"],
            DEFAULT_MAX_RESPONSE_DELAY_MS,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_embedded_yaml() {
        let config = Config::from_yaml_str("host: {}").unwrap();
        assert_eq!(config.get_upnp_manufacturer().unwrap(), "upnpkit");
        assert_eq!(config.get_ssdp_max_age().unwrap(), 1800);
        assert_eq!(config.get_ssdp_advertise_interval().unwrap(), 900);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_yaml_str(
            "host:\n  upnp:\n    product_version: 2.5\n  ssdp:\n    max_age: \"600\"\n",
        )
        .unwrap();
        assert_eq!(config.get_upnp_product_version().unwrap(), "2.5");
        assert_eq!(config.get_ssdp_max_age().unwrap(), 600);

        config.set_ssdp_advertise_interval(30).unwrap();
        assert_eq!(config.get_ssdp_advertise_interval().unwrap(), 30);
    }
}
