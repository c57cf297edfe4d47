//! Types UPnP sous forme d'URN : `urn:{domain}:{kind}:{type}:{version}`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Domaine des types standards du forum UPnP
pub const SCHEMAS_UPNP_ORG: &str = "schemas-upnp-org";

/// Domaine des identifiants de service standards (`urn:upnp-org:serviceId:...`)
pub const UPNP_ORG: &str = "upnp-org";

/// Erreur de décomposition d'une URN
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed URN: '{0}'")]
pub struct UrnError(pub String);

/// Nature de l'objet désigné par une URN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrnKind {
    Device,
    Service,
}

impl UrnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrnKind::Device => "device",
            UrnKind::Service => "service",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "device" => Some(UrnKind::Device),
            "service" => Some(UrnKind::Service),
            _ => None,
        }
    }
}

/// URN de type de device ou de service.
///
/// [`Urn::decompose`] et [`fmt::Display`] sont inverses l'un de l'autre pour
/// toute URN bien formée.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Urn {
    pub domain: String,
    pub kind: UrnKind,
    pub type_name: String,
    pub version: u32,
}

impl Urn {
    pub fn new(
        domain: impl Into<String>,
        kind: UrnKind,
        type_name: impl Into<String>,
        version: u32,
    ) -> Self {
        Self {
            domain: domain.into(),
            kind,
            type_name: type_name.into(),
            version,
        }
    }

    /// Type de device standard (`urn:schemas-upnp-org:device:...`)
    pub fn device(type_name: impl Into<String>, version: u32) -> Self {
        Self::new(SCHEMAS_UPNP_ORG, UrnKind::Device, type_name, version)
    }

    /// Type de service standard (`urn:schemas-upnp-org:service:...`)
    pub fn service(type_name: impl Into<String>, version: u32) -> Self {
        Self::new(SCHEMAS_UPNP_ORG, UrnKind::Service, type_name, version)
    }

    /// Décompose une chaîne en URN.
    ///
    /// Retourne `None` pour toute entrée mal formée : nombre de segments différent
    /// de cinq, préfixe autre que `urn`, segment vide, nature inconnue ou version
    /// non numérique.
    pub fn decompose(s: &str) -> Option<Urn> {
        let parts: Vec<&str> = s.split(':').collect();
        let [prefix, domain, kind, type_name, version] = parts.as_slice() else {
            return None;
        };

        if !prefix.eq_ignore_ascii_case("urn") || domain.is_empty() || type_name.is_empty() {
            return None;
        }

        Some(Urn {
            domain: domain.to_string(),
            kind: UrnKind::parse(kind)?,
            type_name: type_name.to_string(),
            version: version.parse().ok()?,
        })
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "urn:{}:{}:{}:{}",
            self.domain,
            self.kind.as_str(),
            self.type_name,
            self.version
        )
    }
}

impl FromStr for Urn {
    type Err = UrnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Urn::decompose(s).ok_or_else(|| UrnError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_decompose_are_inverse() {
        let urns = [
            Urn::device("Basic", 1),
            Urn::service("SwitchPower", 2),
            Urn::new("sillyhouse-net", UrnKind::Device, "Wemo", 13),
        ];
        for urn in urns {
            assert_eq!(Urn::decompose(&urn.to_string()), Some(urn.clone()));
        }
    }

    #[test]
    fn test_decompose_standard_service() {
        let urn = Urn::decompose("urn:schemas-upnp-org:service:AVTransport:1").unwrap();
        assert_eq!(urn.domain, SCHEMAS_UPNP_ORG);
        assert_eq!(urn.kind, UrnKind::Service);
        assert_eq!(urn.type_name, "AVTransport");
        assert_eq!(urn.version, 1);
    }

    #[test]
    fn test_malformed_inputs_are_rejected() {
        for bad in [
            "",
            "upnp:rootdevice",
            "uuid:1234",
            "urn:schemas-upnp-org:device:Basic",
            "urn:schemas-upnp-org:device:Basic:x",
            "urn:schemas-upnp-org:widget:Basic:1",
            "urn::device:Basic:1",
            "urn:schemas-upnp-org:device::1",
            "urn:schemas-upnp-org:device:Basic:1:extra",
            "nru:schemas-upnp-org:device:Basic:1",
        ] {
            assert!(Urn::decompose(bad).is_none(), "{bad} should not decompose");
        }
    }

    #[test]
    fn test_from_str_error() {
        let err = "urn:nope".parse::<Urn>().unwrap_err();
        assert_eq!(err, UrnError("urn:nope".to_string()));
    }
}
