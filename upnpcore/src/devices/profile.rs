//! Profils des devices concrets.

use std::collections::HashMap;

use crate::fields::DeviceField;

/// Comportement propre à un device concret.
///
/// Un profil ne surcharge que les champs qui ont un sens pour lui ; tous les
/// champs calculés (type, URLs, serverId) ont une valeur par défaut fournie par
/// l'arbre (voir [`super::DeviceRef::field`]).
pub trait DeviceProfile: Send + Sync {
    /// Valeur surchargée d'un champ, `None` pour la valeur par défaut
    fn field(&self, field: DeviceField) -> Option<String>;

    /// Icônes publiées dans la description
    fn icons(&self) -> &[Icon] {
        &[]
    }
}

/// Icône d'un device (`iconList`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub mimetype: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub url: String,
}

impl Icon {
    pub fn new(
        mimetype: impl Into<String>,
        width: u32,
        height: u32,
        url: impl Into<String>,
    ) -> Self {
        Self {
            mimetype: mimetype.into(),
            width,
            height,
            depth: 24,
            url: url.into(),
        }
    }
}

/// Profil générique construit champ par champ.
#[derive(Debug, Clone, Default)]
pub struct BasicDevice {
    fields: HashMap<DeviceField, String>,
    icons: Vec<Icon>,
}

impl BasicDevice {
    /// Crée un profil de type `type_name`, version `version`, dans le domaine UPnP standard.
    pub fn new(type_name: &str, version: u32) -> Self {
        Self::default()
            .with_field(DeviceField::Type, type_name)
            .with_field(DeviceField::Version, version.to_string())
    }

    /// Définit un champ quelconque
    pub fn with_field(mut self, field: DeviceField, value: impl Into<String>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    pub fn with_domain(self, domain: &str) -> Self {
        self.with_field(DeviceField::Domain, domain)
    }

    pub fn with_friendly_name(self, name: &str) -> Self {
        self.with_field(DeviceField::FriendlyName, name)
    }

    pub fn with_manufacturer(self, manufacturer: &str) -> Self {
        self.with_field(DeviceField::Manufacturer, manufacturer)
    }

    pub fn with_model_name(self, name: &str) -> Self {
        self.with_field(DeviceField::ModelName, name)
    }

    /// Définit l'UDN, en ajoutant le préfixe `uuid:` si besoin
    pub fn with_udn(self, udn: &str) -> Self {
        let udn = udn.trim();
        let udn = if udn.starts_with("uuid:") {
            udn.to_string()
        } else {
            format!("uuid:{}", udn)
        };
        self.with_field(DeviceField::Udn, udn)
    }

    pub fn with_icon(mut self, icon: Icon) -> Self {
        self.icons.push(icon);
        self
    }
}

impl DeviceProfile for BasicDevice {
    fn field(&self, field: DeviceField) -> Option<String> {
        self.fields.get(&field).cloned()
    }

    fn icons(&self) -> &[Icon] {
        &self.icons
    }
}
