//! Schéma des champs des devices et services.
//!
//! Chaque nature de nœud possède une énumération fermée et ordonnée de champs.
//! L'ordre de déclaration est celui des éléments XML générés. Les champs
//! « custom » (à partir de `CUSTOM_START`) sont calculés et ne figurent jamais
//! dans la description.

/// Valeur retournée pour un champ obligatoire que le device ne fournit pas
pub const REQUIRED_FIELD: &str = "REQUIRED FIELD";

macro_rules! field_schema {
    (
        $(#[$meta:meta])*
        $name:ident {
            described: [$($field:ident => $xml:literal $(, $req:ident)?;)*]
            custom: [$($custom:ident => $cname:literal;)*]
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($field,)*
            $($custom,)*
        }

        impl $name {
            /// Tous les champs, dans l'ordre du schéma
            pub const ALL: &'static [$name] = &[$($name::$field,)* $($name::$custom,)*];

            /// Champs décrits dans le XML (avant `CUSTOM_START`)
            pub const DESCRIBED: &'static [$name] = &[$($name::$field,)*];

            /// Premier champ calculé
            pub const CUSTOM_START: $name = field_schema!(@first $($custom)*);

            /// Nom de l'élément XML (ou de la clé) du champ
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$field => $xml,)*
                    $($name::$custom => $cname,)*
                }
            }

            /// Le champ est-il obligatoire dans une description valide ?
            pub fn is_required(&self) -> bool {
                match self {
                    $($name::$field => field_schema!(@req $($req)?),)*
                    $($name::$custom => false,)*
                }
            }

            pub fn is_custom(&self) -> bool {
                *self >= Self::CUSTOM_START
            }

            pub fn from_name(name: &str) -> Option<$name> {
                Self::ALL.iter().copied().find(|f| f.name() == name)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
    (@first $first:ident $($rest:ident)*) => { Self::$first };
    (@req required) => { true };
    (@req) => { false };
}

field_schema! {
    /// Champs d'un device
    DeviceField {
        described: [
            DeviceType => "deviceType", required;
            FriendlyName => "friendlyName", required;
            Manufacturer => "manufacturer", required;
            ManufacturerUrl => "manufacturerURL";
            ModelDescription => "modelDescription";
            ModelName => "modelName", required;
            ModelNumber => "modelNumber";
            ModelUrl => "modelURL";
            SerialNumber => "serialNumber";
            Udn => "UDN", required;
            Upc => "UPC";
            PresentationUrl => "presentationURL";
        ]
        custom: [
            Domain => "domain";
            Type => "type";
            Version => "version";
            BaseUrl => "baseURL";
            DescriptionUrl => "descriptionURL";
            ServerId => "serverId";
        ]
    }
}

field_schema! {
    /// Champs d'un service
    ServiceField {
        described: [
            ServiceType => "serviceType", required;
            ServiceId => "serviceId", required;
            ScpdUrl => "SCPDURL", required;
            ControlUrl => "controlURL", required;
            EventSubUrl => "eventSubURL", required;
        ]
        custom: [
            Domain => "domain";
            Type => "type";
            Version => "version";
            BaseUrl => "baseURL";
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_schema_order() {
        let names: Vec<_> = DeviceField::DESCRIBED.iter().map(|f| f.name()).collect();
        assert_eq!(names.first(), Some(&"deviceType"));
        assert_eq!(names.last(), Some(&"presentationURL"));
        assert_eq!(DeviceField::CUSTOM_START, DeviceField::Domain);
        assert_eq!(DeviceField::ALL.len(), DeviceField::DESCRIBED.len() + 6);
    }

    #[test]
    fn test_required_and_custom_flags() {
        assert!(DeviceField::Udn.is_required());
        assert!(!DeviceField::Upc.is_required());
        assert!(DeviceField::ServerId.is_custom());
        assert!(!DeviceField::PresentationUrl.is_custom());
        assert!(ServiceField::EventSubUrl.is_required());
        assert_eq!(ServiceField::CUSTOM_START, ServiceField::Domain);
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(ServiceField::from_name("SCPDURL"), Some(ServiceField::ScpdUrl));
        assert_eq!(DeviceField::from_name("unknown"), None);
    }
}
