//! # Module SOAP
//!
//! Enveloppes SOAP des actions de contrôle UPnP : parsing des requêtes reçues
//! par un service hébergé, construction des réponses et des faults, et
//! construction des requêtes émises par un control point.
//!
//! ```ignore
//! use upnpcore::soap::{parse_soap_action, build_soap_response};
//!
//! let action = parse_soap_action(body)?;
//! assert_eq!(action.name, "SetTarget");
//! let xml = build_soap_response(
//!     "urn:schemas-upnp-org:service:SwitchPower:1",
//!     "SetTarget",
//!     Vec::new(),
//! )?;
//! ```

mod builder;
mod envelope;
mod fault;
mod parser;

pub use builder::{build_soap_request, build_soap_response};
pub use envelope::{SoapBody, SoapEnvelope};
pub use fault::{SoapFault, UpnpError, build_soap_fault, parse_soap_fault};
pub use parser::{SoapAction, SoapParseError, parse_soap_action, parse_soap_envelope};

/// Espace de noms de l'enveloppe SOAP 1.1
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Style d'encodage SOAP 1.1
pub const SOAP_ENCODING_STYLE: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// Codes d'erreur SOAP UPnP standards
pub mod error_codes {
    /// Action invalide
    pub const INVALID_ACTION: &str = "401";

    /// Arguments invalides
    pub const INVALID_ARGS: &str = "402";

    /// Action échouée
    pub const ACTION_FAILED: &str = "501";

    /// Valeur d'argument invalide
    pub const ARGUMENT_VALUE_INVALID: &str = "600";

    /// Argument hors limites
    pub const ARGUMENT_VALUE_OUT_OF_RANGE: &str = "601";

    /// Action optionnelle non implémentée
    pub const OPTIONAL_ACTION_NOT_IMPLEMENTED: &str = "602";
}
