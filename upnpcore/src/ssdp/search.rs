//! Recherche dans l'arbre des devices et construction des champs ST/NT/USN.

use tracing::{debug, warn};

use super::{MessageType, SSDP_ALL, SsdpMessage, UPNP_ROOTDEVICE};
use crate::devices::{DeviceRef, NodeRef, ServiceRef};
use crate::fields::{DeviceField, ServiceField};

/// Axe d'identité sur lequel un nœud a été trouvé
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    /// Marqueur `upnp:rootdevice`
    Root,
    /// Type du device ou du service
    Type,
    /// UDN exact du device
    Uuid,
}

/// Cible d'une recherche SSDP telle que reçue (`ST`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTarget {
    All,
    Root,
    Uuid(String),
    Type(String),
}

impl SearchTarget {
    /// Interprète une valeur `ST` ; `None` pour une cible inconnue
    pub fn parse(st: &str) -> Option<Self> {
        let st = st.trim();
        if st.eq_ignore_ascii_case(SSDP_ALL) {
            Some(SearchTarget::All)
        } else if st.eq_ignore_ascii_case(UPNP_ROOTDEVICE) {
            Some(SearchTarget::Root)
        } else if st.starts_with("uuid:") {
            Some(SearchTarget::Uuid(st.to_string()))
        } else if st.starts_with("urn:") {
            Some(SearchTarget::Type(st.to_string()))
        } else {
            debug!("Unsupported search target '{}'", st);
            None
        }
    }

    /// Cible de parcours de l'arbre, `None` pour `upnp:rootdevice`
    /// (la racine est traitée par l'hôte, pas par le parcours)
    pub fn filter_target(&self) -> Option<FilterTarget> {
        match self {
            SearchTarget::All => Some(FilterTarget::All),
            SearchTarget::Root => None,
            SearchTarget::Uuid(uuid) => Some(FilterTarget::Uuid(uuid.clone())),
            SearchTarget::Type(urn) => Some(FilterTarget::Type(urn.clone())),
        }
    }
}

/// Cible du parcours de l'arbre
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterTarget {
    /// Tous les nœuds, sur tous leurs axes d'identité
    All,
    /// Nœuds dont le type est exactement cette URN
    Type(String),
    /// Device dont l'UDN est exactement cette valeur
    Uuid(String),
}

impl FilterTarget {
    /// Les services n'ont pas d'UDN : une recherche par UUID ne les visite pas
    pub fn visits_services(&self) -> bool {
        !matches!(self, FilterTarget::Uuid(_))
    }
}

/// Filtre de recherche : cible et rappel invoqué pour chaque correspondance
pub struct SearchFilter<F> {
    pub target: FilterTarget,
    pub callback: F,
}

impl<F> SearchFilter<F> {
    pub fn new<'a>(target: FilterTarget, callback: F) -> Self
    where
        F: FnMut(NodeRef<'a>, MatchKind),
    {
        Self { target, callback }
    }
}

impl<'a> DeviceRef<'a> {
    /// Parcourt le sous-arbre et invoque le rappel pour chaque correspondance.
    ///
    /// Ordre déterministe : le device, puis ses services, puis ses sous-devices,
    /// récursivement. `All` produit deux correspondances par device (`Uuid`
    /// puis `Type`). Les services, sans UDN, ne sont pas visités pour `Uuid`.
    pub fn search<F>(&self, filter: &mut SearchFilter<F>)
    where
        F: FnMut(NodeRef<'a>, MatchKind),
    {
        let node = NodeRef::Device(*self);
        match &filter.target {
            FilterTarget::All => {
                (filter.callback)(node, MatchKind::Uuid);
                (filter.callback)(node, MatchKind::Type);
            }
            FilterTarget::Type(urn) => {
                if *urn == self.device_type() {
                    (filter.callback)(node, MatchKind::Type);
                }
            }
            FilterTarget::Uuid(udn) => {
                if *udn == self.udn() {
                    (filter.callback)(node, MatchKind::Uuid);
                }
            }
        }

        if filter.target.visits_services() {
            for service in self.services() {
                service.search(filter);
            }
        }

        for device in self.devices() {
            device.search(filter);
        }
    }

    /// Renseigne SERVER, LOCATION, ST (ou NT) et USN pour une correspondance
    pub fn format_message(&self, msg: &mut SsdpMessage, kind: MatchKind) -> bool {
        msg.set("SERVER", self.field_or_empty(DeviceField::ServerId));
        msg.set("LOCATION", self.tree().get_url(&self.description_url()));

        let udn = self.udn();
        let (st, usn) = match kind {
            MatchKind::Root => {
                let st = UPNP_ROOTDEVICE.to_string();
                let usn = format!("{}::{}", udn, st);
                (st, usn)
            }
            MatchKind::Type => {
                let st = self.device_type();
                let usn = format!("{}::{}", udn, st);
                (st, usn)
            }
            MatchKind::Uuid => (udn.clone(), udn),
        };

        set_target(msg, st);
        msg.set("USN", usn);
        true
    }
}

impl<'a> ServiceRef<'a> {
    /// Un service ne correspond que sur son type
    pub fn search<F>(&self, filter: &mut SearchFilter<F>)
    where
        F: FnMut(NodeRef<'a>, MatchKind),
    {
        let matched = match &filter.target {
            FilterTarget::All => true,
            FilterTarget::Type(urn) => *urn == self.service_type(),
            FilterTarget::Uuid(_) => false,
        };
        if matched {
            (filter.callback)(NodeRef::Service(*self), MatchKind::Type);
        }
    }

    /// Champs SSDP d'un service : identité serveur et description de son device,
    /// USN = UDN du device + `::` + type du service
    pub fn format_message(&self, msg: &mut SsdpMessage, kind: MatchKind) -> bool {
        if kind != MatchKind::Type {
            warn!(
                "❌ Invalid match kind {:?} for service {}",
                kind,
                self.service_type()
            );
            return false;
        }

        let device = self.device();
        msg.set("SERVER", device.field_or_empty(DeviceField::ServerId));
        msg.set("LOCATION", self.tree().get_url(&device.description_url()));

        let st = self.field_or_empty(ServiceField::ServiceType);
        msg.set("USN", format!("{}::{}", device.udn(), st));
        set_target(msg, st);
        true
    }
}

impl<'a> NodeRef<'a> {
    pub fn search<F>(&self, filter: &mut SearchFilter<F>)
    where
        F: FnMut(NodeRef<'a>, MatchKind),
    {
        match self {
            NodeRef::Device(d) => d.search(filter),
            NodeRef::Service(s) => s.search(filter),
        }
    }

    pub fn format_message(&self, msg: &mut SsdpMessage, kind: MatchKind) -> bool {
        match self {
            NodeRef::Device(d) => d.format_message(msg, kind),
            NodeRef::Service(s) => s.format_message(msg, kind),
        }
    }
}

fn set_target(msg: &mut SsdpMessage, st: String) {
    if msg.message_type == MessageType::Notify {
        msg.set("NT", st);
    } else {
        msg.set("ST", st);
    }
}
