//! File des documents de description à récupérer.

use std::fmt;

use url::Url;

use crate::errors::ControlPointError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    /// Document de description d'un device
    Device,
    /// Document SCPD d'un service
    Service,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Pending,
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchState::Pending => "pending",
            FetchState::Success => "success",
            FetchState::Failed => "failed",
            FetchState::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Un document à récupérer.
///
/// `root` et `path` indiquent où ranger le document : `root` est
/// `{host}/{port}/` de l'URL, `path` est le chemin relatif du document de
/// device, ou le type du service pour un SCPD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetch {
    pub kind: FetchKind,
    pub url: String,
    pub root: String,
    pub path: String,
    pub state: FetchState,
    pub attempts: u32,
}

impl Fetch {
    fn new(kind: FetchKind, url: &str, path: Option<&str>) -> Result<Self, ControlPointError> {
        let parsed = Url::parse(url).map_err(|e| ControlPointError::invalid_url(url, e))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ControlPointError::invalid_url(url, "no host"))?;
        let port = parsed.port_or_known_default().unwrap_or(80);

        Ok(Self {
            kind,
            url: parsed.to_string(),
            root: format!("{}/{}/", host, port),
            path: path
                .map(str::to_string)
                .unwrap_or_else(|| parsed.path().trim_start_matches('/').to_string()),
            state: FetchState::Pending,
            attempts: 0,
        })
    }

    /// Description de device à l'URL `location`
    pub fn device(location: &str) -> Result<Self, ControlPointError> {
        Self::new(FetchKind::Device, location, None)
    }

    /// SCPD d'un service de type `service_type`, `scpd_url` étant absolue
    pub fn service(scpd_url: &str, service_type: &str) -> Result<Self, ControlPointError> {
        Self::new(FetchKind::Service, scpd_url, Some(service_type))
    }

    pub fn is_pending(&self) -> bool {
        self.state == FetchState::Pending
    }
}

/// Décompte des entrées par état
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchCounts {
    pub pending: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// File des récupérations, consommée dans l'ordre d'insertion.
///
/// Une URL n'y figure qu'une fois par nature de document : une entrée qui a
/// quitté l'état `Pending` n'est jamais revisitée.
#[derive(Debug, Default)]
pub struct FetchQueue {
    entries: Vec<Fetch>,
}

impl FetchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute `fetch` en queue ; `false` si son URL est déjà connue
    pub fn push(&mut self, fetch: Fetch) -> bool {
        if self.contains(fetch.kind, &fetch.url) {
            return false;
        }
        self.entries.push(fetch);
        true
    }

    pub fn contains(&self, kind: FetchKind, url: &str) -> bool {
        self.entries.iter().any(|f| f.kind == kind && f.url == url)
    }

    /// Index de la première entrée en attente
    pub fn find_pending(&self) -> Option<usize> {
        self.entries.iter().position(Fetch::is_pending)
    }

    pub fn get(&self, index: usize) -> Option<&Fetch> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Fetch> {
        self.entries.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fetch> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plus aucune entrée en attente
    pub fn is_drained(&self) -> bool {
        self.find_pending().is_none()
    }

    pub fn counts(&self) -> FetchCounts {
        self.entries
            .iter()
            .fold(FetchCounts::default(), |mut counts, f| {
                match f.state {
                    FetchState::Pending => counts.pending += 1,
                    FetchState::Success => counts.success += 1,
                    FetchState::Failed => counts.failed += 1,
                    FetchState::Skipped => counts.skipped += 1,
                }
                counts
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_fetch_layout() {
        let fetch = Fetch::device("http://192.168.1.20:8080/BinaryLight/desc.xml").unwrap();
        assert_eq!(fetch.root, "192.168.1.20/8080/");
        assert_eq!(fetch.path, "BinaryLight/desc.xml");
        assert_eq!(fetch.state, FetchState::Pending);
        assert_eq!(fetch.attempts, 0);

        let fetch = Fetch::device("http://box.local/desc.xml").unwrap();
        assert_eq!(fetch.root, "box.local/80/");

        let scpd = Fetch::service(
            "http://192.168.1.20:8080/BinaryLight/SwitchPower/scpd.xml",
            "urn:schemas-upnp-org:service:SwitchPower:1",
        )
        .unwrap();
        assert_eq!(scpd.kind, FetchKind::Service);
        assert_eq!(scpd.path, "urn:schemas-upnp-org:service:SwitchPower:1");

        assert!(Fetch::device("/relative/desc.xml").is_err());
    }

    #[test]
    fn test_queue_is_fifo_and_deduplicated() {
        let mut queue = FetchQueue::new();
        assert!(queue.push(Fetch::device("http://a:1/d.xml").unwrap()));
        assert!(queue.push(Fetch::device("http://b:1/d.xml").unwrap()));
        assert!(!queue.push(Fetch::device("http://a:1/d.xml").unwrap()));
        assert!(queue.push(Fetch::service("http://a:1/d.xml", "urn:x:service:y:1").unwrap()));
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.find_pending(), Some(0));
        queue.get_mut(0).unwrap().state = FetchState::Failed;
        assert_eq!(queue.find_pending(), Some(1));
        queue.get_mut(1).unwrap().state = FetchState::Success;
        queue.get_mut(2).unwrap().state = FetchState::Skipped;
        assert!(queue.is_drained());

        // une URL déjà traitée n'est pas remise en file
        assert!(!queue.push(Fetch::device("http://a:1/d.xml").unwrap()));
        assert_eq!(
            queue.counts(),
            FetchCounts {
                pending: 0,
                success: 1,
                failed: 1,
                skipped: 1
            }
        );
    }
}
