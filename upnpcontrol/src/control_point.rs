//! # Control point SSDP
//!
//! Une seule recherche est active à la fois. [`ControlPoint::begin_search`]
//! émet un M-SEARCH et retourne un [`SearchHandle`] qui livre chaque réponse
//! dont le `ST` (ou le `NT` d'un NOTIFY) est exactement la cible cherchée.
//! Après [`ControlPoint::cancel_search`], le handle ne livre plus rien, même
//! les réponses déjà reçues.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use upnpcore::ssdp::{
    MessageType, NTS_BYEBYE, SsdpMessage, SsdpSender, SsdpSocket, multicast_addr,
};

use crate::classes::{ClassRegistry, DeviceControl, class_registry};
use crate::description::{RootDescription, parse_device_description};
use crate::errors::ControlPointError;
use crate::http::DescriptionClient;

/// Réponse reçue pour une recherche
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub message: SsdpMessage,
    pub from: SocketAddr,
}

struct ActiveSearch {
    target: String,
    cancelled: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<SearchResponse>,
}

/// Réponses d'une recherche en cours
pub struct SearchHandle {
    target: String,
    cancelled: Arc<AtomicBool>,
    rx: mpsc::UnboundedReceiver<SearchResponse>,
}

impl SearchHandle {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Prochaine réponse ; `None` une fois la recherche annulée
    pub async fn next(&mut self) -> Option<SearchResponse> {
        if self.is_cancelled() {
            return None;
        }
        let response = self.rx.recv().await?;
        // l'annulation a pu survenir pendant l'attente
        if self.is_cancelled() {
            return None;
        }
        Some(response)
    }

    /// Réponse déjà reçue, sans attendre
    pub fn try_next(&mut self) -> Option<SearchResponse> {
        if self.is_cancelled() {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Réponses reçues pendant `window`
    pub async fn collect_for(&mut self, window: Duration) -> Vec<SearchResponse> {
        let mut responses = Vec::new();
        let deadline = tokio::time::Instant::now() + window;
        while let Ok(Some(response)) = tokio::time::timeout_at(deadline, self.next()).await {
            responses.push(response);
        }
        responses
    }
}

/// Device découvert par [`ControlPoint::begin_device_search`]
pub struct DiscoveredDevice {
    pub message: SsdpMessage,
    pub location: String,
    /// `None` si la description n'a pu être récupérée ou lue
    pub description: Option<RootDescription>,
    /// `None` si le type du device n'a pas de classe enregistrée
    pub control: Option<Box<dyn DeviceControl>>,
}

/// Recherche dont chaque `LOCATION` distincte est résolue en description
pub struct DeviceSearch {
    search: SearchHandle,
    client: Arc<dyn DescriptionClient>,
    registry: &'static ClassRegistry,
    timeout: Duration,
    seen: HashSet<String>,
}

impl DeviceSearch {
    pub fn target(&self) -> &str {
        self.search.target()
    }

    /// Prochain device non encore vu ; `None` une fois la recherche annulée
    pub async fn next(&mut self) -> Option<DiscoveredDevice> {
        loop {
            let response = self.search.next().await?;
            let Some(location) = response.message.location().map(str::to_string) else {
                debug!("Search response without LOCATION from {}", response.from);
                continue;
            };
            if !self.seen.insert(location.clone()) {
                continue;
            }

            let description = match self.fetch(&location).await {
                Ok(description) => Some(description),
                Err(e) => {
                    warn!("❌ Cannot read description at {}: {}", location, e);
                    None
                }
            };
            if self.search.is_cancelled() {
                return None;
            }

            let control = description.as_ref().and_then(|root| {
                self.registry.instantiate(
                    &root.device,
                    &location,
                    root.base(&location),
                    self.client.clone(),
                )
            });

            return Some(DiscoveredDevice {
                message: response.message,
                location,
                description,
                control,
            });
        }
    }

    async fn fetch(&self, location: &str) -> Result<RootDescription, ControlPointError> {
        let response = tokio::time::timeout(self.timeout, self.client.get(location))
            .await
            .map_err(|_| ControlPointError::timeout(location, self.timeout.as_millis() as u64))??;
        if !response.is_success() {
            return Err(ControlPointError::http_status(location, response.status));
        }
        parse_device_description(response.body.as_bytes())
    }
}

pub struct ControlPoint {
    sender: Arc<dyn SsdpSender>,
    mx: u32,
    registry: &'static ClassRegistry,
    active: Mutex<Option<ActiveSearch>>,
}

impl ControlPoint {
    pub fn new(sender: Arc<dyn SsdpSender>, mx: u32) -> Self {
        Self {
            sender,
            mx,
            registry: class_registry(),
            active: Mutex::new(None),
        }
    }

    /// Registre utilisé à la place du registre global
    pub fn with_registry(mut self, registry: &'static ClassRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Cible de la recherche active
    pub fn active_target(&self) -> Option<String> {
        self.active.lock().as_ref().map(|s| s.target.clone())
    }

    /// Lance une recherche pour `target`, en annulant la précédente
    pub async fn begin_search(&self, target: &str) -> Result<SearchHandle, ControlPointError> {
        self.cancel_search();

        let cancelled = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::unbounded_channel();
        *self.active.lock() = Some(ActiveSearch {
            target: target.to_string(),
            cancelled: cancelled.clone(),
            tx,
        });

        let search = SsdpMessage::search(target, self.mx);
        if let Err(e) = self.sender.send_to(&search, multicast_addr()).await {
            self.cancel_search();
            return Err(e.into());
        }
        info!("📡 M-SEARCH {} (MX {})", target, self.mx);

        Ok(SearchHandle {
            target: target.to_string(),
            cancelled,
            rx,
        })
    }

    /// Lance une recherche dont les réponses sont résolues en devices
    pub async fn begin_device_search(
        &self,
        target: &str,
        client: Arc<dyn DescriptionClient>,
        timeout: Duration,
    ) -> Result<DeviceSearch, ControlPointError> {
        let search = self.begin_search(target).await?;
        Ok(DeviceSearch {
            search,
            client,
            registry: self.registry,
            timeout,
            seen: HashSet::new(),
        })
    }

    /// Annule la recherche active ; ses réponses en attente sont abandonnées
    pub fn cancel_search(&self) {
        if let Some(search) = self.active.lock().take() {
            search.cancelled.store(true, Ordering::Release);
            debug!("Search for {} cancelled", search.target);
        }
    }

    /// Transmet `msg` à la recherche active s'il y répond.
    ///
    /// Retourne `true` si le message a été livré.
    pub fn handle_message(&self, msg: &SsdpMessage, from: SocketAddr) -> bool {
        let guard = self.active.lock();
        let Some(search) = guard.as_ref() else {
            return false;
        };
        if search.cancelled.load(Ordering::Acquire) {
            return false;
        }

        match msg.message_type {
            MessageType::Response => {}
            MessageType::Notify if msg.get("NTS") != Some(NTS_BYEBYE) => {}
            _ => return false,
        }
        if msg.target() != Some(search.target.as_str()) {
            trace!("Ignoring {:?} for {:?}", msg.message_type, msg.target());
            return false;
        }

        search
            .tx
            .send(SearchResponse {
                message: msg.clone(),
                from,
            })
            .is_ok()
    }

    /// Boucle de réception des réponses sur `socket`
    pub async fn run_listener(self: Arc<Self>, socket: Arc<SsdpSocket>) {
        loop {
            match socket.recv().await {
                Ok((Some(msg), from)) => {
                    self.handle_message(&msg, from);
                }
                Ok((None, _)) => {}
                Err(e) => {
                    warn!("❌ SSDP receive error: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
}
