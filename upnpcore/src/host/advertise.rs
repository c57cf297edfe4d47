//! Rôle serveur SSDP : réponses aux M-SEARCH, NOTIFY alive et byebye.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::DeviceHost;
use crate::devices::NodeRef;
use crate::ssdp::{
    MatchKind, MessageType, NTS_ALIVE, NTS_BYEBYE, SSDP_MULTICAST_ADDR, SSDP_PORT, SearchFilter,
    SearchTarget, SsdpMessage, SsdpSocket, multicast_addr,
};

impl DeviceHost {
    /// Correspondances `(nœud, axe)` d'une cible de recherche sur tous les arbres.
    ///
    /// `ssdp:all` et `upnp:rootdevice` ajoutent la correspondance `Root` de
    /// chaque device racine avant le parcours de son arbre.
    pub fn search_matches(&self, target: &SearchTarget) -> Vec<(NodeRef<'_>, MatchKind)> {
        let mut matches = Vec::new();
        for root in &self.roots {
            let device = root.root();
            if matches!(target, SearchTarget::All | SearchTarget::Root) {
                matches.push((NodeRef::Device(device), MatchKind::Root));
            }
            if let Some(filter_target) = target.filter_target() {
                let mut filter = SearchFilter::new(filter_target, |node, kind| {
                    matches.push((node, kind))
                });
                device.search(&mut filter);
            }
        }
        matches
    }

    /// Réponses unicast à un M-SEARCH pour la cible `st`
    pub fn search_responses(&self, st: &str) -> Vec<SsdpMessage> {
        let Some(target) = SearchTarget::parse(st) else {
            return Vec::new();
        };

        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        self.search_matches(&target)
            .into_iter()
            .filter_map(|(node, kind)| {
                let mut msg = SsdpMessage::new(MessageType::Response);
                msg.set("CACHE-CONTROL", format!("max-age={}", self.config.max_age));
                msg.set("DATE", date.as_str());
                msg.set("EXT", "");
                node.format_message(&mut msg, kind).then_some(msg)
            })
            .collect()
    }

    /// NOTIFY `nts` (`ssdp:alive` ou `ssdp:byebye`) pour chaque correspondance
    /// de tous les arbres
    pub fn notify_messages(&self, nts: &str) -> Vec<SsdpMessage> {
        self.search_matches(&SearchTarget::All)
            .into_iter()
            .filter_map(|(node, kind)| {
                let mut msg = SsdpMessage::new(MessageType::Notify);
                msg.set("HOST", format!("{}:{}", SSDP_MULTICAST_ADDR, SSDP_PORT));
                if nts == NTS_ALIVE {
                    msg.set("CACHE-CONTROL", format!("max-age={}", self.config.max_age));
                }
                msg.set("NTS", nts);
                node.format_message(&mut msg, kind).then_some(msg)
            })
            .collect()
    }

    /// Multicast des NOTIFY `nts`, retourne le nombre de messages envoyés
    pub async fn advertise(&self, nts: &str) -> usize {
        let messages = self.notify_messages(nts);
        let dest = multicast_addr();
        let mut sent = 0;
        for msg in &messages {
            match self.sender.send_to(msg, dest).await {
                Ok(()) => sent += 1,
                Err(e) => warn!("❌ NOTIFY {} failed for {:?}: {}", nts, msg.usn(), e),
            }
        }
        info!("📤 NOTIFY {}: {}/{} messages sent", nts, sent, messages.len());
        sent
    }

    /// Annonce le départ de tous les devices
    pub async fn shutdown(&self) -> usize {
        self.advertise(NTS_BYEBYE).await
    }

    /// Délai aléatoire avant réponse : `[0, min(MX, borne configurée)]`
    fn response_delay(&self, mx: Option<u32>) -> Duration {
        let bound = self.config.max_response_delay.as_millis() as u64;
        let max_ms = match mx {
            Some(mx) => bound.min(u64::from(mx) * 1000),
            None => bound,
        };
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }

    /// Traite un message reçu ; seuls les M-SEARCH `ssdp:discover` obtiennent
    /// une réponse. Retourne le nombre de réponses envoyées.
    pub async fn handle_ssdp_message(&self, msg: &SsdpMessage, from: SocketAddr) -> usize {
        if !msg.is_discover() {
            trace!("Ignoring SSDP {:?} from {}", msg.message_type, from);
            return 0;
        }
        let Some(st) = msg.target() else {
            debug!("M-SEARCH without ST from {}", from);
            return 0;
        };

        let responses = self.search_responses(st);
        if responses.is_empty() {
            return 0;
        }

        let delay = self.response_delay(msg.mx());
        debug!(
            "M-SEARCH {} from {}: {} responses in {:?}",
            st,
            from,
            responses.len(),
            delay
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut sent = 0;
        for response in &responses {
            match self.sender.send_to(response, from).await {
                Ok(()) => sent += 1,
                Err(e) => warn!("❌ Search response to {} failed: {}", from, e),
            }
        }
        sent
    }

    /// Boucle d'annonces périodiques ; la première annonce part immédiatement
    pub async fn run_advertiser(self: Arc<Self>) {
        let period = self.config.advertise_interval.max(Duration::from_secs(1));
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            self.advertise(NTS_ALIVE).await;
        }
    }

    /// Boucle de réception : chaque M-SEARCH est traité dans sa propre tâche
    /// pour que le délai de réponse ne bloque pas la réception
    pub async fn run_listener(self: Arc<Self>, socket: Arc<SsdpSocket>) {
        loop {
            match socket.recv().await {
                Ok((Some(msg), from)) => {
                    let host = self.clone();
                    tokio::spawn(async move {
                        host.handle_ssdp_message(&msg, from).await;
                    });
                }
                Ok((None, _)) => {}
                Err(e) => {
                    warn!("❌ SSDP receive error: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    /// Lance l'annonceur et l'écoute SSDP
    pub fn spawn_ssdp(self: Arc<Self>, socket: Arc<SsdpSocket>) -> Vec<JoinHandle<()>> {
        vec![
            tokio::spawn(self.clone().run_advertiser()),
            tokio::spawn(self.run_listener(socket)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{BasicDevice, RootDevice};
    use crate::host::HostConfig;
    use crate::services::BasicService;
    use crate::ssdp::{SsdpError, SsdpSender};
    use async_trait::async_trait;

    struct NullSender;

    #[async_trait]
    impl SsdpSender for NullSender {
        async fn send_to(&self, _msg: &SsdpMessage, _dest: SocketAddr) -> Result<(), SsdpError> {
            Ok(())
        }
    }

    fn host() -> DeviceHost {
        let mut tree = RootDevice::new(BasicDevice::new("Basic", 1).with_udn("abc"));
        tree.add_service(RootDevice::ROOT, BasicService::new("SwitchPower", 1))
            .unwrap();
        let mut host = DeviceHost::new(Arc::new(NullSender), HostConfig::default());
        host.register_device(tree).unwrap();
        host
    }

    #[test]
    fn test_all_adds_root_match_first() {
        let host = host();
        let kinds: Vec<MatchKind> = host
            .search_matches(&SearchTarget::All)
            .into_iter()
            .map(|(_, kind)| kind)
            .collect();
        assert_eq!(
            kinds,
            vec![MatchKind::Root, MatchKind::Uuid, MatchKind::Type, MatchKind::Type]
        );
        assert_eq!(host.search_matches(&SearchTarget::Root).len(), 1);
    }

    #[test]
    fn test_search_response_headers() {
        let host = host();
        let responses = host.search_responses("upnp:rootdevice");
        assert_eq!(responses.len(), 1);
        let msg = &responses[0];
        assert_eq!(msg.get("CACHE-CONTROL"), Some("max-age=1800"));
        assert_eq!(msg.get("EXT"), Some(""));
        assert!(msg.get("DATE").is_some_and(|d| d.ends_with("GMT")));
        assert_eq!(msg.usn(), Some("uuid:abc::upnp:rootdevice"));

        assert!(host.search_responses("urn:other:device:Nope:1").is_empty());
        assert!(host.search_responses("garbage").is_empty());
    }

    #[test]
    fn test_byebye_has_no_cache_control() {
        let host = host();
        let messages = host.notify_messages(NTS_BYEBYE);
        assert_eq!(messages.len(), 4);
        assert!(messages.iter().all(|m| m.get("CACHE-CONTROL").is_none()));
        assert!(messages.iter().all(|m| m.get("NTS") == Some(NTS_BYEBYE)));
    }

    #[test]
    fn test_response_delay_bounds() {
        let host = host();
        for _ in 0..50 {
            assert!(host.response_delay(Some(1)) <= Duration::from_secs(1));
        }
        let mut config = HostConfig::default();
        config.max_response_delay = Duration::ZERO;
        let quiet = DeviceHost::new(Arc::new(NullSender), config);
        assert_eq!(quiet.response_delay(Some(5)), Duration::ZERO);
    }
}
