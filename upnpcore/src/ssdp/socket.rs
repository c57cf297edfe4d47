//! Transport UDP des messages SSDP.
//!
//! Deux modes de liaison :
//!
//! * serveur (hôte de devices) : `0.0.0.0:1900`, groupe multicast rejoint,
//!   reçoit les M-SEARCH et émet NOTIFY et réponses ;
//! * client (control point) : port éphémère, émet les M-SEARCH et reçoit les
//!   réponses unicast. Un client lié sur 1900 se ferait voler une partie des
//!   datagrammes par le serveur du même hôte.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info, trace, warn};

use super::{SSDP_MULTICAST_ADDR, SSDP_PORT, SsdpError, SsdpMessage};

/// Taille maximale d'un datagramme SSDP lu
const RECV_BUFFER_SIZE: usize = 4096;

/// Adresse multicast SSDP (239.255.255.250:1900)
pub fn multicast_addr() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(multicast_group(), SSDP_PORT))
}

fn multicast_group() -> Ipv4Addr {
    SSDP_MULTICAST_ADDR
        .parse()
        .unwrap_or(Ipv4Addr::new(239, 255, 255, 250))
}

/// Émission de messages SSDP.
///
/// Les composants qui émettent (hôte, control point) ne dépendent que de ce
/// trait, ce qui permet de les exercer sans réseau.
#[async_trait]
pub trait SsdpSender: Send + Sync {
    async fn send_to(&self, msg: &SsdpMessage, dest: SocketAddr) -> Result<(), SsdpError>;
}

/// Socket UDP SSDP
pub struct SsdpSocket {
    socket: UdpSocket,
}

impl SsdpSocket {
    /// Socket serveur sur le port 1900, membre du groupe multicast sur chaque
    /// interface IPv4 non loopback
    pub fn bind_server() -> Result<Self, SsdpError> {
        let raw = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        raw.set_reuse_address(true)?;
        #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
        raw.set_reuse_port(true)?;

        let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, SSDP_PORT));
        raw.bind(&bind_addr.into())?;
        raw.set_multicast_loop_v4(true)?;

        let group = multicast_group();
        let interfaces = upnputils::ipv4_interfaces();
        if interfaces.is_empty() {
            raw.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)?;
            debug!("SSDP: joined {} on default interface", group);
        }
        for (name, ipv4) in interfaces {
            match raw.join_multicast_v4(&group, &ipv4) {
                Ok(()) => debug!("SSDP: joined {} on {} ({})", group, ipv4, name),
                Err(e) => warn!("SSDP: failed to join {} on {} ({}): {}", group, ipv4, name, e),
            }
        }

        let socket = Self::into_tokio(raw)?;
        info!("✅ SSDP server socket bound on {}", bind_addr);
        Ok(socket)
    }

    /// Socket client sur un port éphémère
    pub fn bind_client() -> Result<Self, SsdpError> {
        let raw = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        raw.set_reuse_address(true)?;
        let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));
        raw.bind(&bind_addr.into())?;
        raw.set_multicast_loop_v4(true)?;

        let socket = Self::into_tokio(raw)?;
        info!("✅ SSDP client socket bound on {}", socket.local_addr()?);
        Ok(socket)
    }

    fn into_tokio(raw: Socket) -> io::Result<Self> {
        raw.set_nonblocking(true)?;
        let std_socket: std::net::UdpSocket = raw.into();
        Ok(Self {
            socket: UdpSocket::from_std(std_socket)?,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Attend le prochain datagramme ; `None` si son contenu n'est pas un
    /// message SSDP reconnu
    pub async fn recv(&self) -> Result<(Option<SsdpMessage>, SocketAddr), SsdpError> {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let (len, from) = self.socket.recv_from(&mut buf).await?;
        let data = String::from_utf8_lossy(&buf[..len]);
        let msg = SsdpMessage::parse(&data);
        if msg.is_none() {
            trace!("Ignoring non-SSDP datagram from {}", from);
        }
        Ok((msg, from))
    }
}

#[async_trait]
impl SsdpSender for SsdpSocket {
    async fn send_to(&self, msg: &SsdpMessage, dest: SocketAddr) -> Result<(), SsdpError> {
        let wire = msg.to_wire();
        match self.socket.send_to(wire.as_bytes(), dest).await {
            Ok(_) => {
                trace!("📤 SSDP {:?} sent to {}", msg.message_type, dest);
                Ok(())
            }
            Err(e) => {
                warn!("❌ Failed to send SSDP {:?} to {}: {}", msg.message_type, dest, e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multicast_addr() {
        assert_eq!(multicast_addr().to_string(), "239.255.255.250:1900");
    }
}
