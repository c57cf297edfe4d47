use get_if_addrs::get_if_addrs;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Devine l'adresse IP locale de la machine.
///
/// Crée un socket UDP lié à `0.0.0.0:0` et le « connecte » vers `8.8.8.8:80` :
/// aucun paquet n'est émis, mais le système choisit l'interface de sortie,
/// dont on lit l'adresse. En cas d'échec, retourne `127.0.0.1`.
pub fn guess_local_ip() -> String {
    match UdpSocket::bind("0.0.0.0:0") {
        Ok(socket) => {
            if socket.connect("8.8.8.8:80").is_ok() {
                if let Ok(local_addr) = socket.local_addr() {
                    return local_addr.ip().to_string();
                }
            }
            "127.0.0.1".to_string()
        }
        Err(_) => "127.0.0.1".to_string(),
    }
}

/// Liste les adresses IPv4 non-loopback des interfaces réseau.
///
/// Retourne des couples `(nom d'interface, adresse)`, dans l'ordre du système.
/// Une erreur d'énumération donne une liste vide.
pub fn ipv4_interfaces() -> Vec<(String, Ipv4Addr)> {
    let Ok(interfaces) = get_if_addrs() else {
        return Vec::new();
    };

    interfaces
        .into_iter()
        .filter_map(|iface| match iface.ip() {
            IpAddr::V4(ip) if !ip.is_loopback() => Some((iface.name, ip)),
            _ => None,
        })
        .collect()
}
