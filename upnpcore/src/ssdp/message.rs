//! Messages SSDP : requête M-SEARCH, réponse de recherche, NOTIFY.

use std::fmt;
use std::str::FromStr;

use tracing::trace;

use super::{MAX_AGE, SSDP_MULTICAST_ADDR, SSDP_PORT, SsdpError};

/// Discriminant du type de message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// `M-SEARCH * HTTP/1.1`
    Request,
    /// `HTTP/1.1 200 OK`
    Response,
    /// `NOTIFY * HTTP/1.1`
    Notify,
}

impl MessageType {
    fn start_line(&self) -> &'static str {
        match self {
            MessageType::Request => "M-SEARCH * HTTP/1.1",
            MessageType::Response => "HTTP/1.1 200 OK",
            MessageType::Notify => "NOTIFY * HTTP/1.1",
        }
    }
}

/// Message SSDP : type et en-têtes ordonnés, noms insensibles à la casse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsdpMessage {
    pub message_type: MessageType,
    headers: Vec<(String, String)>,
}

impl SsdpMessage {
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            headers: Vec::new(),
        }
    }

    /// M-SEARCH multicast pour la cible `st`
    pub fn search(st: &str, mx: u32) -> Self {
        let mut msg = Self::new(MessageType::Request);
        msg.set("HOST", format!("{}:{}", SSDP_MULTICAST_ADDR, SSDP_PORT));
        msg.set("MAN", "\"ssdp:discover\"");
        msg.set("MX", mx.max(1).to_string());
        msg.set("ST", st);
        msg
    }

    /// Valeur d'un en-tête
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Définit un en-tête, en remplaçant une valeur existante à sa place
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(header) => header.1 = value,
            None => self.headers.push((name.to_ascii_uppercase(), value)),
        }
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Cible du message : `NT` pour un NOTIFY, `ST` sinon
    pub fn target(&self) -> Option<&str> {
        match self.message_type {
            MessageType::Notify => self.get("NT"),
            _ => self.get("ST"),
        }
    }

    pub fn usn(&self) -> Option<&str> {
        self.get("USN")
    }

    pub fn location(&self) -> Option<&str> {
        self.get("LOCATION")
    }

    /// `max-age` de `CACHE-CONTROL`, [`MAX_AGE`] à défaut
    pub fn max_age(&self) -> u32 {
        parse_max_age(self.get("CACHE-CONTROL"))
    }

    /// Valeur de `MX`, bornée à 1 au minimum
    pub fn mx(&self) -> Option<u32> {
        self.get("MX")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .map(|mx| mx.max(1))
    }

    /// Le message est-il une recherche `ssdp:discover` ?
    pub fn is_discover(&self) -> bool {
        self.message_type == MessageType::Request
            && self
                .get("MAN")
                .is_some_and(|man| man.trim_matches('"').eq_ignore_ascii_case("ssdp:discover"))
    }

    /// Parse un datagramme SSDP ; `None` si la ligne de départ est inconnue
    pub fn parse(data: &str) -> Option<Self> {
        let mut lines = data.lines();
        let first_line = lines.next()?.trim();
        let upper = first_line.to_ascii_uppercase();

        let message_type = if upper.starts_with("M-SEARCH ") {
            MessageType::Request
        } else if upper.starts_with("NOTIFY ") {
            MessageType::Notify
        } else if upper.starts_with("HTTP/") && upper.contains(" 200") {
            MessageType::Response
        } else {
            trace!("Unknown SSDP message type: {}", first_line);
            return None;
        };

        let mut msg = Self::new(message_type);
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                break;
            }
            // Les valeurs peuvent contenir ':'
            match line.split_once(':') {
                Some((name, value)) if !name.trim().is_empty() => {
                    msg.set(name.trim(), value.trim());
                }
                _ => trace!("Skipping malformed header: '{}'", line),
            }
        }
        Some(msg)
    }

    /// Forme sérialisée, prête à l'envoi
    pub fn to_wire(&self) -> String {
        let mut out = String::with_capacity(256);
        out.push_str(self.message_type.start_line());
        out.push_str("\r\n");
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push(':');
            if !value.is_empty() {
                out.push(' ');
                out.push_str(value);
            }
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out
    }
}

impl fmt::Display for SsdpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for SsdpMessage {
    type Err = SsdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            SsdpError::InvalidMessage(s.lines().next().unwrap_or_default().to_string())
        })
    }
}

fn parse_max_age(value: Option<&str>) -> u32 {
    if let Some(v) = value {
        let lower = v.to_ascii_lowercase();
        if let Some(idx) = lower.find("max-age") {
            let after_eq = lower[idx + 7..]
                .trim_start()
                .trim_start_matches('=')
                .trim_start();
            let digits: String = after_eq
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if let Ok(age) = digits.parse::<u32>() {
                return age;
            }
        }
        trace!(
            "Could not parse max-age from CACHE-CONTROL: '{}', using default {}",
            v,
            MAX_AGE
        );
    }
    MAX_AGE
}
