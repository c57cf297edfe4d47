//! Clés `control.*` du control point dans upnpconfig

use anyhow::Result;
use serde_yaml::{Number, Value};
use upnpconfig::Config;

const DEFAULT_SEARCH_MX: u64 = 3;
const DEFAULT_SEARCH_WINDOW_MS: u64 = 5000;
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5000;
const DEFAULT_MAX_FETCH_ATTEMPTS: u64 = 3;
const DEFAULT_FETCH_RETRY_DELAY_MS: u64 = 2000;

/// Trait d'extension pour la configuration du control point
///
/// ```rust,ignore
/// use upnpconfig::get_config;
/// use upnpcontrol::ControlConfigExt;
///
/// let attempts = get_config().get_max_description_fetch_attempts()?;
/// ```
pub trait ControlConfigExt {
    /// `MX` des M-SEARCH émis (défaut: 3)
    fn get_search_mx(&self) -> Result<u32>;

    fn set_search_mx(&self, mx: u32) -> Result<()>;

    /// Durée de collecte des réponses d'une recherche (défaut: 5000 ms)
    fn get_search_window_ms(&self) -> Result<u64>;

    /// Délai maximal d'attente d'une description (défaut: 5000 ms)
    fn get_description_fetch_timeout_ms(&self) -> Result<u64>;

    /// Nombre de tentatives avant abandon d'une description (défaut: 3)
    fn get_max_description_fetch_attempts(&self) -> Result<u32>;

    fn set_max_description_fetch_attempts(&self, attempts: u32) -> Result<()>;

    /// Pause avant de rejouer une description en échec (défaut: 2000 ms)
    fn get_fetch_retry_delay_ms(&self) -> Result<u64>;
}

fn get_u32(config: &Config, path: &[&str], default: u64) -> u32 {
    u32::try_from(config.get_u64_or(path, default)).unwrap_or(u32::MAX)
}

impl ControlConfigExt for Config {
    fn get_search_mx(&self) -> Result<u32> {
        Ok(get_u32(self, &["control", "search_mx"], DEFAULT_SEARCH_MX))
    }

    fn set_search_mx(&self, mx: u32) -> Result<()> {
        self.set_value(&["control", "search_mx"], Value::Number(Number::from(mx)))
    }

    fn get_search_window_ms(&self) -> Result<u64> {
        Ok(self.get_u64_or(
            &["control", "search_window_ms"],
            DEFAULT_SEARCH_WINDOW_MS,
        ))
    }

    fn get_description_fetch_timeout_ms(&self) -> Result<u64> {
        Ok(self.get_u64_or(
            &["control", "description_fetch_timeout_ms"],
            DEFAULT_FETCH_TIMEOUT_MS,
        ))
    }

    fn get_max_description_fetch_attempts(&self) -> Result<u32> {
        Ok(get_u32(
            self,
            &["control", "max_description_fetch_attempts"],
            DEFAULT_MAX_FETCH_ATTEMPTS,
        ))
    }

    fn set_max_description_fetch_attempts(&self, attempts: u32) -> Result<()> {
        self.set_value(
            &["control", "max_description_fetch_attempts"],
            Value::Number(Number::from(attempts)),
        )
    }

    fn get_fetch_retry_delay_ms(&self) -> Result<u64> {
        Ok(self.get_u64_or(
            &["control", "fetch_retry_delay_ms"],
            DEFAULT_FETCH_RETRY_DELAY_MS,
        ))
    }
}
