//! Initialisation du logging `tracing`.
//!
//! Le niveau vient de `host.logger.min_level` sauf si `RUST_LOG` est défini,
//! auquel cas le filtre d'environnement l'emporte. La sortie console est
//! contrôlée par `host.logger.enable_console`.

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};
use upnpconfig::Config;

/// Convertit un niveau de configuration (`INFO`, `debug`, ...) en directive de filtre
fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_uppercase().as_str() {
        "ERROR" => "error",
        "WARN" | "WARNING" => "warn",
        "DEBUG" => "debug",
        "TRACE" => "trace",
        _ => "info",
    }
}

/// Installe le subscriber global.
///
/// Sans effet si un subscriber est déjà installé (tests, application hôte).
pub fn init_logging(config: &Config) {
    let level = config
        .get_log_min_level()
        .unwrap_or_else(|_| "INFO".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(&level)));

    let enable_console = config.get_log_enable_console().unwrap_or(true);

    let subscriber = Registry::default().with(filter);
    let result = if enable_console {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .try_init()
    } else {
        subscriber.try_init()
    };

    if result.is_err() {
        tracing::debug!("Global subscriber already set, keeping it");
    }
}
