//! # Configuration des hôtes et control points UPnP
//!
//! Ce module gère la configuration partagée par les crates UPnP :
//! - Chargement depuis un fichier YAML (`config.yaml`)
//! - Fusion avec la configuration par défaut embarquée
//! - Surcharges par variables d'environnement (`UPNP_CONFIG__HOST__HTTP_PORT=9000`)
//! - Getters/setters typés avec valeurs par défaut
//! - Accès singleton thread-safe
//!
//! ## Usage
//!
//! ```no_run
//! use upnpconfig::get_config;
//!
//! let config = get_config();
//! let port = config.get_http_port();
//! config.set_http_port(9000)?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Les crates clientes ajoutent leurs propres clés via des traits d'extension
//! construits sur [`Config::get_value`] et [`Config::set_value`].

use anyhow::{anyhow, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{info, warn};
use upnputils::guess_local_ip;
use uuid::Uuid;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("upnp.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> = Arc::new(Config::load_or_default(""));
}

const ENV_CONFIG_DIR: &str = "UPNP_CONFIG";
const ENV_PREFIX: &str = "UPNP_CONFIG__";
const CONFIG_DIR_NAME: &str = ".upnpkit";

const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Génère un getter/setter `bool` avec valeur par défaut
#[macro_export]
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> anyhow::Result<bool> {
            match self.get_value($path) {
                Ok(serde_yaml::Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> anyhow::Result<()> {
            self.set_value($path, serde_yaml::Value::Bool(value))
        }
    };
}

/// Gestionnaire de configuration
///
/// Une instance est soit adossée à un fichier `config.yaml` (toute modification
/// est sauvegardée), soit purement en mémoire (voir [`Config::from_yaml_str`]).
#[derive(Debug)]
pub struct Config {
    config_dir: Option<String>,
    path: Option<String>,
    data: Mutex<Value>,
}

impl Config {
    /// Cherche le répertoire de configuration dans l'ordre :
    /// argument, variable `UPNP_CONFIG`, `./.upnpkit`, `~/.upnpkit`.
    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return env_path;
        }

        if Path::new(CONFIG_DIR_NAME).exists() {
            return CONFIG_DIR_NAME.to_string();
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        CONFIG_DIR_NAME.to_string()
    }

    /// Crée le répertoire si besoin et vérifie les droits de lecture/écriture
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;
        fs::read_dir(path)?;

        Ok(())
    }

    /// Charge la configuration depuis `directory` (ou le répertoire par défaut)
    ///
    /// 1. Charge la configuration embarquée
    /// 2. Fusionne le fichier `config.yaml` s'il existe
    /// 3. Applique les surcharges d'environnement
    /// 4. Sauvegarde le résultat fusionné
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&config_dir))?;
        info!(config_dir = %config_dir, "Using config directory");

        let path = Path::new(&config_dir)
            .join("config.yaml")
            .to_string_lossy()
            .to_string();

        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path, "Loaded config file");
                let external: Value = serde_yaml::from_slice(&data)?;
                merge_yaml(&mut value, &lower_keys_value(external));
            }
            Err(_) => {
                info!(config_file = %path, "Config file not found, using default embedded config");
            }
        }

        let mut value = lower_keys_value(value);
        apply_env_overrides(&mut value);

        let config = Config {
            config_dir: Some(config_dir),
            path: Some(path),
            data: Mutex::new(value),
        };

        config.save()?;
        Ok(config)
    }

    /// Configuration en mémoire : défauts embarqués fusionnés avec `yaml`.
    ///
    /// Aucune surcharge d'environnement n'est appliquée et rien n'est écrit sur disque.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        if !yaml.trim().is_empty() {
            let external: Value = serde_yaml::from_str(yaml)?;
            merge_yaml(&mut value, &lower_keys_value(external));
        }

        Ok(Config {
            config_dir: None,
            path: None,
            data: Mutex::new(lower_keys_value(value)),
        })
    }

    fn load_or_default(directory: &str) -> Self {
        match Self::load_config(directory) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Cannot load configuration, falling back to embedded defaults");
                Config {
                    config_dir: None,
                    path: None,
                    data: Mutex::new(
                        serde_yaml::from_str(DEFAULT_CONFIG)
                            .map(lower_keys_value)
                            .unwrap_or(Value::Mapping(Mapping::new())),
                    ),
                }
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Value>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("Configuration lock poisoned"))
    }

    /// Répertoire de configuration, `None` pour une configuration en mémoire
    pub fn directory(&self) -> Option<&str> {
        self.config_dir.as_deref()
    }

    /// Sauvegarde la configuration dans `config.yaml` (sans effet en mémoire)
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let yaml = {
            let data = self.lock()?;
            serde_yaml::to_string(&*data)?
        };
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Définit une valeur au chemin donné (ex: `&["host", "http_port"]`) et sauvegarde
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.lock()?;
            set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    /// Lit la valeur au chemin donné, erreur si le chemin n'existe pas
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.lock()?;
        get_value_internal(&data, path)
    }

    /// Lit une chaîne non vide, ou `default`
    pub fn get_string_or(&self, path: &[&str], default: &str) -> String {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            Ok(Value::Number(n)) => n.to_string(),
            _ => default.to_string(),
        }
    }

    /// Lit un entier positif, ou `default`
    ///
    /// Les chaînes numériques (surcharges d'environnement entre guillemets)
    /// sont acceptées.
    pub fn get_u64_or(&self, path: &[&str], default: u64) -> u64 {
        match self.get_value(path) {
            Ok(Value::Number(n)) => n.as_u64().unwrap_or(default),
            Ok(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    /// URL de base HTTP des devices hébergés
    ///
    /// Valeur configurée si non vide, sinon `http://<ip locale>:<port>`.
    pub fn get_base_url(&self) -> String {
        match self.get_value(&["host", "base_url"]) {
            Ok(Value::String(s)) if !s.is_empty() => s.trim_end_matches('/').to_string(),
            _ => format!("http://{}:{}", guess_local_ip(), self.get_http_port()),
        }
    }

    /// Port HTTP du serveur de description (défaut 8080)
    pub fn get_http_port(&self) -> u16 {
        match self.get_value(&["host", "http_port"]) {
            Ok(Value::Number(n)) => match n.as_u64().and_then(|p| u16::try_from(p).ok()) {
                Some(port) => port,
                None => {
                    warn!("Invalid HTTP port '{}', using default {}", n, DEFAULT_HTTP_PORT);
                    DEFAULT_HTTP_PORT
                }
            },
            Ok(Value::String(s)) => s.parse::<u16>().unwrap_or_else(|_| {
                warn!("Invalid HTTP port '{}', using default {}", s, DEFAULT_HTTP_PORT);
                DEFAULT_HTTP_PORT
            }),
            _ => DEFAULT_HTTP_PORT,
        }
    }

    pub fn set_http_port(&self, port: u16) -> Result<()> {
        self.set_value(&["host", "http_port"], Value::Number(Number::from(port)))
    }

    /// UDN persistant d'un device, généré (UUID v4) au premier appel
    ///
    /// Le préfixe `uuid:` éventuel est retiré de la valeur retournée.
    pub fn get_device_udn(&self, devtype: &str, name: &str) -> Result<String> {
        let path = &["devices", devtype, name, "udn"];
        match self.get_value(path) {
            Ok(Value::String(udn)) => Ok(sanitize_udn(&udn)),
            _ => {
                let new_udn = Uuid::new_v4().to_string();
                self.set_value(path, Value::String(new_udn.clone()))?;
                Ok(new_udn)
            }
        }
    }

    pub fn set_device_udn(&self, devtype: &str, name: &str, udn: &str) -> Result<()> {
        self.set_value(
            &["devices", devtype, name, "udn"],
            Value::String(sanitize_udn(udn)),
        )
    }

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Niveau de log minimum (`TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR`)
    pub fn get_log_min_level(&self) -> Result<String> {
        Ok(self.get_string_or(&["host", "logger", "min_level"], DEFAULT_LOG_MIN_LEVEL))
    }

    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }
}

/// Retourne l'instance globale, chargée paresseusement au premier accès
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

fn sanitize_udn(udn: &str) -> String {
    let udn = udn.trim();
    udn.strip_prefix("uuid:").unwrap_or(udn).to_string()
}

fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((first, rest)) = path.split_first() else {
        *data = value;
        return Ok(());
    };

    if let Value::Null = data {
        *data = Value::Mapping(Mapping::new());
    }

    if let Value::Mapping(map) = data {
        let key = Value::String(first.to_lowercase());
        if rest.is_empty() {
            map.insert(key, value);
            Ok(())
        } else {
            let entry = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
            set_value_internal(entry, rest, value)
        }
    } else {
        Err(anyhow!("Current node is not a map"))
    }
}

fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
    let mut current = data;
    for (i, key) in path.iter().enumerate() {
        if let Value::Mapping(map) = current {
            match map.get(&Value::String(key.to_lowercase())) {
                Some(next) => current = next,
                None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
            }
        } else {
            return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
        }
    }
    Ok(current.clone())
}

fn apply_env_overrides(config: &mut Value) {
    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let key_path = stripped.split("__").collect::<Vec<_>>();
            let yaml_value =
                serde_yaml::from_str::<Value>(&value).unwrap_or(Value::String(value.clone()));
            if let Err(e) = set_value_internal(config, &key_path, yaml_value) {
                warn!(variable = %key, error = %e, "Ignoring environment override");
            }
        }
    }
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut new_map = Mapping::new();
            for (k, v) in map {
                let key = match k {
                    Value::String(s) => Value::String(s.to_lowercase()),
                    other => other,
                };
                new_map.insert(key, lower_keys_value(v));
            }
            Value::Mapping(new_map)
        }
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        _ => value,
    }
}

/// Fusionne récursivement `external` dans `default` : les mappings sont fusionnés
/// clé par clé, les scalaires et séquences sont remplacés.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_replaces_scalars_and_keeps_siblings() {
        let mut base: Value = serde_yaml::from_str("a: {b: 1, c: 2}").unwrap();
        let ext: Value = serde_yaml::from_str("a: {c: 3}").unwrap();
        merge_yaml(&mut base, &ext);
        assert_eq!(get_value_internal(&base, &["a", "b"]).unwrap(), Value::from(1));
        assert_eq!(get_value_internal(&base, &["a", "c"]).unwrap(), Value::from(3));
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let config = Config::from_yaml_str("Host: {HTTP_PORT: 9100}").unwrap();
        assert_eq!(config.get_http_port(), 9100);
        assert!(config.get_value(&["HOST", "Http_Port"]).is_ok());
    }

    #[test]
    fn test_set_value_creates_intermediate_maps() {
        let config = Config::from_yaml_str("").unwrap();
        config
            .set_value(&["control", "extra", "deep"], Value::Bool(true))
            .unwrap();
        assert_eq!(
            config.get_value(&["control", "extra", "deep"]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_sanitize_udn() {
        assert_eq!(sanitize_udn(" uuid:abc "), "abc");
        assert_eq!(sanitize_udn("abc"), "abc");
    }
}
