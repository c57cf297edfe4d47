//! Pipeline de récupération des descriptions.
//!
//! La tête des entrées `Pending` est traitée à chaque pas : une réussite
//! ajoute en queue les SCPD des services déclarés, un échec de transport ou de
//! parsing laisse l'entrée en tête pour une nouvelle tentative, jusqu'à
//! `max_attempts` où elle passe `Failed`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use upnpconfig::Config;

use crate::config_ext::ControlConfigExt;
use crate::description::{
    DeviceDescription, RootDescription, ScpdDescription, parse_device_description, parse_scpd,
};
use crate::errors::ControlPointError;
use crate::fetch::{Fetch, FetchCounts, FetchKind, FetchQueue, FetchState};
use crate::http::DescriptionClient;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Nombre de tentatives avant abandon
    pub max_attempts: u32,
    /// Délai d'attente d'une réponse
    pub fetch_timeout: Duration,
    /// Pause avant une nouvelle tentative
    pub retry_delay: Duration,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: config
                .get_max_description_fetch_attempts()
                .unwrap_or(defaults.max_attempts),
            fetch_timeout: config
                .get_description_fetch_timeout_ms()
                .map(Duration::from_millis)
                .unwrap_or(defaults.fetch_timeout),
            retry_delay: config
                .get_fetch_retry_delay_ms()
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            fetch_timeout: Duration::from_millis(5000),
            retry_delay: Duration::from_millis(2000),
        }
    }
}

/// Décide si une entrée doit être récupérée ; `false` la passe `Skipped`
pub trait FetchPolicy: Send + Sync {
    fn should_fetch(&self, _fetch: &Fetch) -> bool {
        true
    }
}

/// Récupère tout
pub struct FetchAll;

impl FetchPolicy for FetchAll {}

/// Reçoit les documents récupérés et les abandons
pub trait FetchObserver: Send {
    fn on_device(&mut self, _fetch: &Fetch, _description: &RootDescription) {}

    fn on_service(&mut self, _fetch: &Fetch, _scpd: &ScpdDescription) {}

    fn on_failed(&mut self, _fetch: &Fetch) {}
}

/// Observateur sans effet
pub struct IgnoreFetches;

impl FetchObserver for IgnoreFetches {}

/// Bilan d'une exécution du pipeline
pub type PipelineReport = FetchCounts;

enum Fetched {
    Device(RootDescription),
    Service(ScpdDescription),
}

pub struct DescriptionPipeline {
    client: Arc<dyn DescriptionClient>,
    config: PipelineConfig,
    policy: Box<dyn FetchPolicy>,
    queue: FetchQueue,
}

impl DescriptionPipeline {
    pub fn new(client: Arc<dyn DescriptionClient>, config: PipelineConfig) -> Self {
        Self {
            client,
            config,
            policy: Box::new(FetchAll),
            queue: FetchQueue::new(),
        }
    }

    pub fn with_policy(mut self, policy: impl FetchPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn queue(&self) -> &FetchQueue {
        &self.queue
    }

    /// Ajoute une entrée en queue ; `false` si son URL est déjà connue
    pub fn enqueue(&mut self, fetch: Fetch) -> bool {
        debug!(url = %fetch.url, kind = ?fetch.kind, "Fetch enqueued");
        self.queue.push(fetch)
    }

    /// Ajoute la description du device à `location`
    pub fn enqueue_device(&mut self, location: &str) -> Result<bool, ControlPointError> {
        Ok(self.enqueue(Fetch::device(location)?))
    }

    /// Traite la tête des entrées en attente ; `false` quand il n'y en a plus
    pub async fn step(&mut self, observer: &mut dyn FetchObserver) -> bool {
        let Some(index) = self.queue.find_pending() else {
            return false;
        };
        let Some(fetch) = self.queue.get(index).cloned() else {
            return false;
        };

        if fetch.attempts == 0 && !self.policy.should_fetch(&fetch) {
            debug!(url = %fetch.url, "Fetch skipped");
            self.set_state(index, FetchState::Skipped);
            return true;
        }

        if fetch.attempts >= self.config.max_attempts {
            self.fail(index, observer);
            return true;
        }

        if fetch.attempts > 0 && !self.config.retry_delay.is_zero() {
            tokio::time::sleep(self.config.retry_delay).await;
        }

        let attempts = fetch.attempts + 1;
        if let Some(entry) = self.queue.get_mut(index) {
            entry.attempts = attempts;
        }

        match self.fetch_document(&fetch).await {
            Ok(fetched) => {
                let mut done = fetch;
                done.attempts = attempts;
                done.state = FetchState::Success;
                match &fetched {
                    Fetched::Device(root) => {
                        self.enqueue_services(&done, root);
                        observer.on_device(&done, root);
                    }
                    Fetched::Service(scpd) => observer.on_service(&done, scpd),
                }
                self.set_state(index, FetchState::Success);
                info!(url = %done.url, attempts, "✅ Description fetched");
            }
            Err(e) => {
                warn!(url = %fetch.url, attempts, "❌ Description fetch failed: {}", e);
                if attempts >= self.config.max_attempts {
                    self.fail(index, observer);
                }
            }
        }
        true
    }

    /// Traite la file jusqu'à ce qu'aucune entrée ne soit en attente
    pub async fn run(&mut self, observer: &mut dyn FetchObserver) -> PipelineReport {
        while self.step(observer).await {}
        let report = self.queue.counts();
        info!(
            "Description pipeline drained: {} success, {} failed, {} skipped",
            report.success, report.failed, report.skipped
        );
        report
    }

    async fn fetch_document(&self, fetch: &Fetch) -> Result<Fetched, ControlPointError> {
        let timeout = self.config.fetch_timeout;
        let response = tokio::time::timeout(timeout, self.client.get(&fetch.url))
            .await
            .map_err(|_| ControlPointError::timeout(&fetch.url, timeout.as_millis() as u64))??;

        if !response.is_success() {
            return Err(ControlPointError::http_status(&fetch.url, response.status));
        }

        let body = response.body.as_bytes();
        Ok(match fetch.kind {
            FetchKind::Device => Fetched::Device(parse_device_description(body)?),
            FetchKind::Service => Fetched::Service(parse_scpd(body)?),
        })
    }

    fn enqueue_services(&mut self, fetch: &Fetch, root: &RootDescription) {
        let base = root.base(&fetch.url).to_string();
        let scpds: Vec<(String, String)> = root
            .device
            .walk()
            .into_iter()
            .flat_map(|d: &DeviceDescription| d.services.iter())
            .filter(|s| !s.scpd_url.is_empty())
            .map(|s| (s.scpd_url.clone(), s.service_type.clone()))
            .collect();

        for (scpd_url, service_type) in scpds {
            match crate::description::resolve_url(&base, &scpd_url)
                .and_then(|url| Fetch::service(&url, &service_type))
            {
                Ok(scpd) => {
                    self.enqueue(scpd);
                }
                Err(e) => warn!("❌ Cannot enqueue SCPD of {}: {}", service_type, e),
            }
        }
    }

    fn set_state(&mut self, index: usize, state: FetchState) {
        if let Some(entry) = self.queue.get_mut(index) {
            entry.state = state;
        }
    }

    fn fail(&mut self, index: usize, observer: &mut dyn FetchObserver) {
        self.set_state(index, FetchState::Failed);
        if let Some(entry) = self.queue.get(index) {
            warn!(url = %entry.url, attempts = entry.attempts, "❌ Giving up on description");
            observer.on_failed(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_yaml() {
        let config = Config::from_yaml_str(
            "control:\n  max_description_fetch_attempts: 5\n  fetch_retry_delay_ms: 0\n",
        )
        .unwrap();
        let pipeline = PipelineConfig::from_config(&config);
        assert_eq!(pipeline.max_attempts, 5);
        assert_eq!(pipeline.retry_delay, Duration::ZERO);
        assert_eq!(pipeline.fetch_timeout, Duration::from_millis(5000));
    }
}
