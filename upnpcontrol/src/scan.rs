//! Exploration du réseau par tours de recherche.
//!
//! Chaque tour cherche la prochaine URN de la file (la première est
//! `upnp:rootdevice`), collecte les réponses pendant la fenêtre de recherche,
//! récupère la description de chaque `LOCATION` nouvelle puis ajoute à la file
//! les types de devices et de services jamais vus.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use upnpconfig::Config;
use upnpcore::ssdp::UPNP_ROOTDEVICE;

use crate::config_ext::ControlConfigExt;
use crate::control_point::ControlPoint;
use crate::description::{RootDescription, ScpdDescription};
use crate::errors::ControlPointError;
use crate::fetch::Fetch;
use crate::pipeline::{DescriptionPipeline, FetchObserver, PipelineReport};

/// Relaye les documents à l'observateur de l'appelant en relevant les types
/// déclarés
struct TypeCollector<'a> {
    inner: &'a mut dyn FetchObserver,
    types: Vec<String>,
}

impl FetchObserver for TypeCollector<'_> {
    fn on_device(&mut self, fetch: &Fetch, description: &RootDescription) {
        self.types.extend(
            description
                .device
                .declared_types()
                .into_iter()
                .map(str::to_string),
        );
        self.inner.on_device(fetch, description);
    }

    fn on_service(&mut self, fetch: &Fetch, scpd: &ScpdDescription) {
        self.inner.on_service(fetch, scpd);
    }

    fn on_failed(&mut self, fetch: &Fetch) {
        self.inner.on_failed(fetch);
    }
}

/// Bilan d'un tour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    pub target: String,
    pub responses: usize,
    pub new_locations: usize,
    pub new_types: Vec<String>,
}

pub struct Scanner {
    control_point: Arc<ControlPoint>,
    pipeline: DescriptionPipeline,
    search_window: Duration,
    search_queue: VecDeque<String>,
    known_types: HashSet<String>,
}

impl Scanner {
    pub fn new(
        control_point: Arc<ControlPoint>,
        pipeline: DescriptionPipeline,
        search_window: Duration,
    ) -> Self {
        Self {
            control_point,
            pipeline,
            search_window,
            search_queue: VecDeque::from([UPNP_ROOTDEVICE.to_string()]),
            known_types: HashSet::from([UPNP_ROOTDEVICE.to_string()]),
        }
    }

    /// Fenêtre de recherche lue dans `control.search_window_ms`
    pub fn from_config(
        control_point: Arc<ControlPoint>,
        pipeline: DescriptionPipeline,
        config: &Config,
    ) -> Self {
        let window = config
            .get_search_window_ms()
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(5));
        Self::new(control_point, pipeline, window)
    }

    pub fn pipeline(&self) -> &DescriptionPipeline {
        &self.pipeline
    }

    /// URNs restant à chercher, dans l'ordre
    pub fn pending_searches(&self) -> impl Iterator<Item = &str> {
        self.search_queue.iter().map(String::as_str)
    }

    /// Exécute le tour suivant ; `None` quand la file des URNs est vide
    pub async fn next_round(
        &mut self,
        observer: &mut dyn FetchObserver,
    ) -> Option<Result<RoundReport, ControlPointError>> {
        let target = self.search_queue.pop_front()?;
        Some(self.round(target, observer).await)
    }

    async fn round(
        &mut self,
        target: String,
        observer: &mut dyn FetchObserver,
    ) -> Result<RoundReport, ControlPointError> {
        let mut search = self.control_point.begin_search(&target).await?;
        let responses = search.collect_for(self.search_window).await;
        self.control_point.cancel_search();

        let mut new_locations = 0;
        for response in &responses {
            let Some(location) = response.message.location() else {
                continue;
            };
            match self.pipeline.enqueue_device(location) {
                Ok(true) => new_locations += 1,
                Ok(false) => {}
                Err(e) => warn!("❌ Ignoring LOCATION {}: {}", location, e),
            }
        }
        debug!(
            "Search {}: {} responses, {} new locations",
            target,
            responses.len(),
            new_locations
        );

        let mut collector = TypeCollector {
            inner: observer,
            types: Vec::new(),
        };
        self.pipeline.run(&mut collector).await;

        let mut new_types = Vec::new();
        for urn in collector.types {
            if self.known_types.insert(urn.clone()) {
                self.search_queue.push_back(urn.clone());
                new_types.push(urn);
            }
        }

        Ok(RoundReport {
            target,
            responses: responses.len(),
            new_locations,
            new_types,
        })
    }

    /// Enchaîne les tours jusqu'à épuisement de la file des URNs
    pub async fn run(&mut self, observer: &mut dyn FetchObserver) -> PipelineReport {
        while let Some(result) = self.next_round(observer).await {
            match result {
                Ok(report) => info!(
                    "✅ Search {} done: {} responses, {} new types",
                    report.target,
                    report.responses,
                    report.new_types.len()
                ),
                Err(e) => warn!("❌ Search round failed: {}", e),
            }
        }
        info!("✅ Scan complete");
        self.pipeline.queue().counts()
    }
}
