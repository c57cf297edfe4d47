//! # upnpcontrol - Control point UPnP
//!
//! Côté client de la pile : découverte SSDP, récupération et lecture des
//! descriptions, instanciation des objets de contrôle.
//!
//! - [`control_point`] : recherches M-SEARCH annulables
//! - [`description`] : parsing des documents de device et des SCPD
//! - [`fetch`] / [`pipeline`] : file des documents, tentatives et délais
//! - [`classes`] : registre URN → fabrique, proxies SOAP
//! - [`scan`] : exploration du réseau par tours de recherche
//!
//! ```ignore
//! let socket = Arc::new(SsdpSocket::bind_client()?);
//! let cp = Arc::new(ControlPoint::new(socket.clone(), config.get_search_mx()?));
//! tokio::spawn(cp.clone().run_listener(socket));
//!
//! let client = Arc::new(UreqClient::new(Duration::from_secs(5)));
//! let pipeline = DescriptionPipeline::new(client, PipelineConfig::from_config(&config));
//! let mut scanner = Scanner::from_config(cp, pipeline, &config);
//! scanner.run(&mut IgnoreFetches).await;
//! ```

pub mod classes;
pub mod config_ext;
pub mod control_point;
pub mod description;
pub mod errors;
pub mod fetch;
pub mod http;
pub mod pipeline;
pub mod scan;

pub use classes::{
    ClassRegistry, DeviceClass, DeviceControl, DeviceParts, GenericDevice, ServiceClass,
    ServiceControl, ServiceProxy, class_registry, init_class_registry,
};
pub use config_ext::ControlConfigExt;
pub use control_point::{ControlPoint, DeviceSearch, DiscoveredDevice, SearchHandle, SearchResponse};
pub use errors::ControlPointError;
pub use fetch::{Fetch, FetchKind, FetchQueue, FetchState};
pub use http::{DescriptionClient, HttpResponse, UreqClient};
pub use pipeline::{
    DescriptionPipeline, FetchAll, FetchObserver, FetchPolicy, IgnoreFetches, PipelineConfig,
    PipelineReport,
};
pub use scan::{RoundReport, Scanner};
