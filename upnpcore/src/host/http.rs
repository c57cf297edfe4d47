//! Routage HTTP des requêtes vers les nœuds de l'arbre.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderName, HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tracing::{debug, info, warn};

use super::DeviceHost;
use crate::description::DescriptionStream;
use crate::devices::{DeviceRef, NodeId, NodeRef, RootDevice, ServiceId, ServiceRef};
use crate::fields::ServiceField;
use crate::soap::{SoapFault, build_soap_response, parse_soap_action};

const XML_CONTENT_TYPE: &str = "text/xml; charset=\"utf-8\"";

/// Nombre de morceaux de description en attente d'envoi
const STREAM_BUFFER: usize = 8;

/// Requête HTTP reçue, réduite à ce dont le routage a besoin
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Chemin sans la chaîne de requête
    fn route_path(&self) -> &str {
        self.path.split('?').next().unwrap_or_default()
    }
}

/// Nœud ayant réclamé une requête et traitement à appliquer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Servir le document du nœud
    Describe(NodeId),
    /// Exécuter une action SOAP du service
    Control(ServiceId),
    /// Chemin connu, méthode refusée
    BadRequest,
}

impl DeviceRef<'_> {
    /// Cherche le nœud qui réclame la requête : le device lui-même, puis ses
    /// services, puis ses sous-devices en profondeur. Le premier gagne.
    pub fn on_http_request(&self, request: &HttpRequest) -> Option<Route> {
        if request.route_path() == self.description_url() {
            return Some(if request.method == Method::GET {
                Route::Describe(NodeId::Device(self.id()))
            } else {
                Route::BadRequest
            });
        }

        self.services()
            .find_map(|service| service.on_http_request(request))
            .or_else(|| {
                self.devices()
                    .find_map(|device| device.on_http_request(request))
            })
    }
}

impl ServiceRef<'_> {
    pub fn on_http_request(&self, request: &HttpRequest) -> Option<Route> {
        let path = request.route_path();
        if path == self.field_or_empty(ServiceField::ScpdUrl) {
            Some(if request.method == Method::GET {
                Route::Describe(NodeId::Service(self.id()))
            } else {
                Route::BadRequest
            })
        } else if path == self.field_or_empty(ServiceField::ControlUrl) {
            Some(if request.method == Method::POST {
                Route::Control(self.id())
            } else {
                Route::BadRequest
            })
        } else {
            None
        }
    }
}

/// Corps d'une réponse
#[derive(Clone)]
pub enum ReplyBody {
    Empty,
    Xml(String),
    /// Description rendue à la volée depuis l'arbre
    Description {
        root: Arc<RootDevice>,
        node: NodeId,
    },
}

impl std::fmt::Debug for ReplyBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplyBody::Empty => f.write_str("Empty"),
            ReplyBody::Xml(xml) => f.debug_tuple("Xml").field(&xml.len()).finish(),
            ReplyBody::Description { node, .. } => {
                f.debug_struct("Description").field("node", node).finish()
            }
        }
    }
}

/// Réponse à une requête réclamée par un nœud
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    /// Identité `SERVER` de l'arbre qui répond
    pub server: String,
    pub body: ReplyBody,
}

impl HttpReply {
    fn new(root: &RootDevice, status: StatusCode, body: ReplyBody) -> Self {
        Self {
            status,
            server: root.server_id().to_string(),
            body,
        }
    }

    /// Rend le corps en une seule chaîne (descriptions comprises)
    pub fn body_string(&self) -> String {
        match &self.body {
            ReplyBody::Empty => String::new(),
            ReplyBody::Xml(xml) => xml.clone(),
            ReplyBody::Description { root, node } => match root.node(*node) {
                Some(NodeRef::Device(d)) => DescriptionStream::new(d).into_string(),
                Some(NodeRef::Service(s)) => DescriptionStream::new(s).into_string(),
                None => String::new(),
            },
        }
    }
}

impl DeviceHost {
    /// Route une requête vers l'arbre qui la réclame.
    ///
    /// `None` si aucun nœud ne la réclame.
    pub fn dispatch(&self, request: &HttpRequest) -> Option<HttpReply> {
        for root in &self.roots {
            let Some(route) = root.root().on_http_request(request) else {
                continue;
            };
            debug!("{} {} -> {:?}", request.method, request.path, route);

            return Some(match route {
                Route::Describe(node) => HttpReply::new(
                    root,
                    StatusCode::OK,
                    ReplyBody::Description {
                        root: root.clone(),
                        node,
                    },
                ),
                Route::BadRequest => {
                    HttpReply::new(root, StatusCode::BAD_REQUEST, ReplyBody::Empty)
                }
                Route::Control(service) => self.handle_control(root, service, &request.body),
            });
        }
        None
    }

    fn handle_control(&self, root: &RootDevice, id: ServiceId, body: &[u8]) -> HttpReply {
        let Some(service) = root.service(id) else {
            return HttpReply::new(root, StatusCode::NOT_FOUND, ReplyBody::Empty);
        };

        let result = match parse_soap_action(body) {
            Ok(action) => {
                info!("📡 SOAP action {} on {}", action.name, service.service_type());
                service
                    .profile()
                    .handle_action(&action)
                    .and_then(|out| {
                        build_soap_response(&service.service_type(), &action.name, out)
                            .map_err(|e| SoapFault::action_failed(&e.to_string()))
                    })
            }
            Err(e) => {
                warn!("❌ Invalid SOAP request for {}: {}", service.service_type(), e);
                Err(SoapFault::invalid_args(&format!("Invalid SOAP envelope: {}", e)))
            }
        };

        match result {
            Ok(xml) => HttpReply::new(root, StatusCode::OK, ReplyBody::Xml(xml)),
            Err(fault) => {
                debug!("SOAP fault: {}", fault);
                match fault.to_xml() {
                    Ok(xml) => {
                        HttpReply::new(root, StatusCode::INTERNAL_SERVER_ERROR, ReplyBody::Xml(xml))
                    }
                    Err(e) => {
                        warn!("❌ Cannot serialize SOAP fault: {}", e);
                        HttpReply::new(root, StatusCode::INTERNAL_SERVER_ERROR, ReplyBody::Empty)
                    }
                }
            }
        }
    }

    /// Convertit une réponse en réponse axum, la description étant rendue
    /// morceau par morceau dans une tâche bloquante
    pub fn reply_response(&self, reply: HttpReply) -> Response {
        let body = match reply.body {
            ReplyBody::Empty => Body::empty(),
            ReplyBody::Xml(xml) => Body::from(xml),
            ReplyBody::Description { root, node } => {
                let (tx, rx) = mpsc::channel::<String>(STREAM_BUFFER);
                tokio::task::spawn_blocking(move || {
                    let stream = match root.node(node) {
                        Some(NodeRef::Device(d)) => DescriptionStream::new(d),
                        Some(NodeRef::Service(s)) => DescriptionStream::new(s),
                        None => return,
                    };
                    for chunk in stream {
                        if tx.blocking_send(chunk).is_err() {
                            debug!("Client went away, description stream dropped");
                            break;
                        }
                    }
                });
                Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>))
            }
        };

        let mut response = (reply.status, body).into_response();
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(XML_CONTENT_TYPE));
        headers.insert(header::CONTENT_LANGUAGE, HeaderValue::from_static("en"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
        headers.insert(HeaderName::from_static("ext"), HeaderValue::from_static(""));
        if let Ok(server) = HeaderValue::from_str(&reply.server) {
            headers.insert(header::SERVER, server);
        }
        if let Ok(marker) = HeaderValue::from_str(&self.config.user_agent_marker) {
            headers.insert(HeaderName::from_static("x-user-agent"), marker);
        }
        response
    }

    /// Routeur axum : toutes les requêtes passent par [`DeviceHost::dispatch`]
    pub fn router(self: Arc<Self>) -> Router {
        Router::new().fallback(handle_request).with_state(self)
    }

    /// Sert les arbres enregistrés sur `listener` jusqu'à l'arrêt du serveur
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> anyhow::Result<()> {
        info!("✅ UPnP HTTP server listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn handle_request(
    State(host): State<Arc<DeviceHost>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let request = HttpRequest {
        method,
        path: uri.path().to_string(),
        body: body.to_vec(),
    };
    match host.dispatch(&request) {
        Some(reply) => host.reply_response(reply),
        None => {
            debug!("No node claims {} {}", request.method, request.path);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
