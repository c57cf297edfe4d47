#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use parking_lot::Mutex;
use upnpcontrol::{ControlPointError, DescriptionClient, HttpResponse};
use upnpcore::devices::{BasicDevice, RootDevice};
use upnpcore::host::{DeviceHost, HostConfig, HttpRequest};
use upnpcore::services::{ActionDescriptor, BasicService, StateVariableDescriptor};
use upnpcore::soap::SoapFault;
use upnpcore::ssdp::{SsdpError, SsdpMessage, SsdpSender};

pub const HOST_PREFIX: &str = "http://192.168.1.20:8080";
pub const LOCATION: &str = "http://192.168.1.20:8080/BinaryLight/desc.xml";
pub const SWITCH_POWER: &str = "urn:schemas-upnp-org:service:SwitchPower:1";
pub const BINARY_LIGHT: &str = "urn:schemas-upnp-org:device:BinaryLight:1";
pub const DIMMER: &str = "urn:schemas-upnp-org:device:Dimmer:1";

/// Émetteur SSDP sans réseau
pub struct NullSender;

#[async_trait]
impl SsdpSender for NullSender {
    async fn send_to(&self, _msg: &SsdpMessage, _dest: SocketAddr) -> Result<(), SsdpError> {
        Ok(())
    }
}

pub fn light_tree() -> RootDevice {
    let mut tree = RootDevice::new(
        BasicDevice::new("BinaryLight", 1)
            .with_friendly_name("Lampe")
            .with_manufacturer("upnpkit")
            .with_model_name("Light")
            .with_udn("light-1"),
    )
    .with_host_url(HOST_PREFIX)
    .with_server_id("Linux/6.1 UPnP/1.1 upnpkit/0.1");

    tree.add_service(
        RootDevice::ROOT,
        BasicService::new("SwitchPower", 1)
            .with_action(
                ActionDescriptor::new("SetTarget").with_in("newTargetValue", "Target"),
                |action| match action.arg("newTargetValue") {
                    Some("0") | Some("1") => Ok(Vec::new()),
                    _ => Err(SoapFault::invalid_args("newTargetValue must be 0 or 1")),
                },
            )
            .with_action(
                ActionDescriptor::new("GetStatus").with_out("ResultStatus", "Status"),
                |_| Ok(vec![("ResultStatus".to_string(), "1".to_string())]),
            )
            .with_state_variable(StateVariableDescriptor::new("Target", "boolean"))
            .with_state_variable(StateVariableDescriptor::new("Status", "boolean").evented()),
    )
    .unwrap();

    tree.add_device(
        RootDevice::ROOT,
        BasicDevice::new("Dimmer", 1).with_udn("dimmer-1"),
    )
    .unwrap();
    tree
}

pub fn light_host() -> Arc<DeviceHost> {
    let mut host = DeviceHost::new(Arc::new(NullSender), HostConfig::default());
    host.register_device(light_tree()).unwrap();
    Arc::new(host)
}

/// Client HTTP servi directement par un [`DeviceHost`]
pub struct HostClient {
    host: Arc<DeviceHost>,
    pub requests: Mutex<Vec<String>>,
}

impl HostClient {
    pub fn new(host: Arc<DeviceHost>) -> Self {
        Self {
            host,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        match self.host.dispatch(&request) {
            Some(reply) => HttpResponse {
                status: reply.status.as_u16(),
                body: reply.body_string(),
            },
            None => HttpResponse {
                status: 404,
                body: String::new(),
            },
        }
    }

    fn path<'a>(&self, url: &'a str) -> Result<&'a str, ControlPointError> {
        url.strip_prefix(HOST_PREFIX)
            .ok_or_else(|| ControlPointError::http(url, "connection refused"))
    }
}

#[async_trait]
impl DescriptionClient for HostClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, ControlPointError> {
        self.requests.lock().push(format!("GET {}", url));
        let path = self.path(url)?;
        Ok(self.dispatch(HttpRequest::new(Method::GET, path)))
    }

    async fn post_soap(
        &self,
        url: &str,
        soap_action: &str,
        body: String,
    ) -> Result<HttpResponse, ControlPointError> {
        self.requests
            .lock()
            .push(format!("POST {} {}", url, soap_action));
        let path = self.path(url)?;
        Ok(self.dispatch(HttpRequest::new(Method::POST, path).with_body(body)))
    }
}

/// Réponse scriptée d'un [`ScriptedClient`]
#[derive(Debug, Clone)]
pub enum Reply {
    Body(String),
    Status(u16),
    Refused,
    Hang,
}

/// Client qui rejoue des réponses prévues par URL ; la dernière réponse d'une
/// URL est répétée
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<HashMap<String, Vec<Reply>>>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn with(self, url: &str, replies: Vec<Reply>) -> Self {
        self.script.lock().insert(url.to_string(), replies);
        self
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|u| *u == url).count()
    }

    fn next_reply(&self, url: &str) -> Reply {
        self.calls.lock().push(url.to_string());
        let mut script = self.script.lock();
        match script.get_mut(url) {
            Some(replies) if replies.len() > 1 => replies.remove(0),
            Some(replies) => replies.first().cloned().unwrap_or(Reply::Status(404)),
            None => Reply::Status(404),
        }
    }
}

#[async_trait]
impl DescriptionClient for ScriptedClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, ControlPointError> {
        match self.next_reply(url) {
            Reply::Body(body) => Ok(HttpResponse::ok(body)),
            Reply::Status(status) => Ok(HttpResponse {
                status,
                body: String::new(),
            }),
            Reply::Refused => Err(ControlPointError::http(url, "connection refused")),
            Reply::Hang => std::future::pending().await,
        }
    }

    async fn post_soap(
        &self,
        url: &str,
        _soap_action: &str,
        _body: String,
    ) -> Result<HttpResponse, ControlPointError> {
        self.get(url).await
    }
}

pub fn device_xml(device_type: &str, scpd_url: Option<&str>) -> String {
    let services = scpd_url
        .map(|url| {
            format!(
                "<serviceList><service><serviceType>{}</serviceType>\
                 <serviceId>urn:upnp-org:serviceId:SwitchPower</serviceId>\
                 <SCPDURL>{}</SCPDURL><controlURL>/control</controlURL>\
                 </service></serviceList>",
                SWITCH_POWER, url
            )
        })
        .unwrap_or_default();
    format!(
        "<?xml version=\"1.0\"?><root xmlns=\"urn:schemas-upnp-org:device-1-0\">\
         <device><deviceType>{}</deviceType><UDN>uuid:x</UDN>{}</device></root>",
        device_type, services
    )
}

pub const SCPD_XML: &str = "<?xml version=\"1.0\"?>\
    <scpd xmlns=\"urn:schemas-upnp-org:service-1-0\"><actionList><action>\
    <name>GetStatus</name></action></actionList></scpd>";
