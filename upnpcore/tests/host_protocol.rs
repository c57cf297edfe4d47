use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use parking_lot::Mutex;
use upnpcore::devices::{BasicDevice, RootDevice};
use upnpcore::host::{DeviceHost, HostConfig, HttpRequest};
use upnpcore::services::{ActionDescriptor, BasicService, StateVariableDescriptor};
use upnpcore::soap::{SoapFault, build_soap_request, parse_soap_fault};
use upnpcore::ssdp::{
    MessageType, NTS_ALIVE, SsdpError, SsdpMessage, SsdpSender, multicast_addr,
};

/// Émetteur qui mémorise chaque message au lieu de l'envoyer
#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<(SsdpMessage, SocketAddr)>>,
}

impl RecordingSender {
    fn take(&self) -> Vec<(SsdpMessage, SocketAddr)> {
        std::mem::take(&mut *self.sent.lock())
    }
}

#[async_trait]
impl SsdpSender for RecordingSender {
    async fn send_to(&self, msg: &SsdpMessage, dest: SocketAddr) -> Result<(), SsdpError> {
        self.sent.lock().push((msg.clone(), dest));
        Ok(())
    }
}

const SWITCH_POWER: &str = "urn:schemas-upnp-org:service:SwitchPower:1";

fn light_tree() -> RootDevice {
    let mut tree = RootDevice::new(
        BasicDevice::new("BinaryLight", 1)
            .with_friendly_name("Lampe")
            .with_manufacturer("upnpkit")
            .with_model_name("Light")
            .with_udn("light-1"),
    )
    .with_host_url("http://192.168.1.20:8080")
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

fn quiet_config() -> HostConfig {
    HostConfig {
        max_response_delay: Duration::ZERO,
        ..HostConfig::default()
    }
}

fn host_with(sender: Arc<RecordingSender>) -> DeviceHost {
    let mut host = DeviceHost::new(sender, quiet_config());
    host.register_device(light_tree()).unwrap();
    host
}

#[tokio::test]
async fn test_alive_announces_every_identity() {
    let sender = Arc::new(RecordingSender::default());
    let host = host_with(sender.clone());

    // racine (ROOT, UUID, TYPE) + service (TYPE) + sous-device (UUID, TYPE)
    assert_eq!(host.advertise(NTS_ALIVE).await, 6);

    let sent = sender.take();
    assert_eq!(sent.len(), 6);
    assert!(sent.iter().all(|(_, dest)| *dest == multicast_addr()));
    assert!(
        sent.iter()
            .all(|(m, _)| m.message_type == MessageType::Notify)
    );

    let usns: Vec<&str> = sent.iter().filter_map(|(m, _)| m.usn()).collect();
    assert_eq!(
        usns,
        vec![
            "uuid:light-1::upnp:rootdevice",
            "uuid:light-1",
            "uuid:light-1::urn:schemas-upnp-org:device:BinaryLight:1",
            "uuid:light-1::urn:schemas-upnp-org:service:SwitchPower:1",
            "uuid:dimmer-1",
            "uuid:dimmer-1::urn:schemas-upnp-org:device:Dimmer:1",
        ]
    );
    assert_eq!(
        sent[5].0.location(),
        Some("http://192.168.1.20:8080/Dimmer/desc.xml")
    );
}

#[tokio::test]
async fn test_msearch_answered_unicast() {
    let sender = Arc::new(RecordingSender::default());
    let host = host_with(sender.clone());
    let from: SocketAddr = "192.168.1.50:50000".parse().unwrap();

    let search = SsdpMessage::search(SWITCH_POWER, 2);
    assert_eq!(host.handle_ssdp_message(&search, from).await, 1);

    let sent = sender.take();
    assert_eq!(sent.len(), 1);
    let (msg, dest) = &sent[0];
    assert_eq!(*dest, from);
    assert_eq!(msg.message_type, MessageType::Response);
    assert_eq!(msg.get("ST"), Some(SWITCH_POWER));
    assert_eq!(
        msg.location(),
        Some("http://192.168.1.20:8080/BinaryLight/desc.xml")
    );

    let by_uuid = SsdpMessage::search("uuid:dimmer-1", 1);
    assert_eq!(host.handle_ssdp_message(&by_uuid, from).await, 1);
    assert_eq!(sender.take()[0].0.usn(), Some("uuid:dimmer-1"));
}

#[tokio::test]
async fn test_notify_is_not_answered() {
    let sender = Arc::new(RecordingSender::default());
    let host = host_with(sender.clone());
    let notify = host.notify_messages(NTS_ALIVE).remove(0);
    let from: SocketAddr = "192.168.1.50:1900".parse().unwrap();

    assert_eq!(host.handle_ssdp_message(&notify, from).await, 0);
    assert!(sender.take().is_empty());
}

#[tokio::test]
async fn test_shutdown_says_byebye() {
    let sender = Arc::new(RecordingSender::default());
    let host = host_with(sender.clone());

    assert_eq!(host.shutdown().await, 6);
    assert!(
        sender
            .take()
            .iter()
            .all(|(m, _)| m.get("NTS") == Some("ssdp:byebye"))
    );
}

#[test]
fn test_description_routes() {
    let host = host_with(Arc::new(RecordingSender::default()));

    let reply = host
        .dispatch(&HttpRequest::new(Method::GET, "/BinaryLight/desc.xml"))
        .unwrap();
    assert_eq!(reply.status, StatusCode::OK);
    let xml = reply.body_string();
    assert!(xml.contains("<UDN>uuid:light-1</UDN>"));
    assert!(xml.contains("<SCPDURL>/BinaryLight/SwitchPower/scpd.xml</SCPDURL>"));
    assert!(xml.contains("<UDN>uuid:dimmer-1</UDN>"));

    let scpd = host
        .dispatch(&HttpRequest::new(
            Method::GET,
            "/BinaryLight/SwitchPower/scpd.xml",
        ))
        .unwrap()
        .body_string();
    assert!(scpd.contains("<name>SetTarget</name>"));
    assert!(scpd.contains("<stateVariable sendEvents=\"yes\">"));

    let bad = host
        .dispatch(&HttpRequest::new(Method::POST, "/BinaryLight/desc.xml"))
        .unwrap();
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);

    assert!(
        host.dispatch(&HttpRequest::new(Method::GET, "/nowhere"))
            .is_none()
    );
}

#[test]
fn test_soap_control() {
    let host = host_with(Arc::new(RecordingSender::default()));
    let control = "/BinaryLight/SwitchPower/control";

    let body = build_soap_request(SWITCH_POWER, "GetStatus", &[]).unwrap();
    let reply = host
        .dispatch(&HttpRequest::new(Method::POST, control).with_body(body))
        .unwrap();
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body_string().contains("<ResultStatus>1</ResultStatus>"));

    let body = build_soap_request(SWITCH_POWER, "Explode", &[]).unwrap();
    let reply = host
        .dispatch(&HttpRequest::new(Method::POST, control).with_body(body))
        .unwrap();
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    let fault = parse_soap_fault(reply.body_string().as_bytes())
        .unwrap()
        .unwrap();
    assert_eq!(fault.error_code(), Some("401"));

    let reply = host
        .dispatch(&HttpRequest::new(Method::POST, control).with_body("not xml"))
        .unwrap();
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    let fault = parse_soap_fault(reply.body_string().as_bytes())
        .unwrap()
        .unwrap();
    assert_eq!(fault.error_code(), Some("402"));
}

#[tokio::test]
async fn test_streamed_response_headers() {
    let host = host_with(Arc::new(RecordingSender::default()));
    let reply = host
        .dispatch(&HttpRequest::new(Method::GET, "/BinaryLight/desc.xml"))
        .unwrap();

    let response = host.reply_response(reply);
    let headers = response.headers();
    assert_eq!(headers["content-type"], "text/xml; charset=\"utf-8\"");
    assert_eq!(headers["content-language"], "en");
    assert_eq!(headers["connection"], "close");
    assert_eq!(headers["ext"], "");
    assert_eq!(headers["server"], "Linux/6.1 UPnP/1.1 upnpkit/0.1");
    assert_eq!(headers["x-user-agent"], "upnpkit/0.1");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let xml = String::from_utf8(body.to_vec()).unwrap();
    assert!(xml.starts_with("<?xml"));
    assert!(xml.trim_end().ends_with("</root>"));
}
