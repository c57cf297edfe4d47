//! Client HTTP du control point : descriptions (GET) et actions SOAP (POST).
//!
//! Le pipeline et les proxies ne connaissent que [`DescriptionClient`] ;
//! [`UreqClient`] en est l'implémentation réseau.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};
use ureq::Agent;

use crate::errors::ControlPointError;

/// Statut et corps d'une réponse HTTP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport HTTP utilisé par le control point.
///
/// Les statuts 4xx/5xx ne sont pas des erreurs : le corps d'un fault SOAP
/// arrive avec un 500.
#[async_trait]
pub trait DescriptionClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, ControlPointError>;

    async fn post_soap(
        &self,
        url: &str,
        soap_action: &str,
        body: String,
    ) -> Result<HttpResponse, ControlPointError>;
}

/// Client bloquant ureq exécuté sur le pool `spawn_blocking` de tokio
#[derive(Clone)]
pub struct UreqClient {
    agent: Agent,
}

impl UreqClient {
    pub fn new(timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }

    async fn run_blocking<F>(&self, url: &str, call: F) -> Result<HttpResponse, ControlPointError>
    where
        F: FnOnce(Agent, String) -> Result<HttpResponse, ControlPointError> + Send + 'static,
    {
        let agent = self.agent.clone();
        let owned = url.to_string();
        tokio::task::spawn_blocking(move || call(agent, owned))
            .await
            .map_err(|e| ControlPointError::http(url, e))?
    }
}

fn read_response(
    url: &str,
    mut response: ureq::http::Response<ureq::Body>,
) -> Result<HttpResponse, ControlPointError> {
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| ControlPointError::http(url, e))?;
    trace!("HTTP {} <- {} ({} bytes)", status, url, body.len());
    Ok(HttpResponse { status, body })
}

#[async_trait]
impl DescriptionClient for UreqClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, ControlPointError> {
        debug!("GET {}", url);
        self.run_blocking(url, |agent, url| {
            let response = agent
                .get(&url)
                .call()
                .map_err(|e| ControlPointError::http(&url, e))?;
            read_response(&url, response)
        })
        .await
    }

    async fn post_soap(
        &self,
        url: &str,
        soap_action: &str,
        body: String,
    ) -> Result<HttpResponse, ControlPointError> {
        debug!("POST {} ({})", url, soap_action);
        let soap_action = soap_action.to_string();
        self.run_blocking(url, move |agent, url| {
            let response = agent
                .post(&url)
                .header("Content-Type", r#"text/xml; charset="utf-8""#)
                .header("SOAPAction", &soap_action)
                .send(body)
                .map_err(|e| ControlPointError::http(&url, e))?;
            read_response(&url, response)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(HttpResponse::ok("").is_success());
        let fault = HttpResponse {
            status: 500,
            body: String::new(),
        };
        assert!(!fault.is_success());
    }
}
