use thiserror::Error;
use upnpcore::soap::{SoapFault, SoapParseError};
use upnpcore::ssdp::SsdpError;

#[derive(Error, Debug)]
pub enum ControlPointError {
    #[error("HTTP request to {0} failed: {1}")]
    Http(String, String),
    #[error("{0} answered with HTTP status {1}")]
    HttpStatus(String, u16),
    #[error("No answer from {0} after {1} ms")]
    Timeout(String, u64),
    #[error("Invalid XML document: {0}")]
    Xml(#[from] xmltree::ParseError),
    #[error("Missing <{0}> element")]
    MissingElement(&'static str),
    #[error("Invalid URL {0}: {1}")]
    InvalidUrl(String, String),
    #[error("Soap Error: {0}")]
    Soap(#[from] SoapParseError),
    #[error("Cannot build SOAP request for {0}: {1}")]
    SoapBuild(String, String),
    #[error("{action} returned {fault} (HTTP status {status})")]
    UpnpFault {
        action: String,
        fault: SoapFault,
        status: u16,
    },
    #[error("Missing {0} element in SOAP body")]
    MissingReturnValue(String),
    #[error("SSDP Error: {0}")]
    Ssdp(#[from] SsdpError),
}

impl ControlPointError {
    pub fn http(url: &str, message: impl ToString) -> Self {
        ControlPointError::Http(url.to_string(), message.to_string())
    }

    pub fn http_status(url: &str, status: u16) -> Self {
        ControlPointError::HttpStatus(url.to_string(), status)
    }

    pub fn timeout(url: &str, millis: u64) -> Self {
        ControlPointError::Timeout(url.to_string(), millis)
    }

    pub fn invalid_url(url: &str, message: impl ToString) -> Self {
        ControlPointError::InvalidUrl(url.to_string(), message.to_string())
    }

    pub fn missing_return_value(name: &str) -> Self {
        ControlPointError::MissingReturnValue(name.to_string())
    }

    /// Les erreurs de transport sont rejouables, les autres non
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ControlPointError::Http(..)
                | ControlPointError::HttpStatus(..)
                | ControlPointError::Timeout(..)
        )
    }
}
