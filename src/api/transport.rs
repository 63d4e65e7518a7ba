//! HTTP transport seam.
//!
//! Clients talk to [`HttpTransport`] rather than to `reqwest` directly, so
//! tests can substitute canned responses.

use crate::error::{ChurnError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Query parameters or headers, kept sorted for stable cache keys.
pub type Params = BTreeMap<String, String>;

const USER_AGENT: &str = concat!("churnflow/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Timeout,
    Status(u16),
    InvalidJson(String),
    Connection(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "Timeout"),
            Self::Status(code) => write!(f, "HTTP status {code}"),
            Self::InvalidJson(msg) => write!(f, "Invalid JSON: {msg}"),
            Self::Connection(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<TransportError> for ChurnError {
    fn from(err: TransportError) -> Self {
        Self::Network(err.to_string())
    }
}

pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str, params: &Params, headers: &Params) -> std::result::Result<Value, TransportError>;

    /// Sends `body` as JSON.
    fn post(&self, url: &str, body: &Value, headers: &Params) -> std::result::Result<Value, TransportError>;
}

/// Blocking `reqwest` client with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ChurnError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn send(
        request: reqwest::blocking::RequestBuilder,
        headers: &Params,
    ) -> std::result::Result<Value, TransportError> {
        let request = headers
            .iter()
            .fold(request, |req, (name, value)| req.header(name.as_str(), value.as_str()));
        let response = request.send().map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        response
            .json::<Value>()
            .map_err(|e| TransportError::InvalidJson(e.to_string()))
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Connection(err.to_string())
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, params: &Params, headers: &Params) -> std::result::Result<Value, TransportError> {
        Self::send(self.client.get(url).query(params), headers)
    }

    fn post(&self, url: &str, body: &Value, headers: &Params) -> std::result::Result<Value, TransportError> {
        Self::send(self.client.post(url).json(body), headers)
    }
}
