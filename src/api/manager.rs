//! Shared request path for every external API client.

use crate::api::cache::{ResponseCache, cache_key};
use crate::api::transport::{HttpTransport, Params, TransportError};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    /// Parameters are sent as the JSON body.
    Post,
}

/// Outcome of one API call. Failures are values, not `Err`s: a failed call
/// serializes as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ApiResponse {
    Data(Value),
    Failed { error: String },
}

impl ApiResponse {
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Data(value) => Some(value),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Data(_) => None,
            Self::Failed { error } => Some(error),
        }
    }

    pub fn into_data(self) -> Option<Value> {
        match self {
            Self::Data(value) => Some(value),
            Self::Failed { .. } => None,
        }
    }
}

impl From<TransportError> for ApiResponse {
    fn from(err: TransportError) -> Self {
        Self::failed(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApiStatistics {
    pub total_calls: usize,
    pub cache_size: usize,
}

/// Builds [`Params`] from literal pairs.
pub fn params<const N: usize>(pairs: [(&str, String); N]) -> Params {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect()
}

/// Issues requests through a transport, caching successful payloads.
///
/// There is no retry; a caller that wants one calls again.
pub struct ApiManager {
    transport: Arc<dyn HttpTransport>,
    cache: ResponseCache,
    calls: AtomicUsize,
}

impl ApiManager {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_cache(transport, ResponseCache::default())
    }

    pub fn with_cache(transport: Arc<dyn HttpTransport>, cache: ResponseCache) -> Self {
        Self {
            transport,
            cache,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, url: &str, params: &Params, headers: &Params) -> ApiResponse {
        self.request(Method::Get, url, params, headers)
    }

    pub fn request(&self, method: Method, url: &str, params: &Params, headers: &Params) -> ApiResponse {
        let key = cache_key(url, params);
        if let Some(cached) = self.cache.get(&key) {
            debug!("Cache hit: {url}");
            return ApiResponse::Data(cached);
        }

        let result = match method {
            Method::Get => self.transport.get(url, params, headers),
            Method::Post => {
                let body = serde_json::to_value(params).unwrap_or(Value::Null);
                self.transport.post(url, &body, headers)
            }
        };

        match result {
            Ok(payload) => {
                self.calls.fetch_add(1, Ordering::Relaxed);
                self.cache.insert(key, payload.clone());
                info!("API request successful: {url}");
                ApiResponse::Data(payload)
            }
            Err(err) => {
                warn!("API request to {url} failed: {err}");
                err.into()
            }
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn statistics(&self) -> ApiStatistics {
        ApiStatistics {
            total_calls: self.calls.load(Ordering::Relaxed),
            cache_size: self.cache.len(),
        }
    }
}
