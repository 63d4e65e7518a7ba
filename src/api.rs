//! Outbound calls to third-party data providers.
//!
//! Every client goes through an [`ApiManager`], which caches successful
//! payloads and reports failures as [`ApiResponse::Failed`] values instead of
//! errors. The HTTP layer sits behind [`HttpTransport`] so none of this needs
//! the network under test.

pub mod cache;
pub mod clients;
pub mod manager;
pub mod mock;
pub mod transport;

pub use cache::{EvictionPolicy, Lru, ResponseCache, Unbounded};
pub use clients::{
    ExchangeRatesClient, GeolocationClient, NewsClient, WeatherClient, WorldBankClient,
};
pub use manager::{ApiManager, ApiResponse, ApiStatistics, Method};
pub use transport::{HttpTransport, Params, ReqwestTransport, TransportError};
