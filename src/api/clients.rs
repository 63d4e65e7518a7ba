//! Per-provider API clients.
//!
//! Each client owns an [`ApiManager`] over a transport with the provider's
//! fixed timeout. Calls return [`ApiResponse`] values; convenience lookups
//! built on top return `None` when the call or the payload lookup fails.

use crate::api::manager::{ApiManager, ApiResponse, params};
use crate::api::transport::{HttpTransport, Params, ReqwestTransport};
use crate::error::Result;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

fn manager_with_timeout(timeout: Duration) -> Result<ApiManager> {
    Ok(ApiManager::new(Arc::new(ReqwestTransport::new(timeout)?)))
}

fn no_headers() -> Params {
    Params::new()
}

/// Currency rates from exchangerate-api.com. No key needed.
pub struct ExchangeRatesClient {
    manager: ApiManager,
}

impl ExchangeRatesClient {
    pub const BASE_URL: &'static str = "https://api.exchangerate-api.com/v4/latest";
    pub const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new() -> Result<Self> {
        Ok(Self {
            manager: manager_with_timeout(Self::TIMEOUT)?,
        })
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            manager: ApiManager::new(transport),
        }
    }

    pub fn manager(&self) -> &ApiManager {
        &self.manager
    }

    pub fn rates(&self, base_currency: &str) -> ApiResponse {
        let url = format!("{}/{base_currency}", Self::BASE_URL);
        self.manager.get(&url, &Params::new(), &no_headers())
    }

    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64> {
        let rate = self
            .rates(from)
            .into_data()?
            .get("rates")?
            .get(to)?
            .as_f64()?;
        Some(amount * rate)
    }
}

/// World Bank development indicators.
pub struct WorldBankClient {
    manager: ApiManager,
}

impl WorldBankClient {
    pub const BASE_URL: &'static str = "https://api.worldbank.org/v2";
    pub const TIMEOUT: Duration = Duration::from_secs(15);
    pub const GDP_INDICATOR: &'static str = "NY.GDP.MKTP.CD";

    pub fn new() -> Result<Self> {
        Ok(Self {
            manager: manager_with_timeout(Self::TIMEOUT)?,
        })
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            manager: ApiManager::new(transport),
        }
    }

    pub fn manager(&self) -> &ApiManager {
        &self.manager
    }

    /// Observations for `indicator` in `country`, newest first.
    ///
    /// The World Bank answers with `[paging, observations]`; the response data
    /// is the observation array. `date_range` looks like `2020:2023`.
    pub fn indicator(&self, country: &str, indicator: &str, date_range: Option<&str>) -> ApiResponse {
        let url = format!("{}/country/{country}/indicator/{indicator}", Self::BASE_URL);
        let mut query = params([("format", "json".to_owned()), ("per_page", "100".to_owned())]);
        if let Some(range) = date_range {
            query.insert("date".to_owned(), range.to_owned());
        }
        match self.manager.get(&url, &query, &no_headers()) {
            ApiResponse::Data(Value::Array(mut parts)) if parts.len() > 1 => {
                ApiResponse::Data(parts.swap_remove(1))
            }
            ApiResponse::Data(_) => ApiResponse::failed("No data"),
            failed => failed,
        }
    }

    /// Latest reported GDP in current US dollars.
    pub fn gdp(&self, country: &str) -> Option<f64> {
        self.indicator(country, Self::GDP_INDICATOR, None)
            .into_data()?
            .get(0)?
            .get("value")?
            .as_f64()
    }
}

/// OpenStreetMap Nominatim geocoding. Requires a User-Agent, no key.
pub struct GeolocationClient {
    manager: ApiManager,
}

impl GeolocationClient {
    pub const BASE_URL: &'static str = "https://nominatim.openstreetmap.org";
    pub const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new() -> Result<Self> {
        Ok(Self {
            manager: manager_with_timeout(Self::TIMEOUT)?,
        })
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            manager: ApiManager::new(transport),
        }
    }

    pub fn manager(&self) -> &ApiManager {
        &self.manager
    }

    fn headers() -> Params {
        params([(
            "User-Agent",
            concat!("churnflow/", env!("CARGO_PKG_VERSION")).to_owned(),
        )])
    }

    pub fn search(&self, address: &str) -> ApiResponse {
        let url = format!("{}/search", Self::BASE_URL);
        let query = params([
            ("q", address.to_owned()),
            ("format", "json".to_owned()),
            ("limit", "1".to_owned()),
        ]);
        self.manager.get(&url, &query, &Self::headers())
    }

    /// `(latitude, longitude)` of the best match for `address`.
    pub fn geocode(&self, address: &str) -> Option<(f64, f64)> {
        let data = self.search(address).into_data()?;
        let first = data.get(0)?;
        // Nominatim returns coordinates as strings.
        let coord = |name: &str| first.get(name)?.as_str()?.parse::<f64>().ok();
        Some((coord("lat")?, coord("lon")?))
    }

    pub fn reverse_geocode(&self, lat: f64, lon: f64) -> Option<String> {
        let url = format!("{}/reverse", Self::BASE_URL);
        let query = params([
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("format", "json".to_owned()),
        ]);
        self.manager
            .get(&url, &query, &Self::headers())
            .into_data()?
            .get("display_name")?
            .as_str()
            .map(str::to_owned)
    }
}

/// OpenWeatherMap current conditions and forecasts.
pub struct WeatherClient {
    manager: ApiManager,
    api_key: String,
}

impl WeatherClient {
    pub const BASE_URL: &'static str = "https://api.openweathermap.org/data/2.5";
    pub const TIMEOUT: Duration = Duration::from_secs(10);
    const DEMO_KEY: &'static str = "demo";
    /// The forecast endpoint reports every three hours.
    const READINGS_PER_DAY: u32 = 8;

    pub fn new(api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            manager: manager_with_timeout(Self::TIMEOUT)?,
            api_key: api_key.unwrap_or_else(|| Self::DEMO_KEY.to_owned()),
        })
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>, api_key: Option<String>) -> Self {
        Self {
            manager: ApiManager::new(transport),
            api_key: api_key.unwrap_or_else(|| Self::DEMO_KEY.to_owned()),
        }
    }

    pub fn manager(&self) -> &ApiManager {
        &self.manager
    }

    /// `units` is `metric`, `imperial` or `standard`.
    pub fn current(&self, city: &str, units: &str) -> ApiResponse {
        let url = format!("{}/weather", Self::BASE_URL);
        let query = params([
            ("q", city.to_owned()),
            ("appid", self.api_key.clone()),
            ("units", units.to_owned()),
        ]);
        self.manager.get(&url, &query, &no_headers())
    }

    pub fn forecast(&self, city: &str, days: u32) -> ApiResponse {
        let url = format!("{}/forecast", Self::BASE_URL);
        let query = params([
            ("q", city.to_owned()),
            ("appid", self.api_key.clone()),
            ("cnt", (days * Self::READINGS_PER_DAY).to_string()),
        ]);
        self.manager.get(&url, &query, &no_headers())
    }
}

/// NewsAPI article search.
pub struct NewsClient {
    manager: ApiManager,
    api_key: Option<String>,
}

impl NewsClient {
    pub const BASE_URL: &'static str = "https://newsapi.org/v2";
    pub const TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            manager: manager_with_timeout(Self::TIMEOUT)?,
            api_key,
        })
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>, api_key: Option<String>) -> Self {
        Self {
            manager: ApiManager::new(transport),
            api_key,
        }
    }

    pub fn manager(&self) -> &ApiManager {
        &self.manager
    }

    fn keyed(&self, mut query: Params) -> Params {
        if let Some(key) = &self.api_key {
            query.insert("apiKey".to_owned(), key.clone());
        }
        query
    }

    pub fn everything(&self, query: &str, language: &str, page_size: u32) -> ApiResponse {
        let url = format!("{}/everything", Self::BASE_URL);
        let query = self.keyed(params([
            ("q", query.to_owned()),
            ("language", language.to_owned()),
            ("pageSize", page_size.to_string()),
        ]));
        self.manager.get(&url, &query, &no_headers())
    }

    pub fn top_headlines(&self, category: &str, country: &str) -> ApiResponse {
        let url = format!("{}/top-headlines", Self::BASE_URL);
        let query = self.keyed(params([
            ("category", category.to_owned()),
            ("country", country.to_owned()),
        ]));
        self.manager.get(&url, &query, &no_headers())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock;
    use crate::api::transport::TransportError;
    use crate::api::transport::fake::FakeTransport;
    use serde_json::json;

    #[test]
    fn test_convert_uses_rate_for_target_currency() {
        let url = format!("{}/USD", ExchangeRatesClient::BASE_URL);
        let fake = FakeTransport::new().respond(&url, Ok(json!({"base": "USD", "rates": {"EUR": 0.5}})));
        let client = ExchangeRatesClient::with_transport(Arc::new(fake));

        assert_eq!(client.convert(10.0, "USD", "EUR"), Some(5.0));
        assert_eq!(client.convert(10.0, "USD", "XXX"), None);
        // second lookup came from the cache
        assert_eq!(client.manager().statistics().total_calls, 1);
    }

    #[test]
    fn test_convert_returns_none_on_network_failure() {
        let url = format!("{}/USD", ExchangeRatesClient::BASE_URL);
        let fake = FakeTransport::new().respond(&url, Err(TransportError::Status(503)));
        let client = ExchangeRatesClient::with_transport(Arc::new(fake));
        assert!(client.rates("USD").is_error());
        assert_eq!(client.convert(1.0, "USD", "EUR"), None);
    }

    #[test]
    fn test_indicator_unwraps_observations() {
        let url = format!(
            "{}/country/US/indicator/{}",
            WorldBankClient::BASE_URL,
            WorldBankClient::GDP_INDICATOR
        );
        let fake = FakeTransport::new().respond(
            &url,
            Ok(json!([{"page": 1}, [{"date": "2023", "value": 2.5e13}]])),
        );
        let client = WorldBankClient::with_transport(Arc::new(fake));
        assert_eq!(client.gdp("US"), Some(2.5e13));
    }

    #[test]
    fn test_indicator_without_observations_is_no_data() {
        let url = format!("{}/country/XX/indicator/X.Y", WorldBankClient::BASE_URL);
        let fake = FakeTransport::new().respond(&url, Ok(json!([{"message": "invalid"}])));
        let client = WorldBankClient::with_transport(Arc::new(fake));
        assert_eq!(client.indicator("XX", "X.Y", Some("2020:2023")).error(), Some("No data"));
    }

    #[test]
    fn test_geocode_parses_string_coordinates() {
        let url = format!("{}/search", GeolocationClient::BASE_URL);
        let fake = FakeTransport::new().respond(&url, Ok(json!([{"lat": "40.7", "lon": "-74.0"}])));
        let client = GeolocationClient::with_transport(Arc::new(fake));
        assert_eq!(client.geocode("New York"), Some((40.7, -74.0)));
    }

    #[test]
    fn test_weather_defaults_to_demo_key() {
        let url = format!("{}/weather", WeatherClient::BASE_URL);
        let fake = Arc::new(FakeTransport::new().respond(&url, Ok(mock::weather("London"))));
        let client = WeatherClient::with_transport(fake.clone(), None);

        let response = client.current("London", "metric");
        assert_eq!(
            response.data().and_then(|d| d.get("name")),
            Some(&json!("London"))
        );
        let sent = fake.last_params().unwrap_or_default();
        assert_eq!(sent.get("appid").map(String::as_str), Some("demo"));
    }

    #[test]
    fn test_news_key_is_optional() {
        let url = format!("{}/everything", NewsClient::BASE_URL);
        let fake = Arc::new(FakeTransport::new().respond(&url, Ok(mock::news_articles(3))));

        let anonymous = NewsClient::with_transport(fake.clone(), None);
        anonymous.everything("5G", "en", 3);
        assert!(!fake.last_params().unwrap_or_default().contains_key("apiKey"));

        let keyed = NewsClient::with_transport(fake.clone(), Some("secret".to_owned()));
        let response = keyed.everything("5G", "en", 3);
        assert_eq!(
            fake.last_params().unwrap_or_default().get("apiKey").map(String::as_str),
            Some("secret")
        );
        assert_eq!(
            response.data().and_then(|d| d["articles"].as_array()).map(Vec::len),
            Some(3)
        );
    }
}
