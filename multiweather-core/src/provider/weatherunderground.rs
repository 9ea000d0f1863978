use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

use crate::{Temperature, WeatherError};

use super::{
    ProviderId, TemperatureSource, http_client, parse_base_url, transport_error, truncate_body,
};

const PROVIDER: ProviderId = ProviderId::WeatherUnderground;

/// Current conditions from the Weather Underground API, reported in Celsius.
#[derive(Debug, Clone)]
pub struct WeatherUndergroundProvider {
    api_key: String,
    base_url: Url,
    http: Client,
}

impl WeatherUndergroundProvider {
    pub const DEFAULT_BASE_URL: &'static str = "http://api.wunderground.com";

    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self { api_key, base_url: parse_base_url(base_url)?, http: http_client(timeout)? })
    }

    /// `{base}/api/{key}/conditions/q/{city}.json`, with each segment percent-encoded.
    fn conditions_url(&self, city: &str) -> Url {
        let mut url = self.base_url.clone();
        let query = format!("{city}.json");
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "api",
                self.api_key.as_str(),
                "conditions",
                "q",
                query.as_str(),
            ]);
        }
        url
    }
}

#[derive(Debug, Deserialize)]
struct WuObservation {
    temp_c: f64,
}

#[derive(Debug, Deserialize)]
struct WuConditionsResponse {
    current_observation: WuObservation,
}

#[async_trait]
impl TemperatureSource for WeatherUndergroundProvider {
    async fn lookup(&self, city: &str) -> Result<Temperature, WeatherError> {
        let res = self
            .http
            .get(self.conditions_url(city))
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| transport_error(PROVIDER, e))?;

        if !status.is_success() {
            return Err(WeatherError::unavailable(
                PROVIDER.as_str(),
                format!("request failed with status {}: {}", status, truncate_body(&body)),
            ));
        }

        let parsed: WuConditionsResponse = serde_json::from_str(&body)
            .map_err(|e| WeatherError::malformed(PROVIDER.as_str(), e.to_string()))?;

        let temperature = Temperature::from_celsius(parsed.current_observation.temp_c);
        tracing::info!(
            provider = %PROVIDER,
            city,
            kelvin = temperature.kelvin(),
            "temperature lookup"
        );
        Ok(temperature)
    }
}
