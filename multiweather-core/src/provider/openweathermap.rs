use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

use crate::{Temperature, WeatherError};

use super::{
    ProviderId, TemperatureSource, http_client, parse_base_url, transport_error, truncate_body,
};

const PROVIDER: ProviderId = ProviderId::OpenWeatherMap;

/// Current conditions from openweathermap.org, which reports Kelvin by default.
#[derive(Debug, Clone)]
pub struct OpenWeatherMapProvider {
    api_key: String,
    endpoint: Url,
    http: Client,
}

impl OpenWeatherMapProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openweathermap.org";

    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let mut endpoint = parse_base_url(base_url)?;
        if let Ok(mut segments) = endpoint.path_segments_mut() {
            segments.pop_if_empty().extend(["data", "2.5", "weather"]);
        }

        Ok(Self { api_key, endpoint, http: http_client(timeout)? })
    }
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCurrentResponse {
    main: OwmMain,
}

#[async_trait]
impl TemperatureSource for OpenWeatherMapProvider {
    async fn lookup(&self, city: &str) -> Result<Temperature, WeatherError> {
        let res = self
            .http
            .get(self.endpoint.clone())
            .query(&[("q", city), ("appid", self.api_key.as_str())])
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

        let parsed: OwmCurrentResponse = serde_json::from_str(&body)
            .map_err(|e| WeatherError::malformed(PROVIDER.as_str(), e.to_string()))?;

        let temperature = Temperature::from_kelvin(parsed.main.temp);
        tracing::info!(
            provider = %PROVIDER,
            city,
            kelvin = temperature.kelvin(),
            "temperature lookup"
        );
        Ok(temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    async fn provider(server: &MockServer) -> OpenWeatherMapProvider {
        OpenWeatherMapProvider::new("KEY".into(), &server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn reads_kelvin_from_main_temp() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Berlin"))
            .and(query_param("appid", "KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"name":"Berlin","main":{"temp":281.5,"humidity":80}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let temp = provider(&server).await.lookup("Berlin").await.unwrap();
        assert_eq!(temp.kelvin(), 281.5);
    }

    #[tokio::test]
    async fn non_success_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = provider(&server).await.lookup("Berlin").await.unwrap_err();
        match err {
            WeatherError::SourceUnavailable { provider, message } => {
                assert_eq!(provider, "openweathermap");
                assert!(message.contains("401"));
                assert!(message.contains("invalid api key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unexpected_shape_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"cod":"404"}"#))
            .mount(&server)
            .await;

        let err = provider(&server).await.lookup("Atlantis").await.unwrap_err();
        assert!(matches!(err, WeatherError::SourceMalformedResponse { .. }));
    }

    #[tokio::test]
    async fn slow_response_hits_client_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"main":{"temp":281.5}}"#)
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let provider =
            OpenWeatherMapProvider::new("KEY".into(), &server.uri(), Duration::from_millis(200))
                .unwrap();

        let started = std::time::Instant::now();
        let err = provider.lookup("Berlin").await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2));

        match err {
            WeatherError::SourceUnavailable { provider, message } => {
                assert_eq!(provider, "openweathermap");
                assert!(message.contains("timed out"), "unexpected message: {message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
