use crate::{
    Config, Temperature, WeatherError,
    provider::{
        openweathermap::OpenWeatherMapProvider, weatherunderground::WeatherUndergroundProvider,
    },
};
use anyhow::Context;
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod openweathermap;
pub mod weatherunderground;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeatherMap,
    WeatherUnderground,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeatherMap => "openweathermap",
            ProviderId::WeatherUnderground => "weatherunderground",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeatherMap, ProviderId::WeatherUnderground]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweathermap" => Ok(ProviderId::OpenWeatherMap),
            "weatherunderground" => Ok(ProviderId::WeatherUnderground),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. \
                 Supported providers: openweathermap, weatherunderground."
            )),
        }
    }
}

/// Something that can tell the current temperature of a city.
///
/// Implementations own their endpoint and credentials, must bound their own
/// network time, and yield exactly one outcome per call.
#[async_trait]
pub trait TemperatureSource: Send + Sync + Debug {
    async fn lookup(&self, city: &str) -> Result<Temperature, WeatherError>;
}

/// Construct a source from config and explicit ProviderId.
pub fn source_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Arc<dyn TemperatureSource>> {
    let provider = config.provider_config(id).filter(|_| config.is_provider_configured(id));
    let provider = provider.ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `multiweather configure {id}` and enter your API key."
        )
    })?;

    let api_key = provider.api_key.clone();
    let timeout = provider.timeout();

    let source: Arc<dyn TemperatureSource> = match id {
        ProviderId::OpenWeatherMap => Arc::new(OpenWeatherMapProvider::new(
            api_key,
            provider.base_url.as_deref().unwrap_or(OpenWeatherMapProvider::DEFAULT_BASE_URL),
            timeout,
        )?),
        ProviderId::WeatherUnderground => Arc::new(WeatherUndergroundProvider::new(
            api_key,
            provider.base_url.as_deref().unwrap_or(WeatherUndergroundProvider::DEFAULT_BASE_URL),
            timeout,
        )?),
    };

    Ok(source)
}

/// Construct every configured source, in [`ProviderId::all`] order.
pub fn sources_from_config(config: &Config) -> anyhow::Result<Vec<Arc<dyn TemperatureSource>>> {
    config
        .configured_providers()
        .into_iter()
        .map(|id| {
            source_from_config(id, config)
                .with_context(|| format!("Failed to set up provider '{id}'"))
        })
        .collect()
}

pub(crate) fn http_client(timeout: std::time::Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build().context("Failed to build HTTP client")
}

pub(crate) fn parse_base_url(base_url: &str) -> anyhow::Result<reqwest::Url> {
    let url = reqwest::Url::parse(base_url)
        .with_context(|| format!("Invalid provider base URL: {base_url}"))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("Provider base URL cannot carry a path: {base_url}");
    }
    Ok(url)
}

/// Map a failed request or body read to a [`WeatherError`].
pub(crate) fn transport_error(provider: ProviderId, err: reqwest::Error) -> WeatherError {
    let message = if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        err.to_string()
    };
    WeatherError::unavailable(provider.as_str(), message)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}
