//! Concurrent fan-out over every configured [`TemperatureSource`].
//!
//! Each call to [`Aggregator::average_temperature`] queries all sources at
//! once and reduces their outcomes in completion order: the first failure
//! wins, otherwise the readings are averaged.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::Instrument;

use crate::{Temperature, TemperatureSource, WeatherError};

/// Averages the temperature reported by a fixed, non-empty set of sources.
#[derive(Debug, Clone)]
pub struct Aggregator {
    sources: Arc<[Arc<dyn TemperatureSource>]>,
}

impl Aggregator {
    /// # Errors
    ///
    /// [`WeatherError::NoSourcesConfigured`] if `sources` is empty.
    pub fn new(sources: Vec<Arc<dyn TemperatureSource>>) -> Result<Self, WeatherError> {
        if sources.is_empty() {
            return Err(WeatherError::NoSourcesConfigured);
        }

        Ok(Self { sources: sources.into() })
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Always false; an aggregator cannot be built without sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn sources(&self) -> &[Arc<dyn TemperatureSource>] {
        &self.sources
    }

    /// Unweighted mean of every source's reading for `city`.
    ///
    /// Lookups run as independent tasks and are observed in the order they
    /// finish. The first error observed is returned as-is; when several
    /// sources fail, which one is reported depends on timing. Lookups still
    /// running at that point are aborted.
    pub async fn average_temperature(&self, city: &str) -> Result<Temperature, WeatherError> {
        let mut lookups = JoinSet::new();

        for (index, source) in self.sources.iter().enumerate() {
            let source = Arc::clone(source);
            let city = city.to_owned();
            let span = tracing::debug_span!("lookup", index);
            lookups.spawn(async move { source.lookup(&city).await }.instrument(span));
        }
        tracing::debug!(city, sources = self.sources.len(), "fanned out temperature lookups");

        let mut sum = 0.0;
        while let Some(outcome) = lookups.join_next().await {
            match outcome.map_err(WeatherError::from).and_then(|result| result) {
                Ok(temperature) => sum += temperature.kelvin(),
                Err(err) => {
                    tracing::debug!(city, error = %err, pending = lookups.len(), "lookup failed");
                    // Dropping `lookups` aborts whatever is still in flight.
                    return Err(err);
                }
            }
        }

        Ok(Temperature::from_kelvin(sum / self.sources.len() as f64))
    }
}
