use thiserror::Error;

/// Failures surfaced by temperature sources and the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    /// The provider could not be reached, or answered with a non-success status.
    #[error("{provider} is unavailable: {message}")]
    SourceUnavailable { provider: String, message: String },

    /// The provider answered, but the payload did not have the expected shape.
    #[error("{provider} returned a malformed response: {message}")]
    SourceMalformedResponse { provider: String, message: String },

    #[error("no temperature sources configured")]
    NoSourcesConfigured,

    #[error("temperature lookup panicked: {message}")]
    LookupPanicked { message: String },
}

impl WeatherError {
    pub fn unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceUnavailable { provider: provider.into(), message: message.into() }
    }

    pub fn malformed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceMalformedResponse { provider: provider.into(), message: message.into() }
    }
}

impl From<tokio::task::JoinError> for WeatherError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::LookupPanicked { message: err.to_string() }
    }
}
