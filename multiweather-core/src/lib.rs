//! Core library for the `multiweather` temperature service.
//!
//! This crate defines:
//! - The [`TemperatureSource`] capability and its concrete providers
//! - The [`Aggregator`], which queries every source concurrently and averages the results
//! - Configuration & credentials handling
//! - The shared error taxonomy
//!
//! It is used by `multiweather-cli`, but can also be embedded in other binaries or services.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;

pub use aggregator::Aggregator;
pub use config::{Config, ProviderConfig};
pub use error::WeatherError;
pub use model::Temperature;
pub use provider::{ProviderId, TemperatureSource, source_from_config, sources_from_config};
