//! HTTP front end: `GET /weather/{city}` answers with the aggregated temperature.

use std::{sync::Arc, time::Instant};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use multiweather_core::{Aggregator, Temperature, WeatherError};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct AppState {
    aggregator: Arc<Aggregator>,
}

#[derive(Debug, Serialize)]
pub struct WeatherReport {
    pub city: String,
    /// Kelvin.
    pub temp: Temperature,
    pub took: String,
}

/// Any aggregation failure is reported as a 500 carrying the error message.
#[derive(Debug)]
pub struct ApiError(WeatherError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

pub fn router(aggregator: Arc<Aggregator>) -> Router {
    Router::new()
        .route("/hello", get(hello))
        // `{*city}` never matches an empty remainder.
        .route("/weather/", get(weather_blank))
        .route("/weather/{*city}", get(weather))
        .with_state(AppState { aggregator })
}

pub async fn serve(addr: &str, aggregator: Arc<Aggregator>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(addr, sources = aggregator.len(), "listening");

    axum::serve(listener, router(aggregator)).await.context("HTTP server failed")
}

async fn hello() -> &'static str {
    "hello!"
}

async fn weather(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<WeatherReport>, ApiError> {
    report(&state, city).await
}

async fn weather_blank(State(state): State<AppState>) -> Result<Json<WeatherReport>, ApiError> {
    report(&state, String::new()).await
}

async fn report(state: &AppState, city: String) -> Result<Json<WeatherReport>, ApiError> {
    let begin = Instant::now();

    let result = state.aggregator.average_temperature(&city).await;
    let took = begin.elapsed();

    match result {
        Ok(temp) => {
            tracing::info!(city = %city, kelvin = temp.kelvin(), ?took, "served temperature");
            Ok(Json(WeatherReport { city, temp, took: format!("{took:?}") }))
        }
        Err(err) => {
            tracing::warn!(city = %city, error = %err, ?took, "temperature aggregation failed");
            Err(ApiError(err))
        }
    }
}
