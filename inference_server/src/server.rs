use anyhow::Result;
use axum::response::{IntoResponse, Response};
use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::Json,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use data_ingestion::{PriceRequest, PriceSource};
use log::{error, info, warn};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

use crate::config::ReportConfig;
use crate::error::PredictError;
use crate::report::Report;
use crate::service::Predictor;

/// Shared application state: the predictor and the latest report served.
struct AppState<S> {
    predictor: Arc<Predictor<S>>,
    defaults: Arc<ReportConfig>,
    latest_output: Arc<RwLock<Option<Report>>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            predictor: self.predictor.clone(),
            defaults: self.defaults.clone(),
            latest_output: self.latest_output.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PredictParams {
    ticker: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

fn error_response(err: &PredictError) -> Response {
    match err {
        PredictError::EmptyInput { .. } | PredictError::InsufficientHistory { .. } => info!("{}", err),
        PredictError::InvalidRequest(_) => warn!("{}", err),
        PredictError::DataSource(_) | PredictError::Inference(_) => error!("{}", err),
    }
    (err.status(), Json(json!({ "error": err.user_message() }))).into_response()
}

/// GET /predict?ticker=AAPL&start=2020-01-01&end=2025-01-01
async fn predict<S: PriceSource + 'static>(
    State(state): State<AppState<S>>,
    params: Result<Query<PredictParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => {
            return error_response(&PredictError::InvalidRequest(rejection.body_text()));
        }
    };
    let defaults = &state.defaults;
    let ticker = params.ticker.unwrap_or_else(|| defaults.default_ticker.clone());
    let start = params.start.unwrap_or(defaults.default_start);
    let end = params.end.unwrap_or(defaults.default_end);

    let request = match PriceRequest::new(&ticker, start, end) {
        Ok(request) => request,
        Err(e) => return error_response(&PredictError::from(e)),
    };

    match state.predictor.predict(&request).await {
        Ok(report) => {
            *state.latest_output.write() = Some(report.clone());
            Json(report).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// GET /output returns the latest report, or null before the first prediction.
async fn get_latest_output<S>(State(state): State<AppState<S>>) -> impl IntoResponse {
    let output = state.latest_output.read();
    Json(output.clone())
}

async fn health<S: PriceSource + 'static>(State(state): State<AppState<S>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "model": state.predictor.engine().model_name(),
    }))
}

fn router<S: PriceSource + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/predict", get(predict::<S>))
        .route("/output", get(get_latest_output::<S>))
        .route("/health", get(health::<S>))
        .with_state(state)
}

pub struct Server<S> {
    state: AppState<S>,
    bind_addr: String,
}

impl<S: PriceSource + 'static> Server<S> {
    pub fn init(predictor: Predictor<S>, defaults: ReportConfig, bind_addr: &str) -> Self {
        let state = AppState {
            predictor: Arc::new(predictor),
            defaults: Arc::new(defaults),
            latest_output: Arc::new(RwLock::new(None)),
        };

        Self {
            state,
            bind_addr: bind_addr.to_string(),
        }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        info!("HTTP server running on {}", listener.local_addr()?);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal, initiating graceful shutdown"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
