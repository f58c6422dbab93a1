use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use persistence::UnitOfWorkFactory;
use tracing::instrument;
use usecases::Metrics as UseCaseMetrics;

use crate::dto::{CreateOrderRequest, HealthResponse, OrderResponse};
use crate::error::HttpError;
use crate::metrics::HttpMetrics;

#[derive(Clone)]
pub struct AppState {
    pub uow_factory: Arc<dyn UnitOfWorkFactory>,
    pub usecase_metrics: Arc<UseCaseMetrics>,
    pub http_metrics: Arc<HttpMetrics>,
    pub registry: Arc<prometheus::Registry>,
    pub service_name: String,
}

pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        service: state.service_name.clone(),
        status: "ok",
    })
}

#[instrument(skip(state, req))]
pub async fn handle_create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let (order_id, customer_id, items) = req.into_parts()?;

    let order = usecases::create_order(
        &*state.uow_factory,
        &state.usecase_metrics,
        &state.service_name,
        order_id,
        customer_id,
        items,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

#[instrument(skip(state))]
pub async fn handle_get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let uow = state
        .uow_factory
        .begin()
        .await
        .map_err(|e| HttpError::Internal(e.into()))?;
    let order = uow
        .orders()
        .get(&order_id)
        .await
        .map_err(|e| HttpError::Internal(e.into()))?;
    uow.commit().await.map_err(|e| HttpError::Internal(e.into()))?;

    match order {
        Some(order) => Ok((StatusCode::OK, Json(OrderResponse::from(&order)))),
        None => Err(HttpError::NotFound),
    }
}

pub async fn metrics_middleware(
    State(state): State<AppState>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    state
        .http_metrics
        .http_requests_total
        .with_label_values(&[&method, &path, &status])
        .inc();
    state
        .http_metrics
        .http_request_duration_seconds
        .with_label_values(&[&method, &path])
        .observe(start.elapsed().as_secs_f64());
    if response.status().is_client_error() || response.status().is_server_error() {
        state
            .http_metrics
            .errors_total
            .with_label_values(&[&method, &path, &status])
            .inc();
    }

    response
}

pub async fn handle_metrics(State(state): State<AppState>) -> impl IntoResponse {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).ok();
    (
        [("content-type", encoder.format_type().to_string())],
        buffer,
    )
}
