/// HTTP API for browser front-ends.
///
/// - `POST /api/recommendations`: risk factors in, formatted recommendations out
/// - `GET /api/health`: reports that the service is up
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::advisor::{RecommendationResponse, RecommendationService};
use crate::error::AppError;
use crate::prompt::RiskFactors;
use crate::server::HealthResponse;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = match &err {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        api_error(status, err.to_string())
    }
}

/// Request body as sent by clients; every field is required.
#[derive(Debug, Default, Deserialize)]
pub struct RecommendationRequest {
    pub waste_disposal: Option<f64>,
    pub stagnant_water: Option<f64>,
    pub drainage_score: Option<f64>,
    pub temperature: Option<f64>,
    pub rainfall: Option<f64>,
    pub cleanup_score: Option<f64>,
    pub dengue_cases: Option<f64>,
}

impl RecommendationRequest {
    pub fn into_factors(self) -> Option<RiskFactors> {
        Some(RiskFactors {
            waste_disposal: self.waste_disposal?,
            stagnant_water: self.stagnant_water?,
            drainage_score: self.drainage_score?,
            temperature: self.temperature?,
            rainfall: self.rainfall?,
            cleanup_score: self.cleanup_score?,
            dengue_cases: self.dengue_cases?,
        })
    }
}

pub fn build_router(service: RecommendationService) -> Router {
    Router::new()
        .route("/api/recommendations", post(recommendations))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

pub async fn serve(addr: &str, service: RecommendationService) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, "HTTP API listening");
    axum::serve(listener, build_router(service)).await
}

async fn recommendations(
    State(service): State<RecommendationService>,
    payload: Result<Json<RecommendationRequest>, JsonRejection>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected recommendation request body");
        api_error(StatusCode::BAD_REQUEST, "No data provided")
    })?;
    let factors = request
        .into_factors()
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing required fields"))?;

    let response = service.recommend(&factors).await.map_err(|e| {
        warn!(error = %e, "recommendation request failed");
        ApiError::from(e)
    })?;
    Ok(Json(response))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
