//! HTTP API for the Meridian daemon.
//!
//! Provides REST endpoints for:
//! - Health check
//! - Users (create, read, update)
//! - Orders (place, read, execute, cancel)
//! - Portfolio, order history and trade history
//! - Ecosystem status and advisory enrichment

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;
use uuid::Uuid;

use meridian_domain::{Order, OrderSide, Portfolio, Trade, User, UserUpdate};
use meridian_ecosystem::{
    Advisory, AiInsight, ComplianceReport, GatewayStatus, SecurityStatus,
};
use meridian_engine::EngineError;
use meridian_store::Store;

use crate::error::DaemonError;
use crate::service::TradingService;

// =============================================================================
// API State
// =============================================================================

/// Shared state for API handlers.
pub struct ApiState<S: Store + 'static> {
    pub service: Arc<TradingService<S>>,
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Request to register a user.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Request to place an order, or to check one for compliance.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub user_id: String,
    pub symbol: String,
    pub side: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub limit_price: Decimal,
}

/// Request to execute a pending order.
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub execution_price: Decimal,
}

/// Cancel outcome.
#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub order_id: Uuid,
    /// False if the order was already cancelled
    pub cancelled: bool,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable error kind, e.g. `InvalidOrderState`
    pub kind: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

// =============================================================================
// Router
// =============================================================================

/// Create the API router.
pub fn create_router<S>(state: Arc<ApiState<S>>) -> Router
where
    S: Store + 'static,
{
    Router::new()
        .route("/health", get(health_handler))
        .route("/users", post(create_user_handler::<S>))
        .route("/users/:id", get(get_user_handler::<S>).patch(update_user_handler::<S>))
        .route("/users/:id/portfolio", get(portfolio_handler::<S>))
        .route("/users/:id/orders", get(order_history_handler::<S>))
        .route("/users/:id/trades", get(trade_history_handler::<S>))
        .route("/orders", post(place_order_handler::<S>))
        .route("/orders/:id", get(get_order_handler::<S>))
        .route("/orders/:id/execute", post(execute_handler::<S>))
        .route("/orders/:id/cancel", post(cancel_handler::<S>))
        .route("/ecosystem/status", get(ecosystem_status_handler::<S>))
        .route("/users/:id/advisory/risk", get(risk_handler::<S>))
        .route(
            "/users/:id/advisory/recommendation/:symbol",
            get(recommendation_handler::<S>),
        )
        .route("/users/:id/advisory/security", get(security_handler::<S>))
        .route("/advisory/compliance", post(compliance_handler::<S>))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn create_user_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), (StatusCode, Json<ErrorResponse>)> {
    let user = state
        .service
        .engine()
        .create_user(&request.id, &request.name, &request.email)
        .map_err(engine_error)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
) -> ApiResult<User> {
    let user = state.service.engine().get_user(&id).map_err(engine_error)?;
    Ok(Json(user))
}

async fn update_user_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
    Json(update): Json<UserUpdate>,
) -> ApiResult<User> {
    let user = state.service.engine().update_user(&id, &update).map_err(engine_error)?;
    Ok(Json(user))
}

/// Place an order (pending).
async fn place_order_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Json(request): Json<OrderRequest>,
) -> Result<(StatusCode, Json<Order>), (StatusCode, Json<ErrorResponse>)> {
    let engine = state.service.engine();

    // Unknown user is reported before a malformed side
    engine.get_user(&request.user_id).map_err(engine_error)?;
    let side = parse_side(&request.side)?;

    let order = engine
        .place_order(&request.user_id, &request.symbol, side, request.quantity, request.limit_price)
        .map_err(engine_error)?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Order> {
    let order = state.service.engine().get_order(id).map_err(engine_error)?;
    Ok(Json(order))
}

/// Execute a pending order.
async fn execute_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ExecuteRequest>,
) -> ApiResult<Trade> {
    let trade = state
        .service
        .engine()
        .execute_trade(id, request.execution_price)
        .map_err(engine_error)?;
    Ok(Json(trade))
}

async fn cancel_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<Uuid>,
) -> ApiResult<CancelResponse> {
    let cancelled = state.service.engine().cancel_order(id).map_err(engine_error)?;
    Ok(Json(CancelResponse {
        order_id: id,
        cancelled,
    }))
}

async fn portfolio_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
) -> ApiResult<Portfolio> {
    let portfolio = state.service.engine().get_portfolio(&id).map_err(engine_error)?;
    Ok(Json(portfolio))
}

async fn order_history_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Order>> {
    let orders = state.service.engine().get_order_history(&id).map_err(engine_error)?;
    Ok(Json(orders))
}

async fn trade_history_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Trade>> {
    let trades = state.service.engine().get_trade_history(&id).map_err(engine_error)?;
    Ok(Json(trades))
}

// =============================================================================
// Advisory Handlers
// =============================================================================

async fn ecosystem_status_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
) -> Json<GatewayStatus> {
    Json(state.service.ecosystem_status())
}

async fn risk_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
) -> ApiResult<Advisory<AiInsight>> {
    let advisory = state.service.assess_risk(&id).await.map_err(engine_error)?;
    Ok(Json(advisory))
}

async fn recommendation_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Path((id, symbol)): Path<(String, String)>,
) -> ApiResult<Advisory<AiInsight>> {
    let advisory = state.service.recommend(&id, &symbol).await.map_err(engine_error)?;
    Ok(Json(advisory))
}

async fn security_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
) -> ApiResult<Advisory<SecurityStatus>> {
    let advisory = state.service.security_status(&id).await.map_err(engine_error)?;
    Ok(Json(advisory))
}

async fn compliance_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Json(request): Json<OrderRequest>,
) -> ApiResult<Advisory<ComplianceReport>> {
    let side = parse_side(&request.side)?;
    let advisory = state
        .service
        .check_compliance(
            &request.user_id,
            &request.symbol,
            side,
            request.quantity,
            request.limit_price,
        )
        .await
        .map_err(engine_error)?;
    Ok(Json(advisory))
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_side(raw: &str) -> Result<OrderSide, (StatusCode, Json<ErrorResponse>)> {
    OrderSide::from_str(raw).map_err(|e| engine_error(e.into()))
}

fn engine_error(error: EngineError) -> (StatusCode, Json<ErrorResponse>) {
    to_error_response(DaemonError::Engine(error))
}

fn to_error_response(error: DaemonError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, kind) = match &error {
        DaemonError::Engine(engine) => (engine_status(engine), engine.kind()),
        DaemonError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Config"),
        DaemonError::Server(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server"),
    };

    debug!(%status, kind, error = %error, "Request rejected");

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            kind: kind.to_string(),
        }),
    )
}

fn engine_status(error: &EngineError) -> StatusCode {
    match error {
        EngineError::UserNotFound(_) | EngineError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidOrderState { .. }
        | EngineError::InvalidTransition(_)
        | EngineError::UserAlreadyExists(_)
        | EngineError::InsufficientPosition { .. } => StatusCode::CONFLICT,
        EngineError::InvalidQuantity(_)
        | EngineError::InvalidPrice(_)
        | EngineError::InvalidSymbol(_)
        | EngineError::InvalidSide(_)
        | EngineError::InvalidUser(_) => StatusCode::BAD_REQUEST,
        EngineError::ArithmeticOverflow(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// Tests
// =============================================================================
