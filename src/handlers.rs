// HTTP request handlers for the PolyMini API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::app_state::{lock, SharedState};
use crate::error::{CollateralError, MarketError};
use crate::events::EventRecord;
use crate::ledger::{Address, Amount};
use crate::market_resolve::{BuyReceipt, MarketId, SwapQuote};
use crate::models::*;
use crate::registry::MarketRegistry;
use crate::shares::Outcome;
use crate::units::display_collateral;

// ===== ERRORS =====

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Market(#[from] MarketError),

    #[error("{0}")]
    BadRequest(String),
}

impl From<CollateralError> for ApiError {
    fn from(err: CollateralError) -> Self {
        ApiError::Market(MarketError::Collateral(err))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Market(err) => match err {
                MarketError::MarketNotFound(_) => StatusCode::NOT_FOUND,
                MarketError::Unauthorized(_) => StatusCode::FORBIDDEN,
                MarketError::MarketClosed
                | MarketError::NotResolved
                | MarketError::AlreadyResolved
                | MarketError::CloseTimeNotReached { .. }
                | MarketError::PoolEmpty => StatusCode::CONFLICT,
                MarketError::SlippageExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                MarketError::ArithmeticFault
                | MarketError::Collateral(CollateralError::ArithmeticFault) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                MarketError::ZeroAmount
                | MarketError::InsufficientBalance { .. }
                | MarketError::InvalidCloseTime { .. }
                | MarketError::OutOfRange { .. }
                | MarketError::Collateral(_) => StatusCode::BAD_REQUEST,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Market(err) => err.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            success: false,
            error: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub(crate) fn parse_market_id(raw: &str) -> Result<MarketId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid market id: {}", raw)))
}

fn view(registry: &MarketRegistry, id: MarketId) -> Result<MarketView, ApiError> {
    Ok(registry.market_info(id)?.into())
}

fn respond<T: Serialize>(registry: &MarketRegistry, id: MarketId, result: T) -> ApiResult<OperationResponse<T>> {
    Ok(Json(OperationResponse {
        success: true,
        result,
        market: view(registry, id)?,
    }))
}

// ===== HEALTH =====

pub async fn health_check() -> &'static str {
    "PolyMini Binary Market AMM - Online ✅"
}

// ===== FACTORY =====

/// GET /markets?start&count
pub async fn get_markets(
    State(state): State<SharedState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<MarketListResponse> {
    let app_state = lock(&state);
    let registry = &app_state.registry;

    let total = registry.market_count();
    let start = page.start.unwrap_or(0);
    let count = page.count.unwrap_or(total);

    let markets = registry
        .get_markets(start, count)?
        .into_iter()
        .map(|id| view(registry, id))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(MarketListResponse { total, start, markets }))
}

/// POST /markets
pub async fn create_market(
    State(state): State<SharedState>,
    Json(request): Json<CreateMarketRequest>,
) -> Result<(StatusCode, Json<CreateMarketResponse>), ApiError> {
    let mut app_state = lock(&state);
    let id = app_state
        .registry
        .create_market(&request.caller, &request.question, request.close_time)?;
    let market = view(&app_state.registry, id)?;

    app_state.log_activity(
        "📊",
        "MARKET_CREATED",
        &format!("{} | \"{}\" | closes {}", id, request.question, request.close_time),
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateMarketResponse { success: true, market_id: id, market }),
    ))
}

// ===== MARKET READS =====

/// GET /markets/:id
pub async fn get_market(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<MarketView> {
    let id = parse_market_id(&id)?;
    let app_state = lock(&state);
    Ok(Json(view(&app_state.registry, id)?))
}

/// GET /markets/:id/positions/:account
pub async fn get_position(
    State(state): State<SharedState>,
    Path((id, account)): Path<(String, String)>,
) -> ApiResult<PositionResponse> {
    let id = parse_market_id(&id)?;
    let app_state = lock(&state);
    let account = Address::from(account);
    let position = app_state.registry.position(id, &account)?;

    Ok(Json(PositionResponse {
        market_id: id,
        account,
        yes: position.yes,
        no: position.no,
    }))
}

/// GET /markets/:id/quote/swap?outcome&amount
pub async fn quote_swap(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<QuoteQuery>,
) -> ApiResult<SwapQuote> {
    let id = parse_market_id(&id)?;
    let app_state = lock(&state);
    Ok(Json(app_state.registry.quote_swap(id, query.outcome, query.amount.into())?))
}

/// GET /markets/:id/quote/buy?outcome&amount
pub async fn quote_buy(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<QuoteQuery>,
) -> ApiResult<BuyReceipt> {
    let id = parse_market_id(&id)?;
    let app_state = lock(&state);
    Ok(Json(app_state.registry.quote_buy(id, query.outcome, query.amount.into())?))
}

// ===== MINT / BURN =====

/// POST /markets/:id/liquidity
pub async fn add_liquidity(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<AmountRequest>,
) -> ApiResult<OperationResponse<()>> {
    let id = parse_market_id(&id)?;
    let mut app_state = lock(&state);
    app_state.registry.add_liquidity(id, &request.caller, request.amount)?;

    app_state.log_activity(
        "💧",
        "LIQUIDITY_ADDED",
        &format!("{} | {} added {} mUSDC", id, request.caller, display_collateral(request.amount)),
    );
    respond(&app_state.registry, id, ())
}

/// POST /markets/:id/split
pub async fn split(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<AmountRequest>,
) -> ApiResult<OperationResponse<()>> {
    let id = parse_market_id(&id)?;
    let mut app_state = lock(&state);
    app_state.registry.split(id, &request.caller, request.amount)?;

    app_state.log_activity(
        "✂️",
        "SPLIT",
        &format!("{} | {} split {} mUSDC", id, request.caller, display_collateral(request.amount)),
    );
    respond(&app_state.registry, id, ())
}

/// POST /markets/:id/merge
pub async fn merge(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<AmountRequest>,
) -> ApiResult<OperationResponse<()>> {
    let id = parse_market_id(&id)?;
    let mut app_state = lock(&state);
    app_state.registry.merge(id, &request.caller, request.amount)?;

    app_state.log_activity(
        "🔗",
        "MERGE",
        &format!("{} | {} merged {} sets", id, request.caller, request.amount),
    );
    respond(&app_state.registry, id, ())
}

// ===== TRADING =====

/// POST /markets/:id/swap
pub async fn swap(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<SwapRequest>,
) -> ApiResult<OperationResponse<SwapQuote>> {
    let id = parse_market_id(&id)?;
    let mut app_state = lock(&state);
    let quote = app_state.registry.swap(
        id,
        &request.caller,
        request.outcome_in,
        request.amount_in,
        request.min_out,
    )?;

    app_state.log_activity(
        "🔄",
        "SWAP",
        &format!(
            "{} | {} swapped {} {} for {} {}",
            id,
            request.caller,
            quote.amount_in,
            request.outcome_in,
            quote.amount_out,
            request.outcome_in.opposite()
        ),
    );
    respond(&app_state.registry, id, quote)
}

/// POST /markets/:id/buy
pub async fn buy(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<BuyRequest>,
) -> ApiResult<OperationResponse<BuyReceipt>> {
    let id = parse_market_id(&id)?;
    let mut app_state = lock(&state);
    let receipt = app_state.registry.buy(
        id,
        &request.caller,
        request.outcome,
        request.collateral_in,
        request.min_total_out,
    )?;

    app_state.log_activity(
        "🎯",
        "BUY",
        &format!(
            "{} | {} paid {} mUSDC for {} {}",
            id,
            request.caller,
            display_collateral(receipt.collateral_in),
            receipt.total_out,
            receipt.outcome
        ),
    );
    respond(&app_state.registry, id, receipt)
}

// ===== RESOLUTION =====

/// POST /markets/:id/resolve
pub async fn resolve(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<ResolveRequest>,
) -> ApiResult<OperationResponse<Outcome>> {
    let id = parse_market_id(&id)?;
    let outcome = Outcome::from_u8(request.outcome)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid outcome: {} (use 1 = YES, 0 = NO)", request.outcome)))?;

    let mut app_state = lock(&state);
    app_state.registry.resolve(id, &request.caller, outcome)?;

    app_state.log_activity("✅", "MARKET_RESOLVED", &format!("{} | winner {}", id, outcome));
    respond(&app_state.registry, id, outcome)
}

/// POST /markets/:id/redeem
pub async fn redeem(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<RedeemRequest>,
) -> ApiResult<OperationResponse<Amount>> {
    let id = parse_market_id(&id)?;
    let mut app_state = lock(&state);
    let payout = app_state.registry.redeem(id, &request.caller)?;

    app_state.log_activity(
        "💰",
        "REDEEM",
        &format!("{} | {} received {} mUSDC", id, request.caller, display_collateral(payout)),
    );
    respond(&app_state.registry, id, payout)
}

/// POST /markets/:id/redeem-pool
pub async fn redeem_pool(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<RedeemPoolRequest>,
) -> ApiResult<OperationResponse<Amount>> {
    let id = parse_market_id(&id)?;
    let mut app_state = lock(&state);
    let payout = app_state.registry.redeem_pool(id, &request.caller, &request.to)?;

    app_state.log_activity(
        "🏦",
        "POOL_REDEEMED",
        &format!("{} | {} mUSDC to {}", id, display_collateral(payout), request.to),
    );
    respond(&app_state.registry, id, payout)
}

// ===== ACTIVITY =====

/// GET /events?since=N
pub async fn get_events(
    State(state): State<SharedState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<EventRecord>> {
    let app_state = lock(&state);
    Json(app_state.registry.events_since(query.since))
}

/// GET /activity
pub async fn get_activity(State(state): State<SharedState>) -> Json<Vec<String>> {
    let app_state = lock(&state);
    Json(app_state.recent_activity(100).to_vec())
}
