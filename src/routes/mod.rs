// Routes module - organizes all HTTP endpoints
// Market endpoints live in `handlers`; collateral endpoints in `collateral`

pub mod collateral;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::app_state::SharedState;
use crate::handlers::*;

/// Build the full API router over shared state
pub fn router(state: SharedState) -> Router {
    Router::new()
        // ===== HEALTH CHECK =====
        .route("/", get(health_check))
        .route("/health", get(health_check))

        // ===== FACTORY =====
        .route("/markets", get(get_markets).post(create_market))

        // ===== MARKET READS =====
        .route("/markets/:id", get(get_market))
        .route("/markets/:id/positions/:account", get(get_position))
        .route("/markets/:id/quote/swap", get(quote_swap))
        .route("/markets/:id/quote/buy", get(quote_buy))

        // ===== MARKET OPERATIONS =====
        .route("/markets/:id/liquidity", post(add_liquidity))
        .route("/markets/:id/split", post(split))
        .route("/markets/:id/merge", post(merge))
        .route("/markets/:id/swap", post(swap))
        .route("/markets/:id/buy", post(buy))
        .route("/markets/:id/resolve", post(resolve))
        .route("/markets/:id/redeem", post(redeem))
        .route("/markets/:id/redeem-pool", post(redeem_pool))

        // ===== COLLATERAL =====
        .route("/collateral/approve", post(collateral::approve))
        .route("/collateral/faucet", post(collateral::faucet))
        .route("/collateral/:account", get(collateral::get_balance))
        .route("/collateral/:account/allowance/:spender", get(collateral::get_allowance))

        // ===== ACTIVITY =====
        .route("/events", get(get_events))
        .route("/activity", get(get_activity))

        // Apply tracing, CORS and state
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
