// Collateral routes for PolyMini
// Mock USDC: balances, allowances and the test faucet. Clients approve a
// market's custody address before split, buy or add_liquidity.

use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::app_state::{lock, SharedState};
use crate::handlers::{ApiError, ApiResult};
use crate::ledger::{Address, CollateralLedger};
use crate::models::{AllowanceResponse, ApproveRequest, BalanceResponse, FaucetRequest};
use crate::units::display_collateral;

fn balance_response(collateral: &CollateralLedger, account: Address) -> BalanceResponse {
    let balance = collateral.balance_of(&account);
    BalanceResponse {
        symbol: collateral.symbol.clone(),
        display: display_collateral(balance),
        balance,
        account,
    }
}

/// GET /collateral/:account
pub async fn get_balance(
    State(state): State<SharedState>,
    Path(account): Path<String>,
) -> Json<BalanceResponse> {
    let app_state = lock(&state);
    Json(balance_response(app_state.registry.collateral(), account.into()))
}

/// GET /collateral/:account/allowance/:spender
pub async fn get_allowance(
    State(state): State<SharedState>,
    Path((owner, spender)): Path<(String, String)>,
) -> Json<AllowanceResponse> {
    let app_state = lock(&state);
    let owner = Address::from(owner);
    let spender = Address::from(spender);
    let allowance = app_state.registry.collateral().allowance(&owner, &spender);

    Json(AllowanceResponse { owner, spender, allowance })
}

/// POST /collateral/approve
/// Sets (does not add to) the spender's allowance
pub async fn approve(
    State(state): State<SharedState>,
    Json(request): Json<ApproveRequest>,
) -> Json<AllowanceResponse> {
    let mut app_state = lock(&state);
    app_state
        .registry
        .collateral_mut()
        .approve(&request.owner, &request.spender, request.amount);

    app_state.log_activity(
        "📝",
        "APPROVE",
        &format!("{} approved {} for {}", request.owner, request.spender, request.amount),
    );

    Json(AllowanceResponse {
        owner: request.owner,
        spender: request.spender,
        allowance: request.amount,
    })
}

/// POST /collateral/faucet
/// Mint test collateral; amount defaults to the configured faucet amount
pub async fn faucet(
    State(state): State<SharedState>,
    Json(request): Json<FaucetRequest>,
) -> ApiResult<BalanceResponse> {
    let mut app_state = lock(&state);
    let amount = request.amount.unwrap_or(app_state.config.faucet_amount);
    if amount == 0 {
        return Err(ApiError::BadRequest("Faucet amount must be greater than zero".to_string()));
    }

    app_state.registry.collateral_mut().faucet(&request.account, amount)?;
    app_state.log_activity(
        "🚰",
        "FAUCET",
        &format!("{} received {} mUSDC", request.account, display_collateral(amount)),
    );

    Ok(Json(balance_response(app_state.registry.collateral(), request.account)))
}
