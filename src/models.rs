// Request and response models for the PolyMini HTTP API
//
// Amounts travel as integers in the collateral's smallest unit (6 decimals
// for mUSDC). Query strings use u64 amounts; request bodies accept the full
// u128 range.

use serde::{Deserialize, Serialize};

use crate::ledger::{Address, Amount};
use crate::market_resolve::{MarketId, MarketInfo};
use crate::shares::Outcome;
use crate::units::{display_collateral, format_units, PRICE_DECIMALS};

// ===== REQUESTS =====

#[derive(Debug, Deserialize)]
pub struct CreateMarketRequest {
    pub caller: Address,
    pub question: String,
    /// Unix seconds
    pub close_time: u64,
}

/// Body for liquidity, split and merge
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub caller: Address,
    pub amount: Amount,
}

#[derive(Debug, Deserialize)]
pub struct SwapRequest {
    pub caller: Address,
    pub outcome_in: Outcome,
    pub amount_in: Amount,
    #[serde(default)]
    pub min_out: Amount,
}

#[derive(Debug, Deserialize)]
pub struct BuyRequest {
    pub caller: Address,
    pub outcome: Outcome,
    pub collateral_in: Amount,
    #[serde(default)]
    pub min_total_out: Amount,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub caller: Address,
    /// 1 = YES, 0 = NO
    pub outcome: u8,
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub caller: Address,
}

#[derive(Debug, Deserialize)]
pub struct RedeemPoolRequest {
    pub caller: Address,
    pub to: Address,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub owner: Address,
    pub spender: Address,
    pub amount: Amount,
}

#[derive(Debug, Deserialize)]
pub struct FaucetRequest {
    pub account: Address,
    /// Defaults to the configured faucet amount
    #[serde(default)]
    pub amount: Option<Amount>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub start: Option<usize>,
    pub count: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub since: u64,
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub outcome: Outcome,
    pub amount: u64,
}

// ===== RESPONSES =====

/// Market info plus human-readable prices and collateral
#[derive(Debug, Serialize)]
pub struct MarketView {
    #[serde(flatten)]
    pub info: MarketInfo,
    pub price_yes: Option<String>,
    pub price_no: Option<String>,
    pub collateral_held_display: String,
}

impl From<MarketInfo> for MarketView {
    fn from(info: MarketInfo) -> Self {
        let price = |value: Option<u128>| value.and_then(|v| format_units(v, PRICE_DECIMALS).ok());
        MarketView {
            price_yes: price(info.price_yes_e18),
            price_no: price(info.price_no_e18),
            collateral_held_display: display_collateral(info.collateral_held),
            info,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MarketListResponse {
    pub total: usize,
    pub start: usize,
    pub markets: Vec<MarketView>,
}

#[derive(Debug, Serialize)]
pub struct CreateMarketResponse {
    pub success: bool,
    pub market_id: MarketId,
    pub market: MarketView,
}

/// Result of a market operation, with the market state after it
#[derive(Debug, Serialize)]
pub struct OperationResponse<T: Serialize> {
    pub success: bool,
    pub result: T,
    pub market: MarketView,
}

#[derive(Debug, Serialize)]
pub struct PositionResponse {
    pub market_id: MarketId,
    pub account: Address,
    pub yes: Amount,
    pub no: Amount,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub account: Address,
    pub symbol: String,
    pub balance: Amount,
    pub display: String,
}

#[derive(Debug, Serialize)]
pub struct AllowanceResponse {
    pub owner: Address,
    pub spender: Address,
    pub allowance: Amount,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: &'static str,
    pub message: String,
}
