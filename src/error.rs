// ============================================================================
// Errors - PolyMini Binary Market
// ============================================================================
//
// Every error is a rejected operation: state is left exactly as it was before
// the call. The engine never retries; callers decide whether to resubmit
// (e.g. with a wider slippage tolerance).
//
// ============================================================================

use thiserror::Error;

use crate::ledger::{Address, Amount};
use crate::market_resolve::MarketId;

/// Errors raised by the collateral ledger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollateralError {
    #[error("Insufficient collateral: {account} has {available}, needs {requested}")]
    InsufficientBalance {
        account: Address,
        available: Amount,
        requested: Amount,
    },

    #[error("Insufficient allowance: {spender} may move {allowed} from {owner}, needs {requested}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        allowed: Amount,
        requested: Amount,
    },

    #[error("Arithmetic fault in collateral ledger")]
    ArithmeticFault,
}

/// Errors raised by the market engine and the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Insufficient {side} shares: have {available}, need {requested}")]
    InsufficientBalance {
        side: &'static str,
        available: Amount,
        requested: Amount,
    },

    #[error("Slippage exceeded: would receive {out}, minimum is {min_out}")]
    SlippageExceeded { out: Amount, min_out: Amount },

    #[error("Market is closed for trading")]
    MarketClosed,

    #[error("Market is not resolved yet")]
    NotResolved,

    #[error("Market is already resolved")]
    AlreadyResolved,

    #[error("Caller {0} is not the resolver authority")]
    Unauthorized(Address),

    #[error("Pool has no liquidity")]
    PoolEmpty,

    #[error("Close time {close_time} is not after current time {now}")]
    InvalidCloseTime { close_time: u64, now: u64 },

    #[error("Close time {close_time} not reached (now {now})")]
    CloseTimeNotReached { close_time: u64, now: u64 },

    #[error("Start index {start} exceeds market count {total}")]
    OutOfRange { start: usize, total: usize },

    #[error("Market not found: {0}")]
    MarketNotFound(MarketId),

    #[error("Arithmetic overflow or underflow")]
    ArithmeticFault,

    #[error("Collateral transfer failed: {0}")]
    Collateral(#[from] CollateralError),
}

impl MarketError {
    /// Short machine-readable code, used by the HTTP surface
    pub fn code(&self) -> &'static str {
        match self {
            MarketError::ZeroAmount => "ZeroAmount",
            MarketError::InsufficientBalance { .. } => "InsufficientBalance",
            MarketError::SlippageExceeded { .. } => "SlippageExceeded",
            MarketError::MarketClosed => "MarketClosed",
            MarketError::NotResolved => "NotResolved",
            MarketError::AlreadyResolved => "AlreadyResolved",
            MarketError::Unauthorized(_) => "Unauthorized",
            MarketError::PoolEmpty => "PoolEmpty",
            MarketError::InvalidCloseTime { .. } => "InvalidCloseTime",
            MarketError::CloseTimeNotReached { .. } => "CloseTimeNotReached",
            MarketError::OutOfRange { .. } => "OutOfRange",
            MarketError::MarketNotFound(_) => "MarketNotFound",
            MarketError::ArithmeticFault => "ArithmeticFault",
            MarketError::Collateral(CollateralError::InsufficientBalance { .. }) => {
                "InsufficientCollateral"
            }
            MarketError::Collateral(CollateralError::InsufficientAllowance { .. }) => {
                "InsufficientAllowance"
            }
            MarketError::Collateral(CollateralError::ArithmeticFault) => "ArithmeticFault",
        }
    }
}

pub type MarketResult<T> = Result<T, MarketError>;
