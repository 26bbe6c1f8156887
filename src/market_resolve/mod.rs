// ============================================================================
// Market Resolve Module - Binary Market Engine
// ============================================================================
//
// This module contains the per-question market engine:
//   - cpmm: Constant Product Market Maker pricing math
//   - markets: Market record, guards, custody and resolution
//   - trade: swaps and composite buys against the pool
//
// Minting/burning of outcome shares (split, merge, add_liquidity, redeem,
// redeem_pool) lives with the share accounting in `crate::shares`.
//
// ============================================================================

pub mod cpmm;
pub mod markets;
pub mod trade;

pub use cpmm::*;
pub use markets::*;
pub use trade::*;
