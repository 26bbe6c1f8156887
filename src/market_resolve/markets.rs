use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use super::cpmm;
use crate::error::{MarketError, MarketResult};
use crate::ledger::{Address, Amount, CollateralLedger};
use crate::shares::{Outcome, SharePosition, ShareBook, ShareSupply};

/// Binary Market Engine
/// One record per question: collateral custody, outcome share balances,
/// the swap pool and resolution state.
///
/// Lifecycle: Open --resolve(outcome)--> Resolved
///   - Open: split, merge, swap, buy, add_liquidity
///   - Resolved: redeem, redeem_pool
///   - Reads are always allowed

// ============================================================================
// MARKET ID
// ============================================================================

/// Opaque market identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(Uuid);

impl MarketId {
    pub fn new() -> Self {
        MarketId(Uuid::new_v4())
    }

    /// Deterministic custody address holding this market's collateral
    pub fn custody_address(&self) -> Address {
        let digest = Sha256::digest(format!("polymini-market:{}", self.0).as_bytes());
        Address::new(format!("0x{}", &hex::encode(digest)[..40]))
    }
}

impl Default for MarketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for MarketId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(MarketId)
    }
}

// ============================================================================
// MARKET
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    id: MarketId,
    question: String,
    close_time: u64,
    resolver_authority: Address,
    custody: Address,
    fee_bps: u32,
    enforce_close_time: bool,
    created_at: u64,
    resolved: bool,
    winning_outcome: Option<Outcome>,
    resolved_at: Option<u64>,
    pub(crate) shares: ShareBook,
}

/// Read-only view of a market, what clients poll after every call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInfo {
    pub id: MarketId,
    pub question: String,
    pub close_time: u64,
    pub resolver_authority: Address,
    pub custody: Address,
    pub fee_bps: u32,
    pub created_at: u64,
    pub resolved: bool,
    pub winning_outcome: Option<Outcome>,
    pub resolved_at: Option<u64>,
    pub yes_reserve: Amount,
    pub no_reserve: Amount,
    /// `None` while the pool is empty
    pub price_yes_e18: Option<u128>,
    pub price_no_e18: Option<u128>,
    pub collateral_held: Amount,
    pub supply: ShareSupply,
}

impl Market {
    pub fn new(
        id: MarketId,
        question: String,
        close_time: u64,
        resolver_authority: Address,
        fee_bps: u32,
        enforce_close_time: bool,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            question,
            close_time,
            resolver_authority,
            custody: id.custody_address(),
            fee_bps,
            enforce_close_time,
            created_at,
            resolved: false,
            winning_outcome: None,
            resolved_at: None,
            shares: ShareBook::new(),
        }
    }

    pub fn id(&self) -> MarketId {
        self.id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn close_time(&self) -> u64 {
        self.close_time
    }

    pub fn resolver_authority(&self) -> &Address {
        &self.resolver_authority
    }

    pub fn custody(&self) -> &Address {
        &self.custody
    }

    pub fn fee_bps(&self) -> u32 {
        self.fee_bps
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn winning_outcome(&self) -> Option<Outcome> {
        self.winning_outcome
    }

    pub fn yes_reserve(&self) -> Amount {
        self.shares.pool().yes
    }

    pub fn no_reserve(&self) -> Amount {
        self.shares.pool().no
    }

    pub fn yes_balance(&self, account: &Address) -> Amount {
        self.shares.balance(account, Outcome::Yes)
    }

    pub fn no_balance(&self, account: &Address) -> Amount {
        self.shares.balance(account, Outcome::No)
    }

    pub fn position(&self, account: &Address) -> SharePosition {
        self.shares.position(account)
    }

    pub fn shares(&self) -> &ShareBook {
        &self.shares
    }

    pub fn collateral_held(&self, collateral: &CollateralLedger) -> Amount {
        collateral.balance_of(&self.custody)
    }

    pub fn spot_price_yes_e18(&self) -> MarketResult<u128> {
        cpmm::spot_prices(self.yes_reserve(), self.no_reserve()).map(|(yes, _)| yes)
    }

    pub fn spot_price_no_e18(&self) -> MarketResult<u128> {
        cpmm::spot_prices(self.yes_reserve(), self.no_reserve()).map(|(_, no)| no)
    }

    /// Trading has stopped (close time reached) without resolution yet
    pub fn is_past_close(&self, now: u64) -> bool {
        self.enforce_close_time && now >= self.close_time
    }

    pub fn info(&self, collateral: &CollateralLedger) -> MarketInfo {
        let prices = cpmm::spot_prices(self.yes_reserve(), self.no_reserve()).ok();
        MarketInfo {
            id: self.id,
            question: self.question.clone(),
            close_time: self.close_time,
            resolver_authority: self.resolver_authority.clone(),
            custody: self.custody.clone(),
            fee_bps: self.fee_bps,
            created_at: self.created_at,
            resolved: self.resolved,
            winning_outcome: self.winning_outcome,
            resolved_at: self.resolved_at,
            yes_reserve: self.yes_reserve(),
            no_reserve: self.no_reserve(),
            price_yes_e18: prices.map(|(yes, _)| yes),
            price_no_e18: prices.map(|(_, no)| no),
            collateral_held: self.collateral_held(collateral),
            supply: self.shares.supply(),
        }
    }

    // ========================================================================
    // GUARDS
    // ========================================================================

    pub(crate) fn ensure_unresolved(&self) -> MarketResult<()> {
        if self.resolved {
            return Err(MarketError::MarketClosed);
        }
        Ok(())
    }

    /// Open and, when close-time enforcement is on, before `close_time`
    pub(crate) fn ensure_trading(&self, now: u64) -> MarketResult<()> {
        self.ensure_unresolved()?;
        if self.is_past_close(now) {
            return Err(MarketError::MarketClosed);
        }
        Ok(())
    }

    pub(crate) fn ensure_resolver(&self, caller: &Address) -> MarketResult<()> {
        if caller != &self.resolver_authority {
            return Err(MarketError::Unauthorized(caller.clone()));
        }
        Ok(())
    }

    /// Winning outcome, or `NotResolved`
    pub(crate) fn settled_outcome(&self) -> MarketResult<Outcome> {
        match (self.resolved, self.winning_outcome) {
            (true, Some(outcome)) => Ok(outcome),
            _ => Err(MarketError::NotResolved),
        }
    }

    // ========================================================================
    // COLLATERAL CUSTODY
    // ========================================================================

    /// Pull collateral from `from` into custody (requires prior approval)
    pub(crate) fn pull_collateral(
        &self,
        collateral: &mut CollateralLedger,
        from: &Address,
        amount: Amount,
    ) -> MarketResult<()> {
        collateral.transfer_from(&self.custody, from, &self.custody, amount)?;
        Ok(())
    }

    /// Pay collateral out of custody
    pub(crate) fn push_collateral(
        &self,
        collateral: &mut CollateralLedger,
        to: &Address,
        amount: Amount,
    ) -> MarketResult<()> {
        collateral.transfer(&self.custody, to, amount)?;
        Ok(())
    }

    // ========================================================================
    // RESOLUTION
    // ========================================================================

    /// Fix the winning outcome. Resolver only, exactly once.
    pub fn resolve(&mut self, caller: &Address, outcome: Outcome, now: u64) -> MarketResult<()> {
        self.ensure_resolver(caller)?;
        if self.resolved {
            return Err(MarketError::AlreadyResolved);
        }
        if self.enforce_close_time && now < self.close_time {
            return Err(MarketError::CloseTimeNotReached {
                close_time: self.close_time,
                now,
            });
        }

        self.resolved = true;
        self.winning_outcome = Some(outcome);
        self.resolved_at = Some(now);

        info!(market = %self.id, %outcome, "market resolved");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> Address {
        Address::from("resolver")
    }

    fn market(enforce: bool) -> Market {
        Market::new(
            MarketId::new(),
            "Will it rain tomorrow?".to_string(),
            1_000,
            resolver(),
            0,
            enforce,
            500,
        )
    }

    #[test]
    fn test_custody_address_is_deterministic() {
        let id = MarketId::new();
        let custody = id.custody_address();
        assert_eq!(custody, id.custody_address());
        assert!(custody.as_str().starts_with("0x"));
        assert_eq!(custody.as_str().len(), 42);
        assert_ne!(custody, MarketId::new().custody_address());
    }

    #[test]
    fn test_market_id_parses_display() {
        let id = MarketId::new();
        let parsed: MarketId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_resolve_is_final() {
        let mut m = market(true);
        m.resolve(&resolver(), Outcome::Yes, 1_000).unwrap();
        assert!(m.is_resolved());
        assert_eq!(m.winning_outcome(), Some(Outcome::Yes));

        assert_eq!(
            m.resolve(&resolver(), Outcome::No, 2_000),
            Err(MarketError::AlreadyResolved)
        );
        assert_eq!(m.winning_outcome(), Some(Outcome::Yes));
    }

    #[test]
    fn test_resolve_requires_resolver() {
        let mut m = market(true);
        let err = m.resolve(&Address::from("mallory"), Outcome::Yes, 1_000).unwrap_err();
        assert_eq!(err, MarketError::Unauthorized(Address::from("mallory")));
        assert!(!m.is_resolved());
    }

    #[test]
    fn test_resolve_waits_for_close_time() {
        let mut m = market(true);
        assert_eq!(
            m.resolve(&resolver(), Outcome::No, 999),
            Err(MarketError::CloseTimeNotReached { close_time: 1_000, now: 999 })
        );

        let mut lax = market(false);
        lax.resolve(&resolver(), Outcome::No, 999).unwrap();
        assert_eq!(lax.winning_outcome(), Some(Outcome::No));
    }

    #[test]
    fn test_trading_guard() {
        let m = market(true);
        assert!(m.ensure_trading(999).is_ok());
        assert_eq!(m.ensure_trading(1_000), Err(MarketError::MarketClosed));
        assert!(market(false).ensure_trading(5_000).is_ok());
    }

    #[test]
    fn test_empty_pool_prices() {
        let m = market(true);
        assert_eq!(m.spot_price_yes_e18(), Err(MarketError::PoolEmpty));
        let info = m.info(&CollateralLedger::default());
        assert_eq!(info.price_yes_e18, None);
        assert_eq!(info.collateral_held, 0);
    }
}
