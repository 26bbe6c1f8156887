// ============================================================================
// Market Registry - PolyMini Factory
// ============================================================================
//
// The registry creates markets, remembers them in creation order and routes
// every market operation to the right record. It owns the shared collateral
// ledger so that custody transfers and share changes happen under the same
// borrow; callers serialize access with a single lock (see `app_state`).
//
// Registry-level operations:
//   create_market  - owner only, close_time must be in the future
//   market_count   - number of markets ever created
//   get_markets    - creation-ordered page of market ids
//
// ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use crate::clock::Clock;
use crate::config::ConfigError;
use crate::error::{MarketError, MarketResult};
use crate::events::{EventLog, EventRecord, MarketEvent};
use crate::ledger::{Address, Amount, CollateralLedger};
use crate::market_resolve::{BuyReceipt, Market, MarketId, MarketInfo, SwapQuote, MAX_FEE_BPS};
use crate::shares::{Outcome, SharePosition};

/// Parameters every market created by this registry inherits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry owner: the only account allowed to create markets, and the
    /// resolver authority of every market it creates
    pub resolver_authority: Address,
    pub fee_bps: u32,
    pub enforce_close_time: bool,
}

impl RegistryConfig {
    pub fn new(resolver_authority: Address) -> Self {
        Self {
            resolver_authority,
            fee_bps: crate::market_resolve::DEFAULT_FEE_BPS,
            enforce_close_time: true,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fee_bps > MAX_FEE_BPS {
            return Err(ConfigError::FeeTooHigh {
                fee_bps: self.fee_bps,
                max: MAX_FEE_BPS,
            });
        }
        Ok(())
    }
}

/// Everything needed to rebuild a registry after restart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub config: RegistryConfig,
    pub collateral: CollateralLedger,
    /// In creation order
    pub markets: Vec<Market>,
}

#[derive(Debug)]
pub struct MarketRegistry {
    config: RegistryConfig,
    collateral: CollateralLedger,
    markets: HashMap<MarketId, Market>,
    order: Vec<MarketId>,
    clock: Arc<dyn Clock>,
    events: EventLog,
}

impl MarketRegistry {
    pub fn new(config: RegistryConfig, collateral: CollateralLedger, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            collateral,
            markets: HashMap::new(),
            order: Vec::new(),
            clock,
            events: EventLog::new(),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn collateral(&self) -> &CollateralLedger {
        &self.collateral
    }

    pub fn collateral_mut(&mut self) -> &mut CollateralLedger {
        &mut self.collateral
    }

    // ========================================================================
    // FACTORY
    // ========================================================================

    /// Create a market and append it to the registry
    ///
    /// # Arguments
    /// * `caller` - must be the registry owner
    /// * `question` - free text, stored verbatim
    /// * `close_time` - Unix seconds, strictly after the current time
    ///
    /// # Returns
    /// The new market's id
    pub fn create_market(&mut self, caller: &Address, question: &str, close_time: u64) -> MarketResult<MarketId> {
        if caller != &self.config.resolver_authority {
            return Err(MarketError::Unauthorized(caller.clone()));
        }
        let now = self.clock.now();
        if close_time <= now {
            return Err(MarketError::InvalidCloseTime { close_time, now });
        }

        let id = MarketId::new();
        let market = Market::new(
            id,
            question.to_string(),
            close_time,
            self.config.resolver_authority.clone(),
            self.config.fee_bps,
            self.config.enforce_close_time,
            now,
        );
        self.markets.insert(id, market);
        self.order.push(id);

        info!(market = %id, close_time, question, "market created");
        self.events.emit(
            MarketEvent::MarketCreated {
                market: id,
                creator: caller.clone(),
                question: question.to_string(),
                close_time,
            },
            now,
        );
        Ok(id)
    }

    pub fn market_count(&self) -> usize {
        self.order.len()
    }

    /// Up to `count` market ids starting at `start`, in creation order.
    /// `start == market_count()` yields an empty page; anything past it is out of range.
    pub fn get_markets(&self, start: usize, count: usize) -> MarketResult<Vec<MarketId>> {
        let total = self.order.len();
        if start > total {
            return Err(MarketError::OutOfRange { start, total });
        }
        let end = start.saturating_add(count).min(total);
        Ok(self.order[start..end].to_vec())
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn market(&self, id: MarketId) -> MarketResult<&Market> {
        self.markets.get(&id).ok_or(MarketError::MarketNotFound(id))
    }

    pub fn market_info(&self, id: MarketId) -> MarketResult<MarketInfo> {
        Ok(self.market(id)?.info(&self.collateral))
    }

    pub fn position(&self, id: MarketId, account: &Address) -> MarketResult<SharePosition> {
        Ok(self.market(id)?.position(account))
    }

    /// (YES, NO) spot prices scaled by 1e18
    pub fn spot_prices(&self, id: MarketId) -> MarketResult<(u128, u128)> {
        let market = self.market(id)?;
        Ok((market.spot_price_yes_e18()?, market.spot_price_no_e18()?))
    }

    pub fn quote_swap(&self, id: MarketId, outcome_in: Outcome, amount_in: Amount) -> MarketResult<SwapQuote> {
        self.market(id)?.quote_swap(outcome_in, amount_in)
    }

    pub fn quote_buy(&self, id: MarketId, outcome: Outcome, collateral_in: Amount) -> MarketResult<BuyReceipt> {
        self.market(id)?.quote_buy(outcome, collateral_in)
    }

    // ========================================================================
    // MARKET OPERATIONS
    // ========================================================================

    /// Run `op` against one market with the shared collateral ledger and the
    /// current time, then record the resulting event on success.
    fn with_market<T>(
        &mut self,
        id: MarketId,
        op: impl FnOnce(&mut Market, &mut CollateralLedger, u64) -> MarketResult<T>,
        event: impl FnOnce(&T) -> MarketEvent,
    ) -> MarketResult<T> {
        let now = self.clock.now();
        let market = self.markets.get_mut(&id).ok_or(MarketError::MarketNotFound(id))?;
        let result = op(market, &mut self.collateral, now)?;
        self.events.emit(event(&result), now);
        Ok(result)
    }

    pub fn add_liquidity(&mut self, id: MarketId, caller: &Address, amount: Amount) -> MarketResult<()> {
        self.with_market(
            id,
            |market, collateral, now| market.add_liquidity(collateral, caller, amount, now),
            |_| MarketEvent::LiquidityAdded { market: id, provider: caller.clone(), amount },
        )
    }

    pub fn split(&mut self, id: MarketId, caller: &Address, amount: Amount) -> MarketResult<()> {
        self.with_market(
            id,
            |market, collateral, now| market.split(collateral, caller, amount, now),
            |_| MarketEvent::Split { market: id, account: caller.clone(), amount },
        )
    }

    pub fn merge(&mut self, id: MarketId, caller: &Address, amount_each: Amount) -> MarketResult<()> {
        self.with_market(
            id,
            |market, collateral, _| market.merge(collateral, caller, amount_each),
            |_| MarketEvent::Merged { market: id, account: caller.clone(), amount: amount_each },
        )
    }

    pub fn swap(
        &mut self,
        id: MarketId,
        caller: &Address,
        outcome_in: Outcome,
        amount_in: Amount,
        min_out: Amount,
    ) -> MarketResult<SwapQuote> {
        self.with_market(
            id,
            |market, _, now| market.swap(caller, outcome_in, amount_in, min_out, now),
            |quote| MarketEvent::Swapped {
                market: id,
                account: caller.clone(),
                outcome_in,
                amount_in,
                amount_out: quote.amount_out,
                fee: quote.fee,
            },
        )
    }

    pub fn swap_no_for_yes(&mut self, id: MarketId, caller: &Address, no_in: Amount, min_yes_out: Amount) -> MarketResult<Amount> {
        self.swap(id, caller, Outcome::No, no_in, min_yes_out).map(|quote| quote.amount_out)
    }

    pub fn swap_yes_for_no(&mut self, id: MarketId, caller: &Address, yes_in: Amount, min_no_out: Amount) -> MarketResult<Amount> {
        self.swap(id, caller, Outcome::Yes, yes_in, min_no_out).map(|quote| quote.amount_out)
    }

    pub fn buy(
        &mut self,
        id: MarketId,
        caller: &Address,
        outcome: Outcome,
        collateral_in: Amount,
        min_total_out: Amount,
    ) -> MarketResult<BuyReceipt> {
        self.with_market(
            id,
            |market, collateral, now| market.buy(collateral, caller, outcome, collateral_in, min_total_out, now),
            |receipt| MarketEvent::Bought {
                market: id,
                account: caller.clone(),
                outcome,
                collateral_in,
                total_out: receipt.total_out,
            },
        )
    }

    pub fn buy_yes(&mut self, id: MarketId, caller: &Address, collateral_in: Amount, min_total_yes_out: Amount) -> MarketResult<Amount> {
        self.buy(id, caller, Outcome::Yes, collateral_in, min_total_yes_out)
            .map(|receipt| receipt.total_out)
    }

    pub fn buy_no(&mut self, id: MarketId, caller: &Address, collateral_in: Amount, min_total_no_out: Amount) -> MarketResult<Amount> {
        self.buy(id, caller, Outcome::No, collateral_in, min_total_no_out)
            .map(|receipt| receipt.total_out)
    }

    pub fn resolve(&mut self, id: MarketId, caller: &Address, outcome: Outcome) -> MarketResult<()> {
        self.with_market(
            id,
            |market, _, now| market.resolve(caller, outcome, now),
            |_| MarketEvent::Resolved { market: id, outcome },
        )
    }

    pub fn redeem(&mut self, id: MarketId, caller: &Address) -> MarketResult<Amount> {
        self.with_market(
            id,
            |market, collateral, _| market.redeem(collateral, caller),
            |payout| MarketEvent::Redeemed { market: id, account: caller.clone(), payout: *payout },
        )
    }

    pub fn redeem_pool(&mut self, id: MarketId, caller: &Address, to: &Address) -> MarketResult<Amount> {
        self.with_market(
            id,
            |market, collateral, _| market.redeem_pool(collateral, caller, to),
            |payout| MarketEvent::PoolRedeemed { market: id, to: to.clone(), payout: *payout },
        )
    }

    // ========================================================================
    // EVENTS
    // ========================================================================

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }

    pub fn events_since(&self, since: u64) -> Vec<EventRecord> {
        self.events.since(since)
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            config: self.config.clone(),
            collateral: self.collateral.clone(),
            markets: self
                .order
                .iter()
                .filter_map(|id| self.markets.get(id).cloned())
                .collect(),
        }
    }

    /// Rebuild from a snapshot. The event log starts empty.
    pub fn from_snapshot(snapshot: RegistrySnapshot, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let mut registry = Self::new(snapshot.config, snapshot.collateral, clock)?;
        for market in snapshot.markets {
            registry.order.push(market.id());
            registry.markets.insert(market.id(), market);
        }
        Ok(registry)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn owner() -> Address {
        Address::from("owner")
    }

    fn registry() -> (MarketRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let registry = MarketRegistry::new(
            RegistryConfig::new(owner()),
            CollateralLedger::default(),
            clock.clone(),
        )
        .unwrap();
        (registry, clock)
    }

    #[test]
    fn test_create_market_owner_only() {
        let (mut reg, _) = registry();
        let err = reg.create_market(&Address::from("bob"), "Q?", 2_000).unwrap_err();
        assert_eq!(err, MarketError::Unauthorized(Address::from("bob")));
        assert_eq!(reg.market_count(), 0);

        let id = reg.create_market(&owner(), "Q?", 2_000).unwrap();
        let info = reg.market_info(id).unwrap();
        assert_eq!(info.question, "Q?");
        assert_eq!(info.resolver_authority, owner());
        assert_eq!(info.created_at, 1_000);
    }

    #[test]
    fn test_create_market_close_time_in_past() {
        let (mut reg, _) = registry();
        assert_eq!(
            reg.create_market(&owner(), "Q?", 1_000),
            Err(MarketError::InvalidCloseTime { close_time: 1_000, now: 1_000 })
        );
        assert_eq!(reg.market_count(), 0);
    }

    #[test]
    fn test_get_markets_paging() {
        let (mut reg, _) = registry();
        let ids: Vec<MarketId> = (0..3)
            .map(|i| reg.create_market(&owner(), &format!("Q{}", i), 5_000).unwrap())
            .collect();

        assert_eq!(reg.get_markets(0, 10).unwrap(), ids);
        assert_eq!(reg.get_markets(1, 1).unwrap(), vec![ids[1]]);
        assert!(reg.get_markets(3, 5).unwrap().is_empty());
        assert_eq!(
            reg.get_markets(4, 1),
            Err(MarketError::OutOfRange { start: 4, total: 3 })
        );
    }

    #[test]
    fn test_unknown_market() {
        let (mut reg, _) = registry();
        let id = MarketId::new();
        assert_eq!(reg.split(id, &owner(), 10), Err(MarketError::MarketNotFound(id)));
        assert!(reg.events_since(0).is_empty());
    }

    #[test]
    fn test_fee_above_maximum_rejected() {
        let mut config = RegistryConfig::new(owner());
        config.fee_bps = MAX_FEE_BPS + 1;
        let err = MarketRegistry::new(config, CollateralLedger::default(), Arc::new(ManualClock::new(0)))
            .unwrap_err();
        assert!(matches!(err, ConfigError::FeeTooHigh { .. }));
    }

    #[test]
    fn test_operations_emit_events() {
        let (mut reg, clock) = registry();
        let id = reg.create_market(&owner(), "Q?", 2_000).unwrap();
        let custody = reg.market(id).unwrap().custody().clone();
        reg.collateral_mut().faucet(&owner(), 1_000).unwrap();
        reg.collateral_mut().approve(&owner(), &custody, 1_000);

        reg.add_liquidity(id, &owner(), 500).unwrap();
        reg.split(id, &owner(), 100).unwrap();
        // failed calls leave no trace
        assert!(reg.merge(id, &owner(), 1_000).is_err());

        clock.set(2_000);
        reg.resolve(id, &owner(), Outcome::Yes).unwrap();

        let kinds: Vec<&'static str> = reg
            .events_since(0)
            .iter()
            .map(|record| match record.event {
                MarketEvent::MarketCreated { .. } => "created",
                MarketEvent::LiquidityAdded { .. } => "liquidity",
                MarketEvent::Split { .. } => "split",
                MarketEvent::Resolved { .. } => "resolved",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["created", "liquidity", "split", "resolved"]);
        assert_eq!(reg.events_since(0).last().unwrap().timestamp, 2_000);
    }

    #[test]
    fn test_snapshot_restores_order_and_balances() {
        let (mut reg, clock) = registry();
        let first = reg.create_market(&owner(), "first", 5_000).unwrap();
        let second = reg.create_market(&owner(), "second", 5_000).unwrap();
        let custody = reg.market(second).unwrap().custody().clone();
        reg.collateral_mut().faucet(&owner(), 300).unwrap();
        reg.collateral_mut().approve(&owner(), &custody, 300);
        reg.split(second, &owner(), 300).unwrap();

        let json = serde_json::to_string(&reg.snapshot()).unwrap();
        let snapshot: RegistrySnapshot = serde_json::from_str(&json).unwrap();
        let restored = MarketRegistry::from_snapshot(snapshot, clock).unwrap();

        assert_eq!(restored.get_markets(0, 10).unwrap(), vec![first, second]);
        assert_eq!(restored.position(second, &owner()).unwrap(), SharePosition::new(300, 300));
        assert_eq!(restored.market_info(second).unwrap().collateral_held, 300);
    }
}
