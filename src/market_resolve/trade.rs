// Swaps and composite buys against the market's pool.
//
// A swap moves shares between a trader and the pool; totals never change.
// A buy is split + swap of every freshly minted share of the unwanted side,
// settled as one operation.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::cpmm::{self, SwapQuote};
use super::Market;
use crate::error::{MarketError, MarketResult};
use crate::ledger::{Address, Amount, CollateralLedger};
use crate::shares::{Outcome, SharePosition};
use crate::units::display_collateral;

/// Result of a buy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyReceipt {
    pub outcome: Outcome,
    pub collateral_in: Amount,
    /// Shares received from swapping the minted opposite side
    pub swap_out: Amount,
    /// `collateral_in + swap_out`
    pub total_out: Amount,
    pub fee: Amount,
}

impl BuyReceipt {
    fn from_quote(outcome: Outcome, quote: &SwapQuote) -> MarketResult<Self> {
        let total_out = quote
            .amount_in
            .checked_add(quote.amount_out)
            .ok_or(MarketError::ArithmeticFault)?;
        Ok(BuyReceipt {
            outcome,
            collateral_in: quote.amount_in,
            swap_out: quote.amount_out,
            total_out,
            fee: quote.fee,
        })
    }
}

/// Pool reserves after settling `quote`, given the side that was paid in
fn pool_after(outcome_in: Outcome, quote: &SwapQuote) -> SharePosition {
    match outcome_in {
        Outcome::No => SharePosition::new(quote.new_reserve_out, quote.new_reserve_in),
        Outcome::Yes => SharePosition::new(quote.new_reserve_in, quote.new_reserve_out),
    }
}

impl Market {
    /// Preview swapping `amount_in` shares of `outcome_in` for the other side
    pub fn quote_swap(&self, outcome_in: Outcome, amount_in: Amount) -> MarketResult<SwapQuote> {
        let pool = self.shares.pool();
        cpmm::quote_swap(
            pool.get(outcome_in),
            pool.get(outcome_in.opposite()),
            amount_in,
            self.fee_bps(),
        )
    }

    /// Preview buying `outcome` with `collateral_in`
    pub fn quote_buy(&self, outcome: Outcome, collateral_in: Amount) -> MarketResult<BuyReceipt> {
        let quote = self.quote_swap(outcome.opposite(), collateral_in)?;
        BuyReceipt::from_quote(outcome, &quote)
    }

    /// Swap the caller's `outcome_in` shares into the opposite side
    pub fn swap(
        &mut self,
        caller: &Address,
        outcome_in: Outcome,
        amount_in: Amount,
        min_out: Amount,
        now: u64,
    ) -> MarketResult<SwapQuote> {
        if amount_in == 0 {
            return Err(MarketError::ZeroAmount);
        }
        self.ensure_trading(now)?;

        let quote = self.quote_swap(outcome_in, amount_in)?;
        if quote.amount_out < min_out {
            return Err(MarketError::SlippageExceeded {
                out: quote.amount_out,
                min_out,
            });
        }

        let changes = {
            let mut delta = self.shares.begin();
            delta.debit(caller, outcome_in, amount_in)?;
            delta.credit(caller, outcome_in.opposite(), quote.amount_out)?;
            let pool = pool_after(outcome_in, &quote);
            delta.set_pool(pool.yes, pool.no);
            delta.finish()
        };
        self.shares.apply(changes);

        info!(
            market = %self.id(),
            account = %caller,
            side_in = %outcome_in,
            amount_in,
            amount_out = quote.amount_out,
            fee = quote.fee,
            "swap"
        );
        Ok(quote)
    }

    pub fn swap_no_for_yes(
        &mut self,
        caller: &Address,
        no_in: Amount,
        min_yes_out: Amount,
        now: u64,
    ) -> MarketResult<Amount> {
        self.swap(caller, Outcome::No, no_in, min_yes_out, now)
            .map(|quote| quote.amount_out)
    }

    pub fn swap_yes_for_no(
        &mut self,
        caller: &Address,
        yes_in: Amount,
        min_no_out: Amount,
        now: u64,
    ) -> MarketResult<Amount> {
        self.swap(caller, Outcome::Yes, yes_in, min_no_out, now)
            .map(|quote| quote.amount_out)
    }

    /// Split `collateral_in`, then swap all newly minted opposite shares into `outcome`
    pub fn buy(
        &mut self,
        collateral: &mut CollateralLedger,
        caller: &Address,
        outcome: Outcome,
        collateral_in: Amount,
        min_total_out: Amount,
        now: u64,
    ) -> MarketResult<BuyReceipt> {
        if collateral_in == 0 {
            return Err(MarketError::ZeroAmount);
        }
        self.ensure_trading(now)?;

        let sold = outcome.opposite();
        let quote = self.quote_swap(sold, collateral_in)?;
        let receipt = BuyReceipt::from_quote(outcome, &quote)?;
        if receipt.total_out < min_total_out {
            return Err(MarketError::SlippageExceeded {
                out: receipt.total_out,
                min_out: min_total_out,
            });
        }

        let changes = {
            let mut delta = self.shares.begin();
            delta.mint_pair(caller, collateral_in)?;
            delta.debit(caller, sold, collateral_in)?;
            delta.credit(caller, outcome, quote.amount_out)?;
            let pool = pool_after(sold, &quote);
            delta.set_pool(pool.yes, pool.no);
            delta.finish()
        };

        self.pull_collateral(collateral, caller, collateral_in)?;
        self.shares.apply(changes);

        info!(
            market = %self.id(),
            account = %caller,
            %outcome,
            collateral_in = %display_collateral(collateral_in),
            total_out = receipt.total_out,
            "buy"
        );
        Ok(receipt)
    }

    /// Returns the caller's total YES received
    pub fn buy_yes(
        &mut self,
        collateral: &mut CollateralLedger,
        caller: &Address,
        collateral_in: Amount,
        min_total_yes_out: Amount,
        now: u64,
    ) -> MarketResult<Amount> {
        self.buy(collateral, caller, Outcome::Yes, collateral_in, min_total_yes_out, now)
            .map(|receipt| receipt.total_out)
    }

    /// Returns the caller's total NO received
    pub fn buy_no(
        &mut self,
        collateral: &mut CollateralLedger,
        caller: &Address,
        collateral_in: Amount,
        min_total_no_out: Amount,
        now: u64,
    ) -> MarketResult<Amount> {
        self.buy(collateral, caller, Outcome::No, collateral_in, min_total_no_out, now)
            .map(|receipt| receipt.total_out)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_resolve::MarketId;

    fn lp() -> Address {
        Address::from("lp")
    }

    fn trader() -> Address {
        Address::from("trader")
    }

    fn seeded(fee_bps: u32) -> (Market, CollateralLedger) {
        let mut market = Market::new(
            MarketId::new(),
            "Will X happen by D?".to_string(),
            1_000,
            Address::from("resolver"),
            fee_bps,
            true,
            0,
        );
        let mut collateral = CollateralLedger::default();
        for account in [lp(), trader()] {
            collateral.faucet(&account, 1_000_000).unwrap();
            collateral.approve(&account, market.custody(), Amount::MAX);
        }
        market.add_liquidity(&mut collateral, &lp(), 1000, 1).unwrap();
        (market, collateral)
    }

    #[test]
    fn test_buy_yes_scenario() {
        let (mut market, mut collateral) = seeded(0);

        let total = market.buy_yes(&mut collateral, &trader(), 100, 0, 1).unwrap();

        assert_eq!(total, 191);
        assert_eq!(market.yes_balance(&trader()), 191);
        assert_eq!(market.no_balance(&trader()), 0);
        assert_eq!(market.yes_reserve(), 909);
        assert_eq!(market.no_reserve(), 1100);
        assert_eq!(market.collateral_held(&collateral), 1100);
        assert!(market.shares().is_conserved());
    }

    #[test]
    fn test_buy_keeps_existing_opposite_shares() {
        let (mut market, mut collateral) = seeded(0);
        market.split(&mut collateral, &trader(), 50, 1).unwrap();
        market.buy_no(&mut collateral, &trader(), 100, 0, 1).unwrap();

        assert_eq!(market.yes_balance(&trader()), 50);
        assert_eq!(market.no_balance(&trader()), 50 + 191);
    }

    #[test]
    fn test_buy_slippage_leaves_state() {
        let (mut market, mut collateral) = seeded(0);
        let before = collateral.balance_of(&trader());

        let err = market.buy_yes(&mut collateral, &trader(), 100, 192, 1).unwrap_err();

        assert_eq!(err, MarketError::SlippageExceeded { out: 191, min_out: 192 });
        assert_eq!(collateral.balance_of(&trader()), before);
        assert_eq!(market.yes_reserve(), 1000);
        assert_eq!(market.position(&trader()), SharePosition::default());
    }

    #[test]
    fn test_swap_moves_price() {
        let (mut market, mut collateral) = seeded(0);
        market.split(&mut collateral, &trader(), 200, 1).unwrap();
        let before = market.spot_price_yes_e18().unwrap();

        let out = market.swap_no_for_yes(&trader(), 100, 91, 1).unwrap();

        assert_eq!(out, 91);
        assert_eq!(market.position(&trader()), SharePosition::new(291, 100));
        assert!(market.spot_price_yes_e18().unwrap() > before);
        assert_eq!(
            market.spot_price_yes_e18().unwrap() + market.spot_price_no_e18().unwrap(),
            cpmm::SCALE
        );
    }

    #[test]
    fn test_swap_slippage() {
        let (mut market, mut collateral) = seeded(0);
        market.split(&mut collateral, &trader(), 200, 1).unwrap();

        assert_eq!(
            market.swap_yes_for_no(&trader(), 100, 92, 1),
            Err(MarketError::SlippageExceeded { out: 91, min_out: 92 })
        );
        assert_eq!(market.position(&trader()), SharePosition::new(200, 200));
    }

    #[test]
    fn test_swap_insufficient_balance() {
        let (mut market, _) = seeded(0);
        assert_eq!(
            market.swap_no_for_yes(&trader(), 10, 0, 1),
            Err(MarketError::InsufficientBalance { side: "NO", available: 0, requested: 10 })
        );
        assert_eq!(market.no_reserve(), 1000);
    }

    #[test]
    fn test_swap_on_empty_pool() {
        let mut market = Market::new(
            MarketId::new(),
            "Empty".to_string(),
            1_000,
            Address::from("resolver"),
            0,
            true,
            0,
        );
        let mut collateral = CollateralLedger::default();
        collateral.faucet(&trader(), 100).unwrap();
        collateral.approve(&trader(), market.custody(), 100);
        market.split(&mut collateral, &trader(), 100, 1).unwrap();

        assert_eq!(market.swap_no_for_yes(&trader(), 10, 0, 1), Err(MarketError::PoolEmpty));
        assert_eq!(
            market.buy_yes(&mut collateral, &trader(), 10, 0, 1),
            Err(MarketError::PoolEmpty)
        );
    }

    #[test]
    fn test_fee_accrues_to_pool() {
        let (mut market, mut collateral) = seeded(30);
        market.split(&mut collateral, &trader(), 10_000, 1).unwrap();
        let k_before = market.yes_reserve() * market.no_reserve();

        let quote = market.swap(&trader(), Outcome::No, 5_000, 0, 1).unwrap();

        assert_eq!(quote.fee, 15);
        assert_eq!(market.no_reserve(), 1000 + 5_000);
        assert!(market.yes_reserve() * market.no_reserve() > k_before);
        assert!(market.shares().is_conserved());
    }

    #[test]
    fn test_round_trip_does_not_profit_beyond_rounding() {
        let (mut market, mut collateral) = seeded(0);
        market.split(&mut collateral, &trader(), 1_000, 1).unwrap();

        for x in [1u128, 7, 100, 250, 333] {
            let yes_out = market.swap_no_for_yes(&trader(), x, 0, 1).unwrap();
            let no_back = market.swap_yes_for_no(&trader(), yes_out, 0, 1).unwrap();
            // floor on the new reserve may hand the trader one unit per leg
            assert!(no_back <= x + 2, "x={} back={}", x, no_back);
        }
    }

    #[test]
    fn test_round_trip_with_fee_loses() {
        let (mut market, mut collateral) = seeded(30);
        market.split(&mut collateral, &trader(), 1_000, 1).unwrap();

        let yes_out = market.swap_no_for_yes(&trader(), 500, 0, 1).unwrap();
        let no_back = market.swap_yes_for_no(&trader(), yes_out, 0, 1).unwrap();
        assert!(no_back <= 500);
    }

    #[test]
    fn test_trading_after_resolution() {
        let (mut market, mut collateral) = seeded(0);
        market.split(&mut collateral, &trader(), 100, 1).unwrap();
        market.resolve(&Address::from("resolver"), Outcome::Yes, 1_000).unwrap();

        assert_eq!(market.swap_no_for_yes(&trader(), 10, 0, 1_000), Err(MarketError::MarketClosed));
        assert_eq!(
            market.buy_no(&mut collateral, &trader(), 10, 0, 1_000),
            Err(MarketError::MarketClosed)
        );
    }
}
