// ============================================================================
// Share Redemption - PolyMini Binary Market
// ============================================================================
//
// Redemption converts outcome shares back into collateral.
//
// 1. MERGE (while the market is open):
//    1 YES share + 1 NO share -> 1 collateral
//    The inverse of split; keeps YES + NO prices anchored to 1.00.
//
// 2. RESOLUTION REDEMPTION (after the market resolves):
//    Winning shares -> 1 collateral each
//    Losing shares  -> burned, nothing paid
//    Both of the caller's balances are zeroed in one step.
//
// 3. POOL REDEMPTION (resolver only, after resolution):
//    The pool's winning-side reserve is paid out to a chosen address and
//    both reserves are zeroed, recovering AMM-seeded liquidity.
//
// ============================================================================

use tracing::info;

use crate::error::{MarketError, MarketResult};
use crate::ledger::{Address, Amount, CollateralLedger};
use crate::market_resolve::Market;
use crate::units::display_collateral;

impl Market {
    /// Burn `amount_each` YES and NO from the caller and return that much collateral
    pub fn merge(
        &mut self,
        collateral: &mut CollateralLedger,
        caller: &Address,
        amount_each: Amount,
    ) -> MarketResult<()> {
        if amount_each == 0 {
            return Err(MarketError::ZeroAmount);
        }
        // Merging stays available after close time; it only unwinds complete sets.
        self.ensure_unresolved()?;

        let changes = {
            let mut delta = self.shares.begin();
            delta.burn(caller, amount_each, amount_each)?;
            delta.finish()
        };

        self.push_collateral(collateral, caller, amount_each)?;
        self.shares.apply(changes);

        info!(market = %self.id(), account = %caller, amount = %display_collateral(amount_each), "merge");
        Ok(())
    }

    /// Pay out the caller's winning-side balance and clear both balances
    ///
    /// # Returns
    /// Collateral paid (zero when only losing shares were held)
    pub fn redeem(&mut self, collateral: &mut CollateralLedger, caller: &Address) -> MarketResult<Amount> {
        let winner = self.settled_outcome()?;

        let position = self.shares.position(caller);
        if position.is_empty() {
            return Err(MarketError::ZeroAmount);
        }
        let payout = position.get(winner);

        let changes = {
            let mut delta = self.shares.begin();
            delta.burn(caller, position.yes, position.no)?;
            delta.finish()
        };

        if payout > 0 {
            self.push_collateral(collateral, caller, payout)?;
        }
        self.shares.apply(changes);

        info!(
            market = %self.id(),
            account = %caller,
            payout = %display_collateral(payout),
            burned_losing = position.get(winner.opposite()),
            "redeem"
        );
        Ok(payout)
    }

    /// Sweep the pool's winning-side reserve to `to`. Resolver only.
    pub fn redeem_pool(
        &mut self,
        collateral: &mut CollateralLedger,
        caller: &Address,
        to: &Address,
    ) -> MarketResult<Amount> {
        self.ensure_resolver(caller)?;
        let winner = self.settled_outcome()?;

        let pool = self.shares.pool();
        if pool.is_empty() {
            return Err(MarketError::ZeroAmount);
        }
        let payout = pool.get(winner);

        let changes = {
            let mut delta = self.shares.begin();
            delta.burn_from_pool(pool.yes, pool.no)?;
            delta.finish()
        };

        if payout > 0 {
            self.push_collateral(collateral, to, payout)?;
        }
        self.shares.apply(changes);

        info!(market = %self.id(), %to, payout = %display_collateral(payout), "pool redeemed");
        Ok(payout)
    }
}

// ============================================================================
// TESTS
// ============================================================================
