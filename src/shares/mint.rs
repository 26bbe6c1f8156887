// ============================================================================
// Share Minting - PolyMini Binary Market
// ============================================================================
//
// Minting converts collateral into outcome shares.
//
//   split:          1 collateral -> 1 YES + 1 NO, credited to the caller
//   add_liquidity:  1 collateral -> 1 YES + 1 NO, credited to the pool
//
// Both keep YES supply == NO supply == collateral in custody.
// Liquidity providers receive no claim token; AMM-seeded shares are
// recovered after resolution by the resolver through redeem_pool.
//
// ============================================================================

use tracing::info;

use crate::error::{MarketError, MarketResult};
use crate::ledger::{Address, Amount, CollateralLedger};
use crate::market_resolve::Market;
use crate::units::display_collateral;

impl Market {
    /// Deposit collateral and mint equal YES/NO reserves into the pool.
    /// Open to any account.
    pub fn add_liquidity(
        &mut self,
        collateral: &mut CollateralLedger,
        caller: &Address,
        amount: Amount,
        now: u64,
    ) -> MarketResult<()> {
        if amount == 0 {
            return Err(MarketError::ZeroAmount);
        }
        self.ensure_trading(now)?;

        let changes = {
            let mut delta = self.shares.begin();
            delta.mint_pair_to_pool(amount)?;
            delta.finish()
        };

        self.pull_collateral(collateral, caller, amount)?;
        self.shares.apply(changes);

        info!(
            market = %self.id(),
            provider = %caller,
            amount = %display_collateral(amount),
            yes_reserve = self.yes_reserve(),
            no_reserve = self.no_reserve(),
            "liquidity added"
        );
        Ok(())
    }

    /// Deposit collateral and receive `amount` YES plus `amount` NO
    pub fn split(
        &mut self,
        collateral: &mut CollateralLedger,
        caller: &Address,
        amount: Amount,
        now: u64,
    ) -> MarketResult<()> {
        if amount == 0 {
            return Err(MarketError::ZeroAmount);
        }
        self.ensure_trading(now)?;

        let changes = {
            let mut delta = self.shares.begin();
            delta.mint_pair(caller, amount)?;
            delta.finish()
        };

        self.pull_collateral(collateral, caller, amount)?;
        self.shares.apply(changes);

        info!(market = %self.id(), account = %caller, amount = %display_collateral(amount), "split");
        Ok(())
    }
}
