// ============================================================================
// Shares Module - PolyMini Binary Market
// ============================================================================
//
// Outcome share accounting for a single market.
//
// Core Invariant:
//   1 YES share + 1 NO share = 1 unit of collateral (while the market is open)
//
// Share Types:
//   - YES shares: pay 1 unit of collateral if the question resolves YES
//   - NO shares: pay 1 unit of collateral if it resolves NO
//
// Every account (and the pool pseudo-account) holds a (yes, no) pair.
// Mutations are staged in a `ShareDelta` against a read-only view of the book
// and only committed once every check has passed, so a failed operation
// never leaves a half-applied balance behind.
//
// ============================================================================

pub mod mint;
pub mod redeem;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{MarketError, MarketResult};
use crate::ledger::{Address, Amount};

// ============================================================================
// OUTCOME
// ============================================================================

/// Binary outcome. Numeric values are what resolvers send
/// (`resolve(1)` = YES, `resolve(0)` = NO).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Outcome {
    No = 0,
    Yes = 1,
}

impl Outcome {
    pub fn opposite(&self) -> Self {
        match self {
            Outcome::Yes => Outcome::No,
            Outcome::No => Outcome::Yes,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Outcome::No),
            1 => Some(Outcome::Yes),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Yes => "YES",
            Outcome::No => "NO",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SHARE POSITION
// ============================================================================

/// YES/NO holdings of one account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePosition {
    pub yes: Amount,
    pub no: Amount,
}

impl SharePosition {
    pub fn new(yes: Amount, no: Amount) -> Self {
        Self { yes, no }
    }

    pub fn get(&self, outcome: Outcome) -> Amount {
        match outcome {
            Outcome::Yes => self.yes,
            Outcome::No => self.no,
        }
    }

    fn slot(&mut self, outcome: Outcome) -> &mut Amount {
        match outcome {
            Outcome::Yes => &mut self.yes,
            Outcome::No => &mut self.no,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.yes == 0 && self.no == 0
    }

    /// Complete sets this position could merge back into collateral
    pub fn complete_sets(&self) -> Amount {
        self.yes.min(self.no)
    }
}

// ============================================================================
// SHARE BOOK
// ============================================================================

/// Running supply and mint/burn totals for one market
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareSupply {
    /// Outstanding YES shares, pool included
    pub yes: Amount,
    /// Outstanding NO shares, pool included
    pub no: Amount,
    /// Pairs ever minted (split + add_liquidity)
    pub minted: Amount,
    pub burned_yes: Amount,
    pub burned_no: Amount,
}

/// All share balances of a single market
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareBook {
    positions: HashMap<Address, SharePosition>,
    pool: SharePosition,
    supply: ShareSupply,
}

impl ShareBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self, account: &Address) -> SharePosition {
        self.positions.get(account).copied().unwrap_or_default()
    }

    pub fn balance(&self, account: &Address, outcome: Outcome) -> Amount {
        self.position(account).get(outcome)
    }

    pub fn pool(&self) -> SharePosition {
        self.pool
    }

    pub fn supply(&self) -> ShareSupply {
        self.supply
    }

    /// Accounts with a non-empty position, sorted for stable output
    pub fn holders(&self) -> Vec<(&Address, &SharePosition)> {
        let mut holders: Vec<_> = self.positions.iter().collect();
        holders.sort_by(|a, b| a.0.cmp(b.0));
        holders
    }

    /// Start staging a mutation
    pub fn begin(&self) -> ShareDelta<'_> {
        ShareDelta {
            book: self,
            positions: HashMap::new(),
            pool: self.pool,
            supply: self.supply,
        }
    }

    /// Commit staged changes. Infallible: all checks ran while staging.
    pub fn apply(&mut self, changes: ShareChanges) {
        for (account, position) in changes.positions {
            if position.is_empty() {
                self.positions.remove(&account);
            } else {
                self.positions.insert(account, position);
            }
        }
        self.pool = changes.pool;
        self.supply = changes.supply;
    }

    /// Recompute per-side sums from scratch and compare them with the
    /// tracked supply. An overflowing sum counts as not conserved.
    pub fn is_conserved(&self) -> bool {
        let mut yes = Some(self.pool.yes);
        let mut no = Some(self.pool.no);
        for position in self.positions.values() {
            yes = yes.and_then(|total| total.checked_add(position.yes));
            no = no.and_then(|total| total.checked_add(position.no));
        }
        yes == Some(self.supply.yes) && no == Some(self.supply.no)
    }
}

// ============================================================================
// STAGED CHANGES
// ============================================================================

/// Owned result of a staged mutation, ready for `ShareBook::apply`
#[derive(Debug, Clone)]
pub struct ShareChanges {
    positions: HashMap<Address, SharePosition>,
    pool: SharePosition,
    supply: ShareSupply,
}

/// Mutation being staged against a read-only book
#[derive(Debug)]
pub struct ShareDelta<'a> {
    book: &'a ShareBook,
    positions: HashMap<Address, SharePosition>,
    pool: SharePosition,
    supply: ShareSupply,
}

impl<'a> ShareDelta<'a> {
    pub fn position(&self, account: &Address) -> SharePosition {
        self.positions
            .get(account)
            .copied()
            .unwrap_or_else(|| self.book.position(account))
    }

    pub fn pool(&self) -> SharePosition {
        self.pool
    }

    fn position_mut(&mut self, account: &Address) -> &mut SharePosition {
        let current = self.book.position(account);
        self.positions.entry(account.clone()).or_insert(current)
    }

    /// Mint `amount` YES and `amount` NO to an account
    pub fn mint_pair(&mut self, account: &Address, amount: Amount) -> MarketResult<()> {
        self.bump_supply(amount)?;
        let position = self.position_mut(account);
        position.yes = position.yes.checked_add(amount).ok_or(MarketError::ArithmeticFault)?;
        position.no = position.no.checked_add(amount).ok_or(MarketError::ArithmeticFault)?;
        Ok(())
    }

    /// Mint `amount` YES and `amount` NO into the pool reserves
    pub fn mint_pair_to_pool(&mut self, amount: Amount) -> MarketResult<()> {
        self.bump_supply(amount)?;
        self.pool.yes = self.pool.yes.checked_add(amount).ok_or(MarketError::ArithmeticFault)?;
        self.pool.no = self.pool.no.checked_add(amount).ok_or(MarketError::ArithmeticFault)?;
        Ok(())
    }

    /// Burn `yes` YES and `no` NO from an account
    pub fn burn(&mut self, account: &Address, yes: Amount, no: Amount) -> MarketResult<()> {
        self.debit(account, Outcome::Yes, yes)?;
        self.debit(account, Outcome::No, no)?;
        self.drop_supply(yes, no)
    }

    /// Burn `yes` YES and `no` NO from the pool reserves
    pub fn burn_from_pool(&mut self, yes: Amount, no: Amount) -> MarketResult<()> {
        self.pool.yes = self.pool.yes.checked_sub(yes).ok_or(MarketError::PoolEmpty)?;
        self.pool.no = self.pool.no.checked_sub(no).ok_or(MarketError::PoolEmpty)?;
        self.drop_supply(yes, no)
    }

    /// Add shares to an account without minting (swap proceeds)
    pub fn credit(&mut self, account: &Address, outcome: Outcome, amount: Amount) -> MarketResult<()> {
        let slot = self.position_mut(account).slot(outcome);
        *slot = slot.checked_add(amount).ok_or(MarketError::ArithmeticFault)?;
        Ok(())
    }

    /// Remove shares from an account without burning (swap input)
    pub fn debit(&mut self, account: &Address, outcome: Outcome, amount: Amount) -> MarketResult<()> {
        let slot = self.position_mut(account).slot(outcome);
        let available = *slot;
        *slot = available.checked_sub(amount).ok_or(MarketError::InsufficientBalance {
            side: outcome.label(),
            available,
            requested: amount,
        })?;
        Ok(())
    }

    /// Replace the pool reserves (swap settlement)
    pub fn set_pool(&mut self, yes: Amount, no: Amount) {
        self.pool = SharePosition::new(yes, no);
    }

    pub fn finish(self) -> ShareChanges {
        ShareChanges {
            positions: self.positions,
            pool: self.pool,
            supply: self.supply,
        }
    }

    fn bump_supply(&mut self, amount: Amount) -> MarketResult<()> {
        self.supply.yes = self.supply.yes.checked_add(amount).ok_or(MarketError::ArithmeticFault)?;
        self.supply.no = self.supply.no.checked_add(amount).ok_or(MarketError::ArithmeticFault)?;
        self.supply.minted = self.supply.minted.checked_add(amount).ok_or(MarketError::ArithmeticFault)?;
        Ok(())
    }

    fn drop_supply(&mut self, yes: Amount, no: Amount) -> MarketResult<()> {
        self.supply.yes = self.supply.yes.checked_sub(yes).ok_or(MarketError::ArithmeticFault)?;
        self.supply.no = self.supply.no.checked_sub(no).ok_or(MarketError::ArithmeticFault)?;
        self.supply.burned_yes = self.supply.burned_yes.checked_add(yes).ok_or(MarketError::ArithmeticFault)?;
        self.supply.burned_no = self.supply.burned_no.checked_add(no).ok_or(MarketError::ArithmeticFault)?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
