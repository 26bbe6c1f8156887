/// Collateral Ledger for PolyMini markets
///
/// In-memory fungible token (mock USDC) that every market custodies its
/// collateral in. Exposes the ERC20-shaped surface the markets and clients
/// need: balances, allowances, approve, transfer, transfer_from, plus a
/// faucet for test/demo funding.
///
/// All amounts are opaque integers in the asset's smallest unit. Every
/// mutation is all-or-nothing: checks run first, balances move only after
/// every check has passed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::error::CollateralError;
use crate::units::{display_collateral, COLLATERAL_DECIMALS};

/// Amount in the collateral's smallest unit
pub type Amount = u128;

/// Maximum number of collateral transactions kept in memory
pub const MAX_TX_HISTORY: usize = 1000;

// ============================================================================
// ADDRESS
// ============================================================================

/// Account identifier (wallet address, username or market custody address)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Address(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Address(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Address(value)
    }
}

// ============================================================================
// TRANSACTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CollateralTxType {
    Faucet,
    Transfer,
    Approve,
}

/// Collateral movement record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralTx {
    pub tx_type: CollateralTxType,
    pub from: Option<Address>,
    pub to: Address,
    pub amount: Amount,
    pub timestamp: u64,
}

// ============================================================================
// LEDGER
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralLedger {
    pub symbol: String,
    pub decimals: u32,
    balances: HashMap<Address, Amount>,
    /// owner -> spender -> remaining allowance
    allowances: HashMap<Address, HashMap<Address, Amount>>,
    total_supply: Amount,
    #[serde(default)]
    transactions: Vec<CollateralTx>,
}

impl Default for CollateralLedger {
    fn default() -> Self {
        Self::new("mUSDC", COLLATERAL_DECIMALS)
    }
}

impl CollateralLedger {
    pub fn new(symbol: &str, decimals: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            total_supply: 0,
            transactions: Vec::new(),
        }
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Set `spender`'s allowance over `owner`'s funds (overwrites, ERC20 style)
    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) -> bool {
        self.allowances
            .entry(owner.clone())
            .or_default()
            .insert(spender.clone(), amount);
        self.record(CollateralTxType::Approve, Some(owner.clone()), spender.clone(), amount);
        debug!(%owner, %spender, amount = %display_collateral(amount), "approve");
        true
    }

    /// Mint fresh collateral to `account` (mock USDC faucet)
    pub fn faucet(&mut self, account: &Address, amount: Amount) -> Result<Amount, CollateralError> {
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(CollateralError::ArithmeticFault)?;
        let new_balance = self
            .balance_of(account)
            .checked_add(amount)
            .ok_or(CollateralError::ArithmeticFault)?;

        self.total_supply = new_supply;
        self.balances.insert(account.clone(), new_balance);
        self.record(CollateralTxType::Faucet, None, account.clone(), amount);
        debug!(%account, amount = %display_collateral(amount), "faucet");
        Ok(new_balance)
    }

    /// Move `amount` from `from` to `to`
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), CollateralError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(CollateralError::InsufficientBalance {
                account: from.clone(),
                available,
                requested: amount,
            });
        }

        if from != to {
            let credited = self
                .balance_of(to)
                .checked_add(amount)
                .ok_or(CollateralError::ArithmeticFault)?;
            self.balances.insert(from.clone(), available - amount);
            self.balances.insert(to.clone(), credited);
        }

        self.record(CollateralTxType::Transfer, Some(from.clone()), to.clone(), amount);
        debug!(%from, %to, amount = %display_collateral(amount), "transfer");
        Ok(())
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming allowance.
    /// An allowance of `Amount::MAX` is treated as unlimited.
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), CollateralError> {
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(CollateralError::InsufficientAllowance {
                owner: from.clone(),
                spender: spender.clone(),
                allowed,
                requested: amount,
            });
        }

        self.transfer(from, to, amount)?;

        if allowed != Amount::MAX {
            self.allowances
                .entry(from.clone())
                .or_default()
                .insert(spender.clone(), allowed - amount);
        }
        Ok(())
    }

    /// Most recent transactions, newest last
    pub fn recent_transactions(&self, limit: usize) -> &[CollateralTx] {
        let start = self.transactions.len().saturating_sub(limit);
        &self.transactions[start..]
    }

    fn record(&mut self, tx_type: CollateralTxType, from: Option<Address>, to: Address, amount: Amount) {
        self.transactions.push(CollateralTx {
            tx_type,
            from,
            to,
            amount,
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
        });
        if self.transactions.len() > MAX_TX_HISTORY {
            self.transactions.remove(0);
        }
    }
}
