// Application state management

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::{Config, ConfigError};
use crate::error::MarketResult;
use crate::ledger::{Amount, CollateralLedger};
use crate::market_resolve::MarketId;
use crate::registry::{MarketRegistry, RegistrySnapshot};
use crate::units::{display_collateral, COLLATERAL_DECIMALS};

pub type SharedState = Arc<Mutex<AppState>>;

/// Maximum number of activity lines kept in memory
pub const MAX_ACTIVITY: usize = 1000;

pub const DEMO_QUESTION: &str = "Will BTC be above $100,000 on 2026-01-01? (DEMO)";

/// Demo market closes one hour after seeding
pub const DEMO_DURATION_SECS: u64 = 60 * 60;

/// 1,000 mUSDC of initial pool liquidity for the demo market
pub const DEMO_LIQUIDITY: Amount = 1_000 * 10u128.pow(COLLATERAL_DECIMALS);

pub struct AppState {
    pub registry: MarketRegistry,
    pub activity: Vec<String>,
    pub config: Config,
}

impl AppState {
    /// Fresh in-memory state; never touches disk
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let registry = MarketRegistry::new(config.registry_config(), CollateralLedger::default(), clock)?;
        Ok(Self {
            registry,
            activity: Vec::new(),
            config,
        })
    }

    /// Load persisted state from `config.state_path` if present, otherwise
    /// start fresh (and seed the demo market when configured).
    pub fn load_or_new(config: Config, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        info!("🚀 Initializing PolyMini binary market AMM...");

        let mut state = Self::new(config, clock.clone())?;
        match Self::load_from_disk(&state.config.state_path) {
            Ok(snapshot) => {
                state.registry = MarketRegistry::from_snapshot(snapshot, clock)?;
                info!(markets = state.registry.market_count(), "✅ Loaded persisted state from disk");
            }
            Err(e) => {
                info!("ℹ️  No persisted state loaded ({}), starting fresh", e);
                if state.config.seed_demo {
                    if let Err(e) = state.seed_demo() {
                        warn!("⚠️  Failed to seed demo market: {}", e);
                    }
                }
            }
        }

        info!(
            resolver = %state.config.resolver_authority,
            fee_bps = state.config.fee_bps,
            enforce_close_time = state.config.enforce_close_time,
            "✅ PolyMini initialized"
        );
        Ok(state)
    }

    pub fn save_to_disk(&self) -> Result<(), String> {
        use std::fs;

        let json = serde_json::to_string_pretty(&self.registry.snapshot())
            .map_err(|e| format!("Failed to serialize state: {}", e))?;

        if let Some(dir) = self.config.state_path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|e| format!("Failed to create state directory: {}", e))?;
            }
        }
        fs::write(&self.config.state_path, json)
            .map_err(|e| format!("Failed to write state file: {}", e))?;

        info!(path = %self.config.state_path.display(), "💾 State saved to disk");
        Ok(())
    }

    fn load_from_disk(path: &Path) -> Result<RegistrySnapshot, String> {
        let json = std::fs::read_to_string(path).map_err(|_| "No state file found".to_string())?;
        serde_json::from_str(&json).map_err(|e| format!("Failed to deserialize state: {}", e))
    }

    pub fn log_activity(&mut self, emoji: &str, action: &str, details: &str) {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let entry = format!("[{}] {} {} | {}", timestamp, emoji, action, details);
        info!("{}", entry);
        self.activity.push(entry);
        if self.activity.len() > MAX_ACTIVITY {
            self.activity.remove(0);
        }
    }

    /// Most recent activity lines, newest last
    pub fn recent_activity(&self, limit: usize) -> &[String] {
        let start = self.activity.len().saturating_sub(limit);
        &self.activity[start..]
    }

    /// Fund the resolver, create the demo market and seed its pool
    pub fn seed_demo(&mut self) -> MarketResult<MarketId> {
        let owner = self.config.resolver_authority.clone();
        let funding = self.config.faucet_amount.max(DEMO_LIQUIDITY);
        let close_time = self.registry.now() + DEMO_DURATION_SECS;

        self.registry.collateral_mut().faucet(&owner, funding)?;
        let id = self.registry.create_market(&owner, DEMO_QUESTION, close_time)?;
        let custody = self.registry.market(id)?.custody().clone();
        self.registry.collateral_mut().approve(&owner, &custody, DEMO_LIQUIDITY);
        self.registry.add_liquidity(id, &owner, DEMO_LIQUIDITY)?;

        self.log_activity(
            "🌱",
            "DEMO_SEEDED",
            &format!("Market {} | liquidity {} mUSDC", id, display_collateral(DEMO_LIQUIDITY)),
        );
        Ok(id)
    }
}

/// Lock the shared state. A poisoned lock is recovered: every registry
/// mutation validates before it writes, so the state behind it is consistent.
pub fn lock(state: &SharedState) -> MutexGuard<'_, AppState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
