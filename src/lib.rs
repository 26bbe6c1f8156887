/// PolyMini Binary Prediction Market AMM
/// Exports all modules for use as a library crate

pub mod app_state;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod ledger;
pub mod market_resolve;
pub mod models;
pub mod registry;
pub mod routes;
pub mod shares;
pub mod units;

// Re-export the engine
pub use market_resolve::{
    BuyReceipt, Market, MarketId, MarketInfo, SwapQuote,
    BPS_DENOMINATOR, DEFAULT_FEE_BPS, MAX_FEE_BPS, SCALE,
};
pub use shares::{Outcome, SharePosition, ShareSupply};
pub use ledger::{Address, Amount, CollateralLedger};
pub use registry::{MarketRegistry, RegistryConfig, RegistrySnapshot};
pub use events::{EventRecord, MarketEvent};
pub use error::{CollateralError, MarketError, MarketResult};
pub use clock::{Clock, ManualClock, SystemClock};

// Re-export the service
pub use config::{Config, ConfigError};
pub use app_state::{AppState, SharedState};
pub use routes::router;
