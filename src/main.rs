// PolyMini Binary Market AMM - Main Entry Point

use std::sync::{Arc, Mutex};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use polymini_amm::app_state::lock;
use polymini_amm::{router, AppState, Config, SharedState, SystemClock};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        error!("❌ {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("═══════════════════════════════════════════════");
    info!("     🎲 PolyMini Binary Market AMM");
    info!("═══════════════════════════════════════════════");

    let config = Config::from_env()?;
    let addr = config.bind_addr;

    // Initialize application state
    let state: SharedState = Arc::new(Mutex::new(AppState::load_or_new(config, Arc::new(SystemClock))?));

    // Clone state for shutdown handler before moving into router
    let shutdown_state = state.clone();

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server running on http://{}", addr);
    info!("📋 Available Endpoints:");
    info!("   GET  /markets?start&count            - Page through markets");
    info!("   POST /markets                        - Create market (owner only)");
    info!("   GET  /markets/:id                    - Market state and prices");
    info!("   GET  /markets/:id/positions/:account - YES/NO balances");
    info!("   POST /markets/:id/liquidity          - Add pool liquidity");
    info!("   POST /markets/:id/split | merge      - Mint / burn complete sets");
    info!("   POST /markets/:id/swap | buy         - Trade against the pool");
    info!("   POST /markets/:id/resolve            - Resolve (resolver only)");
    info!("   POST /markets/:id/redeem             - Redeem winning shares");
    info!("   POST /markets/:id/redeem-pool        - Recover pool liquidity");
    info!("   GET  /collateral/:account            - mUSDC balance");
    info!("   POST /collateral/approve | faucet    - Allowances / test funds");
    info!("   GET  /events                         - Market event stream");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("💾 Saving state to disk...");
    if let Err(e) = lock(&shutdown_state).save_to_disk() {
        error!("❌ Failed to save state: {}", e);
    }
    info!("👋 Goodbye!");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("🛑 Shutdown signal received...");
}
