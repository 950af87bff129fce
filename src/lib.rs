//! Quote aggregation and transaction planning for leveraged-token
//! mint and redeem flows.
//!
//! The crate is organized around three layers:
//!
//! - **Venues** ([`venues`]): adapters that price a swap on one venue
//!   (constant-product pair, concentrated-liquidity pool, tick-based
//!   universal router pool, off-chain aggregator, cross-venue routing
//!   API) and return executable calldata behind a common [`venues::QuoteAdapter`]
//!   trait.
//! - **Planners** ([`planner`]): size the flash loan, apply slippage
//!   bounds, and assemble the ordered call array the protocol's
//!   multicall executor runs atomically.
//! - **Orchestrator** ([`orchestrator`]): simulate the router entrypoint
//!   and submit the signed transaction.
//!
//! All plans are pure values. Nothing here caches chain state; a stale
//! plan is discarded and recomputed.

pub mod config;
pub mod manager;
pub mod orchestrator;
pub mod planner;
pub mod types;
pub mod venues;

pub use config::Config;
pub use manager::ManagerClient;
pub use orchestrator::Orchestrator;
pub use planner::{MintPlan, MintPlanner, RedeemPlan, RedeemPlanner};
pub use types::{Quote, QuoteError, QuoteRequest, SwapIntent};
pub use venues::{QuoteAdapter, Venue};

/// Install the default tracing subscriber. Honors `RUST_LOG`; falls back
/// to `info` for this crate.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("torque=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
