//! Engine configuration.
//!
//! Everything here is explicit: adapters and planners receive the
//! addresses and settings they need at construction time, so independent
//! planning calls stay concurrent-safe and testable. No process-wide
//! singletons.

use alloy_primitives::Address;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Deployment target, selecting which address registry applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployTarget {
    /// Test deployment - tokens and venues on a test registry
    Test,
    /// Production deployment
    Production,
}

impl Default for DeployTarget {
    fn default() -> Self {
        DeployTarget::Test
    }
}

impl std::fmt::Display for DeployTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeployTarget::Test => write!(f, "TEST"),
            DeployTarget::Production => write!(f, "PRODUCTION"),
        }
    }
}

/// Main configuration for the planning engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ========== Network Settings ==========
    /// RPC URL for on-chain reads and submission
    pub rpc_url: String,

    /// Chain ID (8453 = Base Mainnet)
    pub chain_id: u64,

    /// Deployment target
    pub deploy_target: DeployTarget,

    // ========== Planning Settings ==========
    /// Default slippage tolerance in basis points
    pub slippage_bps: u64,

    // ========== Protocol Addresses ==========
    /// Leverage manager (read: assets, state, previews)
    pub manager_address: String,

    /// Leverage router (write: deposit/redeem entrypoints)
    pub router_address: String,

    /// Multicall executor the router hands plans to
    pub executor_address: String,

    /// Wrapped native token
    pub weth_address: String,

    // ========== Venue: constant-product pair ==========
    pub v2_pair_address: String,
    pub v2_router_address: String,

    // ========== Venue: concentrated-liquidity pool ==========
    pub v3_quoter_address: String,
    pub v3_router_address: String,
    pub v3_fee: u32,

    // ========== Venue: tick-based universal router pool ==========
    pub v4_quoter_address: String,
    pub v4_universal_router_address: String,
    pub v4_currency0: String,
    pub v4_currency1: String,
    pub v4_fee: u32,
    pub v4_tick_spacing: i32,
    pub v4_hooks: String,

    // ========== Venue: off-chain aggregator ==========
    pub velora_base_url: String,
    /// API version pin; the calldata patch offsets are tied to it
    pub velora_version: String,
    /// Optional `from` attribution override for aggregator requests
    pub velora_from_address: Option<String>,

    // ========== Venue: cross-venue routing API ==========
    pub lifi_base_url: String,

    // ========== Wallet Settings ==========
    /// Private key used by the orchestrator for submission (KEEP SECRET!)
    pub signer_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| "https://mainnet.base.org".to_string()),
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| "8453".to_string())
                .parse()
                .unwrap_or(8453),
            deploy_target: match env::var("DEPLOY_TARGET")
                .unwrap_or_else(|_| "test".to_string())
                .to_lowercase()
                .as_str()
            {
                "production" | "prod" => DeployTarget::Production,
                _ => DeployTarget::Test,
            },
            slippage_bps: env::var("SLIPPAGE_BPS")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .unwrap_or(50),
            manager_address: env::var("MANAGER_ADDRESS").unwrap_or_default(),
            router_address: env::var("ROUTER_ADDRESS").unwrap_or_default(),
            executor_address: env::var("EXECUTOR_ADDRESS").unwrap_or_default(),
            weth_address: env::var("WETH_ADDRESS")
                .unwrap_or_else(|_| "0x4200000000000000000000000000000000000006".to_string()),
            v2_pair_address: env::var("V2_PAIR_ADDRESS").unwrap_or_default(),
            v2_router_address: env::var("V2_ROUTER_ADDRESS")
                .unwrap_or_else(|_| "0x4752ba5DBc23f44D87826276BF6Fd6b1C372aD24".to_string()),
            v3_quoter_address: env::var("V3_QUOTER_ADDRESS")
                .unwrap_or_else(|_| "0x3d4e44Eb1374240CE5F1B871ab261CD16335B76a".to_string()),
            v3_router_address: env::var("V3_ROUTER_ADDRESS")
                .unwrap_or_else(|_| "0x2626664c2603336E57B271c5C0b26F421741e481".to_string()),
            v3_fee: env::var("V3_FEE")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .unwrap_or(500),
            v4_quoter_address: env::var("V4_QUOTER_ADDRESS")
                .unwrap_or_else(|_| "0x0d5e0F971ED27FBfF6c2837bf31316121532048D".to_string()),
            v4_universal_router_address: env::var("V4_UNIVERSAL_ROUTER_ADDRESS")
                .unwrap_or_else(|_| "0x6fF5693b99212Da76ad316178A184AB56D299b43".to_string()),
            v4_currency0: env::var("V4_CURRENCY0").unwrap_or_default(),
            v4_currency1: env::var("V4_CURRENCY1").unwrap_or_default(),
            v4_fee: env::var("V4_FEE")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .unwrap_or(500),
            v4_tick_spacing: env::var("V4_TICK_SPACING")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            v4_hooks: env::var("V4_HOOKS")
                .unwrap_or_else(|_| "0x0000000000000000000000000000000000000000".to_string()),
            velora_base_url: env::var("VELORA_BASE_URL")
                .unwrap_or_else(|_| "https://api.velora.xyz".to_string()),
            velora_version: env::var("VELORA_VERSION").unwrap_or_else(|_| "6.2".to_string()),
            velora_from_address: env::var("VELORA_FROM_ADDRESS").ok(),
            lifi_base_url: env::var("LIFI_BASE_URL")
                .unwrap_or_else(|_| "https://li.quest/v1".to_string()),
            signer_key: env::var("SIGNER_KEY").ok(),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn parse_address(label: &str, raw: &str) -> Result<Address> {
        Address::from_str(raw).map_err(|_| eyre::eyre!("{} is not a valid address: {:?}", label, raw))
    }

    pub fn manager(&self) -> Result<Address> {
        Self::parse_address("MANAGER_ADDRESS", &self.manager_address)
    }

    pub fn router(&self) -> Result<Address> {
        Self::parse_address("ROUTER_ADDRESS", &self.router_address)
    }

    pub fn executor(&self) -> Result<Address> {
        Self::parse_address("EXECUTOR_ADDRESS", &self.executor_address)
    }

    pub fn weth(&self) -> Result<Address> {
        Self::parse_address("WETH_ADDRESS", &self.weth_address)
    }

    /// Validate configuration before planning or submission
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() || self.rpc_url.contains("YOUR_API_KEY") {
            return Err(eyre::eyre!("Invalid RPC_URL - please set a valid RPC endpoint"));
        }

        // Unbounded slippage defeats every bound the planners compute
        if self.slippage_bps > 1_000 {
            return Err(eyre::eyre!(
                "SLIPPAGE_BPS > 1000 (10%) is almost certainly a mistake (currently {})",
                self.slippage_bps
            ));
        }

        self.manager()?;
        self.router()?;
        self.weth()?;

        if self.deploy_target == DeployTarget::Production {
            if self.signer_key.is_none() {
                return Err(eyre::eyre!("Production target requires SIGNER_KEY"));
            }
            self.executor()?;
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "https://mainnet.base.org".to_string(),
            chain_id: 8453,
            deploy_target: DeployTarget::Test,
            slippage_bps: 50,
            manager_address: String::new(),
            router_address: String::new(),
            executor_address: String::new(),
            weth_address: "0x4200000000000000000000000000000000000006".to_string(),
            v2_pair_address: String::new(),
            v2_router_address: "0x4752ba5DBc23f44D87826276BF6Fd6b1C372aD24".to_string(),
            v3_quoter_address: "0x3d4e44Eb1374240CE5F1B871ab261CD16335B76a".to_string(),
            v3_router_address: "0x2626664c2603336E57B271c5C0b26F421741e481".to_string(),
            v3_fee: 500,
            v4_quoter_address: "0x0d5e0F971ED27FBfF6c2837bf31316121532048D".to_string(),
            v4_universal_router_address: "0x6fF5693b99212Da76ad316178A184AB56D299b43".to_string(),
            v4_currency0: String::new(),
            v4_currency1: String::new(),
            v4_fee: 500,
            v4_tick_spacing: 10,
            v4_hooks: "0x0000000000000000000000000000000000000000".to_string(),
            velora_base_url: "https://api.velora.xyz".to_string(),
            velora_version: "6.2".to_string(),
            velora_from_address: None,
            lifi_base_url: "https://li.quest/v1".to_string(),
            signer_key: None,
        }
    }
}
