//! Swap venue adapters.
//!
//! Every venue implements the same contract: a read-only async
//! `quote(request) -> Quote`. Side effects are confined to `eth_call`
//! reads or outbound HTTP GETs; nothing here mutates state, so adapters
//! are safe to share across concurrent planning calls.

mod concentrated;
mod constant_product;
mod lifi;
mod universal;
mod velora;

pub use concentrated::ConcentratedAdapter;
pub use constant_product::ConstantProductAdapter;
pub use lifi::{LifiAdapter, LifiConfig};
pub use universal::{decode_execute, PoolKeyConfig, UniversalAdapter, ACTIONS_EXACT_IN, ACTIONS_EXACT_OUT};
pub use velora::{VeloraAdapter, VeloraConfig};

use alloy_primitives::Address;
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::{Quote, QuoteError, QuoteRequest};

/// The common venue contract. One quote per call; errors are raised,
/// never silently defaulted to a zero quote.
#[async_trait]
pub trait QuoteAdapter: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, QuoteError>;
}

/// Closed set of supported venues, for callers that prefer enum dispatch
/// over trait objects.
pub enum Venue {
    ConstantProduct(ConstantProductAdapter),
    Concentrated(ConcentratedAdapter),
    Universal(UniversalAdapter),
    Velora(VeloraAdapter),
    Lifi(LifiAdapter),
}

#[async_trait]
impl QuoteAdapter for Venue {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, QuoteError> {
        match self {
            Venue::ConstantProduct(a) => a.quote(request).await,
            Venue::Concentrated(a) => a.quote(request).await,
            Venue::Universal(a) => a.quote(request).await,
            Venue::Velora(a) => a.quote(request).await,
            Venue::Lifi(a) => a.quote(request).await,
        }
    }
}

/// Read-only contract call against the configured RPC.
pub(crate) async fn call_contract(
    rpc_url: &str,
    to: Address,
    calldata: Vec<u8>,
) -> Result<Vec<u8>, QuoteError> {
    let provider = ProviderBuilder::new().connect_http(
        rpc_url
            .parse()
            .map_err(|e| QuoteError::Rpc(format!("bad RPC URL: {}", e)))?,
    );

    let tx = TransactionRequest::default().to(to).input(calldata.into());

    let result = provider
        .call(tx)
        .await
        .map_err(|e| QuoteError::Rpc(format!("eth_call failed: {}", e)))?;

    Ok(result.to_vec())
}

/// Unix deadline `secs` seconds from now, for venue routers that take one.
pub(crate) fn swap_deadline(secs: u64) -> alloy_primitives::U256 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    alloy_primitives::U256::from(now + secs)
}
