//! Cross-venue routing API adapter, bridging disabled.
//!
//! Delegates route selection to an external routing API configured for
//! same-chain execution only, and maps the response into the common
//! `Quote` shape so planners never special-case it. The routing API
//! prices exact-in swaps only.

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::QuoteAdapter;
use crate::types::{
    is_native, normalize_native, Call, Quote, QuoteError, QuoteRequest, SwapIntent,
};

/// Routing API configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct LifiConfig {
    pub base_url: String,
    pub chain_id: u64,
    /// Sender attribution for the route request.
    pub from_address: Address,
    /// Receiver of the swap output: the protocol router.
    pub router: Address,
    pub slippage_bps: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RouteResponse {
    estimate: Option<Estimate>,
    #[serde(rename = "transactionRequest")]
    transaction_request: Option<RouteTransaction>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Estimate {
    #[serde(rename = "toAmount")]
    to_amount: String,
    #[serde(rename = "toAmountMin")]
    to_amount_min: String,
    #[serde(rename = "approvalAddress")]
    approval_address: String,
}

#[derive(Debug, Deserialize)]
struct RouteTransaction {
    to: String,
    data: String,
    #[serde(default)]
    value: Option<String>,
}

pub struct LifiAdapter {
    http: reqwest::Client,
    config: LifiConfig,
}

impl LifiAdapter {
    pub fn new(config: LifiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

/// Query parameters for a same-chain route. Pure, no I/O.
pub(crate) fn build_query(
    config: &LifiConfig,
    request: &QuoteRequest,
) -> Result<Vec<(&'static str, String)>, QuoteError> {
    request.validate()?;
    if request.intent == SwapIntent::ExactOut {
        return Err(QuoteError::UnsupportedMethod(
            "routing API quotes are exact-in only".to_string(),
        ));
    }
    let chain = config.chain_id.to_string();
    Ok(vec![
        // Same chain on both legs, bridges explicitly disabled.
        ("fromChain", chain.clone()),
        ("toChain", chain),
        ("allowBridges", "none".to_string()),
        (
            "fromToken",
            format!("0x{}", hex::encode(normalize_native(request.token_in))),
        ),
        (
            "toToken",
            format!("0x{}", hex::encode(normalize_native(request.token_out))),
        ),
        ("fromAmount", request.input_amount()?.to_string()),
        (
            "fromAddress",
            format!("0x{}", hex::encode(config.from_address)),
        ),
        ("toAddress", format!("0x{}", hex::encode(config.router))),
        ("slippage", config.slippage_bps.to_string()),
    ])
}

fn parse_amount(raw: &str, what: &str) -> Result<U256, QuoteError> {
    U256::from_str_radix(raw, 10)
        .map_err(|_| QuoteError::Decode(format!("{} is not a non-negative integer: {}", what, raw)))
}

/// Shape a route response into the common quote form. Pure, no I/O.
pub(crate) fn build_quote(
    request: &QuoteRequest,
    response: RouteResponse,
) -> Result<Quote, QuoteError> {
    if let Some(message) = response.message {
        return Err(QuoteError::Venue(message));
    }
    let estimate = response
        .estimate
        .ok_or_else(|| QuoteError::Decode("route response missing estimate".to_string()))?;
    let tx = response
        .transaction_request
        .ok_or_else(|| QuoteError::Decode("route response missing transactionRequest".to_string()))?;

    let out = parse_amount(&estimate.to_amount, "toAmount")?;
    let min_out = parse_amount(&estimate.to_amount_min, "toAmountMin")?;
    let approval_target: Address = estimate
        .approval_address
        .parse()
        .map_err(|_| QuoteError::Decode(format!("bad approvalAddress: {}", estimate.approval_address)))?;
    let target: Address = tx
        .to
        .parse()
        .map_err(|_| QuoteError::Decode(format!("bad transaction target: {}", tx.to)))?;
    let stripped = tx.data.strip_prefix("0x").unwrap_or(&tx.data);
    let data = hex::decode(stripped)
        .map(Bytes::from)
        .map_err(|e| QuoteError::Decode(format!("transaction data is not valid hex: {}", e)))?;
    let value = match tx.value {
        Some(raw) => {
            let raw = raw.strip_prefix("0x").unwrap_or(&raw);
            U256::from_str_radix(raw, 16)
                .map_err(|_| QuoteError::Decode(format!("bad transaction value: {}", raw)))?
        }
        None => U256::ZERO,
    };

    debug!("route quote: out {} (min {})", out, min_out);

    Ok(Quote {
        out,
        min_out,
        in_amount: None,
        max_in: None,
        approval_target,
        calls: vec![Call::with_value(target, data, value)],
        wants_native_in: is_native(request.token_in),
        velora: None,
    })
}

#[async_trait]
impl QuoteAdapter for LifiAdapter {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, QuoteError> {
        let query = build_query(&self.config, request)?;
        let url = format!("{}/quote", self.config.base_url.trim_end_matches('/'));

        let resp = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| QuoteError::Transport(format!("routing API request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(QuoteError::Transport(format!(
                "routing API returned HTTP {}: {}",
                status, body
            )));
        }

        let body: RouteResponse = resp
            .json()
            .await
            .map_err(|e| QuoteError::Decode(format!("routing API response: {}", e)))?;

        build_quote(request, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LifiConfig {
        LifiConfig {
            base_url: "https://li.quest/v1".to_string(),
            chain_id: 8453,
            from_address: Address::repeat_byte(0xcc),
            router: Address::repeat_byte(0xbb),
            slippage_bps: 50,
        }
    }

    #[test]
    fn test_same_chain_and_bridges_disabled() {
        let req = QuoteRequest::exact_in(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::from(100u64),
        );
        let query = build_query(&test_config(), &req).unwrap();
        let get = |key: &str| {
            query
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };
        assert_eq!(get("fromChain"), get("toChain"));
        assert_eq!(get("allowBridges"), "none");
        assert_eq!(get("fromAmount"), "100");
    }

    #[test]
    fn test_exact_out_unsupported() {
        let req = QuoteRequest::exact_out(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::from(100u64),
        );
        assert!(matches!(
            build_query(&test_config(), &req),
            Err(QuoteError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn test_route_shaping() {
        let req = QuoteRequest::exact_in(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::from(100u64),
        );
        let response = RouteResponse {
            estimate: Some(Estimate {
                to_amount: "12345".to_string(),
                to_amount_min: "12283".to_string(),
                approval_address: "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE".to_string(),
            }),
            transaction_request: Some(RouteTransaction {
                to: "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE".to_string(),
                data: "0xcafe".to_string(),
                value: Some("0x0".to_string()),
            }),
            message: None,
        };
        let quote = build_quote(&req, response).unwrap();
        assert_eq!(quote.out, U256::from(12345u64));
        assert_eq!(quote.min_out, U256::from(12283u64));
        assert_eq!(quote.calls.len(), 1);
        assert!(!quote.wants_native_in);
    }

    #[test]
    fn test_route_error_message() {
        let req = QuoteRequest::exact_in(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::from(100u64),
        );
        let response = RouteResponse {
            estimate: None,
            transaction_request: None,
            message: Some("No available routes".to_string()),
        };
        let err = build_quote(&req, response).unwrap_err();
        assert!(matches!(err, QuoteError::Venue(m) if m == "No available routes"));
    }
}
