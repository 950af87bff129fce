//! Off-chain aggregator adapter (HTTP quote + calldata patch).
//!
//! Queries the aggregator's `/swap` endpoint and validates the response
//! strictly: integer amounts, a real contract address, well-formed hex
//! calldata. An HTTP-200 body carrying `{ "error": ... }` is a hard
//! failure. Exact-in accepts any contract method and uses the calldata
//! verbatim; exact-out is allow-listed to `swapExactAmountOut` only,
//! because the fixed patch offsets this adapter returns do not hold for
//! the venue-specialized method variants.

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::QuoteAdapter;
use crate::types::{
    apply_slippage_down, apply_slippage_up, is_native, normalize_native, Call, Quote, QuoteError,
    QuoteRequest, SwapIntent, VeloraPatch,
};

/// The only aggregator method whose calldata layout supports amount
/// patching at fixed offsets.
const METHOD_SWAP_EXACT_AMOUNT_OUT: &str = "swapExactAmountOut";

/// Aggregator-specific configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct VeloraConfig {
    pub base_url: String,
    /// API version pin. The patch offsets are tied to this encoding version.
    pub version: String,
    pub chain_id: u64,
    pub slippage_bps: u64,
    /// Default `userAddress`/`receiver`: the protocol router executing the
    /// swap inside the multicall.
    pub router: Address,
    /// Optional `from` attribution override.
    pub from_address: Option<Address>,
    pub src_decimals: u8,
    pub dest_decimals: u8,
}

/// Successful response body.
#[derive(Debug, Deserialize)]
pub(crate) struct SwapResponse {
    #[serde(rename = "priceRoute")]
    price_route: Option<PriceRoute>,
    #[serde(rename = "txParams")]
    tx_params: Option<TxParams>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceRoute {
    #[serde(rename = "srcAmount")]
    src_amount: String,
    #[serde(rename = "destAmount")]
    dest_amount: String,
    #[serde(rename = "contractAddress")]
    contract_address: String,
    #[serde(rename = "contractMethod")]
    contract_method: String,
}

#[derive(Debug, Deserialize)]
struct TxParams {
    data: String,
}

pub struct VeloraAdapter {
    http: reqwest::Client,
    config: VeloraConfig,
}

impl VeloraAdapter {
    pub fn new(config: VeloraConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

fn address_param(token: Address) -> String {
    format!("0x{}", hex::encode(normalize_native(token)))
}

/// Build the `/swap` query parameters for a request. Pure, no I/O.
pub(crate) fn build_query(
    config: &VeloraConfig,
    request: &QuoteRequest,
) -> Result<Vec<(&'static str, String)>, QuoteError> {
    request.validate()?;

    let (side, amount) = match request.intent {
        SwapIntent::ExactIn => ("SELL", request.input_amount()?),
        SwapIntent::ExactOut => ("BUY", request.output_amount()?),
    };
    let user = config.from_address.unwrap_or(config.router);

    let mut query = vec![
        ("side", side.to_string()),
        ("amount", amount.to_string()),
        ("srcToken", address_param(request.token_in)),
        ("destToken", address_param(request.token_out)),
        ("srcDecimals", config.src_decimals.to_string()),
        ("destDecimals", config.dest_decimals.to_string()),
        ("slippage", config.slippage_bps.to_string()),
        ("network", config.chain_id.to_string()),
        ("userAddress", format!("0x{}", hex::encode(user))),
        ("receiver", format!("0x{}", hex::encode(config.router))),
        ("version", config.version.clone()),
    ];
    if request.intent == SwapIntent::ExactOut {
        query.push((
            "includeContractMethods",
            METHOD_SWAP_EXACT_AMOUNT_OUT.to_string(),
        ));
    }
    Ok(query)
}

fn parse_amount(raw: &str, what: &str) -> Result<U256, QuoteError> {
    U256::from_str_radix(raw, 10)
        .map_err(|_| QuoteError::Decode(format!("{} is not a non-negative integer: {}", what, raw)))
}

fn parse_calldata(raw: &str) -> Result<Bytes, QuoteError> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(stripped)
        .map(Bytes::from)
        .map_err(|e| QuoteError::Decode(format!("transaction data is not valid hex: {}", e)))
}

/// Validate a response body and shape it into a `Quote`. Pure, no I/O.
pub(crate) fn build_quote(
    config: &VeloraConfig,
    request: &QuoteRequest,
    response: SwapResponse,
) -> Result<Quote, QuoteError> {
    if let Some(message) = response.error {
        // Aggregator-level errors arrive with HTTP 200; log once here,
        // then raise with the venue's own message.
        warn!("aggregator error: {}", message);
        return Err(QuoteError::Venue(message));
    }

    let route = response
        .price_route
        .ok_or_else(|| QuoteError::Decode("response missing priceRoute".to_string()))?;
    let tx = response
        .tx_params
        .ok_or_else(|| QuoteError::Decode("response missing txParams".to_string()))?;

    let src_amount = parse_amount(&route.src_amount, "srcAmount")?;
    let dest_amount = parse_amount(&route.dest_amount, "destAmount")?;
    let contract: Address = route
        .contract_address
        .parse()
        .map_err(|_| QuoteError::Decode(format!("bad contractAddress: {}", route.contract_address)))?;
    let data = parse_calldata(&tx.data)?;

    let wants_native_in = is_native(request.token_in);

    match request.intent {
        SwapIntent::ExactIn => {
            // Caller controls the exact input already; any contract method
            // is acceptable and the calldata is used without patching.
            let min_out = apply_slippage_down(dest_amount, config.slippage_bps);
            debug!(
                "aggregator exact-in via {}: {} -> {} (min {})",
                route.contract_method, src_amount, dest_amount, min_out
            );
            let value = if wants_native_in { src_amount } else { U256::ZERO };
            Ok(Quote {
                out: dest_amount,
                min_out,
                in_amount: None,
                max_in: None,
                approval_target: contract,
                calls: vec![Call::with_value(contract, data, value)],
                wants_native_in,
                velora: None,
            })
        }
        SwapIntent::ExactOut => {
            if route.contract_method != METHOD_SWAP_EXACT_AMOUNT_OUT {
                return Err(QuoteError::UnsupportedMethod(route.contract_method));
            }
            let max_in = apply_slippage_up(src_amount, config.slippage_bps);
            debug!(
                "aggregator exact-out: {} <- {} (max {})",
                dest_amount, src_amount, max_in
            );
            let value = if wants_native_in { max_in } else { U256::ZERO };
            Ok(Quote {
                out: dest_amount,
                min_out: dest_amount,
                in_amount: Some(src_amount),
                max_in: Some(max_in),
                approval_target: contract,
                calls: vec![Call::with_value(contract, data, value)],
                wants_native_in,
                velora: Some(VeloraPatch::SWAP_EXACT_AMOUNT_OUT),
            })
        }
    }
}

#[async_trait]
impl QuoteAdapter for VeloraAdapter {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, QuoteError> {
        let query = build_query(&self.config, request)?;
        let url = format!("{}/swap", self.config.base_url.trim_end_matches('/'));

        let resp = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| QuoteError::Transport(format!("aggregator request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(QuoteError::Transport(format!(
                "aggregator returned HTTP {}: {}",
                status, body
            )));
        }

        let body: SwapResponse = resp
            .json()
            .await
            .map_err(|e| QuoteError::Decode(format!("aggregator response: {}", e)))?;

        build_quote(&self.config, request, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NATIVE_SENTINEL;

    fn test_config() -> VeloraConfig {
        VeloraConfig {
            base_url: "https://api.velora.xyz".to_string(),
            version: "6.2".to_string(),
            chain_id: 8453,
            slippage_bps: 50,
            router: Address::repeat_byte(0xbb),
            from_address: None,
            src_decimals: 18,
            dest_decimals: 18,
        }
    }

    fn get<'a>(query: &'a [(&str, String)], key: &str) -> &'a str {
        &query.iter().find(|(k, _)| *k == key).unwrap().1
    }

    fn ok_response(method: &str, src: &str, dest: &str) -> SwapResponse {
        SwapResponse {
            price_route: Some(PriceRoute {
                src_amount: src.to_string(),
                dest_amount: dest.to_string(),
                contract_address: "0x6A000F20005980200259B80c5102003040001068".to_string(),
                contract_method: method.to_string(),
            }),
            tx_params: Some(TxParams {
                data: "0xdeadbeef".to_string(),
            }),
            error: None,
        }
    }

    #[test]
    fn test_query_params_exact_in() {
        let config = test_config();
        let req = QuoteRequest::exact_in(
            NATIVE_SENTINEL,
            Address::repeat_byte(2),
            U256::from(10u64).pow(U256::from(18u64)),
        );
        let query = build_query(&config, &req).unwrap();

        assert_eq!(get(&query, "side"), "SELL");
        assert_eq!(get(&query, "amount"), "1000000000000000000");
        // Native sentinel is normalized to the zero address.
        assert_eq!(
            get(&query, "srcToken"),
            "0x0000000000000000000000000000000000000000"
        );
        // Slippage is the raw bps value.
        assert_eq!(get(&query, "slippage"), "50");
        assert_eq!(get(&query, "network"), "8453");
        assert_eq!(get(&query, "version"), "6.2");
        // userAddress/receiver default to the router.
        assert_eq!(
            get(&query, "userAddress"),
            format!("0x{}", hex::encode(config.router))
        );
    }

    #[test]
    fn test_query_params_exact_out_side_and_amount() {
        let config = test_config();
        let req = QuoteRequest::exact_out(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::from(777u64),
        );
        let query = build_query(&config, &req).unwrap();
        assert_eq!(get(&query, "side"), "BUY");
        assert_eq!(get(&query, "amount"), "777");
        assert_eq!(get(&query, "includeContractMethods"), "swapExactAmountOut");
    }

    #[test]
    fn test_from_address_override() {
        let mut config = test_config();
        let from = Address::repeat_byte(0xcc);
        config.from_address = Some(from);
        let req =
            QuoteRequest::exact_in(Address::repeat_byte(1), Address::repeat_byte(2), U256::from(1u64));
        let query = build_query(&config, &req).unwrap();
        assert_eq!(get(&query, "userAddress"), format!("0x{}", hex::encode(from)));
        // Receiver stays the router regardless of the override.
        assert_eq!(
            get(&query, "receiver"),
            format!("0x{}", hex::encode(config.router))
        );
    }

    #[test]
    fn test_error_body_is_hard_failure() {
        let config = test_config();
        let req =
            QuoteRequest::exact_in(Address::repeat_byte(1), Address::repeat_byte(2), U256::from(1u64));
        let response = SwapResponse {
            price_route: None,
            tx_params: None,
            error: Some("Insufficient liquidity".to_string()),
        };
        let err = build_quote(&config, &req, response).unwrap_err();
        match err {
            QuoteError::Venue(message) => assert_eq!(message, "Insufficient liquidity"),
            other => panic!("expected venue error, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_in_min_out_integer_math() {
        let config = test_config();
        let req = QuoteRequest::exact_in(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::from(1_000u64),
        );
        let quote = build_quote(&config, &req, ok_response("swapOnAugustus", "1000", "33333")).unwrap();
        // 33333 * (10000 - 50) / 10000 = 33166 (integer division)
        assert_eq!(quote.min_out, U256::from(33166u64));
        assert_eq!(quote.out, U256::from(33333u64));
        assert!(quote.velora.is_none());
    }

    #[test]
    fn test_exact_in_accepts_any_method() {
        let config = test_config();
        let req = QuoteRequest::exact_in(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::from(1_000u64),
        );
        let quote = build_quote(
            &config,
            &req,
            ok_response("swapExactAmountInOnUniswapV3", "1000", "999"),
        )
        .unwrap();
        assert_eq!(quote.calls.len(), 1);
        assert_eq!(quote.calls[0].data.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_exact_out_patch_offsets() {
        let config = test_config();
        let req = QuoteRequest::exact_out(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::from(5_000u64),
        );
        let quote = build_quote(
            &config,
            &req,
            ok_response(METHOD_SWAP_EXACT_AMOUNT_OUT, "1200", "5000"),
        )
        .unwrap();
        let patch = quote.velora.expect("exact-out quote carries patch offsets");
        assert_eq!(patch.exact_amount_offset, 132);
        assert_eq!(patch.limit_amount_offset, 100);
        assert_eq!(patch.quoted_amount_offset, 164);
        // max_in = 1200 * 10050 / 10000 = 1206
        assert_eq!(quote.max_in, Some(U256::from(1206u64)));
        assert_eq!(quote.in_amount, Some(U256::from(1200u64)));
    }

    #[test]
    fn test_exact_out_rejects_specialized_methods() {
        let config = test_config();
        let req = QuoteRequest::exact_out(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::from(5_000u64),
        );
        let err = build_quote(
            &config,
            &req,
            ok_response("swapExactAmountOutOnUniswapV2", "1200", "5000"),
        )
        .unwrap_err();
        assert!(matches!(err, QuoteError::UnsupportedMethod(m) if m == "swapExactAmountOutOnUniswapV2"));
    }

    #[test]
    fn test_malformed_amount_rejected() {
        let config = test_config();
        let req =
            QuoteRequest::exact_in(Address::repeat_byte(1), Address::repeat_byte(2), U256::from(1u64));
        let err = build_quote(&config, &req, ok_response("swap", "-5", "100")).unwrap_err();
        assert!(matches!(err, QuoteError::Decode(_)));
    }

    #[test]
    fn test_wire_format_deserializes() {
        let body = r#"{
            "priceRoute": {
                "srcAmount": "1000000000000000000",
                "destAmount": "2500000000",
                "contractAddress": "0x6A000F20005980200259B80c5102003040001068",
                "contractMethod": "swapExactAmountOut"
            },
            "txParams": { "data": "0x0102" }
        }"#;
        let response: SwapResponse = serde_json::from_str(body).unwrap();
        let config = test_config();
        let req = QuoteRequest::exact_out(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::from(2_500_000_000u64),
        );
        let quote = build_quote(&config, &req, response).unwrap();
        assert_eq!(quote.out, U256::from(2_500_000_000u64));
        assert_eq!(quote.calls[0].data.as_ref(), &[0x01, 0x02]);
    }

    #[test]
    fn test_malformed_calldata_rejected() {
        let config = test_config();
        let req =
            QuoteRequest::exact_in(Address::repeat_byte(1), Address::repeat_byte(2), U256::from(1u64));
        let mut response = ok_response("swap", "1", "1");
        response.tx_params = Some(TxParams {
            data: "0xzz".to_string(),
        });
        let err = build_quote(&config, &req, response).unwrap_err();
        assert!(matches!(err, QuoteError::Decode(_)));
    }
}
