//! Command-encoded router adapter (V4-style, tick-based pools).
//!
//! Quotes against a `{currency0, currency1, fee, tickSpacing, hooks}` pool
//! key, then encodes `execute(commands, inputs, deadline)` for a
//! universal-style router. The swap-only command byte is fixed (`0x10`);
//! the inner unlock payload is an `(actions, params)` ABI tuple whose
//! action byte sequence differs by intent and is not interchangeable:
//! exact-in settles what was swapped in, exact-out takes what was swapped
//! out, so the router rejects a plan encoded with the wrong ordering.

use alloy_primitives::{
    aliases::{I24, U24},
    Address, Bytes, U256,
};
use alloy_sol_types::{sol, SolCall, SolValue};
use async_trait::async_trait;
use tracing::debug;

use super::{call_contract, swap_deadline, QuoteAdapter};
use crate::types::{
    apply_slippage_down, apply_slippage_up, is_native, Call, Quote, QuoteError, QuoteRequest,
    SwapIntent,
};

sol! {
    /// V4 pool key
    struct PoolKey {
        address currency0;
        address currency1;
        uint24 fee;
        int24 tickSpacing;
        address hooks;
    }

    /// Single-pool swap parameters carried inside the unlock payload
    struct ExactInputSingleParams {
        PoolKey poolKey;
        bool zeroForOne;
        uint128 amountIn;
        uint128 amountOutMinimum;
        bytes hookData;
    }

    struct ExactOutputSingleParams {
        PoolKey poolKey;
        bool zeroForOne;
        uint128 amountOut;
        uint128 amountInMaximum;
        bytes hookData;
    }

    /// V4 quoter interface
    interface IV4Quoter {
        struct QuoteExactSingleParams {
            PoolKey poolKey;
            bool zeroForOne;
            uint128 exactAmount;
            bytes hookData;
        }

        function quoteExactInputSingle(QuoteExactSingleParams memory params)
            external returns (uint256 amountOut, uint256 gasEstimate);

        function quoteExactOutputSingle(QuoteExactSingleParams memory params)
            external returns (uint256 amountIn, uint256 gasEstimate);
    }

    /// Universal-style router
    interface IUniversalRouter {
        function execute(
            bytes calldata commands,
            bytes[] calldata inputs,
            uint256 deadline
        ) external payable;
    }
}

/// Router command byte for a V4 swap-only flow.
pub const COMMAND_V4_SWAP: u8 = 0x10;

/// Action bytes for an exact-in single swap: swap, settle, take.
pub const ACTIONS_EXACT_IN: [u8; 3] = [0x06, 0x0c, 0x0f];

/// Action bytes for an exact-out single swap.
pub const ACTIONS_EXACT_OUT: [u8; 3] = [0x08, 0x0c, 0x0f];

const DEADLINE_SECS: u64 = 300;

/// Static pool identification for one tick-based pool.
#[derive(Debug, Clone)]
pub struct PoolKeyConfig {
    pub currency0: Address,
    pub currency1: Address,
    pub fee: u32,
    pub tick_spacing: i32,
    pub hooks: Address,
}

impl PoolKeyConfig {
    fn to_pool_key(&self) -> Result<PoolKey, QuoteError> {
        Ok(PoolKey {
            currency0: self.currency0,
            currency1: self.currency1,
            fee: U24::from(self.fee),
            tickSpacing: I24::try_from(self.tick_spacing)
                .map_err(|_| QuoteError::Decode("tick spacing out of range".to_string()))?,
            hooks: self.hooks,
        })
    }
}

/// Adapter over one V4-style pool behind a universal router.
pub struct UniversalAdapter {
    rpc_url: String,
    quoter: Address,
    universal_router: Address,
    pool: PoolKeyConfig,
    slippage_bps: u64,
}

impl UniversalAdapter {
    pub fn new(
        rpc_url: String,
        quoter: Address,
        universal_router: Address,
        pool: PoolKeyConfig,
        slippage_bps: u64,
    ) -> Self {
        Self {
            rpc_url,
            quoter,
            universal_router,
            pool,
            slippage_bps,
        }
    }

    fn zero_for_one(&self, token_in: Address) -> bool {
        token_in == self.pool.currency0
    }
}

fn to_u128(amount: U256, what: &str) -> Result<u128, QuoteError> {
    u128::try_from(amount).map_err(|_| QuoteError::Decode(format!("{} exceeds uint128", what)))
}

/// Encode the full `execute` calldata for a single-pool swap.
///
/// `bound` is the minimum output for exact-in or the maximum input for
/// exact-out; `amount` is the fixed side of the swap.
pub fn encode_execute(
    pool_key: &PoolKey,
    zero_for_one: bool,
    intent: SwapIntent,
    amount: u128,
    bound: u128,
    deadline: U256,
) -> Vec<u8> {
    let (currency_in, currency_out) = if zero_for_one {
        (pool_key.currency0, pool_key.currency1)
    } else {
        (pool_key.currency1, pool_key.currency0)
    };

    let (actions, swap_param, settle_amount, take_amount) = match intent {
        SwapIntent::ExactIn => (
            ACTIONS_EXACT_IN,
            ExactInputSingleParams {
                poolKey: pool_key.clone(),
                zeroForOne: zero_for_one,
                amountIn: amount,
                amountOutMinimum: bound,
                hookData: Bytes::new(),
            }
            .abi_encode(),
            amount, // settle exactly what was swapped in
            bound,  // take at least the bounded output
        ),
        SwapIntent::ExactOut => (
            ACTIONS_EXACT_OUT,
            ExactOutputSingleParams {
                poolKey: pool_key.clone(),
                zeroForOne: zero_for_one,
                amountOut: amount,
                amountInMaximum: bound,
                hookData: Bytes::new(),
            }
            .abi_encode(),
            bound,  // settle at most the bounded input
            amount, // take exactly the requested output
        ),
    };

    let params: Vec<Bytes> = vec![
        Bytes::from(swap_param),
        Bytes::from((currency_in, U256::from(settle_amount)).abi_encode_params()),
        Bytes::from((currency_out, U256::from(take_amount)).abi_encode_params()),
    ];

    let unlock_payload = (Bytes::from(actions.to_vec()), params).abi_encode_params();

    IUniversalRouter::executeCall {
        commands: Bytes::from(vec![COMMAND_V4_SWAP]),
        inputs: vec![Bytes::from(unlock_payload)],
        deadline,
    }
    .abi_encode()
}

/// Decode an `execute` call back into its command byte string, action byte
/// string, and parameter blobs. Conformance helper for encoded plans.
pub fn decode_execute(calldata: &[u8]) -> Result<(Bytes, Bytes, Vec<Bytes>), QuoteError> {
    let call = IUniversalRouter::executeCall::abi_decode(calldata)
        .map_err(|e| QuoteError::Decode(format!("execute call: {}", e)))?;
    let input = call
        .inputs
        .first()
        .ok_or_else(|| QuoteError::Decode("execute call has no inputs".to_string()))?;
    let (actions, params) = <(Bytes, Vec<Bytes>)>::abi_decode_params(input)
        .map_err(|e| QuoteError::Decode(format!("unlock payload: {}", e)))?;
    Ok((call.commands, actions, params))
}

#[async_trait]
impl QuoteAdapter for UniversalAdapter {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, QuoteError> {
        request.validate()?;

        let pool_key = self.pool.to_pool_key()?;
        let zero_for_one = self.zero_for_one(request.token_in);
        let wants_native_in = is_native(request.token_in);
        let deadline = swap_deadline(DEADLINE_SECS);

        match request.intent {
            SwapIntent::ExactIn => {
                let amount_in = request.input_amount()?;
                let quoter_params = IV4Quoter::QuoteExactSingleParams {
                    poolKey: pool_key.clone(),
                    zeroForOne: zero_for_one,
                    exactAmount: to_u128(amount_in, "input amount")?,
                    hookData: Bytes::new(),
                };
                let calldata = IV4Quoter::quoteExactInputSingleCall {
                    params: quoter_params,
                }
                .abi_encode();
                let output = call_contract(&self.rpc_url, self.quoter, calldata)
                    .await
                    .map_err(|e| QuoteError::Venue(format!("v4 quoter reverted: {}", e)))?;
                let decoded = IV4Quoter::quoteExactInputSingleCall::abi_decode_returns(&output)
                    .map_err(|e| QuoteError::Decode(format!("v4 quoter output: {}", e)))?;

                let out = decoded.amountOut;
                let min_out = apply_slippage_down(out, self.slippage_bps);
                debug!(
                    "tick pool quote exact-in: {} -> {} (min {})",
                    amount_in, out, min_out
                );

                let data = encode_execute(
                    &pool_key,
                    zero_for_one,
                    SwapIntent::ExactIn,
                    to_u128(amount_in, "input amount")?,
                    to_u128(min_out, "min output")?,
                    deadline,
                );
                let value = if wants_native_in { amount_in } else { U256::ZERO };

                Ok(Quote {
                    out,
                    min_out,
                    in_amount: None,
                    max_in: None,
                    approval_target: self.universal_router,
                    calls: vec![Call::with_value(
                        self.universal_router,
                        Bytes::from(data),
                        value,
                    )],
                    wants_native_in,
                    velora: None,
                })
            }
            SwapIntent::ExactOut => {
                let amount_out = request.output_amount()?;
                let quoter_params = IV4Quoter::QuoteExactSingleParams {
                    poolKey: pool_key.clone(),
                    zeroForOne: zero_for_one,
                    exactAmount: to_u128(amount_out, "output amount")?,
                    hookData: Bytes::new(),
                };
                let calldata = IV4Quoter::quoteExactOutputSingleCall {
                    params: quoter_params,
                }
                .abi_encode();
                let output = call_contract(&self.rpc_url, self.quoter, calldata)
                    .await
                    .map_err(|e| QuoteError::Venue(format!("v4 quoter reverted: {}", e)))?;
                let decoded = IV4Quoter::quoteExactOutputSingleCall::abi_decode_returns(&output)
                    .map_err(|e| QuoteError::Decode(format!("v4 quoter output: {}", e)))?;

                let amount_in = decoded.amountIn;
                let max_in = apply_slippage_up(amount_in, self.slippage_bps);
                debug!(
                    "tick pool quote exact-out: {} <- {} (max {})",
                    amount_out, amount_in, max_in
                );

                let data = encode_execute(
                    &pool_key,
                    zero_for_one,
                    SwapIntent::ExactOut,
                    to_u128(amount_out, "output amount")?,
                    to_u128(max_in, "max input")?,
                    deadline,
                );
                let value = if wants_native_in { max_in } else { U256::ZERO };

                Ok(Quote {
                    out: amount_out,
                    min_out: amount_out,
                    in_amount: Some(amount_in),
                    max_in: Some(max_in),
                    approval_target: self.universal_router,
                    calls: vec![Call::with_value(
                        self.universal_router,
                        Bytes::from(data),
                        value,
                    )],
                    wants_native_in,
                    velora: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pool_key() -> PoolKey {
        PoolKey {
            currency0: Address::ZERO,
            currency1: Address::repeat_byte(2),
            fee: U24::from(500u32),
            tickSpacing: I24::try_from(10).unwrap(),
            hooks: Address::ZERO,
        }
    }

    #[test]
    fn test_exact_in_round_trip_actions_and_param_count() {
        let data = encode_execute(
            &test_pool_key(),
            true,
            SwapIntent::ExactIn,
            1_000_000,
            995_000,
            U256::from(1_700_000_000u64),
        );
        let (commands, actions, params) = decode_execute(&data).unwrap();
        assert_eq!(commands.as_ref(), &[COMMAND_V4_SWAP]);
        assert_eq!(actions.as_ref(), &ACTIONS_EXACT_IN);
        assert_eq!(hex::encode(actions.as_ref()), "060c0f");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_exact_out_round_trip_actions_and_param_count() {
        let data = encode_execute(
            &test_pool_key(),
            false,
            SwapIntent::ExactOut,
            1_000_000,
            1_005_000,
            U256::from(1_700_000_000u64),
        );
        let (commands, actions, params) = decode_execute(&data).unwrap();
        assert_eq!(commands.as_ref(), &[COMMAND_V4_SWAP]);
        assert_eq!(actions.as_ref(), &ACTIONS_EXACT_OUT);
        assert_eq!(hex::encode(actions.as_ref()), "080c0f");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_action_bytes_differ_by_intent() {
        // Exact-in and exact-out unlock payloads are not interchangeable.
        assert_ne!(ACTIONS_EXACT_IN, ACTIONS_EXACT_OUT);
        assert_eq!(ACTIONS_EXACT_IN[1..], ACTIONS_EXACT_OUT[1..]);
    }

    #[test]
    fn test_settle_take_params_follow_direction() {
        // zero_for_one exact-in: settle currency0, take currency1
        let data = encode_execute(
            &test_pool_key(),
            true,
            SwapIntent::ExactIn,
            1_000,
            990,
            U256::from(1u64),
        );
        let (_, _, params) = decode_execute(&data).unwrap();
        let (settle_currency, settle_amount) =
            <(Address, U256)>::abi_decode_params(&params[1]).unwrap();
        let (take_currency, take_amount) =
            <(Address, U256)>::abi_decode_params(&params[2]).unwrap();
        assert_eq!(settle_currency, Address::ZERO);
        assert_eq!(settle_amount, U256::from(1_000u64));
        assert_eq!(take_currency, Address::repeat_byte(2));
        assert_eq!(take_amount, U256::from(990u64));
    }
}
