//! Concentrated-liquidity adapter (V3-style, single pool).
//!
//! Wraps the venue QuoterV2 view call for a configured fee tier, then
//! encodes a single-pool swap against the venue swap router. Exact-in
//! passes a slippage-derived minimum output; exact-out passes the bounded
//! maximum input.

use alloy_primitives::{aliases::U24, Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use tracing::debug;

use super::{call_contract, swap_deadline, QuoteAdapter};
use crate::types::{
    apply_slippage_down, apply_slippage_up, Call, Quote, QuoteError, QuoteRequest, SwapIntent,
};

sol! {
    /// Uniswap V3 QuoterV2 interface
    interface IQuoterV2 {
        struct QuoteExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amountIn;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        struct QuoteExactOutputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amount;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        function quoteExactInputSingle(QuoteExactInputSingleParams memory params)
            external
            returns (
                uint256 amountOut,
                uint160 sqrtPriceX96After,
                uint32 initializedTicksCrossed,
                uint256 gasEstimate
            );

        function quoteExactOutputSingle(QuoteExactOutputSingleParams memory params)
            external
            returns (
                uint256 amountIn,
                uint160 sqrtPriceX96After,
                uint32 initializedTicksCrossed,
                uint256 gasEstimate
            );
    }

    /// Uniswap V3 SwapRouter interface
    interface ISwapRouter {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        struct ExactOutputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountOut;
            uint256 amountInMaximum;
            uint160 sqrtPriceLimitX96;
        }

        function exactInputSingle(ExactInputSingleParams calldata params)
            external payable returns (uint256 amountOut);

        function exactOutputSingle(ExactOutputSingleParams calldata params)
            external payable returns (uint256 amountIn);
    }
}

const DEADLINE_SECS: u64 = 300;

/// Adapter over one V3-style pool (token pair + fee tier).
pub struct ConcentratedAdapter {
    rpc_url: String,
    quoter: Address,
    swap_router: Address,
    recipient: Address,
    fee: u32,
    slippage_bps: u64,
}

impl ConcentratedAdapter {
    pub fn new(
        rpc_url: String,
        quoter: Address,
        swap_router: Address,
        recipient: Address,
        fee: u32,
        slippage_bps: u64,
    ) -> Self {
        Self {
            rpc_url,
            quoter,
            swap_router,
            recipient,
            fee,
            slippage_bps,
        }
    }

    fn fee_u24(&self) -> U24 {
        U24::from(self.fee)
    }
}

#[async_trait]
impl QuoteAdapter for ConcentratedAdapter {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, QuoteError> {
        request.validate()?;

        let zero_limit = alloy_primitives::aliases::U160::ZERO;
        let deadline = swap_deadline(DEADLINE_SECS);

        match request.intent {
            SwapIntent::ExactIn => {
                let amount_in = request.input_amount()?;
                let params = IQuoterV2::QuoteExactInputSingleParams {
                    tokenIn: request.token_in,
                    tokenOut: request.token_out,
                    amountIn: amount_in,
                    fee: self.fee_u24(),
                    sqrtPriceLimitX96: zero_limit,
                };
                let calldata = IQuoterV2::quoteExactInputSingleCall { params }.abi_encode();
                let output = call_contract(&self.rpc_url, self.quoter, calldata)
                    .await
                    .map_err(|e| QuoteError::Venue(format!("quoter reverted: {}", e)))?;
                let decoded = IQuoterV2::quoteExactInputSingleCall::abi_decode_returns(&output)
                    .map_err(|e| QuoteError::Decode(format!("quoter output: {}", e)))?;

                let out = decoded.amountOut;
                let min_out = apply_slippage_down(out, self.slippage_bps);
                debug!(
                    "pool quote exact-in: {} -> {} (min {}, fee {})",
                    amount_in, out, min_out, self.fee
                );

                let data = ISwapRouter::exactInputSingleCall {
                    params: ISwapRouter::ExactInputSingleParams {
                        tokenIn: request.token_in,
                        tokenOut: request.token_out,
                        fee: self.fee_u24(),
                        recipient: self.recipient,
                        deadline,
                        amountIn: amount_in,
                        amountOutMinimum: min_out,
                        sqrtPriceLimitX96: zero_limit,
                    },
                }
                .abi_encode();

                Ok(Quote {
                    out,
                    min_out,
                    in_amount: None,
                    max_in: None,
                    approval_target: self.swap_router,
                    calls: vec![Call::new(self.swap_router, Bytes::from(data))],
                    wants_native_in: false,
                    velora: None,
                })
            }
            SwapIntent::ExactOut => {
                let amount_out = request.output_amount()?;
                let params = IQuoterV2::QuoteExactOutputSingleParams {
                    tokenIn: request.token_in,
                    tokenOut: request.token_out,
                    amount: amount_out,
                    fee: self.fee_u24(),
                    sqrtPriceLimitX96: zero_limit,
                };
                let calldata = IQuoterV2::quoteExactOutputSingleCall { params }.abi_encode();
                let output = call_contract(&self.rpc_url, self.quoter, calldata)
                    .await
                    .map_err(|e| QuoteError::Venue(format!("quoter reverted: {}", e)))?;
                let decoded = IQuoterV2::quoteExactOutputSingleCall::abi_decode_returns(&output)
                    .map_err(|e| QuoteError::Decode(format!("quoter output: {}", e)))?;

                let amount_in = decoded.amountIn;
                let max_in = apply_slippage_up(amount_in, self.slippage_bps);
                debug!(
                    "pool quote exact-out: {} <- {} (max {}, fee {})",
                    amount_out, amount_in, max_in, self.fee
                );

                let data = ISwapRouter::exactOutputSingleCall {
                    params: ISwapRouter::ExactOutputSingleParams {
                        tokenIn: request.token_in,
                        tokenOut: request.token_out,
                        fee: self.fee_u24(),
                        recipient: self.recipient,
                        deadline,
                        amountOut: amount_out,
                        amountInMaximum: max_in,
                        sqrtPriceLimitX96: zero_limit,
                    },
                }
                .abi_encode();

                Ok(Quote {
                    out: amount_out,
                    min_out: amount_out,
                    in_amount: Some(amount_in),
                    max_in: Some(max_in),
                    approval_target: self.swap_router,
                    calls: vec![Call::new(self.swap_router, Bytes::from(data))],
                    wants_native_in: false,
                    velora: None,
                })
            }
        }
    }
}
