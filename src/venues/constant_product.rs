//! Constant-product AMM adapter (V2-style pair).
//!
//! Output/input amounts are computed deterministically from on-chain pair
//! reserves with the standard constant-product formula, the 0.3% venue fee
//! applied to the input leg. Calldata is a single router swap with a
//! deadline.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use tracing::debug;

use super::{call_contract, swap_deadline, QuoteAdapter};
use crate::types::{
    apply_slippage_down, apply_slippage_up, Call, Quote, QuoteError, QuoteRequest, SwapIntent,
};
use async_trait::async_trait;

sol! {
    /// Uniswap V2 Pair interface
    interface IUniswapV2Pair {
        function getReserves() external view returns (
            uint112 reserve0,
            uint112 reserve1,
            uint32 blockTimestampLast
        );
        function token0() external view returns (address);
        function token1() external view returns (address);
    }

    /// Uniswap V2 Router interface
    interface IUniswapV2Router {
        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);

        function swapTokensForExactTokens(
            uint256 amountOut,
            uint256 amountInMax,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);
    }
}

/// Deadline window for encoded swaps (seconds).
const DEADLINE_SECS: u64 = 300;

/// Constant product with 0.3% fee on the input leg:
/// `out = in * 997 * R_out / (R_in * 1000 + in * 997)`
pub fn v2_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> Result<U256, QuoteError> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(QuoteError::Venue("pair has no liquidity".to_string()));
    }
    let amount_in_with_fee = amount_in * U256::from(997u64);
    let numerator = amount_in_with_fee * reserve_out;
    let denominator = reserve_in * U256::from(1000u64) + amount_in_with_fee;
    if denominator.is_zero() {
        return Err(QuoteError::Venue("division by zero in pair quote".to_string()));
    }
    Ok(numerator / denominator)
}

/// Inverse formula for exact-out, rounded up by one:
/// `in = R_in * out * 1000 / ((R_out - out) * 997) + 1`
pub fn v2_amount_in(amount_out: U256, reserve_in: U256, reserve_out: U256) -> Result<U256, QuoteError> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(QuoteError::Venue("pair has no liquidity".to_string()));
    }
    if amount_out >= reserve_out {
        return Err(QuoteError::Venue(
            "requested output exceeds pair reserves".to_string(),
        ));
    }
    let numerator = reserve_in * amount_out * U256::from(1000u64);
    let denominator = (reserve_out - amount_out) * U256::from(997u64);
    Ok(numerator / denominator + U256::from(1u64))
}

/// Reserves oriented as (reserve_in, reserve_out), rejecting tokens the
/// pair does not hold.
pub fn orient_reserves(
    token_in: Address,
    token0: Address,
    token1: Address,
    reserve0: U256,
    reserve1: U256,
) -> Result<(U256, U256), QuoteError> {
    if token_in == token0 {
        Ok((reserve0, reserve1))
    } else if token_in == token1 {
        Ok((reserve1, reserve0))
    } else {
        Err(QuoteError::Venue(format!(
            "token {} is not in the pair ({}, {})",
            token_in, token0, token1
        )))
    }
}

/// Adapter over a single V2-style pair, swapping through the venue router.
pub struct ConstantProductAdapter {
    rpc_url: String,
    pair: Address,
    router: Address,
    /// Address that receives the swap output (the protocol router).
    recipient: Address,
    slippage_bps: u64,
}

impl ConstantProductAdapter {
    pub fn new(
        rpc_url: String,
        pair: Address,
        router: Address,
        recipient: Address,
        slippage_bps: u64,
    ) -> Self {
        Self {
            rpc_url,
            pair,
            router,
            recipient,
            slippage_bps,
        }
    }

    /// Reserves oriented as (reserve_in, reserve_out) for the request pair.
    async fn oriented_reserves(&self, token_in: Address) -> Result<(U256, U256), QuoteError> {
        let calldata = IUniswapV2Pair::getReservesCall {}.abi_encode();
        let output = call_contract(&self.rpc_url, self.pair, calldata).await?;
        let reserves = IUniswapV2Pair::getReservesCall::abi_decode_returns(&output)
            .map_err(|e| QuoteError::Decode(format!("reserves: {}", e)))?;

        let calldata = IUniswapV2Pair::token0Call {}.abi_encode();
        let output = call_contract(&self.rpc_url, self.pair, calldata).await?;
        let token0 = IUniswapV2Pair::token0Call::abi_decode_returns(&output)
            .map_err(|e| QuoteError::Decode(format!("token0: {}", e)))?;

        let calldata = IUniswapV2Pair::token1Call {}.abi_encode();
        let output = call_contract(&self.rpc_url, self.pair, calldata).await?;
        let token1 = IUniswapV2Pair::token1Call::abi_decode_returns(&output)
            .map_err(|e| QuoteError::Decode(format!("token1: {}", e)))?;

        let r0: u128 = reserves.reserve0.to();
        let r1: u128 = reserves.reserve1.to();
        orient_reserves(token_in, token0, token1, U256::from(r0), U256::from(r1))
    }
}

#[async_trait]
impl QuoteAdapter for ConstantProductAdapter {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, QuoteError> {
        request.validate()?;

        let (reserve_in, reserve_out) = self.oriented_reserves(request.token_in).await?;
        let path = vec![request.token_in, request.token_out];
        let deadline = swap_deadline(DEADLINE_SECS);

        match request.intent {
            SwapIntent::ExactIn => {
                let amount_in = request.input_amount()?;
                let out = v2_amount_out(amount_in, reserve_in, reserve_out)?;
                let min_out = apply_slippage_down(out, self.slippage_bps);
                debug!(
                    "pair quote exact-in: {} -> {} (min {})",
                    amount_in, out, min_out
                );

                let data = IUniswapV2Router::swapExactTokensForTokensCall {
                    amountIn: amount_in,
                    amountOutMin: min_out,
                    path,
                    to: self.recipient,
                    deadline,
                }
                .abi_encode();

                Ok(Quote {
                    out,
                    min_out,
                    in_amount: None,
                    max_in: None,
                    approval_target: self.router,
                    calls: vec![Call::new(self.router, Bytes::from(data))],
                    wants_native_in: false,
                    velora: None,
                })
            }
            SwapIntent::ExactOut => {
                let amount_out = request.output_amount()?;
                let amount_in = v2_amount_in(amount_out, reserve_in, reserve_out)?;
                let max_in = apply_slippage_up(amount_in, self.slippage_bps);
                debug!(
                    "pair quote exact-out: {} <- {} (max {})",
                    amount_out, amount_in, max_in
                );

                let data = IUniswapV2Router::swapTokensForExactTokensCall {
                    amountOut: amount_out,
                    amountInMax: max_in,
                    path,
                    to: self.recipient,
                    deadline,
                }
                .abi_encode();

                Ok(Quote {
                    out: amount_out,
                    min_out: amount_out,
                    in_amount: Some(amount_in),
                    max_in: Some(max_in),
                    approval_target: self.router,
                    calls: vec![Call::new(self.router, Bytes::from(data))],
                    wants_native_in: false,
                    velora: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_out_formula() {
        // 1000 in, 1_000_000 / 1_000_000 reserves, 0.3% fee
        let out = v2_amount_out(
            U256::from(1000u64),
            U256::from(1_000_000u64),
            U256::from(1_000_000u64),
        )
        .unwrap();
        // 1000 * 997 * 1e6 / (1e6 * 1000 + 1000 * 997) = 996
        assert_eq!(out, U256::from(996u64));
    }

    #[test]
    fn test_amount_in_inverse_of_amount_out() {
        let r_in = U256::from(5_000_000u64);
        let r_out = U256::from(3_000_000u64);
        let want_out = U256::from(10_000u64);
        let need_in = v2_amount_in(want_out, r_in, r_out).unwrap();
        // Feeding the computed input back must produce at least want_out.
        let got = v2_amount_out(need_in, r_in, r_out).unwrap();
        assert!(got >= want_out, "got {} < want {}", got, want_out);
    }

    #[test]
    fn test_amount_in_rejects_draining_pool() {
        let err = v2_amount_in(
            U256::from(100u64),
            U256::from(1_000u64),
            U256::from(100u64),
        );
        assert!(matches!(err, Err(QuoteError::Venue(_))));
    }

    #[test]
    fn test_orient_reserves_by_pair_side() {
        let token0 = Address::repeat_byte(1);
        let token1 = Address::repeat_byte(2);
        let r0 = U256::from(100u64);
        let r1 = U256::from(200u64);
        assert_eq!(
            orient_reserves(token0, token0, token1, r0, r1).unwrap(),
            (r0, r1)
        );
        assert_eq!(
            orient_reserves(token1, token0, token1, r0, r1).unwrap(),
            (r1, r0)
        );
    }

    #[test]
    fn test_foreign_token_rejected() {
        let err = orient_reserves(
            Address::repeat_byte(9),
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::from(100u64),
            U256::from(200u64),
        );
        assert!(matches!(err, Err(QuoteError::Venue(_))));
    }

    #[test]
    fn test_empty_reserves_error() {
        assert!(v2_amount_out(U256::from(1u64), U256::ZERO, U256::ZERO).is_err());
        assert!(v2_amount_in(U256::from(1u64), U256::ZERO, U256::ZERO).is_err());
    }
}
