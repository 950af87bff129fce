//! Core value types shared by venue adapters and planners.
//!
//! A `Quote` is the venue-agnostic result of pricing a swap on one venue.
//! A `Call` is one encoded contract call; planners emit them as an ordered
//! array that the on-chain multicall executor runs atomically.

use alloy_primitives::{Address, Bytes, U256};
use thiserror::Error;

/// Basis-point denominator used for all slippage math.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Sentinel address some venues use for the native currency.
/// Normalized to the zero address before hitting any API.
pub const NATIVE_SENTINEL: Address =
    alloy_primitives::address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Swap direction: fix the input amount or fix the output amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapIntent {
    /// Input amount is fixed; output is estimated and bounded by `min_out`.
    ExactIn,
    /// Output amount is fixed; input is estimated and bounded by `max_in`.
    ExactOut,
}

impl std::fmt::Display for SwapIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapIntent::ExactIn => write!(f, "exactIn"),
            SwapIntent::ExactOut => write!(f, "exactOut"),
        }
    }
}

/// Errors surfaced by venue adapters.
#[derive(Debug, Error)]
pub enum QuoteError {
    /// Input-contract violation: the amount required by the stated intent
    /// is missing. Raised before any I/O.
    #[error("missing {0} amount for {1} quote")]
    MissingAmount(&'static str, SwapIntent),

    /// Venue-level failure (insufficient liquidity, aggregator error body).
    /// The venue's own message is preserved.
    #[error("{0}")]
    Venue(String),

    /// The aggregator returned a calldata shape we cannot safely patch.
    #[error("unsupported aggregator method: {0}")]
    UnsupportedMethod(String),

    /// HTTP / network failure, with status context where available.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed venue response (bad address, non-integer amount, bad hex).
    #[error("malformed venue response: {0}")]
    Decode(String),

    /// On-chain read failure (eth_call revert or RPC error).
    #[error("rpc error: {0}")]
    Rpc(String),
}

/// A request for a swap quote on a single venue.
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: Option<U256>,
    pub amount_out: Option<U256>,
    pub intent: SwapIntent,
}

impl QuoteRequest {
    pub fn exact_in(token_in: Address, token_out: Address, amount_in: U256) -> Self {
        Self {
            token_in,
            token_out,
            amount_in: Some(amount_in),
            amount_out: None,
            intent: SwapIntent::ExactIn,
        }
    }

    pub fn exact_out(token_in: Address, token_out: Address, amount_out: U256) -> Self {
        Self {
            token_in,
            token_out,
            amount_in: None,
            amount_out: None,
            intent: SwapIntent::ExactOut,
        }
        .with_amount_out(amount_out)
    }

    fn with_amount_out(mut self, amount_out: U256) -> Self {
        self.amount_out = Some(amount_out);
        self
    }

    /// The fixed input amount. Fails fast for malformed exact-in requests.
    pub fn input_amount(&self) -> Result<U256, QuoteError> {
        self.amount_in
            .ok_or(QuoteError::MissingAmount("input", self.intent))
    }

    /// The fixed output amount. Fails fast for malformed exact-out requests.
    pub fn output_amount(&self) -> Result<U256, QuoteError> {
        self.amount_out
            .ok_or(QuoteError::MissingAmount("output", self.intent))
    }

    /// Check the amount required by the stated intent is present,
    /// before any network call is made.
    pub fn validate(&self) -> Result<(), QuoteError> {
        match self.intent {
            SwapIntent::ExactIn => self.input_amount().map(|_| ()),
            SwapIntent::ExactOut => self.output_amount().map(|_| ()),
        }
    }
}

/// One encoded contract call. Immutable once produced by a planner;
/// the executor runs the full sequence atomically, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub target: Address,
    pub data: Bytes,
    pub value: U256,
}

impl Call {
    pub fn new(target: Address, data: Bytes) -> Self {
        Self {
            target,
            data,
            value: U256::ZERO,
        }
    }

    pub fn with_value(target: Address, data: Bytes, value: U256) -> Self {
        Self {
            target,
            data,
            value,
        }
    }
}

/// Byte offsets into aggregator `swapExactAmountOut` calldata at which a
/// caller may patch amounts just before execution, without re-quoting.
/// Pinned against the aggregator's current ABI encoding; any other contract
/// method is rejected upstream precisely because these offsets would not
/// hold for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VeloraPatch {
    pub exact_amount_offset: usize,
    pub limit_amount_offset: usize,
    pub quoted_amount_offset: usize,
}

impl VeloraPatch {
    pub const SWAP_EXACT_AMOUNT_OUT: Self = Self {
        exact_amount_offset: 132,
        limit_amount_offset: 100,
        quoted_amount_offset: 164,
    };
}

/// Venue-agnostic swap quote.
#[derive(Debug, Clone)]
pub struct Quote {
    /// Expected amount received. For exact-out quotes this equals the
    /// requested output amount.
    pub out: U256,
    /// Guaranteed output floor (exact-in) or the fixed output (exact-out).
    pub min_out: U256,
    /// Expected input, present for exact-out quotes.
    pub in_amount: Option<U256>,
    /// Slippage-bounded input ceiling, present for exact-out quotes.
    pub max_in: Option<U256>,
    /// Address the caller must grant ERC-20 allowance to.
    pub approval_target: Address,
    /// Encoded contract call(s) achieving the swap, in execution order.
    pub calls: Vec<Call>,
    /// True if the input leg must be supplied as native currency rather
    /// than wrapped ERC-20.
    pub wants_native_in: bool,
    /// Calldata-patch metadata, present only for exact-out aggregator quotes.
    pub velora: Option<VeloraPatch>,
}

/// `amount * (10000 - bps) / 10000`, integer arithmetic.
pub fn apply_slippage_down(amount: U256, bps: u64) -> U256 {
    amount * U256::from(BPS_DENOMINATOR.saturating_sub(bps)) / U256::from(BPS_DENOMINATOR)
}

/// `amount * (10000 + bps) / 10000`, integer arithmetic.
pub fn apply_slippage_up(amount: U256, bps: u64) -> U256 {
    amount * U256::from(BPS_DENOMINATOR + bps) / U256::from(BPS_DENOMINATOR)
}

/// Map the native-currency sentinel (and the zero address itself) to the
/// zero address; all other tokens pass through.
pub fn normalize_native(token: Address) -> Address {
    if token == NATIVE_SENTINEL {
        Address::ZERO
    } else {
        token
    }
}

/// Whether a token address denotes the native currency.
pub fn is_native(token: Address) -> bool {
    token == NATIVE_SENTINEL || token == Address::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_in_requires_amount_in() {
        let req = QuoteRequest {
            token_in: Address::ZERO,
            token_out: Address::ZERO,
            amount_in: None,
            amount_out: Some(U256::from(1u64)),
            intent: SwapIntent::ExactIn,
        };
        assert!(matches!(
            req.validate(),
            Err(QuoteError::MissingAmount("input", SwapIntent::ExactIn))
        ));
    }

    #[test]
    fn test_exact_out_requires_amount_out() {
        let req = QuoteRequest {
            token_in: Address::ZERO,
            token_out: Address::ZERO,
            amount_in: Some(U256::from(1u64)),
            amount_out: None,
            intent: SwapIntent::ExactOut,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_constructors_are_valid() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        assert!(QuoteRequest::exact_in(a, b, U256::from(5u64)).validate().is_ok());
        assert!(QuoteRequest::exact_out(a, b, U256::from(5u64)).validate().is_ok());
    }

    #[test]
    fn test_slippage_math_is_integer() {
        // 1000 with 50 bps down -> 995
        assert_eq!(
            apply_slippage_down(U256::from(1000u64), 50),
            U256::from(995u64)
        );
        // 1000 with 50 bps up -> 1005
        assert_eq!(
            apply_slippage_up(U256::from(1000u64), 50),
            U256::from(1005u64)
        );
        // Truncating division, never rounding up
        assert_eq!(apply_slippage_down(U256::from(3u64), 50), U256::from(2u64));
    }

    #[test]
    fn test_native_sentinel_normalization() {
        assert_eq!(normalize_native(NATIVE_SENTINEL), Address::ZERO);
        let weth = Address::repeat_byte(0xaa);
        assert_eq!(normalize_native(weth), weth);
        assert!(is_native(NATIVE_SENTINEL));
        assert!(is_native(Address::ZERO));
        assert!(!is_native(weth));
    }
}
