//! Mint and redeem planners.
//!
//! A planner turns a user intent ("mint X equity" / "redeem N shares")
//! into a slippage-bounded, ordered call plan for the multicall executor.
//! Plans are pure values: nothing is submitted, nothing is cached, and a
//! stale plan is simply recomputed.

mod mint;
mod redeem;

pub use mint::{MintPlan, MintPlanner};
pub use redeem::{RedeemPlan, RedeemPlanner};

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use crate::types::Call;

sol! {
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
    }

    interface IWETH {
        function deposit() external payable;
        function withdraw(uint256 amount) external;
    }
}

/// WAD scale used by the manager's collateral ratio (1e18 = 1x).
pub(crate) fn wad() -> U256 {
    U256::from(10u64).pow(U256::from(18u64))
}

pub(crate) fn approve_call(token: Address, spender: Address, amount: U256) -> Call {
    let data = IERC20::approveCall { spender, amount }.abi_encode();
    Call::new(token, Bytes::from(data))
}

pub(crate) fn weth_withdraw_call(weth: Address, amount: U256) -> Call {
    let data = IWETH::withdrawCall { amount }.abi_encode();
    Call::new(weth, Bytes::from(data))
}
