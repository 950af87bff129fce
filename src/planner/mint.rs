//! Mint planner.
//!
//! Minting opens or grows a leveraged position: flash-loan the debt asset,
//! swap it into collateral, and supply the swapped collateral plus the
//! user's equity so the position lands back on the manager's target
//! ratio. The planner sizes that flash loan, prices the debt→collateral
//! swap on one venue, and assembles the ordered call sequence the router
//! executes atomically.

use alloy_primitives::{Address, U256};
use eyre::{bail, ensure, eyre, Result};
use tracing::debug;

use super::{approve_call, wad, weth_withdraw_call};
use crate::manager::{ManagerClient, TokenState};
use crate::types::{apply_slippage_down, Call, Quote, QuoteRequest};
use crate::venues::QuoteAdapter;

/// A fully sized, slippage-bounded mint. Pure value; discard and re-plan
/// if the quote goes stale.
#[derive(Debug, Clone)]
pub struct MintPlan {
    pub equity_in_input_asset: U256,
    pub flash_loan_amount: U256,
    pub expected_debt: U256,
    pub expected_total_collateral: U256,
    pub expected_shares: U256,
    pub min_shares: U256,
    pub calls: Vec<Call>,
}

/// Convert user equity (collateral asset units) into debt units using the
/// price implied by the manager's own accounting.
pub(crate) fn equity_in_debt_units(equity: U256, state: &TokenState) -> Result<U256> {
    ensure!(
        !state.collateral.is_zero(),
        "token holds no collateral; cannot derive collateral price"
    );
    Ok(equity * state.collateral_in_debt / state.collateral)
}

/// Flash-loan debt `d` such that swapped collateral plus user equity keeps
/// the manager's ratio: `(e + d) / d = ratio` at parity, so
/// `d = e * WAD / (ratio - WAD)`.
pub(crate) fn size_flash_loan(equity_debt_units: U256, ratio_wad: U256) -> Result<U256> {
    ensure!(
        ratio_wad > wad(),
        "collateral ratio {} is at or below 1x; nothing to borrow",
        ratio_wad
    );
    Ok(equity_debt_units * wad() / (ratio_wad - wad()))
}

/// Assemble the final plan from the quote and the share preview.
pub(crate) fn assemble_mint_plan(
    equity: U256,
    flash_loan_amount: U256,
    debt_asset: Address,
    weth: Address,
    expected_shares: U256,
    slippage_bps: u64,
    quote: &Quote,
) -> Result<MintPlan> {
    let min_shares = apply_slippage_down(expected_shares, slippage_bps);
    if min_shares.is_zero() {
        bail!("slippage bound rounds to zero shares; refusing to build mint plan");
    }
    ensure!(
        min_shares <= expected_shares,
        "share bound exceeds expected shares"
    );

    // Approvals (or the unwrap replacing them) come first; the adapter's
    // swap calls come last and deliver collateral to the router.
    let mut calls = Vec::with_capacity(1 + quote.calls.len());
    if quote.wants_native_in {
        calls.push(weth_withdraw_call(weth, flash_loan_amount));
    } else {
        calls.push(approve_call(
            debt_asset,
            quote.approval_target,
            flash_loan_amount,
        ));
    }
    calls.extend(quote.calls.iter().cloned());

    Ok(MintPlan {
        equity_in_input_asset: equity,
        flash_loan_amount,
        expected_debt: flash_loan_amount,
        expected_total_collateral: equity + quote.out,
        expected_shares,
        min_shares,
        calls,
    })
}

/// Plans mints for one manager deployment through one quote venue.
pub struct MintPlanner<Q: QuoteAdapter> {
    manager: ManagerClient,
    quoter: Q,
    weth: Address,
    slippage_bps: u64,
}

impl<Q: QuoteAdapter> MintPlanner<Q> {
    pub fn new(manager: ManagerClient, quoter: Q, weth: Address, slippage_bps: u64) -> Self {
        Self {
            manager,
            quoter,
            weth,
            slippage_bps,
        }
    }

    /// Plan a mint of `equity` (in the token's collateral asset).
    pub async fn plan(&self, token: Address, equity: U256) -> Result<MintPlan> {
        ensure!(!equity.is_zero(), "cannot mint zero equity");

        let collateral_asset = self.manager.collateral_asset(token).await?;
        let debt_asset = self.manager.debt_asset(token).await?;
        let state = self.manager.token_state(token).await?;
        let ratio = self.manager.collateral_ratio(token).await?;

        let equity_debt = equity_in_debt_units(equity, &state)?;
        let flash_loan_amount = size_flash_loan(equity_debt, ratio)?;
        debug!(
            "mint sizing: equity {} ({} debt units) -> flash loan {}",
            equity, equity_debt, flash_loan_amount
        );

        let quote = self
            .quoter
            .quote(&QuoteRequest::exact_in(
                debt_asset,
                collateral_asset,
                flash_loan_amount,
            ))
            .await
            .map_err(|e| eyre!("debt->collateral quote failed: {}", e))?;

        let expected_shares = self.manager.preview_mint(token, equity).await?;

        assemble_mint_plan(
            equity,
            flash_loan_amount,
            debt_asset,
            self.weth,
            expected_shares,
            self.slippage_bps,
            &quote,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;

    fn wad_u(x: u64) -> U256 {
        U256::from(x) * wad()
    }

    fn stub_quote(out: u64, wants_native_in: bool) -> Quote {
        Quote {
            out: U256::from(out),
            min_out: U256::from(out),
            in_amount: None,
            max_in: None,
            approval_target: Address::repeat_byte(0xee),
            calls: vec![Call::new(Address::repeat_byte(0xee), Bytes::from(vec![0x01]))],
            wants_native_in,
            velora: None,
        }
    }

    #[test]
    fn test_flash_loan_sizing_2x() {
        // 2x leverage: borrow exactly the equity.
        let d = size_flash_loan(wad_u(1), wad_u(2)).unwrap();
        assert_eq!(d, wad_u(1));
    }

    #[test]
    fn test_flash_loan_sizing_3x() {
        // ratio 1.5x: d = e / 0.5 = 2e
        let ratio = wad_u(3) / U256::from(2u64);
        let d = size_flash_loan(wad_u(1), ratio).unwrap();
        assert_eq!(d, wad_u(2));
    }

    #[test]
    fn test_flash_loan_sizing_rejects_1x() {
        assert!(size_flash_loan(wad_u(1), wad_u(1)).is_err());
    }

    #[test]
    fn test_equity_conversion_uses_state_price() {
        let state = TokenState {
            collateral: U256::from(100u64),
            collateral_in_debt: U256::from(300u64), // 3 debt units per collateral
            debt: U256::from(150u64),
            equity: U256::from(150u64),
        };
        let e = equity_in_debt_units(U256::from(10u64), &state).unwrap();
        assert_eq!(e, U256::from(30u64));
    }

    #[test]
    fn test_equity_conversion_rejects_empty_position() {
        let state = TokenState {
            collateral: U256::ZERO,
            collateral_in_debt: U256::ZERO,
            debt: U256::ZERO,
            equity: U256::ZERO,
        };
        assert!(equity_in_debt_units(U256::from(1u64), &state).is_err());
    }

    #[test]
    fn test_min_shares_bounded_by_expected() {
        let quote = stub_quote(2_000, false);
        let plan = assemble_mint_plan(
            U256::from(1_000u64),
            U256::from(2_000u64),
            Address::repeat_byte(0xdd),
            Address::repeat_byte(0x11),
            U256::from(995u64),
            50,
            &quote,
        )
        .unwrap();
        assert!(plan.min_shares <= plan.expected_shares);
        // 995 * 9950 / 10000 = 990
        assert_eq!(plan.min_shares, U256::from(990u64));
        assert_eq!(plan.expected_total_collateral, U256::from(3_000u64));
    }

    #[test]
    fn test_zero_min_shares_rejected() {
        let quote = stub_quote(2_000, false);
        let err = assemble_mint_plan(
            U256::from(1_000u64),
            U256::from(2_000u64),
            Address::repeat_byte(0xdd),
            Address::repeat_byte(0x11),
            U256::ZERO,
            50,
            &quote,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_calls_begin_with_approval_and_end_with_swap() {
        let quote = stub_quote(2_000, false);
        let debt_asset = Address::repeat_byte(0xdd);
        let plan = assemble_mint_plan(
            U256::from(1_000u64),
            U256::from(2_000u64),
            debt_asset,
            Address::repeat_byte(0x11),
            U256::from(100u64),
            50,
            &quote,
        )
        .unwrap();
        assert_eq!(plan.calls.len(), 2);
        assert_eq!(plan.calls[0].target, debt_asset);
        assert_eq!(plan.calls.last().unwrap(), &quote.calls[0]);
    }

    #[test]
    fn test_native_input_replaces_approval_with_unwrap() {
        let quote = stub_quote(2_000, true);
        let weth = Address::repeat_byte(0x11);
        let plan = assemble_mint_plan(
            U256::from(1_000u64),
            U256::from(2_000u64),
            Address::repeat_byte(0xdd),
            weth,
            U256::from(100u64),
            50,
            &quote,
        )
        .unwrap();
        assert_eq!(plan.calls[0].target, weth);
    }

    #[test]
    fn test_plan_assembly_is_idempotent() {
        let quote = stub_quote(2_000, false);
        let build = || {
            assemble_mint_plan(
                U256::from(1_000u64),
                U256::from(2_000u64),
                Address::repeat_byte(0xdd),
                Address::repeat_byte(0x11),
                U256::from(995u64),
                50,
                &quote,
            )
            .unwrap()
        };
        let a = build();
        let b = build();
        assert_eq!(a.calls, b.calls);
        assert_eq!(a.min_shares, b.min_shares);
        assert_eq!(a.flash_loan_amount, b.flash_loan_amount);
    }
}
