//! Redeem planner.
//!
//! Redeeming unwinds a leveraged position: the router flash-loans the
//! debt owed, the manager releases collateral, and part of that
//! collateral is swapped back into the debt asset to repay the loan.
//! The repayment must be exact, so the swap is always priced as an
//! exact-out quote for the debt owed — sizing from the output side
//! guarantees repayment regardless of price movement, at the cost of a
//! slippage-bounded maximum collateral consumed.

use alloy_primitives::{Address, U256};
use eyre::{ensure, eyre, Result};
use tracing::debug;

use super::{approve_call, weth_withdraw_call};
use crate::manager::{ManagerClient, RedeemPreview};
use crate::types::{Call, Quote, QuoteRequest};
use crate::venues::QuoteAdapter;

/// A fully bounded redeem. Pure value; discard and re-plan on staleness.
#[derive(Debug, Clone)]
pub struct RedeemPlan {
    pub shares_to_redeem: U256,
    pub expected_debt: U256,
    /// Released collateral when the payout asset is the collateral asset;
    /// zero otherwise.
    pub expected_collateral: U256,
    /// Expected debt-asset payout when the payout asset is the debt asset;
    /// zero otherwise.
    pub expected_debt_payout: U256,
    /// Residual collateral guaranteed to reach the sender after the swap
    /// leg consumes at most `max_in`.
    pub min_collateral_for_sender: U256,
    pub payout_asset: Address,
    pub payout_amount: U256,
    pub calls: Vec<Call>,
}

/// Assemble the redeem plan from the preview and the exact-out quote.
pub(crate) fn assemble_redeem_plan(
    shares: U256,
    preview: &RedeemPreview,
    collateral_asset: Address,
    requested_payout: Option<Address>,
    payout_native: bool,
    weth: Address,
    quote: &Quote,
) -> Result<RedeemPlan> {
    let max_in = quote
        .max_in
        .ok_or_else(|| eyre!("exact-out quote is missing its input bound"))?;
    let expected_in = quote.in_amount.unwrap_or(max_in);
    ensure!(
        !expected_in.is_zero(),
        "exact-out quote reports zero input for nonzero debt"
    );
    ensure!(
        max_in <= preview.collateral_released,
        "repaying {} debt may consume {} collateral but only {} is released",
        preview.debt_owed,
        max_in,
        preview.collateral_released
    );

    let payout_asset = requested_payout.unwrap_or(collateral_asset);
    let payout_in_collateral = payout_asset == collateral_asset;

    let (expected_collateral, expected_debt_payout, payout_amount, min_collateral_for_sender) =
        if payout_in_collateral {
            (
                preview.collateral_released,
                U256::ZERO,
                preview.collateral_released - expected_in,
                preview.collateral_released - max_in,
            )
        } else {
            // Whole residual is converted at the quote's implied rate.
            let residual = preview.collateral_released - expected_in;
            let debt_payout = residual * preview.debt_owed / expected_in;
            (U256::ZERO, debt_payout, debt_payout, U256::ZERO)
        };

    let mut calls = Vec::with_capacity(2 + quote.calls.len());
    calls.push(approve_call(
        collateral_asset,
        quote.approval_target,
        max_in,
    ));
    calls.extend(quote.calls.iter().cloned());
    if payout_native {
        calls.push(weth_withdraw_call(weth, payout_amount));
    }

    Ok(RedeemPlan {
        shares_to_redeem: shares,
        expected_debt: preview.debt_owed,
        expected_collateral,
        expected_debt_payout,
        min_collateral_for_sender,
        payout_asset,
        payout_amount,
        calls,
    })
}

/// Plans redeems for one manager deployment through one quote venue.
pub struct RedeemPlanner<Q: QuoteAdapter> {
    manager: ManagerClient,
    quoter: Q,
    weth: Address,
}

impl<Q: QuoteAdapter> RedeemPlanner<Q> {
    pub fn new(manager: ManagerClient, quoter: Q, weth: Address) -> Self {
        Self {
            manager,
            quoter,
            weth,
        }
    }

    /// Plan a redeem of `shares`. The payout asset defaults to the token's
    /// collateral asset; `payout_native` appends a WETH unwrap so the
    /// sender receives native currency.
    pub async fn plan(
        &self,
        token: Address,
        shares: U256,
        payout_asset: Option<Address>,
        payout_native: bool,
    ) -> Result<RedeemPlan> {
        ensure!(!shares.is_zero(), "cannot redeem zero shares");

        let collateral_asset = self.manager.collateral_asset(token).await?;
        let debt_asset = self.manager.debt_asset(token).await?;
        let preview = self.manager.preview_redeem(token, shares).await?;
        debug!(
            "redeem preview: {} shares -> {} collateral released, {} debt owed",
            shares, preview.collateral_released, preview.debt_owed
        );

        // Flash-loan repayment must be exact: size the swap from the
        // output side, never from the available collateral.
        let quote = self
            .quoter
            .quote(&QuoteRequest::exact_out(
                collateral_asset,
                debt_asset,
                preview.debt_owed,
            ))
            .await
            .map_err(|e| eyre!("collateral->debt quote failed: {}", e))?;

        assemble_redeem_plan(
            shares,
            &preview,
            collateral_asset,
            payout_asset,
            payout_native,
            self.weth,
            &quote,
        )
    }
}
