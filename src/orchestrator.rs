//! Orchestration layer: bind a plan to a simulate-then-submit transaction
//! against the protocol router.
//!
//! The router entrypoints take the full plan (amounts, bounds, executor,
//! ordered call array), perform the flash loan, and run the calls
//! atomically. This layer simulates the entrypoint via `eth_call`, signs
//! an EIP-1559 transaction with a local key, submits it raw, and returns
//! the hash. No retry happens here; a revert is reported upward as-is and
//! the caller awaits the receipt.

use alloy_consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, Bytes, B256, TxKind, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{sol, SolCall};
use eyre::{eyre, Result};
use tracing::{debug, info};

use crate::planner::{MintPlan, RedeemPlan};
use crate::types::Call;

sol! {
    /// Protocol router executing plans atomically behind a flash loan.
    interface ILeverageRouter {
        struct ExecutorCall {
            address target;
            bytes data;
            uint256 value;
        }

        function deposit(
            address token,
            uint256 equityInInputAsset,
            uint256 flashLoanAmount,
            uint256 minShares,
            address executor,
            ExecutorCall[] calldata calls
        ) external payable;

        function redeem(
            address token,
            uint256 shares,
            uint256 flashLoanAmount,
            uint256 minCollateralForSender,
            address executor,
            ExecutorCall[] calldata calls
        ) external;
    }
}

fn to_executor_calls(calls: &[Call]) -> Vec<ILeverageRouter::ExecutorCall> {
    calls
        .iter()
        .map(|c| ILeverageRouter::ExecutorCall {
            target: c.target,
            data: c.data.clone(),
            value: c.value,
        })
        .collect()
}

/// Simulates and submits plans against one router deployment.
pub struct Orchestrator {
    rpc_url: String,
    chain_id: u64,
    router: Address,
    executor: Address,
    signer: PrivateKeySigner,
}

impl Orchestrator {
    pub fn new(
        rpc_url: String,
        chain_id: u64,
        router: Address,
        executor: Address,
        signer: PrivateKeySigner,
    ) -> Self {
        Self {
            rpc_url,
            chain_id,
            router,
            executor,
            signer,
        }
    }

    pub fn sender(&self) -> Address {
        self.signer.address()
    }

    /// Simulate a mint plan against the router's deposit entrypoint, then
    /// submit it. Returns the transaction hash.
    pub async fn orchestrate_mint(&self, token: Address, plan: &MintPlan) -> Result<B256> {
        let calldata = ILeverageRouter::depositCall {
            token,
            equityInInputAsset: plan.equity_in_input_asset,
            flashLoanAmount: plan.flash_loan_amount,
            minShares: plan.min_shares,
            executor: self.executor,
            calls: to_executor_calls(&plan.calls),
        }
        .abi_encode();

        info!(
            "orchestrating mint: token {:?}, equity {}, flash loan {}, min shares {}",
            token, plan.equity_in_input_asset, plan.flash_loan_amount, plan.min_shares
        );
        self.simulate_then_submit(Bytes::from(calldata)).await
    }

    /// Simulate a redeem plan against the router's redeem entrypoint, then
    /// submit it. Returns the transaction hash.
    pub async fn orchestrate_redeem(&self, token: Address, plan: &RedeemPlan) -> Result<B256> {
        let calldata = ILeverageRouter::redeemCall {
            token,
            shares: plan.shares_to_redeem,
            flashLoanAmount: plan.expected_debt,
            minCollateralForSender: plan.min_collateral_for_sender,
            executor: self.executor,
            calls: to_executor_calls(&plan.calls),
        }
        .abi_encode();

        info!(
            "orchestrating redeem: token {:?}, shares {}, debt {}, min collateral {}",
            token, plan.shares_to_redeem, plan.expected_debt, plan.min_collateral_for_sender
        );
        self.simulate_then_submit(Bytes::from(calldata)).await
    }

    async fn simulate_then_submit(&self, calldata: Bytes) -> Result<B256> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.parse()?);
        let from = self.signer.address();

        let tx = TransactionRequest::default()
            .from(from)
            .to(self.router)
            .input(calldata.clone().into());

        // Simulation failure aborts before anything is signed.
        provider
            .call(tx.clone())
            .await
            .map_err(|e| eyre!("router simulation reverted: {}", e))?;

        let gas_limit = provider
            .estimate_gas(tx)
            .await
            .map_err(|e| eyre!("gas estimation failed: {}", e))?;
        let nonce = provider.get_transaction_count(from).await?;
        let gas_price = provider.get_gas_price().await?;
        debug!(
            "submitting: nonce {}, gas limit {}, gas price {}",
            nonce, gas_limit, gas_price
        );

        let tx = TxEip1559 {
            chain_id: self.chain_id,
            nonce,
            gas_limit,
            max_fee_per_gas: gas_price,
            max_priority_fee_per_gas: gas_price / 10,
            to: TxKind::Call(self.router),
            value: U256::ZERO,
            input: calldata,
            access_list: Default::default(),
        };

        let sig_hash = tx.signature_hash();
        let signature = self
            .signer
            .sign_hash(&sig_hash)
            .await
            .map_err(|e| eyre!("failed to sign transaction: {}", e))?;

        let signed = TxEnvelope::Eip1559(tx.into_signed(signature));
        // eth_sendRawTransaction takes the bare typed payload (first byte
        // 0x02), not the RLP network framing.
        let encoded = signed.encoded_2718();

        let pending = provider
            .send_raw_transaction(&encoded)
            .await
            .map_err(|e| eyre!("transaction submission failed: {}", e))?;

        let hash = *pending.tx_hash();
        info!("submitted: {:?}", hash);
        Ok(hash)
    }
}
