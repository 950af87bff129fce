//! Read client for the on-chain leverage manager.
//!
//! The manager tracks, per leverage token, the configured collateral and
//! debt assets, the position state, the target collateral ratio, and the
//! share previews both planners rely on. All methods are read-only
//! `eth_call`s; preview reverts propagate as errors and are never retried.

use alloy_primitives::{Address, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use eyre::{eyre, Result};

sol! {
    interface ILeverageManager {
        function collateralAsset(address token) external view returns (address);
        function debtAsset(address token) external view returns (address);

        /// Position state for a leverage token: raw collateral, collateral
        /// valued in debt units, outstanding debt, and equity.
        function tokenState(address token) external view returns (
            uint256 collateral,
            uint256 collateralInDebt,
            uint256 debt,
            uint256 equity
        );

        /// Target collateral ratio, WAD-scaled (1e18 = 1x).
        function collateralRatio(address token) external view returns (uint256);

        function previewMint(address token, uint256 equityInCollateralAsset)
            external view returns (uint256 shares);

        function previewRedeem(address token, uint256 shares)
            external view returns (uint256 collateral, uint256 debt);
    }
}

/// Position state snapshot read from the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenState {
    pub collateral: U256,
    pub collateral_in_debt: U256,
    pub debt: U256,
    pub equity: U256,
}

/// Redeem preview: what the manager releases and what it is owed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemPreview {
    pub collateral_released: U256,
    pub debt_owed: U256,
}

/// Typed reads against one manager deployment.
#[derive(Debug, Clone)]
pub struct ManagerClient {
    rpc_url: String,
    manager: Address,
}

impl ManagerClient {
    pub fn new(rpc_url: String, manager: Address) -> Self {
        Self { rpc_url, manager }
    }

    async fn call(&self, calldata: Vec<u8>) -> Result<Vec<u8>> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.parse()?);
        let tx = TransactionRequest::default()
            .to(self.manager)
            .input(calldata.into());
        let result = provider
            .call(tx)
            .await
            .map_err(|e| eyre!("manager read failed: {}", e))?;
        Ok(result.to_vec())
    }

    pub async fn collateral_asset(&self, token: Address) -> Result<Address> {
        let output = self
            .call(ILeverageManager::collateralAssetCall { token }.abi_encode())
            .await?;
        ILeverageManager::collateralAssetCall::abi_decode_returns(&output)
            .map_err(|e| eyre!("failed to decode collateral asset: {}", e))
    }

    pub async fn debt_asset(&self, token: Address) -> Result<Address> {
        let output = self
            .call(ILeverageManager::debtAssetCall { token }.abi_encode())
            .await?;
        ILeverageManager::debtAssetCall::abi_decode_returns(&output)
            .map_err(|e| eyre!("failed to decode debt asset: {}", e))
    }

    pub async fn token_state(&self, token: Address) -> Result<TokenState> {
        let output = self
            .call(ILeverageManager::tokenStateCall { token }.abi_encode())
            .await?;
        let decoded = ILeverageManager::tokenStateCall::abi_decode_returns(&output)
            .map_err(|e| eyre!("failed to decode token state: {}", e))?;
        Ok(TokenState {
            collateral: decoded.collateral,
            collateral_in_debt: decoded.collateralInDebt,
            debt: decoded.debt,
            equity: decoded.equity,
        })
    }

    pub async fn collateral_ratio(&self, token: Address) -> Result<U256> {
        let output = self
            .call(ILeverageManager::collateralRatioCall { token }.abi_encode())
            .await?;
        ILeverageManager::collateralRatioCall::abi_decode_returns(&output)
            .map_err(|e| eyre!("failed to decode collateral ratio: {}", e))
    }

    pub async fn preview_mint(&self, token: Address, equity: U256) -> Result<U256> {
        let output = self
            .call(
                ILeverageManager::previewMintCall {
                    token,
                    equityInCollateralAsset: equity,
                }
                .abi_encode(),
            )
            .await?;
        ILeverageManager::previewMintCall::abi_decode_returns(&output)
            .map_err(|e| eyre!("failed to decode mint preview: {}", e))
    }

    pub async fn preview_redeem(&self, token: Address, shares: U256) -> Result<RedeemPreview> {
        let output = self
            .call(ILeverageManager::previewRedeemCall { token, shares }.abi_encode())
            .await?;
        let decoded = ILeverageManager::previewRedeemCall::abi_decode_returns(&output)
            .map_err(|e| eyre!("failed to decode redeem preview: {}", e))?;
        Ok(RedeemPreview {
            collateral_released: decoded.collateral,
            debt_owed: decoded.debt,
        })
    }
}
