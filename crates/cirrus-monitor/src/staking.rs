//! Keep staking switched on.

use cirrus_api::{ApiError, NodeApi, StartStakingRequest};
use cirrus_core::WalletCredentials;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakingAction {
    AlreadyEnabled,
    Started,
}

/// Start staking with `wallet` if the node reports it disabled.
pub async fn ensure_staking<A: NodeApi + ?Sized>(
    api: &A,
    wallet: &WalletCredentials,
) -> Result<StakingAction, ApiError> {
    let info = api.staking_info().await?;
    if info.enabled {
        if let Some(errors) = info.errors.as_deref().filter(|e| !e.is_empty()) {
            warn!(errors, "Staking enabled but the node reports errors");
        }
        return Ok(StakingAction::AlreadyEnabled);
    }

    api.start_staking(&StartStakingRequest {
        name: wallet.name.clone(),
        password: wallet.password.clone(),
    })
    .await?;
    info!(wallet = %wallet.name, "Staking started");
    Ok(StakingAction::Started)
}
