//! The node API seam.
//!
//! Wallet and monitor code talk to the node only through [`NodeApi`], so
//! tests can swap in an in-memory fake and the binaries plug in
//! [`crate::NodeClient`].

use async_trait::async_trait;

use cirrus_core::SpendableOutput;

use crate::error::ApiError;
use crate::schema::*;

/// Operations on one node's REST surface. Every call blocks the caller
/// until the node answers or the transport fails; nothing is retried.
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Federation members with their inactivity periods.
    async fn federation_members(&self) -> Result<Vec<FederationMember>, ApiError>;

    async fn node_status(&self) -> Result<NodeStatus, ApiError>;

    async fn federation_gateway_info(&self) -> Result<FederationGatewayInfo, ApiError>;

    async fn wallet_balance(&self, wallet_name: &str) -> Result<WalletBalance, ApiError>;

    /// Unspent outputs of one wallet account.
    async fn spendable_outputs(
        &self,
        wallet_name: &str,
        account_name: &str,
    ) -> Result<Vec<SpendableOutput>, ApiError>;

    /// Build and sign a transaction without broadcasting it.
    async fn build_transaction(
        &self,
        request: &BuildTransactionRequest,
    ) -> Result<BuiltTransaction, ApiError>;

    /// Broadcast a signed transaction.
    async fn send_transaction(
        &self,
        request: &SendTransactionRequest,
    ) -> Result<SendTransactionResponse, ApiError>;

    async fn start_staking(&self, request: &StartStakingRequest) -> Result<(), ApiError>;

    async fn staking_info(&self) -> Result<StakingInfo, ApiError>;

    async fn list_wallets(&self) -> Result<WalletList, ApiError>;

    async fn accounts(&self, wallet_name: &str) -> Result<Vec<String>, ApiError>;

    async fn peer_info(&self) -> Result<Vec<PeerInfo>, ApiError>;

    /// Add, remove or try a peer endpoint (`ip:port`).
    async fn add_node(&self, endpoint: &str, command: AddNodeCommand) -> Result<bool, ApiError>;
}
