//! In-memory [`NodeApi`] for tests.
//!
//! Every endpoint answers from [`FakeState`]; calls that move funds or
//! change peers are recorded so tests can assert on them.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use cirrus_core::SpendableOutput;

use crate::error::ApiError;
use crate::schema::*;
use crate::traits::NodeApi;

/// Canned answers and recorded calls.
#[derive(Debug)]
pub struct FakeState {
    /// When false every endpoint fails with a transport error.
    pub reachable: bool,
    pub status: NodeStatus,
    pub members: Vec<FederationMember>,
    pub gateway: FederationGatewayInfo,
    pub balance: WalletBalance,
    pub outputs: Vec<SpendableOutput>,
    pub staking: StakingInfo,
    pub wallets: WalletList,
    pub accounts: Vec<String>,
    pub peers: Vec<PeerInfo>,
    /// Fail the build call with this zero-based index.
    pub fail_build_at: Option<usize>,
    /// Fail the broadcast call with this zero-based index.
    pub fail_send_at: Option<usize>,
    /// Return an empty hex string from build calls.
    pub empty_hex: bool,

    pub build_requests: Vec<BuildTransactionRequest>,
    pub sent_hex: Vec<String>,
    pub staking_started: Vec<StartStakingRequest>,
    pub add_node_calls: Vec<(String, AddNodeCommand)>,
    /// Endpoint paths in call order.
    pub calls: Vec<&'static str>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            reachable: true,
            status: NodeStatus {
                state: "Started".into(),
                agent: "FakeNode".into(),
                version: "1.0.0".into(),
                network: "CirrusTest".into(),
                consensus_height: Some(1),
                block_store_height: Some(1),
                best_peer_height: Some(1),
                running_time: None,
            },
            members: Vec::new(),
            gateway: FederationGatewayInfo {
                is_active: true,
                is_main_chain: false,
                multi_sig_address: Some("cFederationMultisig".into()),
                federation_node_ip_end_points: Vec::new(),
            },
            balance: WalletBalance {
                balances: Vec::new(),
            },
            outputs: Vec::new(),
            staking: StakingInfo {
                enabled: true,
                staking: true,
                errors: None,
                weight: 0,
                net_stake_weight: 0,
                expected_time: 0,
            },
            wallets: WalletList {
                wallet_names: Vec::new(),
                watch_only_wallets: Vec::new(),
            },
            accounts: Vec::new(),
            peers: Vec::new(),
            fail_build_at: None,
            fail_send_at: None,
            empty_hex: false,
            build_requests: Vec::new(),
            sent_hex: Vec::new(),
            staking_started: Vec::new(),
            add_node_calls: Vec::new(),
            calls: Vec::new(),
        }
    }
}

/// Fake node backed by a mutex-guarded [`FakeState`].
#[derive(Debug, Default)]
pub struct FakeNode {
    state: Mutex<FakeState>,
}

impl FakeNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node that refuses every request.
    pub fn unreachable() -> Self {
        let node = Self::default();
        node.state().reachable = false;
        node
    }

    pub fn with_outputs(outputs: Vec<SpendableOutput>) -> Self {
        let node = Self::default();
        node.state().outputs = outputs;
        node
    }

    /// Lock the state for inspection or mutation.
    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the call and fail if the node is marked unreachable.
    fn enter(&self, path: &'static str) -> Result<MutexGuard<'_, FakeState>, ApiError> {
        let mut state = self.state();
        state.calls.push(path);
        if !state.reachable {
            return Err(ApiError::Transport {
                endpoint: path.to_string(),
                reason: "connection refused".into(),
            });
        }
        Ok(state)
    }
}

/// Federation member with the given inactivity.
pub fn member(pubkey: &str, inactive_for: Duration) -> FederationMember {
    FederationMember {
        pubkey: pubkey.to_string(),
        period_of_inactivity: inactive_for,
        last_active_time: None,
    }
}

/// Spendable output with a unique id derived from `n`.
pub fn output(n: usize, amount: u64, confirmations: u64) -> SpendableOutput {
    SpendableOutput {
        id: format!("{n:064x}"),
        index: (n % 4) as u32,
        address: format!("CAddr{n}"),
        amount,
        creation_time: 1_700_000_000 + n as i64,
        confirmations,
    }
}

fn rejected(path: &str) -> ApiError {
    ApiError::Status {
        endpoint: path.to_string(),
        status: 400,
        body: "rejected by fake node".into(),
    }
}

#[async_trait]
impl NodeApi for FakeNode {
    async fn federation_members(&self) -> Result<Vec<FederationMember>, ApiError> {
        Ok(self.enter(paths::FEDERATION_MEMBERS)?.members.clone())
    }

    async fn node_status(&self) -> Result<NodeStatus, ApiError> {
        Ok(self.enter(paths::NODE_STATUS)?.status.clone())
    }

    async fn federation_gateway_info(&self) -> Result<FederationGatewayInfo, ApiError> {
        Ok(self.enter(paths::FEDERATION_GATEWAY_INFO)?.gateway.clone())
    }

    async fn wallet_balance(&self, _wallet_name: &str) -> Result<WalletBalance, ApiError> {
        Ok(self.enter(paths::WALLET_BALANCE)?.balance.clone())
    }

    async fn spendable_outputs(
        &self,
        _wallet_name: &str,
        _account_name: &str,
    ) -> Result<Vec<SpendableOutput>, ApiError> {
        Ok(self.enter(paths::SPENDABLE_TRANSACTIONS)?.outputs.clone())
    }

    async fn build_transaction(
        &self,
        request: &BuildTransactionRequest,
    ) -> Result<BuiltTransaction, ApiError> {
        let mut state = self.enter(paths::BUILD_TRANSACTION)?;
        let n = state.build_requests.len();
        state.build_requests.push(request.clone());
        if state.fail_build_at == Some(n) {
            return Err(rejected(paths::BUILD_TRANSACTION));
        }
        let hex = if state.empty_hex {
            String::new()
        } else {
            format!("{n:02x}{}", request.outpoints.len())
        };
        Ok(BuiltTransaction {
            hex,
            transaction_id: Some(format!("tx{n}")),
            fee: cirrus_core::parse_coins(&request.fee_amount).ok(),
            outputs: Vec::new(),
        })
    }

    async fn send_transaction(
        &self,
        request: &SendTransactionRequest,
    ) -> Result<SendTransactionResponse, ApiError> {
        let mut state = self.enter(paths::SEND_TRANSACTION)?;
        let n = state.sent_hex.len();
        if state.fail_send_at == Some(n) {
            return Err(rejected(paths::SEND_TRANSACTION));
        }
        state.sent_hex.push(request.hex.clone());
        Ok(SendTransactionResponse {
            transaction_id: format!("tx{n}"),
            outputs: Vec::new(),
        })
    }

    async fn start_staking(&self, request: &StartStakingRequest) -> Result<(), ApiError> {
        let mut state = self.enter(paths::START_STAKING)?;
        state.staking_started.push(request.clone());
        state.staking.enabled = true;
        Ok(())
    }

    async fn staking_info(&self) -> Result<StakingInfo, ApiError> {
        Ok(self.enter(paths::STAKING_INFO)?.staking.clone())
    }

    async fn list_wallets(&self) -> Result<WalletList, ApiError> {
        Ok(self.enter(paths::LIST_WALLETS)?.wallets.clone())
    }

    async fn accounts(&self, _wallet_name: &str) -> Result<Vec<String>, ApiError> {
        Ok(self.enter(paths::ACCOUNTS)?.accounts.clone())
    }

    async fn peer_info(&self) -> Result<Vec<PeerInfo>, ApiError> {
        Ok(self.enter(paths::PEER_INFO)?.peers.clone())
    }

    async fn add_node(&self, endpoint: &str, command: AddNodeCommand) -> Result<bool, ApiError> {
        let mut state = self.enter(paths::ADD_NODE)?;
        state.add_node_calls.push((endpoint.to_string(), command));
        match command {
            AddNodeCommand::Remove => state.peers.retain(|p| p.addr != endpoint),
            AddNodeCommand::Add | AddNodeCommand::OneTry => {
                if !state.peers.iter().any(|p| p.addr == endpoint) {
                    let id = state.peers.len() as i64;
                    state.peers.push(PeerInfo {
                        id,
                        addr: endpoint.to_string(),
                        inbound: false,
                        subver: String::new(),
                        startingheight: 0,
                    });
                }
            }
        }
        Ok(true)
    }
}
