//! Request and response schemas for the node REST endpoints.
//!
//! Responses are validated on deserialization: required fields must be
//! present with the right type, unknown fields are ignored. Requests that
//! carry the wallet password redact it from `Debug` output.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use cirrus_core::timespan::deserialize_timespan;
use cirrus_core::{OutPoint, SpendableOutput};

/// Endpoint paths, relative to the node's API base URL.
pub mod paths {
    pub const FEDERATION_MEMBERS: &str = "api/DefaultVoting/fedmembers";
    pub const NODE_STATUS: &str = "api/node/status";
    pub const FEDERATION_GATEWAY_INFO: &str = "api/FederationGateway/info";
    pub const WALLET_BALANCE: &str = "api/Wallet/balance";
    pub const SPENDABLE_TRANSACTIONS: &str = "api/Wallet/spendable-transactions";
    pub const BUILD_TRANSACTION: &str = "api/Wallet/build-transaction";
    pub const SEND_TRANSACTION: &str = "api/Wallet/send-transaction";
    pub const START_STAKING: &str = "api/Staking/startStaking";
    pub const STAKING_INFO: &str = "api/Staking/getstakinginfo";
    pub const LIST_WALLETS: &str = "api/Wallet/list-wallets";
    pub const ACCOUNTS: &str = "api/Wallet/accounts";
    pub const PEER_INFO: &str = "ConnectionManager/getpeerinfo";
    pub const ADD_NODE: &str = "ConnectionManager/addnode";
}

// ---------------------------------------------------------------------------
// Federation and node health
// ---------------------------------------------------------------------------

/// One federation member as listed by the voting endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationMember {
    /// Hex-encoded mining public key.
    pub pubkey: String,
    /// Time since the member last produced a block.
    #[serde(deserialize_with = "deserialize_timespan")]
    pub period_of_inactivity: Duration,
    #[serde(default)]
    pub last_active_time: Option<String>,
}

/// `api/node/status` response (subset).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    /// Full-node lifecycle state, `"Started"` once running.
    pub state: String,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub consensus_height: Option<u64>,
    #[serde(default)]
    pub block_store_height: Option<u64>,
    #[serde(default)]
    pub best_peer_height: Option<u64>,
    #[serde(default)]
    pub running_time: Option<String>,
}

impl NodeStatus {
    pub fn is_started(&self) -> bool {
        self.state.eq_ignore_ascii_case("started")
    }
}

/// `api/FederationGateway/info` response (subset).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationGatewayInfo {
    pub is_active: bool,
    #[serde(default)]
    pub is_main_chain: bool,
    /// Federation deposit address on this chain.
    #[serde(default)]
    pub multi_sig_address: Option<String>,
    #[serde(default)]
    pub federation_node_ip_end_points: Vec<String>,
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// `api/Wallet/balance` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    pub balances: Vec<AccountBalance>,
}

impl WalletBalance {
    /// Confirmed balance across all accounts, in units.
    pub fn total_confirmed(&self) -> u64 {
        self.balances
            .iter()
            .map(|b| b.amount_confirmed)
            .fold(0u64, u64::saturating_add)
    }

    /// Spendable balance across all accounts, in units.
    pub fn total_spendable(&self) -> u64 {
        self.balances
            .iter()
            .map(|b| b.spendable_amount)
            .fold(0u64, u64::saturating_add)
    }
}

/// Balance of one wallet account, in units.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub account_name: String,
    pub amount_confirmed: u64,
    /// Negative while an outgoing spend is unconfirmed.
    #[serde(default)]
    pub amount_unconfirmed: i64,
    #[serde(default)]
    pub spendable_amount: u64,
}

/// `api/Wallet/spendable-transactions` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendableTransactions {
    pub transactions: Vec<SpendableOutput>,
}

/// `api/Wallet/list-wallets` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletList {
    pub wallet_names: Vec<String>,
    #[serde(default)]
    pub watch_only_wallets: Vec<String>,
}

// ---------------------------------------------------------------------------
// Transaction build / broadcast
// ---------------------------------------------------------------------------

/// One payment in a build request. `amount` is a whole-coin decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub destination_address: String,
    pub amount: String,
}

/// Body of `api/Wallet/build-transaction`.
///
/// Change is not listed explicitly: the node pays
/// `inputs - recipients - fee` to `change_address`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTransactionRequest {
    /// Fee as a whole-coin decimal string.
    pub fee_amount: String,
    pub password: String,
    pub wallet_name: String,
    pub account_name: String,
    pub outpoints: Vec<OutPoint>,
    pub recipients: Vec<Recipient>,
    pub change_address: String,
    /// Auxiliary payload, used to name the mainchain address on cross-chain transfers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op_return_data: Option<String>,
}

impl fmt::Debug for BuildTransactionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildTransactionRequest")
            .field("fee_amount", &self.fee_amount)
            .field("password", &"<redacted>")
            .field("wallet_name", &self.wallet_name)
            .field("account_name", &self.account_name)
            .field("outpoints", &self.outpoints.len())
            .field("recipients", &self.recipients)
            .field("change_address", &self.change_address)
            .field("op_return_data", &self.op_return_data)
            .finish()
    }
}

/// An output echoed back by build or broadcast. `amount` is in units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutput {
    #[serde(default)]
    pub address: Option<String>,
    pub amount: u64,
    #[serde(default)]
    pub op_return_data: Option<String>,
}

/// Response of `api/Wallet/build-transaction`: the signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltTransaction {
    pub hex: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// Fee actually charged, in units.
    #[serde(default)]
    pub fee: Option<u64>,
    #[serde(default)]
    pub outputs: Vec<TransactionOutput>,
}

/// Body of `api/Wallet/send-transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendTransactionRequest {
    pub hex: String,
}

/// Response of `api/Wallet/send-transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionResponse {
    pub transaction_id: String,
    #[serde(default)]
    pub outputs: Vec<TransactionOutput>,
}

// ---------------------------------------------------------------------------
// Staking
// ---------------------------------------------------------------------------

/// Body of `api/Staking/startStaking`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct StartStakingRequest {
    pub name: String,
    pub password: String,
}

impl fmt::Debug for StartStakingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartStakingRequest")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `api/Staking/getstakinginfo` response (subset).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingInfo {
    pub enabled: bool,
    pub staking: bool,
    #[serde(default)]
    pub errors: Option<String>,
    #[serde(default)]
    pub weight: u64,
    #[serde(default)]
    pub net_stake_weight: u64,
    /// Expected seconds until the next stake.
    #[serde(default)]
    pub expected_time: u64,
}

// ---------------------------------------------------------------------------
// Peers
// ---------------------------------------------------------------------------

/// One connected peer from `getpeerinfo`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PeerInfo {
    #[serde(default)]
    pub id: i64,
    /// Remote endpoint, `ip:port`.
    pub addr: String,
    #[serde(default)]
    pub inbound: bool,
    #[serde(default)]
    pub subver: String,
    #[serde(default)]
    pub startingheight: i64,
}

/// `command` argument of `addnode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddNodeCommand {
    Add,
    Remove,
    OneTry,
}

impl AddNodeCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::OneTry => "onetry",
        }
    }
}

impl fmt::Display for AddNodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn federation_member_parses_inactivity() {
        let members: Vec<FederationMember> = serde_json::from_value(json!([
            {"pubkey": "02aa", "collateralAmount": 50000, "lastActiveTime": "2024-01-01T00:00:00", "periodOfInactivity": "02:15:00"},
            {"pubkey": "03bb", "periodOfInactivity": "00:00:16"}
        ]))
        .unwrap();
        assert_eq!(members[0].period_of_inactivity, Duration::from_secs(8100));
        assert_eq!(members[1].last_active_time, None);
    }

    #[test]
    fn federation_member_requires_inactivity() {
        let res = serde_json::from_value::<FederationMember>(json!({"pubkey": "02aa"}));
        assert!(res.is_err());
    }

    #[test]
    fn node_status_state() {
        let status: NodeStatus = serde_json::from_value(json!({
            "agent": "StratisNode", "version": "1.5.0", "network": "CirrusMain",
            "state": "Started", "consensusHeight": 100, "inboundPeers": []
        }))
        .unwrap();
        assert!(status.is_started());
        assert_eq!(status.consensus_height, Some(100));
        assert!(serde_json::from_value::<NodeStatus>(json!({"agent": "x"})).is_err());
    }

    #[test]
    fn gateway_info_multisig() {
        let info: FederationGatewayInfo = serde_json::from_value(json!({
            "isActive": true, "isMainChain": false, "multiSigAddress": "cFedAddr",
            "federationNodeIpEndPoints": ["1.1.1.1:16179"]
        }))
        .unwrap();
        assert!(info.is_active);
        assert_eq!(info.multi_sig_address.as_deref(), Some("cFedAddr"));
    }

    #[test]
    fn wallet_balance_totals() {
        let balance: WalletBalance = serde_json::from_value(json!({"balances": [
            {"accountName": "account 0", "amountConfirmed": 500, "amountUnconfirmed": -20, "spendableAmount": 480},
            {"accountName": "account 1", "amountConfirmed": 100, "amountUnconfirmed": 0, "spendableAmount": 100}
        ]}))
        .unwrap();
        assert_eq!(balance.total_confirmed(), 600);
        assert_eq!(balance.total_spendable(), 580);
        assert_eq!(balance.balances[0].amount_unconfirmed, -20);
    }

    #[test]
    fn spendable_transactions_reject_zero_amount() {
        let res = serde_json::from_value::<SpendableTransactions>(json!({"transactions": [
            {"id": "aa", "index": 0, "address": "A", "amount": 0, "creationTime": 1, "confirmations": 5}
        ]}));
        assert!(res.is_err());
    }

    #[test]
    fn build_request_wire_format() {
        let req = BuildTransactionRequest {
            fee_amount: "0.01000000".into(),
            password: "secret".into(),
            wallet_name: "mn".into(),
            account_name: "account 0".into(),
            outpoints: vec![OutPoint {
                transaction_id: "aa".into(),
                index: 1,
            }],
            recipients: vec![Recipient {
                destination_address: "Dest".into(),
                amount: "9.99000000".into(),
            }],
            change_address: "Change".into(),
            op_return_data: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "feeAmount": "0.01000000",
                "password": "secret",
                "walletName": "mn",
                "accountName": "account 0",
                "outpoints": [{"transactionId": "aa", "index": 1}],
                "recipients": [{"destinationAddress": "Dest", "amount": "9.99000000"}],
                "changeAddress": "Change"
            })
        );
        assert!(!format!("{req:?}").contains("secret"));
    }

    #[test]
    fn build_request_includes_op_return_when_set() {
        let req = BuildTransactionRequest {
            fee_amount: "0.01000000".into(),
            password: String::new(),
            wallet_name: "mn".into(),
            account_name: "account 0".into(),
            outpoints: vec![],
            recipients: vec![],
            change_address: "Change".into(),
            op_return_data: Some("XMainAddr".into()),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["opReturnData"], "XMainAddr");
    }

    #[test]
    fn built_transaction_defaults() {
        let built: BuiltTransaction = serde_json::from_value(json!({"hex": "0100"})).unwrap();
        assert_eq!(built.hex, "0100");
        assert!(built.outputs.is_empty());
        assert!(serde_json::from_value::<BuiltTransaction>(json!({"fee": 1})).is_err());
    }

    #[test]
    fn staking_request_redacts_password() {
        let req = StartStakingRequest {
            name: "mn".into(),
            password: "secret".into(),
        };
        assert!(!format!("{req:?}").contains("secret"));
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"name": "mn", "password": "secret"})
        );
    }

    #[test]
    fn add_node_command_strings() {
        assert_eq!(AddNodeCommand::Add.as_str(), "add");
        assert_eq!(AddNodeCommand::Remove.to_string(), "remove");
        assert_eq!(AddNodeCommand::OneTry.as_str(), "onetry");
    }
}
