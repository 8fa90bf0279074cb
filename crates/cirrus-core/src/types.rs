//! Data model shared by the API client, coin selector and transaction builder.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::format_coins;

/// Reference to one output of a transaction, as the build request expects it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutPoint {
    pub transaction_id: String,
    pub index: u32,
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.transaction_id, self.index)
    }
}

/// One unspent output reported by the node's spendable-transactions endpoint.
///
/// A fetched set is a snapshot: it is only valid for the build attempt it
/// was fetched for. Zero-amount outputs are rejected while deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SpendableOutputJson")]
pub struct SpendableOutput {
    /// Owning transaction id.
    pub id: String,
    /// Position of the output within its transaction.
    pub index: u32,
    /// Owning address.
    pub address: String,
    /// Value in units (1 coin = 10^8 units).
    pub amount: u64,
    /// Creation time, seconds since the Unix epoch.
    pub creation_time: i64,
    pub confirmations: u64,
}

impl SpendableOutput {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            transaction_id: self.id.clone(),
            index: self.index,
        }
    }

    /// Creation time as a UTC timestamp, `None` if out of chrono's range.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.creation_time, 0)
    }

    /// Amount as a whole-coin decimal string.
    pub fn amount_coins(&self) -> String {
        format_coins(self.amount)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpendableOutputJson {
    id: String,
    index: u32,
    address: String,
    amount: u64,
    creation_time: i64,
    #[serde(default)]
    confirmations: u64,
}

impl TryFrom<SpendableOutputJson> for SpendableOutput {
    type Error = String;

    fn try_from(raw: SpendableOutputJson) -> Result<Self, Self::Error> {
        if raw.amount == 0 {
            return Err(format!(
                "spendable output {}:{} has zero amount",
                raw.id, raw.index
            ));
        }
        Ok(SpendableOutput {
            id: raw.id,
            index: raw.index,
            address: raw.address,
            amount: raw.amount,
            creation_time: raw.creation_time,
            confirmations: raw.confirmations,
        })
    }
}

/// Where leftover value goes when the caller supplies neither a change
/// address nor a destination amount.
///
/// Older tooling disagreed on this, so there is no default: the operator
/// has to pick one in the configuration or on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangePolicy {
    /// Change returns to the address of the first selected output.
    FirstCoinAddress,
    /// Change goes to the transaction's destination address.
    Destination,
}

impl FromStr for ChangePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first-coin-address" => Ok(Self::FirstCoinAddress),
            "destination" => Ok(Self::Destination),
            other => Err(format!(
                "unknown change policy '{other}' (expected 'first-coin-address' or 'destination')"
            )),
        }
    }
}

impl fmt::Display for ChangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstCoinAddress => f.write_str("first-coin-address"),
            Self::Destination => f.write_str("destination"),
        }
    }
}

/// Which of the two monitored nodes a check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkRole {
    /// Mainchain node.
    Primary,
    /// Sidechain node; hosts the federation and the operator wallet.
    Secondary,
}

impl fmt::Display for NetworkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("mainchain"),
            Self::Secondary => f.write_str("sidechain"),
        }
    }
}
