//! Wallet error types.

use cirrus_api::ApiError;
use cirrus_core::{AmountError, format_coins};
use thiserror::Error;

/// Errors from coin selection, transaction building and broadcast.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Declared amount plus fee exceeds the selected input value.
    #[error("insufficient funds: have {}, need {}", format_coins(*have), format_coins(*need))]
    InsufficientFunds {
        /// Selected input value in units.
        have: u64,
        /// Amount plus fee in units.
        need: u64,
    },

    /// Exactly one of change address and destination amount was supplied.
    #[error("change address and destination amount must be given together or not at all")]
    InvalidParameterCombination,

    /// An entered index does not name a listed output.
    #[error("index {index} out of range ({len} outputs listed)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Selection input that is not a comma-separated list of indices.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// A coin set must contain at least one output.
    #[error("no coins selected")]
    NoCoins,

    /// The same outpoint appears twice in one coin set.
    #[error("duplicate outpoint {0}")]
    DuplicateOutpoint(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("no destination address")]
    MissingDestination,

    /// Neither change address nor amount given and no change policy configured.
    #[error("no change address: set one explicitly or configure a change policy")]
    ChangePolicyRequired,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Amount(#[from] AmountError),

    /// Terminal I/O failure during interactive selection.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for WalletError {
    fn from(e: std::io::Error) -> Self {
        WalletError::Io(e.to_string())
    }
}
