//! # cirrus-core — shared building blocks for masternode operator tooling.
//!
//! # Modules
//!
//! - [`constants`] — units and operator defaults
//! - [`amount`] — whole-coin decimal parsing and formatting
//! - [`types`] — spendable outputs, outpoints, change policy
//! - [`timespan`] — node `TimeSpan` strings (`d.hh:mm:ss.fffffff`)
//! - [`config`] — operator configuration loaded once at startup
//! - [`error`] — error enums for the above

pub mod amount;
pub mod config;
pub mod constants;
pub mod error;
pub mod timespan;
pub mod types;

pub use amount::{format_coins, parse_coins};
pub use config::{
    CrossChainConfig, MonitorConfig, NodesConfig, NotifyConfig, OperatorConfig,
    TransactionConfig, WalletCredentials,
};
pub use error::{AmountError, ConfigError, TimeSpanError};
pub use timespan::parse_timespan;
pub use types::{ChangePolicy, NetworkRole, OutPoint, SpendableOutput};
