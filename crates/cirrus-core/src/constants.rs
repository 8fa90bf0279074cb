//! Operator constants. All monetary values in units (1 coin = 10^8 units).

use std::time::Duration;

pub const COIN: u64 = 100_000_000;

/// Number of fractional digits in a whole-coin decimal string.
pub const COIN_DECIMALS: usize = 8;

/// Default REST endpoint of the mainchain (primary) node.
pub const DEFAULT_PRIMARY_API: &str = "http://127.0.0.1:37221";

/// Default REST endpoint of the sidechain (secondary) node.
pub const DEFAULT_SECONDARY_API: &str = "http://127.0.0.1:37223";

pub const DEFAULT_ACCOUNT_NAME: &str = "account 0";

/// Default transaction fee in whole coins.
pub const DEFAULT_FEE: &str = "0.01";

/// Outputs need strictly more confirmations than this to be spent.
pub const DEFAULT_MIN_CONFIRMATIONS: u64 = 10;

/// Outputs per consolidation transaction.
pub const DEFAULT_BATCH_SIZE: usize = 950;

pub const DEFAULT_MINUTE_UPDATE_INTERVAL: u64 = 5;

pub const DEFAULT_HOURS_BETWEEN_UPDATES: u64 = 6;

/// Inactivity at or beyond this period raises a notification.
pub const DEFAULT_INACTIVITY_THRESHOLD: Duration = Duration::from_secs(60 * 60);
