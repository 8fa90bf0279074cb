//! # cirrus-monitor — masternode watchdog.
//!
//! Polls a mainchain/sidechain node pair on a fixed interval, alerts on
//! downtime and federation inactivity, and on a slower schedule sends a
//! status report and sweeps the sidechain wallet to the mainchain.
//!
//! # Modules
//!
//! - [`monitor`] — the polling loop and its per-cycle policies
//! - [`ticker`] — tick source (real sleep or injected)
//! - [`notify`] — notification sinks (Discord webhook, log) and fan-out
//! - [`peers`] — re-adding dropped peers
//! - [`staking`] — restarting staking

pub mod monitor;
pub mod notify;
pub mod peers;
pub mod staking;
pub mod ticker;

pub use monitor::{CycleOutcome, Health, Monitor};
pub use notify::{
    DiscordWebhook, Embed, LogSink, Notification, NotificationSink, Notifier, NotifyError,
};
pub use peers::{ReconnectReport, normalize_endpoint, reconnect_peers};
pub use staking::{StakingAction, ensure_staking};
pub use ticker::{IntervalTicker, Ticker};
