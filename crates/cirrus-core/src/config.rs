//! Operator configuration.
//!
//! Loaded once at process start from a TOML file layered with
//! `CIRRUS__SECTION__KEY` environment variables, validated, then passed by
//! reference into every component. Nothing rewrites it at runtime.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::amount::parse_coins;
use crate::constants::*;
use crate::error::ConfigError;
use crate::types::ChangePolicy;

/// Top-level operator record.
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorConfig {
    #[serde(default)]
    pub nodes: NodesConfig,
    pub wallet: WalletCredentials,
    #[serde(default)]
    pub transaction: TransactionConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// REST endpoints of the two nodes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodesConfig {
    /// Mainchain node API base URL.
    pub primary: String,
    /// Sidechain node API base URL.
    pub secondary: String,
    /// Per-request timeout. Unset means the HTTP client's default.
    pub timeout_secs: Option<u64>,
}

impl Default for NodesConfig {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY_API.to_string(),
            secondary: DEFAULT_SECONDARY_API.to_string(),
            timeout_secs: None,
        }
    }
}

/// Wallet identity used for balance queries and transaction builds.
///
/// The password is wiped on drop and never printed.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct WalletCredentials {
    pub name: String,
    #[serde(default = "default_account")]
    pub account: String,
    /// Empty means "prompt at startup".
    #[serde(default)]
    pub password: String,
}

fn default_account() -> String {
    DEFAULT_ACCOUNT_NAME.to_string()
}

impl WalletCredentials {
    pub fn new(name: impl Into<String>, account: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            account: account.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for WalletCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletCredentials")
            .field("name", &self.name)
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Fee and coin-selection policy for send and consolidation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Fee per transaction in whole coins.
    pub fee: String,
    /// Outputs need strictly more confirmations than this.
    pub min_confirmations: u64,
    /// Outputs per consolidation transaction.
    pub batch_size: usize,
    /// Change destination when neither change address nor amount is given.
    pub change_policy: Option<ChangePolicy>,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            fee: DEFAULT_FEE.to_string(),
            min_confirmations: DEFAULT_MIN_CONFIRMATIONS,
            batch_size: DEFAULT_BATCH_SIZE,
            change_policy: None,
        }
    }
}

impl TransactionConfig {
    /// Fee in units.
    pub fn fee_units(&self) -> Result<u64, ConfigError> {
        Ok(parse_coins(&self.fee)?)
    }
}

/// Watchdog schedule and checks.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Minutes between polls.
    pub minute_update_interval: u64,
    /// Hours between status reports.
    pub hours_between_updates: u64,
    /// Inactivity at or beyond this many minutes is reported.
    pub inactivity_threshold_mins: u64,
    /// Federation member key to watch for inactivity.
    pub public_key: Option<String>,
    /// Sweep the sidechain wallet to the mainchain on each report.
    pub cross_chain: Option<CrossChainConfig>,
    /// Peer endpoints to re-add whenever they drop out of the peer list.
    pub reconnect_peers: Vec<String>,
    /// Start staking on the sidechain node whenever it is disabled.
    pub ensure_staking: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            minute_update_interval: DEFAULT_MINUTE_UPDATE_INTERVAL,
            hours_between_updates: DEFAULT_HOURS_BETWEEN_UPDATES,
            inactivity_threshold_mins: DEFAULT_INACTIVITY_THRESHOLD.as_secs() / 60,
            public_key: None,
            cross_chain: None,
            reconnect_peers: Vec::new(),
            ensure_staking: false,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.minute_update_interval * 60)
    }

    /// Elapsed minutes at which the loop enters its reporting step.
    pub fn report_after_minutes(&self) -> u64 {
        self.hours_between_updates * 60
    }

    pub fn inactivity_threshold(&self) -> Duration {
        Duration::from_secs(self.inactivity_threshold_mins * 60)
    }
}

/// Cross-chain sweep settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CrossChainConfig {
    /// Mainchain address credited by the federation (sent as OP_RETURN data).
    pub mainchain_address: String,
    /// Federation multisig address; looked up from the gateway when unset.
    #[serde(default)]
    pub multisig_address: Option<String>,
}

/// Notification sinks.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub discord_webhook_url: Option<String>,
    /// Display name for webhook posts.
    pub username: Option<String>,
    /// Image attached to report embeds.
    pub image_url: Option<String>,
    /// Also write every notification to the log.
    pub log: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            discord_webhook_url: None,
            username: None,
            image_url: None,
            log: true,
        }
    }
}

impl OperatorConfig {
    /// Default location: `<config dir>/cirrus/operator.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cirrus")
            .join("operator.toml")
    }

    /// Load from `path`, apply environment overrides, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix("CIRRUS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        Self::from_settings(settings)
    }

    /// Parse and validate a TOML document without touching the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        Self::from_settings(settings)
    }

    fn from_settings(settings: config::Config) -> Result<Self, ConfigError> {
        let cfg: Self = settings
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the tools cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wallet.name.trim().is_empty() {
            return Err(ConfigError::Invalid("wallet.name must not be empty".into()));
        }
        self.transaction.fee_units()?;
        if self.transaction.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "transaction.batch_size must be at least 1".into(),
            ));
        }

        let m = &self.monitor;
        if m.minute_update_interval == 0 {
            return Err(ConfigError::Invalid(
                "monitor.minute_update_interval must be at least 1".into(),
            ));
        }
        if m.hours_between_updates == 0 {
            return Err(ConfigError::Invalid(
                "monitor.hours_between_updates must be at least 1".into(),
            ));
        }
        // The reporting step fires on equality, so the poll interval must divide it.
        if m.report_after_minutes() % m.minute_update_interval != 0 {
            return Err(ConfigError::Invalid(format!(
                "monitor.hours_between_updates ({} min) is not a multiple of \
                 monitor.minute_update_interval ({} min)",
                m.report_after_minutes(),
                m.minute_update_interval
            )));
        }
        if let Some(cc) = &m.cross_chain {
            if cc.mainchain_address.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "monitor.cross_chain.mainchain_address must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}
