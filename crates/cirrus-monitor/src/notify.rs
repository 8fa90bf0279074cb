//! Notification sinks.
//!
//! The monitor hands every [`Notification`] to a [`Notifier`], which fans it
//! out to each configured [`NotificationSink`]. Delivery is fire-and-forget:
//! a failing sink is logged and never stops the loop.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use cirrus_core::{NetworkRole, NotifyConfig, format_coins};

/// Embed colours.
const RED: u32 = 0xE7_4C_3C;
const ORANGE: u32 = 0xE6_7E_22;
const GREEN: u32 = 0x2E_CC_71;
const BLUE: u32 = 0x34_98_DB;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("invalid webhook URL: {0}")]
    InvalidUrl(String),
    #[error("webhook request failed: {0}")]
    Transport(String),
    #[error("webhook returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Something the operator should hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A node did not answer its status check.
    NodeDown { role: NetworkRole, reason: String },
    /// The watched federation member has not produced a block for a while.
    Inactive {
        pubkey: String,
        inactive_for: Duration,
    },
    /// Scheduled status report.
    Report {
        uptime_minutes: u64,
        /// Confirmed sidechain wallet balance in units.
        balance: Option<u64>,
        gateway_active: Option<bool>,
    },
    /// Cross-chain sweep went out.
    TransferSent {
        batches: usize,
        amount: u64,
        transaction_ids: Vec<String>,
        dropped: usize,
    },
    /// Cross-chain sweep failed, possibly after some batches went out.
    TransferFailed { reason: String, batches_sent: usize },
}

impl Notification {
    pub fn title(&self) -> String {
        match self {
            Self::NodeDown { role, .. } => format!("{role} node is down"),
            Self::Inactive { .. } => "Federation member inactive".into(),
            Self::Report { .. } => "Masternode status report".into(),
            Self::TransferSent { .. } => "Cross-chain transfer sent".into(),
            Self::TransferFailed { .. } => "Cross-chain transfer failed".into(),
        }
    }

    /// Alerts need attention; reports and successful transfers do not.
    pub fn is_alert(&self) -> bool {
        matches!(
            self,
            Self::NodeDown { .. } | Self::Inactive { .. } | Self::TransferFailed { .. }
        )
    }

    /// Webhook embed. `image_url` is attached to reports only.
    pub fn embed(&self, image_url: Option<&str>) -> Embed {
        let mut embed = Embed {
            color: BLUE,
            title: self.title(),
            description: String::new(),
            fields: Vec::new(),
            image: None,
        };
        match self {
            Self::NodeDown { role, reason } => {
                embed.color = RED;
                embed.description = format!("The {role} node did not respond to its status check.");
                embed.field("Error", reason.clone(), false);
            }
            Self::Inactive {
                pubkey,
                inactive_for,
            } => {
                embed.color = ORANGE;
                embed.description = "The monitored federation member is not producing blocks.".into();
                embed.field("Public key", pubkey.clone(), false);
                embed.field("Inactive for", humanize(*inactive_for), true);
            }
            Self::Report {
                uptime_minutes,
                balance,
                gateway_active,
            } => {
                embed.description = "Both nodes are responding.".into();
                embed.field("Monitored for", humanize(Duration::from_secs(uptime_minutes * 60)), true);
                embed.field(
                    "Balance",
                    match balance {
                        Some(units) => format_coins(*units),
                        None => "unavailable".into(),
                    },
                    true,
                );
                embed.field(
                    "Federation gateway",
                    match gateway_active {
                        Some(true) => "active",
                        Some(false) => "inactive",
                        None => "unavailable",
                    }
                    .into(),
                    true,
                );
                embed.image = image_url.map(|url| EmbedImage { url: url.to_string() });
            }
            Self::TransferSent {
                batches,
                amount,
                transaction_ids,
                dropped,
            } => {
                embed.color = GREEN;
                embed.description = format!("{} sent in {batches} transaction(s).", format_coins(*amount));
                if !transaction_ids.is_empty() {
                    embed.field("Transactions", transaction_ids.join("\n"), false);
                }
                if *dropped > 0 {
                    embed.field("Outputs left unconsolidated", dropped.to_string(), true);
                }
            }
            Self::TransferFailed {
                reason,
                batches_sent,
            } => {
                embed.color = RED;
                embed.description = format!("Stopped after {batches_sent} transaction(s).");
                embed.field("Error", reason.clone(), false);
            }
        }
        embed
    }
}

/// `3h 15m` style duration.
fn humanize(d: Duration) -> String {
    let mins = d.as_secs() / 60;
    let (days, hours, mins) = (mins / 1440, (mins / 60) % 24, mins % 60);
    let mut out = String::new();
    if days > 0 {
        let _ = write!(out, "{days}d ");
    }
    if days > 0 || hours > 0 {
        let _ = write!(out, "{hours}h ");
    }
    let _ = write!(out, "{mins}m");
    out
}

/// Discord-compatible embed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub color: u32,
    pub title: String,
    pub description: String,
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

impl Embed {
    fn field(&mut self, name: &str, value: String, inline: bool) {
        self.fields.push(EmbedField {
            name: name.to_string(),
            value,
            inline,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

/// Delivers notifications somewhere.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Short name for log lines.
    fn name(&self) -> &str;

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    embeds: [Embed; 1],
}

/// Posts embeds to a Discord webhook.
#[derive(Debug, Clone)]
pub struct DiscordWebhook {
    client: Client,
    url: Url,
    username: Option<String>,
    image_url: Option<String>,
}

impl DiscordWebhook {
    pub fn new(
        url: &str,
        username: Option<String>,
        image_url: Option<String>,
    ) -> Result<Self, NotifyError> {
        let url = Url::parse(url).map_err(|e| NotifyError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NotifyError::InvalidUrl(format!("unsupported scheme '{}'", url.scheme())));
        }
        Ok(Self {
            client: Client::new(),
            url,
            username,
            image_url,
        })
    }
}

#[async_trait]
impl NotificationSink for DiscordWebhook {
    fn name(&self) -> &str {
        "discord"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            username: self.username.as_deref(),
            embeds: [notification.embed(self.image_url.as_deref())],
        };
        let resp = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        let embed = notification.embed(None);
        let fields: Vec<String> = embed
            .fields
            .iter()
            .map(|f| format!("{}={}", f.name, f.value.replace('\n', ",")))
            .collect();
        if notification.is_alert() {
            warn!(title = %embed.title, fields = %fields.join("; "), "{}", embed.description);
        } else {
            info!(title = %embed.title, fields = %fields.join("; "), "{}", embed.description);
        }
        Ok(())
    }
}

/// Fans notifications out to every sink.
#[derive(Default)]
pub struct Notifier {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sinks named by the `[notify]` section.
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let mut notifier = Self::new();
        if config.log {
            notifier.add(LogSink);
        }
        if let Some(url) = config.discord_webhook_url.as_deref().filter(|u| !u.is_empty()) {
            notifier.add(DiscordWebhook::new(
                url,
                config.username.clone(),
                config.image_url.clone(),
            )?);
        }
        Ok(notifier)
    }

    pub fn add(&mut self, sink: impl NotificationSink + 'static) -> &mut Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Deliver to every sink. Returns how many succeeded.
    pub async fn notify(&self, notification: &Notification) -> usize {
        let mut delivered = 0;
        for sink in &self.sinks {
            match sink.deliver(notification).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(sink = sink.name(), error = %e, "Notification delivery failed"),
            }
        }
        delivered
    }
}
