//! The monitoring loop.
//!
//! Each tick runs one polling cycle: primary health, secondary health,
//! federation inactivity and optional maintenance. An elapsed-minutes
//! counter advances by the poll interval after every tick; when it reaches
//! `hours_between_updates * 60` the cycle also sends a status report and runs
//! the cross-chain sweep, then the counter starts again from zero.
//!
//! Nothing inside a cycle ends the loop. Failed requests skip the feature
//! for that cycle and the next tick proceeds as usual. Only the stop flag,
//! checked between ticks, ends [`Monitor::run`].

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use cirrus_api::{NodeApi, NodeStatus};
use cirrus_core::{CrossChainConfig, NetworkRole, OperatorConfig};
use cirrus_wallet::{
    ConsolidationPlan, ConsolidationReport, WalletError, consolidate, federation_deposit_address,
};

use crate::notify::{Notification, Notifier};
use crate::peers::reconnect_peers;
use crate::staking::ensure_staking;
use crate::ticker::Ticker;

/// Result of one node's status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    Up,
    Down(String),
    /// Skipped because an earlier check failed.
    Unchecked,
}

impl Health {
    pub fn is_up(&self) -> bool {
        matches!(self, Self::Up)
    }
}

/// What one polling cycle observed and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub primary: Health,
    pub secondary: Health,
    /// `Some(true)` when an inactivity alert went out, `None` when the
    /// check was skipped or its request failed.
    pub inactive: Option<bool>,
    /// The reporting step ran this cycle.
    pub reported: bool,
    /// Cross-chain sweep result, when one was attempted.
    pub transfer: Option<Result<ConsolidationReport, WalletError>>,
}

/// Watches a mainchain/sidechain node pair.
pub struct Monitor<'a> {
    primary: &'a dyn NodeApi,
    secondary: &'a dyn NodeApi,
    config: &'a OperatorConfig,
    notifier: &'a Notifier,
    elapsed_minutes: u64,
    uptime_minutes: u64,
}

impl<'a> Monitor<'a> {
    pub fn new(
        primary: &'a dyn NodeApi,
        secondary: &'a dyn NodeApi,
        config: &'a OperatorConfig,
        notifier: &'a Notifier,
    ) -> Self {
        Self {
            primary,
            secondary,
            config,
            notifier,
            elapsed_minutes: 0,
            uptime_minutes: 0,
        }
    }

    /// Minutes since the last report.
    pub fn elapsed_minutes(&self) -> u64 {
        self.elapsed_minutes
    }

    /// Minutes since the loop started.
    pub fn uptime_minutes(&self) -> u64 {
        self.uptime_minutes
    }

    /// Poll until `running` is cleared. The flag is read before each cycle
    /// and after each tick.
    pub async fn run<T: Ticker + ?Sized>(&mut self, ticker: &mut T, running: &AtomicBool) {
        let m = &self.config.monitor;
        info!(
            interval_mins = m.minute_update_interval,
            report_every_mins = m.report_after_minutes(),
            "Monitor started"
        );
        while running.load(Ordering::Relaxed) {
            let outcome = self.run_cycle().await;
            debug!(
                primary = ?outcome.primary,
                secondary = ?outcome.secondary,
                reported = outcome.reported,
                "Cycle complete"
            );

            ticker.tick().await;
            if !running.load(Ordering::Relaxed) {
                break;
            }
            self.advance();
        }
        info!(uptime_mins = self.uptime_minutes, "Monitor stopped");
    }

    fn advance(&mut self) {
        let step = self.config.monitor.minute_update_interval;
        self.elapsed_minutes += step;
        self.uptime_minutes += step;
    }

    /// One polling step, plus the reporting step when it is due.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let primary = self.check(NetworkRole::Primary).await;
        let secondary = if primary.is_up() {
            self.check(NetworkRole::Secondary).await
        } else {
            Health::Unchecked
        };

        let mut inactive = None;
        if primary.is_up() && secondary.is_up() {
            inactive = self.check_inactivity().await;
            self.maintain().await;
        }

        let mut outcome = CycleOutcome {
            primary,
            secondary,
            inactive,
            reported: false,
            transfer: None,
        };

        if self.elapsed_minutes == self.config.monitor.report_after_minutes() {
            outcome.transfer = self.report(outcome.secondary.is_up()).await;
            outcome.reported = true;
            self.elapsed_minutes = 0;
        }
        outcome
    }

    fn node(&self, role: NetworkRole) -> &'a dyn NodeApi {
        match role {
            NetworkRole::Primary => self.primary,
            NetworkRole::Secondary => self.secondary,
        }
    }

    async fn check(&self, role: NetworkRole) -> Health {
        let health = match self.node(role).node_status().await {
            Ok(status) => status_health(&status),
            Err(e) => Health::Down(e.to_string()),
        };
        if let Health::Down(reason) = &health {
            warn!(node = %role, %reason, "Node is down");
            self.notifier
                .notify(&Notification::NodeDown {
                    role,
                    reason: reason.clone(),
                })
                .await;
        }
        health
    }

    async fn check_inactivity(&self) -> Option<bool> {
        let pubkey = self.config.monitor.public_key.as_deref()?;
        let members = match self.secondary.federation_members().await {
            Ok(members) => members,
            Err(e) => {
                warn!(error = %e, "Could not fetch federation members");
                return None;
            }
        };

        let Some(member) = members
            .iter()
            .find(|m| m.pubkey.eq_ignore_ascii_case(pubkey))
        else {
            warn!(pubkey, "Public key not in the federation member list");
            return Some(false);
        };

        let threshold = self.config.monitor.inactivity_threshold();
        if member.period_of_inactivity < threshold {
            debug!(inactive_secs = member.period_of_inactivity.as_secs(), "Federation member active");
            return Some(false);
        }

        warn!(
            pubkey,
            inactive_secs = member.period_of_inactivity.as_secs(),
            "Federation member inactive"
        );
        self.notifier
            .notify(&Notification::Inactive {
                pubkey: member.pubkey.clone(),
                inactive_for: member.period_of_inactivity,
            })
            .await;
        Some(true)
    }

    async fn maintain(&self) {
        let m = &self.config.monitor;
        if !m.reconnect_peers.is_empty() {
            if let Err(e) = reconnect_peers(self.secondary, &m.reconnect_peers).await {
                warn!(error = %e, "Peer reconnection skipped");
            }
        }
        if m.ensure_staking {
            if let Err(e) = ensure_staking(self.secondary, &self.config.wallet).await {
                warn!(error = %e, "Staking check skipped");
            }
        }
    }

    async fn report(
        &self,
        secondary_up: bool,
    ) -> Option<Result<ConsolidationReport, WalletError>> {
        let balance = match self.secondary.wallet_balance(&self.config.wallet.name).await {
            Ok(b) => Some(b.total_confirmed()),
            Err(e) => {
                warn!(error = %e, "Balance unavailable for report");
                None
            }
        };
        let gateway_active = match self.secondary.federation_gateway_info().await {
            Ok(info) => Some(info.is_active),
            Err(e) => {
                warn!(error = %e, "Gateway info unavailable for report");
                None
            }
        };
        info!(uptime_mins = self.uptime_minutes, "Sending status report");
        self.notifier
            .notify(&Notification::Report {
                uptime_minutes: self.uptime_minutes,
                balance,
                gateway_active,
            })
            .await;

        let cc = self.config.monitor.cross_chain.as_ref()?;
        if !secondary_up {
            warn!("Cross-chain transfer skipped: sidechain node not healthy");
            return None;
        }
        let result = self.cross_chain(cc).await;
        self.notify_transfer(&result).await;
        Some(result)
    }

    async fn cross_chain(&self, cc: &CrossChainConfig) -> Result<ConsolidationReport, WalletError> {
        let destination =
            federation_deposit_address(self.secondary, cc.multisig_address.as_deref()).await?;
        let mut plan = ConsolidationPlan::from_config(&self.config.transaction, destination)?;
        plan.op_return_data = Some(cc.mainchain_address.clone());
        consolidate(self.secondary, &self.config.wallet, &plan).await
    }

    async fn notify_transfer(&self, result: &Result<ConsolidationReport, WalletError>) {
        let notification = match result {
            Ok(report) => {
                let transaction_ids = report
                    .batches
                    .iter()
                    .filter_map(|b| b.receipt.as_ref())
                    .map(|r| r.transaction_id.clone())
                    .collect();
                match &report.failure {
                    Some(failure) => Notification::TransferFailed {
                        reason: failure.error.to_string(),
                        batches_sent: report.batches.len(),
                    },
                    None if report.batches.is_empty() => {
                        info!(eligible = report.eligible, "Nothing to transfer cross-chain");
                        return;
                    }
                    None => Notification::TransferSent {
                        batches: report.batches.len(),
                        amount: report.total_sent(),
                        transaction_ids,
                        dropped: report.dropped,
                    },
                }
            }
            Err(e) => {
                warn!(error = %e, "Cross-chain transfer failed");
                Notification::TransferFailed {
                    reason: e.to_string(),
                    batches_sent: 0,
                }
            }
        };
        self.notifier.notify(&notification).await;
    }
}

fn status_health(status: &NodeStatus) -> Health {
    if status.is_started() {
        Health::Up
    } else {
        Health::Down(format!("node state is '{}'", status.state))
    }
}
