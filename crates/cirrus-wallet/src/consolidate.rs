//! Batch consolidation: sweep a wallet's spendable outputs into one address,
//! one transaction per full batch.
//!
//! Batches go out one after another. The first failure stops the run; batches
//! already broadcast stay broadcast and nothing is retried.

use std::num::NonZeroUsize;

use cirrus_api::NodeApi;
use cirrus_core::{ChangePolicy, TransactionConfig, WalletCredentials, format_coins, parse_coins};
use tracing::{info, warn};

use crate::builder::{BroadcastReceipt, TransactionBuilder, build_and_broadcast};
use crate::coin_selection::CoinSelector;
use crate::error::WalletError;

/// What to consolidate and where.
#[derive(Debug, Clone)]
pub struct ConsolidationPlan {
    pub destination: String,
    /// Fee per transaction in units.
    pub fee: u64,
    pub min_confirmations: u64,
    pub batch_size: NonZeroUsize,
    pub change_policy: Option<ChangePolicy>,
    pub op_return_data: Option<String>,
    /// Prepare requests without calling build or broadcast.
    pub dry_run: bool,
}

impl ConsolidationPlan {
    /// Plan from the transaction section of the operator config.
    pub fn from_config(
        config: &TransactionConfig,
        destination: impl Into<String>,
    ) -> Result<Self, WalletError> {
        let batch_size = NonZeroUsize::new(config.batch_size)
            .ok_or_else(|| WalletError::InvalidAmount("batch size must be non-zero".into()))?;
        Ok(Self {
            destination: destination.into(),
            fee: parse_coins(&config.fee)?,
            min_confirmations: config.min_confirmations,
            batch_size,
            change_policy: config.change_policy,
            op_return_data: None,
            dry_run: false,
        })
    }
}

/// One batch handled during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentBatch {
    pub inputs: usize,
    /// Value credited to the destination, in units.
    pub amount: u64,
    /// `None` on a dry run.
    pub receipt: Option<BroadcastReceipt>,
}

/// The batch that stopped a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Zero-based batch number.
    pub batch: usize,
    /// Batches that were never attempted.
    pub skipped: usize,
    pub error: WalletError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationReport {
    /// Outputs returned by the node.
    pub fetched: usize,
    pub eligible: usize,
    /// Eligible outputs that did not fill a batch and were left alone.
    pub dropped: usize,
    pub batches: Vec<SentBatch>,
    pub failure: Option<BatchFailure>,
    pub dry_run: bool,
}

impl ConsolidationReport {
    /// Units credited to the destination across all batches.
    pub fn total_sent(&self) -> u64 {
        self.batches
            .iter()
            .map(|b| b.amount)
            .fold(0u64, u64::saturating_add)
    }

    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Fetch, select and send every full batch.
///
/// Errors before the first batch (fetch, request assembly) are returned
/// directly. A failing batch ends the run and is recorded in
/// [`ConsolidationReport::failure`].
pub async fn consolidate<A: NodeApi + ?Sized>(
    api: &A,
    wallet: &WalletCredentials,
    plan: &ConsolidationPlan,
) -> Result<ConsolidationReport, WalletError> {
    let outputs = api.spendable_outputs(&wallet.name, &wallet.account).await?;
    let fetched = outputs.len();

    let selection = CoinSelector::new(plan.min_confirmations, plan.batch_size).batches(outputs)?;
    if selection.dropped > 0 {
        warn!(
            dropped = selection.dropped,
            batch_size = plan.batch_size.get(),
            "Outputs beyond the last full batch are not consolidated"
        );
    }

    let mut builder = TransactionBuilder::new(plan.fee);
    builder.set_destination(plan.destination.clone());
    if let Some(policy) = plan.change_policy {
        builder.set_change_policy(policy);
    }
    if let Some(data) = &plan.op_return_data {
        builder.set_op_return_data(data.clone());
    }

    // Assemble every request up front so a configuration problem fails
    // before anything is broadcast.
    let prepared = selection
        .sets
        .iter()
        .map(|set| builder.build(set, wallet))
        .collect::<Result<Vec<_>, _>>()?;

    let mut report = ConsolidationReport {
        fetched,
        eligible: selection.eligible,
        dropped: selection.dropped,
        batches: Vec::with_capacity(prepared.len()),
        failure: None,
        dry_run: plan.dry_run,
    };

    let total_batches = prepared.len();
    for (n, tx) in prepared.into_iter().enumerate() {
        let inputs = tx.request.outpoints.len();
        if plan.dry_run {
            info!(
                batch = n,
                inputs,
                amount = %format_coins(tx.amount_for_destination),
                "Dry run: batch prepared"
            );
            report.batches.push(SentBatch {
                inputs,
                amount: tx.amount_for_destination,
                receipt: None,
            });
            continue;
        }

        match build_and_broadcast(api, &tx.request).await {
            Ok(receipt) => report.batches.push(SentBatch {
                inputs,
                amount: tx.amount_for_destination,
                receipt: Some(receipt),
            }),
            Err(error) => {
                let skipped = total_batches - n - 1;
                warn!(batch = n, skipped, %error, "Consolidation batch failed, stopping");
                report.failure = Some(BatchFailure {
                    batch: n,
                    skipped,
                    error,
                });
                break;
            }
        }
    }

    info!(
        batches = report.batches.len(),
        sent = %format_coins(report.total_sent()),
        dropped = report.dropped,
        "Consolidation finished"
    );
    Ok(report)
}

/// Federation deposit address: `configured` if set, otherwise the
/// multisig address reported by the gateway.
pub async fn federation_deposit_address<A: NodeApi + ?Sized>(
    api: &A,
    configured: Option<&str>,
) -> Result<String, WalletError> {
    if let Some(addr) = configured.filter(|a| !a.is_empty()) {
        return Ok(addr.to_string());
    }
    api.federation_gateway_info()
        .await?
        .multi_sig_address
        .filter(|a| !a.is_empty())
        .ok_or(WalletError::MissingDestination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_api::testing::{FakeNode, output};
    use cirrus_core::constants::COIN;

    fn wallet() -> WalletCredentials {
        WalletCredentials::new("mn", "account 0", "pw")
    }

    fn plan(batch_size: usize) -> ConsolidationPlan {
        ConsolidationPlan {
            destination: "CDest".into(),
            fee: COIN / 100,
            min_confirmations: 10,
            batch_size: NonZeroUsize::new(batch_size).unwrap(),
            change_policy: Some(ChangePolicy::Destination),
            op_return_data: None,
            dry_run: false,
        }
    }

    #[tokio::test]
    async fn sends_one_transaction_per_full_batch() {
        let outputs = (0..1900).map(|n| output(n, COIN, 50)).collect();
        let node = FakeNode::with_outputs(outputs);

        let report = consolidate(&node, &wallet(), &plan(950)).await.unwrap();
        assert_eq!(report.batches.len(), 2);
        assert_eq!(report.dropped, 0);
        assert!(report.is_complete());
        assert_eq!(report.total_sent(), 2 * (950 * COIN - COIN / 100));

        let state = node.state();
        assert_eq!(state.build_requests.len(), 2);
        assert!(state.build_requests.iter().all(|r| r.outpoints.len() == 950));
        assert_eq!(state.sent_hex.len(), 2);
    }

    #[tokio::test]
    async fn unconfirmed_and_remainder_are_left_alone() {
        let mut outputs: Vec<_> = (0..5).map(|n| output(n, COIN, 50)).collect();
        outputs.push(output(10, 100 * COIN, 3));
        let node = FakeNode::with_outputs(outputs);

        let report = consolidate(&node, &wallet(), &plan(2)).await.unwrap();
        assert_eq!(report.fetched, 6);
        assert_eq!(report.eligible, 5);
        assert_eq!(report.batches.len(), 2);
        assert_eq!(report.dropped, 1);
    }

    #[tokio::test]
    async fn failure_stops_remaining_batches() {
        let outputs = (0..6).map(|n| output(n, COIN, 50)).collect();
        let node = FakeNode::with_outputs(outputs);
        node.state().fail_send_at = Some(1);

        let report = consolidate(&node, &wallet(), &plan(2)).await.unwrap();
        assert_eq!(report.batches.len(), 1);
        let failure = report.failure.unwrap();
        assert_eq!(failure.batch, 1);
        assert_eq!(failure.skipped, 1);
        // Third batch never reached the node.
        assert_eq!(node.state().build_requests.len(), 2);
    }

    #[tokio::test]
    async fn dry_run_does_not_touch_node_wallet() {
        let outputs = (0..4).map(|n| output(n, COIN, 50)).collect();
        let node = FakeNode::with_outputs(outputs);
        let mut plan = plan(2);
        plan.dry_run = true;

        let report = consolidate(&node, &wallet(), &plan).await.unwrap();
        assert_eq!(report.batches.len(), 2);
        assert!(report.batches.iter().all(|b| b.receipt.is_none()));
        assert!(node.state().build_requests.is_empty());
    }

    #[tokio::test]
    async fn missing_policy_fails_before_sending() {
        let outputs = (0..4).map(|n| output(n, COIN, 50)).collect();
        let node = FakeNode::with_outputs(outputs);
        let mut plan = plan(2);
        plan.change_policy = None;

        let err = consolidate(&node, &wallet(), &plan).await.unwrap_err();
        assert_eq!(err, WalletError::ChangePolicyRequired);
        assert!(node.state().build_requests.is_empty());
    }

    #[tokio::test]
    async fn nothing_eligible_is_empty_report() {
        let node = FakeNode::with_outputs(vec![output(0, COIN, 1)]);
        let report = consolidate(&node, &wallet(), &plan(2)).await.unwrap();
        assert!(report.batches.is_empty());
        assert_eq!(report.total_sent(), 0);
    }

    #[tokio::test]
    async fn deposit_address_falls_back_to_gateway() {
        let node = FakeNode::new();
        assert_eq!(
            federation_deposit_address(&node, Some("cConfigured")).await.unwrap(),
            "cConfigured"
        );
        assert_eq!(
            federation_deposit_address(&node, None).await.unwrap(),
            "cFederationMultisig"
        );
        node.state().gateway.multi_sig_address = None;
        assert_eq!(
            federation_deposit_address(&node, None).await.unwrap_err(),
            WalletError::MissingDestination
        );
    }

    #[test]
    fn plan_from_config() {
        let config = TransactionConfig {
            fee: "0.02".into(),
            min_confirmations: 100,
            batch_size: 500,
            change_policy: None,
        };
        let plan = ConsolidationPlan::from_config(&config, "CDest").unwrap();
        assert_eq!(plan.fee, 2 * COIN / 100);
        assert_eq!(plan.batch_size.get(), 500);

        let zero = TransactionConfig {
            batch_size: 0,
            ..config
        };
        assert!(ConsolidationPlan::from_config(&zero, "CDest").is_err());
    }
}
