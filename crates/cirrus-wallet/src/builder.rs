//! Transaction builder: amount resolution, request assembly, build and
//! broadcast.
//!
//! 1. Resolve the destination amount against the fee and the selected input
//!    value ([`resolve_amounts`]).
//! 2. Assemble a [`BuildTransactionRequest`] ([`TransactionBuilder::build`]).
//! 3. Ask the node to build and sign it, then broadcast the result
//!    ([`build_and_broadcast`]).
//!
//! Change is never computed here. The node pays
//! `inputs - recipients - fee` to the change address on its own.

use cirrus_api::{
    ApiError, BuildTransactionRequest, NodeApi, Recipient, SendTransactionRequest,
    TransactionOutput, paths,
};
use cirrus_core::{ChangePolicy, WalletCredentials, format_coins};
use tracing::{debug, info};

use crate::coin_selection::CoinSet;
use crate::error::WalletError;

/// How the destination amount was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedAmounts {
    /// Neither change address nor amount was given: everything but the fee
    /// goes to the destination and the change address comes from policy.
    Sweep { amount: u64 },
    /// Both were given and the amount plus fee fits in the inputs.
    Explicit { amount: u64 },
}

impl ResolvedAmounts {
    pub fn amount(&self) -> u64 {
        match *self {
            Self::Sweep { amount } | Self::Explicit { amount } => amount,
        }
    }
}

/// Decide the destination amount for inputs worth `total` units.
///
/// Change address and amount come as a pair: both or neither.
pub fn resolve_amounts(
    total: u64,
    fee: u64,
    change_address: Option<&str>,
    amount: Option<u64>,
) -> Result<ResolvedAmounts, WalletError> {
    match (change_address, amount) {
        (None, None) => {
            if total <= fee {
                return Err(WalletError::InsufficientFunds {
                    have: total,
                    need: fee.saturating_add(1),
                });
            }
            Ok(ResolvedAmounts::Sweep { amount: total - fee })
        }
        (Some(_), Some(amount)) => {
            if amount == 0 {
                return Err(WalletError::InvalidAmount("destination amount is zero".into()));
            }
            let need = amount
                .checked_add(fee)
                .ok_or_else(|| WalletError::InvalidAmount("amount plus fee overflows".into()))?;
            if need > total {
                return Err(WalletError::InsufficientFunds { have: total, need });
            }
            Ok(ResolvedAmounts::Explicit { amount })
        }
        _ => Err(WalletError::InvalidParameterCombination),
    }
}

/// A build request plus the figures it was derived from.
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub request: BuildTransactionRequest,
    /// Selected input value in units.
    pub input_total: u64,
    pub amount_for_destination: u64,
    pub fee: u64,
}

/// Builder for one transaction over a [`CoinSet`].
///
/// # Example
/// ```ignore
/// let prepared = TransactionBuilder::new(fee)
///     .set_destination(addr)
///     .set_change_policy(ChangePolicy::FirstCoinAddress)
///     .build(&coins, &wallet)?;
/// let receipt = build_and_broadcast(&client, &prepared.request).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    fee: u64,
    destination: Option<String>,
    amount: Option<u64>,
    change_address: Option<String>,
    change_policy: Option<ChangePolicy>,
    op_return_data: Option<String>,
}

impl TransactionBuilder {
    /// New builder charging `fee` units.
    pub fn new(fee: u64) -> Self {
        Self {
            fee,
            ..Self::default()
        }
    }

    pub fn set_destination(&mut self, address: impl Into<String>) -> &mut Self {
        self.destination = Some(address.into());
        self
    }

    /// Amount for the destination in units. Requires a change address.
    pub fn set_amount(&mut self, amount: u64) -> &mut Self {
        self.amount = Some(amount);
        self
    }

    /// Requires an amount.
    pub fn set_change_address(&mut self, address: impl Into<String>) -> &mut Self {
        self.change_address = Some(address.into());
        self
    }

    /// Change address to use when sweeping.
    pub fn set_change_policy(&mut self, policy: ChangePolicy) -> &mut Self {
        self.change_policy = Some(policy);
        self
    }

    pub fn set_op_return_data(&mut self, data: impl Into<String>) -> &mut Self {
        self.op_return_data = Some(data.into());
        self
    }

    /// Resolve amounts and assemble the build request. No network calls.
    pub fn build(
        &self,
        coins: &CoinSet,
        wallet: &WalletCredentials,
    ) -> Result<PreparedTransaction, WalletError> {
        let destination = self
            .destination
            .as_deref()
            .filter(|d| !d.is_empty())
            .ok_or(WalletError::MissingDestination)?;

        let total = coins.total();
        let resolved = resolve_amounts(
            total,
            self.fee,
            self.change_address.as_deref(),
            self.amount,
        )?;

        let change_address = match (resolved, self.change_address.as_deref()) {
            (ResolvedAmounts::Explicit { .. }, Some(addr)) => addr.to_string(),
            _ => match self.change_policy {
                Some(ChangePolicy::FirstCoinAddress) => coins.first_address().to_string(),
                Some(ChangePolicy::Destination) => destination.to_string(),
                None => return Err(WalletError::ChangePolicyRequired),
            },
        };

        let amount = resolved.amount();
        debug!(
            inputs = coins.len(),
            total = %format_coins(total),
            amount = %format_coins(amount),
            fee = %format_coins(self.fee),
            change = %change_address,
            "Resolved transaction amounts"
        );

        Ok(PreparedTransaction {
            request: BuildTransactionRequest {
                fee_amount: format_coins(self.fee),
                password: wallet.password.clone(),
                wallet_name: wallet.name.clone(),
                account_name: wallet.account.clone(),
                outpoints: coins.outpoints(),
                recipients: vec![Recipient {
                    destination_address: destination.to_string(),
                    amount: format_coins(amount),
                }],
                change_address,
                op_return_data: self.op_return_data.clone(),
            },
            input_total: total,
            amount_for_destination: amount,
            fee: self.fee,
        })
    }
}

/// Outcome of a successful broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReceipt {
    pub transaction_id: String,
    pub outputs: Vec<TransactionOutput>,
    /// Fee reported by the build step, in units.
    pub fee: Option<u64>,
}

/// Build then broadcast. Either failure is returned as is; a transaction
/// built but not broadcast is discarded.
pub async fn build_and_broadcast<A: NodeApi + ?Sized>(
    api: &A,
    request: &BuildTransactionRequest,
) -> Result<BroadcastReceipt, WalletError> {
    let built = api.build_transaction(request).await?;
    if built.hex.is_empty() {
        return Err(ApiError::Decode {
            endpoint: paths::BUILD_TRANSACTION.to_string(),
            reason: "empty transaction hex".into(),
        }
        .into());
    }
    debug!(inputs = request.outpoints.len(), "Transaction built");

    let sent = api
        .send_transaction(&SendTransactionRequest { hex: built.hex })
        .await?;
    info!(
        txid = %sent.transaction_id,
        inputs = request.outpoints.len(),
        fee = %request.fee_amount,
        "Transaction broadcast"
    );

    Ok(BroadcastReceipt {
        transaction_id: sent.transaction_id,
        outputs: sent.outputs,
        fee: built.fee,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_api::testing::{FakeNode, output};
    use cirrus_core::constants::COIN;
    use cirrus_core::parse_coins;

    const FEE: u64 = COIN / 100;

    fn wallet() -> WalletCredentials {
        WalletCredentials::new("mn", "account 0", "pw")
    }

    fn ten_coins() -> CoinSet {
        CoinSet::new(vec![output(0, 6 * COIN, 20), output(1, 4 * COIN, 20)]).unwrap()
    }

    #[test]
    fn sweep_subtracts_fee() {
        let r = resolve_amounts(10 * COIN, FEE, None, None).unwrap();
        assert_eq!(r, ResolvedAmounts::Sweep { amount: parse_coins("9.99").unwrap() });
    }

    #[test]
    fn explicit_amount_within_total() {
        let r = resolve_amounts(10 * COIN, FEE, Some("X1"), Some(5 * COIN)).unwrap();
        assert_eq!(r.amount(), 5 * COIN);
    }

    #[test]
    fn explicit_amount_plus_fee_over_total() {
        let err = resolve_amounts(10 * COIN, FEE, Some("X1"), Some(10 * COIN)).unwrap_err();
        assert_eq!(
            err,
            WalletError::InsufficientFunds {
                have: 10 * COIN,
                need: 10 * COIN + FEE
            }
        );
    }

    #[test]
    fn explicit_amount_exactly_total_minus_fee() {
        let r = resolve_amounts(10 * COIN, FEE, Some("X1"), Some(10 * COIN - FEE)).unwrap();
        assert_eq!(r.amount(), 10 * COIN - FEE);
    }

    #[test]
    fn only_one_of_pair_is_rejected() {
        assert_eq!(
            resolve_amounts(10 * COIN, FEE, Some("X1"), None).unwrap_err(),
            WalletError::InvalidParameterCombination
        );
        assert_eq!(
            resolve_amounts(10 * COIN, FEE, None, Some(COIN)).unwrap_err(),
            WalletError::InvalidParameterCombination
        );
    }

    #[test]
    fn sweep_needs_more_than_fee() {
        assert!(matches!(
            resolve_amounts(FEE, FEE, None, None),
            Err(WalletError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn build_sweep_with_first_coin_policy() {
        let prepared = TransactionBuilder::new(FEE)
            .set_destination("Dest")
            .set_change_policy(ChangePolicy::FirstCoinAddress)
            .build(&ten_coins(), &wallet())
            .unwrap();
        let req = &prepared.request;
        assert_eq!(req.fee_amount, "0.01000000");
        assert_eq!(req.recipients[0].amount, "9.99000000");
        assert_eq!(req.recipients[0].destination_address, "Dest");
        assert_eq!(req.change_address, "CAddr0");
        assert_eq!(req.outpoints.len(), 2);
        assert_eq!(req.wallet_name, "mn");
        assert_eq!(req.password, "pw");
        assert_eq!(prepared.input_total, 10 * COIN);
    }

    #[test]
    fn build_sweep_with_destination_policy() {
        let prepared = TransactionBuilder::new(FEE)
            .set_destination("Dest")
            .set_change_policy(ChangePolicy::Destination)
            .set_op_return_data("XMain")
            .build(&ten_coins(), &wallet())
            .unwrap();
        assert_eq!(prepared.request.change_address, "Dest");
        assert_eq!(prepared.request.op_return_data.as_deref(), Some("XMain"));
    }

    #[test]
    fn build_sweep_without_policy_fails() {
        let err = TransactionBuilder::new(FEE)
            .set_destination("Dest")
            .build(&ten_coins(), &wallet())
            .unwrap_err();
        assert_eq!(err, WalletError::ChangePolicyRequired);
    }

    #[test]
    fn explicit_change_address_wins_over_policy() {
        let prepared = TransactionBuilder::new(FEE)
            .set_destination("Dest")
            .set_amount(5 * COIN)
            .set_change_address("X1")
            .set_change_policy(ChangePolicy::Destination)
            .build(&ten_coins(), &wallet())
            .unwrap();
        assert_eq!(prepared.request.change_address, "X1");
        assert_eq!(prepared.request.recipients[0].amount, "5.00000000");
    }

    #[test]
    fn build_requires_destination() {
        let err = TransactionBuilder::new(FEE)
            .set_change_policy(ChangePolicy::Destination)
            .build(&ten_coins(), &wallet())
            .unwrap_err();
        assert_eq!(err, WalletError::MissingDestination);
    }

    #[tokio::test]
    async fn build_and_broadcast_sends_built_hex() {
        let node = FakeNode::new();
        let prepared = TransactionBuilder::new(FEE)
            .set_destination("Dest")
            .set_change_policy(ChangePolicy::FirstCoinAddress)
            .build(&ten_coins(), &wallet())
            .unwrap();

        let receipt = build_and_broadcast(&node, &prepared.request).await.unwrap();
        assert_eq!(receipt.transaction_id, "tx0");
        assert_eq!(receipt.fee, Some(FEE));

        let state = node.state();
        assert_eq!(state.build_requests.len(), 1);
        assert_eq!(state.sent_hex, vec!["002".to_string()]);
    }

    #[tokio::test]
    async fn build_failure_skips_broadcast() {
        let node = FakeNode::new();
        node.state().fail_build_at = Some(0);
        let prepared = TransactionBuilder::new(FEE)
            .set_destination("Dest")
            .set_change_policy(ChangePolicy::FirstCoinAddress)
            .build(&ten_coins(), &wallet())
            .unwrap();

        let err = build_and_broadcast(&node, &prepared.request).await.unwrap_err();
        assert!(matches!(err, WalletError::Api(ApiError::Status { status: 400, .. })));
        assert!(node.state().sent_hex.is_empty());
    }

    #[tokio::test]
    async fn empty_hex_is_decode_error() {
        let node = FakeNode::new();
        node.state().empty_hex = true;
        let prepared = TransactionBuilder::new(FEE)
            .set_destination("Dest")
            .set_change_policy(ChangePolicy::Destination)
            .build(&ten_coins(), &wallet())
            .unwrap();

        let err = build_and_broadcast(&node, &prepared.request).await.unwrap_err();
        assert!(matches!(err, WalletError::Api(ApiError::Decode { .. })));
        assert!(node.state().sent_hex.is_empty());
    }
}
