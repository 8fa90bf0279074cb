//! # cirrus-wallet — coin selection and transaction building.
//!
//! Turns a node's spendable outputs into coin sets, resolves destination
//! amounts against the fee, and drives the node's build then broadcast
//! calls. Keys and signing stay inside the node.
//!
//! # Modules
//!
//! - [`error`] — `WalletError` enum
//! - [`coin_selection`] — filter, sort and partition of spendable outputs
//! - [`selection`] — choosing outputs by index (preset or interactive)
//! - [`builder`] — amount resolution, request assembly, build/broadcast
//! - [`consolidate`] — batch consolidation and federation deposits

pub mod builder;
pub mod coin_selection;
pub mod consolidate;
pub mod error;
pub mod selection;

pub use builder::{
    BroadcastReceipt, PreparedTransaction, ResolvedAmounts, TransactionBuilder,
    build_and_broadcast, resolve_amounts,
};
pub use coin_selection::{
    Batches, CoinSelector, CoinSet, filter_eligible, partition, sort_descending_by_amount,
};
pub use consolidate::{
    BatchFailure, ConsolidationPlan, ConsolidationReport, SentBatch, consolidate,
    federation_deposit_address,
};
pub use error::WalletError;
pub use selection::{
    InteractiveSelection, PresetIndices, SelectionStrategy, parse_indices, pick, render_outputs,
};
