//! Shared helpers for the end-to-end and property tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use cirrus_core::SpendableOutput;
use cirrus_monitor::{Notification, NotificationSink, NotifyError, Ticker};

/// `n` distinct outputs of `amount` units with `confirmations` each.
pub fn outputs(n: usize, amount: u64, confirmations: u64) -> Vec<SpendableOutput> {
    (0..n)
        .map(|i| SpendableOutput {
            id: format!("{i:064x}"),
            index: (i % 2) as u32,
            address: format!("CAddr{i}"),
            amount,
            creation_time: 1_700_000_000 + i as i64,
            confirmations,
        })
        .collect()
}

/// Sink that keeps every notification.
#[derive(Clone, Default)]
pub struct RecordingSink(pub Arc<Mutex<Vec<Notification>>>);

impl RecordingSink {
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.0.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Ticker that returns immediately and clears `running` after `limit` ticks.
pub struct StepTicker {
    pub ticks: usize,
    pub limit: usize,
    pub running: Arc<AtomicBool>,
}

impl StepTicker {
    pub fn new(limit: usize, running: Arc<AtomicBool>) -> Self {
        Self {
            ticks: 0,
            limit,
            running,
        }
    }
}

#[async_trait]
impl Ticker for StepTicker {
    async fn tick(&mut self) {
        self.ticks += 1;
        if self.ticks >= self.limit {
            self.running.store(false, Ordering::Relaxed);
        }
    }
}

/// JSON the mock node serves, and what it received.
#[derive(Default)]
pub struct MockNodeState {
    /// `api/Wallet/spendable-transactions` `transactions` array.
    pub transactions: Value,
    /// `api/DefaultVoting/fedmembers` body.
    pub fedmembers: Value,
    /// Bodies posted to `api/Wallet/build-transaction`.
    pub builds: Vec<Value>,
    /// Hex strings posted to `api/Wallet/send-transaction`.
    pub sends: Vec<String>,
    /// Query strings seen on `api/Wallet/spendable-transactions`.
    pub spendable_queries: Vec<Vec<(String, String)>>,
}

pub type SharedMock = Arc<Mutex<MockNodeState>>;

/// Node REST surface backed by [`MockNodeState`].
pub fn mock_node_router(state: SharedMock) -> Router {
    Router::new()
        .route(
            "/api/node/status",
            get(|| async { Json(json!({"state": "Started", "agent": "MockNode"})) }),
        )
        .route(
            "/api/DefaultVoting/fedmembers",
            get(|State(s): State<SharedMock>| async move {
                Json(s.lock().unwrap().fedmembers.clone())
            }),
        )
        .route(
            "/api/FederationGateway/info",
            get(|| async { Json(json!({"isActive": true, "multiSigAddress": "cFedMultisig"})) }),
        )
        .route(
            "/api/Wallet/balance",
            get(|| async {
                Json(json!({"balances": [{"accountName": "account 0", "amountConfirmed": 100000000}]}))
            }),
        )
        .route(
            "/api/Wallet/spendable-transactions",
            get(
                |State(s): State<SharedMock>, Query(q): Query<Vec<(String, String)>>| async move {
                    let mut s = s.lock().unwrap();
                    s.spendable_queries.push(q);
                    Json(json!({"transactions": s.transactions.clone()}))
                },
            ),
        )
        .route(
            "/api/Wallet/build-transaction",
            post(|State(s): State<SharedMock>, Json(body): Json<Value>| async move {
                let mut s = s.lock().unwrap();
                let n = s.builds.len();
                s.builds.push(body);
                Json(json!({"hex": format!("beef{n:02}"), "fee": 1000000}))
            }),
        )
        .route(
            "/api/Wallet/send-transaction",
            post(|State(s): State<SharedMock>, Json(body): Json<Value>| async move {
                let mut s = s.lock().unwrap();
                let hex = body["hex"].as_str().unwrap_or_default().to_string();
                if hex.is_empty() {
                    return Err((StatusCode::BAD_REQUEST, "missing hex"));
                }
                s.sends.push(hex.clone());
                Ok(Json(json!({"transactionId": format!("txid-{hex}")})))
            }),
        )
        .with_state(state)
}

/// Serve `app` on an ephemeral local port, returning its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing listens on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Spendable-transactions JSON for `outputs`.
pub fn transactions_json(outputs: &[SpendableOutput]) -> Value {
    Value::Array(
        outputs
            .iter()
            .map(|o| {
                json!({
                    "id": o.id,
                    "index": o.index,
                    "address": o.address,
                    "isChange": false,
                    "amount": o.amount,
                    "creationTime": o.creation_time,
                    "confirmations": o.confirmations,
                })
            })
            .collect(),
    )
}
