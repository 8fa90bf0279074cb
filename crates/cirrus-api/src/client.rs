//! `reqwest` implementation of [`NodeApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use cirrus_core::SpendableOutput;

use crate::error::ApiError;
use crate::schema::*;
use crate::traits::NodeApi;

/// HTTP client bound to one node's API base URL.
#[derive(Debug, Clone)]
pub struct NodeClient {
    client: Client,
    base_url: Url,
}

impl NodeClient {
    /// Client using the HTTP library's default timeout behaviour.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, None)
    }

    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let invalid = |reason: String| ApiError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };

        // A trailing slash keeps any path prefix when joining endpoint paths.
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let parsed = Url::parse(&normalized).map_err(|e| invalid(e.to_string()))?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("expected an http(s) base URL".into()));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ApiError::Transport {
            endpoint: parsed.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url.join(path).map_err(|e| ApiError::InvalidUrl {
            url: format!("{}{path}", self.base_url),
            reason: e.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        debug!(endpoint = path, "GET");
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let resp = request.send().await.map_err(|e| transport(path, e))?;
        decode(path, resp).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self.send_post(path, body).await?;
        decode(path, resp).await
    }

    /// POST where the node answers with an empty body on success.
    async fn post_no_content<B>(&self, path: &str, body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let resp = self.send_post(path, body).await?;
        checked_body(path, resp).await.map(|_| ())
    }

    async fn send_post<B>(&self, path: &str, body: &B) -> Result<Response, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        debug!(endpoint = path, "POST");
        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport(path, e))
    }
}

fn transport(path: &str, err: reqwest::Error) -> ApiError {
    ApiError::Transport {
        endpoint: path.to_string(),
        reason: err.to_string(),
    }
}

/// Read the body, turning a non-2xx status into [`ApiError::Status`].
async fn checked_body(path: &str, resp: Response) -> Result<String, ApiError> {
    let status = resp.status();
    let body = resp.text().await.map_err(|e| transport(path, e))?;
    if !status.is_success() {
        return Err(ApiError::Status {
            endpoint: path.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

async fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> Result<T, ApiError> {
    let body = checked_body(path, resp).await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode {
        endpoint: path.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl NodeApi for NodeClient {
    async fn federation_members(&self) -> Result<Vec<FederationMember>, ApiError> {
        self.get(paths::FEDERATION_MEMBERS, &[]).await
    }

    async fn node_status(&self) -> Result<NodeStatus, ApiError> {
        self.get(paths::NODE_STATUS, &[]).await
    }

    async fn federation_gateway_info(&self) -> Result<FederationGatewayInfo, ApiError> {
        self.get(paths::FEDERATION_GATEWAY_INFO, &[]).await
    }

    async fn wallet_balance(&self, wallet_name: &str) -> Result<WalletBalance, ApiError> {
        self.get(paths::WALLET_BALANCE, &[("WalletName", wallet_name)])
            .await
    }

    async fn spendable_outputs(
        &self,
        wallet_name: &str,
        account_name: &str,
    ) -> Result<Vec<SpendableOutput>, ApiError> {
        let resp: SpendableTransactions = self
            .get(
                paths::SPENDABLE_TRANSACTIONS,
                &[("WalletName", wallet_name), ("AccountName", account_name)],
            )
            .await?;
        Ok(resp.transactions)
    }

    async fn build_transaction(
        &self,
        request: &BuildTransactionRequest,
    ) -> Result<BuiltTransaction, ApiError> {
        self.post(paths::BUILD_TRANSACTION, request).await
    }

    async fn send_transaction(
        &self,
        request: &SendTransactionRequest,
    ) -> Result<SendTransactionResponse, ApiError> {
        self.post(paths::SEND_TRANSACTION, request).await
    }

    async fn start_staking(&self, request: &StartStakingRequest) -> Result<(), ApiError> {
        self.post_no_content(paths::START_STAKING, request).await
    }

    async fn staking_info(&self) -> Result<StakingInfo, ApiError> {
        self.get(paths::STAKING_INFO, &[]).await
    }

    async fn list_wallets(&self) -> Result<WalletList, ApiError> {
        self.get(paths::LIST_WALLETS, &[]).await
    }

    async fn accounts(&self, wallet_name: &str) -> Result<Vec<String>, ApiError> {
        self.get(paths::ACCOUNTS, &[("WalletName", wallet_name)]).await
    }

    async fn peer_info(&self) -> Result<Vec<PeerInfo>, ApiError> {
        self.get(paths::PEER_INFO, &[]).await
    }

    async fn add_node(&self, endpoint: &str, command: AddNodeCommand) -> Result<bool, ApiError> {
        self.get(
            paths::ADD_NODE,
            &[("endpoint", endpoint), ("command", command.as_str())],
        )
        .await
    }
}
