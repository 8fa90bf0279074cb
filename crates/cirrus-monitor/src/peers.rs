//! Peer reconnection: re-add configured peers that dropped off the node.

use cirrus_api::{AddNodeCommand, ApiError, NodeApi};
use tracing::{debug, info, warn};

/// `[::ffff:1.2.3.4]:16179` → `1.2.3.4:16179`; other forms are trimmed only.
pub fn normalize_endpoint(addr: &str) -> String {
    let addr = addr.trim();
    if let Some(rest) = addr.strip_prefix("[::ffff:") {
        if let Some((ip, port)) = rest.split_once("]:") {
            if !ip.contains(':') {
                return format!("{ip}:{port}");
            }
        }
    }
    addr.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconnectReport {
    /// Configured peers already connected.
    pub connected: Vec<String>,
    /// Peers removed and re-added.
    pub reconnected: Vec<String>,
    /// Peers whose `add` call failed, with the error.
    pub failed: Vec<(String, String)>,
}

/// For each endpoint missing from `getpeerinfo`, issue `remove` then `add`.
///
/// A failed `remove` is ignored (the node may not know the peer); a failed
/// `add` is recorded and the remaining endpoints are still tried.
pub async fn reconnect_peers<A: NodeApi + ?Sized>(
    api: &A,
    endpoints: &[String],
) -> Result<ReconnectReport, ApiError> {
    let mut report = ReconnectReport::default();
    if endpoints.is_empty() {
        return Ok(report);
    }

    let connected: Vec<String> = api
        .peer_info()
        .await?
        .iter()
        .map(|p| normalize_endpoint(&p.addr))
        .collect();

    for endpoint in endpoints {
        let wanted = normalize_endpoint(endpoint);
        if connected.contains(&wanted) {
            report.connected.push(wanted);
            continue;
        }

        if let Err(e) = api.add_node(&wanted, AddNodeCommand::Remove).await {
            debug!(peer = %wanted, error = %e, "addnode remove failed");
        }
        match api.add_node(&wanted, AddNodeCommand::Add).await {
            Ok(_) => {
                info!(peer = %wanted, "Peer re-added");
                report.reconnected.push(wanted);
            }
            Err(e) => {
                warn!(peer = %wanted, error = %e, "Failed to re-add peer");
                report.failed.push((wanted, e.to_string()));
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_api::PeerInfo;
    use cirrus_api::testing::FakeNode;

    fn peer(addr: &str) -> PeerInfo {
        PeerInfo {
            id: 0,
            addr: addr.into(),
            inbound: false,
            subver: String::new(),
            startingheight: 0,
        }
    }

    #[test]
    fn normalize_mapped_ipv4() {
        assert_eq!(normalize_endpoint("[::ffff:10.0.0.5]:16179"), "10.0.0.5:16179");
        assert_eq!(normalize_endpoint(" 10.0.0.5:16179 "), "10.0.0.5:16179");
        assert_eq!(normalize_endpoint("[2001:db8::1]:16179"), "[2001:db8::1]:16179");
    }

    #[tokio::test]
    async fn missing_peer_is_removed_then_added() {
        let node = FakeNode::new();
        node.state().peers = vec![peer("[::ffff:1.1.1.1]:16179")];

        let wanted = vec!["1.1.1.1:16179".to_string(), "2.2.2.2:16179".to_string()];
        let report = reconnect_peers(&node, &wanted).await.unwrap();

        assert_eq!(report.connected, ["1.1.1.1:16179"]);
        assert_eq!(report.reconnected, ["2.2.2.2:16179"]);
        let calls = node.state().add_node_calls.clone();
        assert_eq!(
            calls,
            vec![
                ("2.2.2.2:16179".to_string(), AddNodeCommand::Remove),
                ("2.2.2.2:16179".to_string(), AddNodeCommand::Add),
            ]
        );
    }

    #[tokio::test]
    async fn nothing_configured_makes_no_calls() {
        let node = FakeNode::new();
        let report = reconnect_peers(&node, &[]).await.unwrap();
        assert_eq!(report, ReconnectReport::default());
        assert!(node.state().calls.is_empty());
    }

    #[tokio::test]
    async fn unreachable_node_is_error() {
        let node = FakeNode::unreachable();
        let err = reconnect_peers(&node, &["1.1.1.1:16179".into()]).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }));
    }
}
