use crate::config::{NodeConfig, SyncConfig};
use crate::db::UtxoStoreRef;
use crate::error::{QueryError, QueryResult};
use crate::status::SyncStatusManagerRef;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Brings the local store up to the chain tip before a query runs.
#[async_trait::async_trait]
pub trait SyncWorker: Send + Sync {
    async fn sync(&self) -> Result<(), String>;
}

pub type SyncWorkerRef = Arc<dyn SyncWorker>;

/// Wait for `worker` at most `timeout`. Both a timeout and a worker failure
/// mean the query cannot be served with fresh data.
pub async fn ensure_synced(worker: &dyn SyncWorker, timeout: Duration) -> QueryResult<()> {
    match tokio::time::timeout(timeout, worker.sync()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            let msg = format!("Sync failed: {}", e);
            warn!("{}", msg);
            Err(QueryError::Unavailable(msg))
        }
        Err(_) => {
            let msg = format!("Sync did not complete within {} ms", timeout.as_millis());
            warn!("{}", msg);
            Err(QueryError::Unavailable(msg))
        }
    }
}

/// Follows the node's best block number and waits for the ingestion side to
/// index up to it. Ingestion itself runs outside this service.
pub struct NodeTipWorker {
    rpc_url: String,
    tip_method: String,
    poll_interval: Duration,
    client: Client,
    store: UtxoStoreRef,
    status: SyncStatusManagerRef,
}

impl NodeTipWorker {
    pub fn new(
        node: &NodeConfig,
        sync: &SyncConfig,
        store: UtxoStoreRef,
        status: SyncStatusManagerRef,
    ) -> Result<Self, String> {
        let client = Client::builder().build().map_err(|e| {
            let msg = format!("Failed to build HTTP client: {}", e);
            error!("{}", msg);
            msg
        })?;

        Ok(Self {
            rpc_url: node.rpc_url.clone(),
            tip_method: node.tip_method.clone(),
            poll_interval: Duration::from_millis(sync.poll_interval_ms),
            client,
            store,
            status,
        })
    }

    pub async fn get_node_tip(&self) -> Result<u64, String> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": self.tip_method,
            "params": [],
            "id": 1
        });

        let resp: Value = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Failed to send {} to {}: {}", self.tip_method, self.rpc_url, e);
                error!("{}", msg);
                msg
            })?
            .json()
            .await
            .map_err(|e| {
                let msg = format!("Failed to parse {} response: {}", self.tip_method, e);
                error!("{}", msg);
                msg
            })?;

        if let Some(err) = resp.get("error") {
            if !err.is_null() {
                let msg = format!("Node RPC error: {}", err);
                error!("{}", msg);
                return Err(msg);
            }
        }

        parse_block_number(&resp["result"])
    }

    async fn indexed_head(&self) -> Result<u64, String> {
        let store = self.store.clone();
        let head = tokio::task::spawn_blocking(move || store.current_head_height())
            .await
            .map_err(|e| {
                let msg = format!("Head height task failed: {}", e);
                error!("{}", msg);
                msg
            })??;

        Ok(head.unwrap_or(0))
    }

    /// Refresh the sync status forever, errors are reported through the status.
    pub async fn run(&self) {
        loop {
            match self.get_node_tip().await {
                Ok(tip) => match self.indexed_head().await {
                    Ok(head) => self.status.update_progress(head, tip),
                    Err(e) => self.status.update_message(Some(e)),
                },
                Err(e) => self.status.update_message(Some(e)),
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait::async_trait]
impl SyncWorker for NodeTipWorker {
    async fn sync(&self) -> Result<(), String> {
        let tip = self.get_node_tip().await?;
        loop {
            let head = self.indexed_head().await?;
            self.status.update_progress(head, tip);
            if head >= tip {
                debug!("Indexed head {} reached node tip {}", head, tip);
                return Ok(());
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Nodes report block numbers either as JSON numbers or as decimal or `0x` strings.
fn parse_block_number(value: &Value) -> Result<u64, String> {
    let ret = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => match s.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => s.parse::<u64>().ok(),
        },
        _ => None,
    };

    ret.ok_or_else(|| {
        let msg = format!("Invalid block number in node response: {}", value);
        error!("{}", msg);
        msg
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StalledWorker;

    #[async_trait::async_trait]
    impl SyncWorker for StalledWorker {
        async fn sync(&self) -> Result<(), String> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    struct FailingWorker;

    #[async_trait::async_trait]
    impl SyncWorker for FailingWorker {
        async fn sync(&self) -> Result<(), String> {
            Err("node unreachable".to_string())
        }
    }

    struct CountingWorker {
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl SyncWorker for CountingWorker {
        async fn sync(&self) -> Result<(), String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_ensure_synced_timeout() {
        let ret = ensure_synced(&StalledWorker, Duration::from_millis(50)).await;
        assert!(matches!(ret, Err(QueryError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_ensure_synced_failure() {
        let ret = ensure_synced(&FailingWorker, Duration::from_secs(5)).await;
        match ret {
            Err(QueryError::Unavailable(msg)) => assert!(msg.contains("node unreachable")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ensure_synced_ok() {
        let worker = CountingWorker {
            calls: AtomicU32::new(0),
        };
        ensure_synced(&worker, Duration::from_secs(5)).await.unwrap();
        assert_eq!(worker.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_block_number() {
        assert_eq!(parse_block_number(&json!(42)).unwrap(), 42);
        assert_eq!(parse_block_number(&json!("42")).unwrap(), 42);
        assert_eq!(parse_block_number(&json!("0x2a")).unwrap(), 42);
        assert!(parse_block_number(&json!(null)).is_err());
        assert!(parse_block_number(&json!(-1)).is_err());
    }
}
