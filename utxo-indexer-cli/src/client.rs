use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use utxo_indexer::SyncStatus;
use utxo_indexer::query::{
    AddressAssetParams, Page, SnapshotPage, SnapshotParams, UtxoQueryParams,
};
use utxo_indexer::types::{AggregateUtxo, AssetScheme, UtxoRecord};

pub struct RpcClient {
    url: String,
    client: Client,
}

impl RpcClient {
    pub fn new(url: &str) -> Result<Self, String> {
        let client = Client::builder().build().map_err(|e| {
            let msg = format!("Failed to build HTTP client: {}", e);
            log::error!("{}", msg);
            msg
        })?;

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    pub async fn get_block_height(&self) -> Result<Option<u64>, String> {
        self.rpc_call::<Option<u64>>("get_block_height", json!([]))
            .await
    }

    pub async fn get_sync_status(&self) -> Result<SyncStatus, String> {
        self.rpc_call::<SyncStatus>("get_sync_status", json!([]))
            .await
    }

    pub async fn stop(&self) -> Result<(), String> {
        self.rpc_call::<()>("stop", json!([])).await
    }

    pub async fn get_utxo(&self, params: &UtxoQueryParams) -> Result<Page<UtxoRecord>, String> {
        self.rpc_call::<Page<UtxoRecord>>("get_utxo", json!([params]))
            .await
    }

    pub async fn get_aggregate_utxo(
        &self,
        params: &UtxoQueryParams,
    ) -> Result<Page<AggregateUtxo>, String> {
        self.rpc_call::<Page<AggregateUtxo>>("get_aggregate_utxo", json!([params]))
            .await
    }

    pub async fn get_aggregate_utxo_count(&self, params: &UtxoQueryParams) -> Result<u64, String> {
        self.rpc_call::<u64>("get_aggregate_utxo_count", json!([params]))
            .await
    }

    pub async fn get_address_asset_aggregate(
        &self,
        params: &AddressAssetParams,
    ) -> Result<Option<AggregateUtxo>, String> {
        self.rpc_call::<Option<AggregateUtxo>>("get_address_asset_aggregate", json!([params]))
            .await
    }

    pub async fn get_snapshot(&self, params: &SnapshotParams) -> Result<Option<SnapshotPage>, String> {
        self.rpc_call::<Option<SnapshotPage>>("get_snapshot", json!([params]))
            .await
    }

    pub async fn get_asset_scheme(&self, asset_type: &str) -> Result<Option<AssetScheme>, String> {
        self.rpc_call::<Option<AssetScheme>>("get_asset_scheme", json!([asset_type]))
            .await
    }

    async fn rpc_call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, String> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp: Value = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Failed to send RPC request: {}", e);
                log::error!("{}", msg);
                msg
            })?
            .json()
            .await
            .map_err(|e| {
                let msg = format!("Failed to parse RPC response: {}", e);
                log::error!("{}", msg);
                msg
            })?;

        if let Some(err) = resp.get("error") {
            let msg = format!("RPC Error: {}", err);
            log::error!("{}", msg);
            return Err(msg);
        }

        serde_json::from_value(resp["result"].clone()).map_err(|e| {
            let msg = format!("Failed to parse RPC result: {}", e);
            log::error!("{}", msg);
            msg
        })
    }
}
