use crate::error::QueryError;
use crate::query::{AddressAssetParams, Page, SnapshotPage, SnapshotParams, UtxoQueryParams};
use crate::status::SyncStatus;
use crate::types::{AggregateUtxo, AssetScheme, UtxoRecord};
use jsonrpc_core::{BoxFuture, Error as JsonError, ErrorCode, Result as JsonResult};
use jsonrpc_derive::rpc;
use serde_json::json;

// Returned when the sync-before-query step times out or fails
pub const UNAVAILABLE_ERROR_CODE: i64 = -32001;

#[rpc(server)]
pub trait UtxoIndexerRpc {
    /// Gets the latest indexed block number, null before the first block
    #[rpc(name = "get_block_height")]
    fn get_block_height(&self) -> BoxFuture<JsonResult<Option<u64>>>;

    /// Gets the current sync status
    #[rpc(name = "get_sync_status")]
    fn get_sync_status(&self) -> JsonResult<SyncStatus>;

    /// Lists unspent outputs, one page at a time
    #[rpc(name = "get_utxo")]
    fn get_utxo(&self, params: UtxoQueryParams) -> BoxFuture<JsonResult<Page<UtxoRecord>>>;

    /// Lists per (address, asset type) totals, one page at a time
    #[rpc(name = "get_aggregate_utxo")]
    fn get_aggregate_utxo(
        &self,
        params: UtxoQueryParams,
    ) -> BoxFuture<JsonResult<Page<AggregateUtxo>>>;

    #[rpc(name = "get_aggregate_utxo_count")]
    fn get_aggregate_utxo_count(&self, params: UtxoQueryParams) -> BoxFuture<JsonResult<u64>>;

    /// Gets the totals of one address for one asset type
    #[rpc(name = "get_address_asset_aggregate")]
    fn get_address_asset_aggregate(
        &self,
        params: AddressAssetParams,
    ) -> BoxFuture<JsonResult<Option<AggregateUtxo>>>;

    /// Gets the UTXO set of one asset type at a point in time
    #[rpc(name = "get_snapshot")]
    fn get_snapshot(&self, params: SnapshotParams) -> BoxFuture<JsonResult<Option<SnapshotPage>>>;

    #[rpc(name = "get_asset_scheme")]
    fn get_asset_scheme(&self, asset_type: String) -> BoxFuture<JsonResult<Option<AssetScheme>>>;

    #[rpc(name = "stop")]
    fn stop(&self) -> JsonResult<()>;
}

pub fn to_json_error(e: QueryError) -> JsonError {
    let code = if e.is_validation() {
        ErrorCode::InvalidParams
    } else if let QueryError::Unavailable(_) = e {
        ErrorCode::ServerError(UNAVAILABLE_ERROR_CODE)
    } else {
        ErrorCode::InternalError
    };

    JsonError {
        code,
        message: e.to_string(),
        data: Some(json!({ "kind": e.kind() })),
    }
}
