use crate::types::{AggregateUtxo, AssetScheme, BlockRecord, UtxoRecord};
use indexer_util::{AssetType, H256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Paging direction. Comparison operator and sort order always flip together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    // Rows after the bound, ascending
    Forward,
    // Rows before the bound, descending (nearest predecessors first)
    Backward,
}

impl Direction {
    pub fn comparison(&self) -> &'static str {
        match self {
            Direction::Forward => ">",
            Direction::Backward => "<",
        }
    }

    pub fn sort_order(&self) -> &'static str {
        match self {
            Direction::Forward => "ASC",
            Direction::Backward => "DESC",
        }
    }
}

/// Which outputs count as unspent for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Unspent at the current head, optionally created at or before a block ceiling.
    Unspent { max_block_number: Option<u64> },

    /// The UTXO set as it was right after the given block.
    UnspentAt(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPredicate {
    pub address: Option<String>,
    pub asset_type: Option<AssetType>,
    pub shard_id: Option<u16>,
    pub eligibility: Eligibility,
}

/// Sort key of the flat UTXO listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct UtxoKey {
    pub block_number: u64,
    pub transaction_hash: H256,
    pub output_index: u32,
}

impl UtxoKey {
    pub fn of(utxo: &UtxoRecord) -> Self {
        Self {
            block_number: utxo.block_number,
            transaction_hash: utxo.transaction_hash,
            output_index: utxo.output_index,
        }
    }
}

/// Primary sort column of an aggregate listing. The other group column breaks ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregateOrder {
    Address,
    AssetType,
}

impl AggregateOrder {
    /// A pinned address leaves the asset type as the only varying group column.
    pub fn for_address_filter(address: Option<&str>) -> Self {
        if address.is_some() {
            AggregateOrder::AssetType
        } else {
            AggregateOrder::Address
        }
    }

    pub fn columns(&self) -> [&'static str; 2] {
        match self {
            AggregateOrder::Address => ["address", "asset_type"],
            AggregateOrder::AssetType => ["asset_type", "address"],
        }
    }
}

/// Group key of an aggregate row, the tuple order is given by `AggregateOrder`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateKey {
    pub address: String,
    pub asset_type: AssetType,
}

impl AggregateKey {
    pub fn of(aggregate: &AggregateUtxo) -> Self {
        Self {
            address: aggregate.address.clone(),
            asset_type: aggregate.asset_type,
        }
    }
}

/// Read side of the persisted block/output store.
pub trait UtxoStore: Send + Sync {
    /// Latest indexed block number, `None` before the first block is indexed.
    fn current_head_height(&self) -> Result<Option<u64>, String>;

    /// Latest block with `timestamp <= timestamp`.
    fn resolve_block_by_timestamp(&self, timestamp: u64) -> Result<Option<BlockRecord>, String>;

    fn query_outputs(
        &self,
        predicate: &OutputPredicate,
        bound: Option<&UtxoKey>,
        direction: Direction,
        limit: usize,
    ) -> Result<Vec<UtxoRecord>, String>;

    fn query_aggregates(
        &self,
        order: AggregateOrder,
        predicate: &OutputPredicate,
        bound: Option<&AggregateKey>,
        direction: Direction,
        limit: usize,
    ) -> Result<Vec<AggregateUtxo>, String>;

    fn count_aggregates(&self, predicate: &OutputPredicate) -> Result<u64, String>;

    fn get_asset_scheme(&self, asset_type: &AssetType) -> Result<Option<AssetScheme>, String>;
}

pub type UtxoStoreRef = Arc<dyn UtxoStore>;
