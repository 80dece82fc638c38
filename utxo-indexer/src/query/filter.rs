use super::cursor::{CursorKey, PageCursor, parse_cursor};
use crate::config::QueryConfig;
use crate::db::{Eligibility, OutputPredicate};
use crate::error::{QueryError, QueryResult};
use indexer_util::AssetType;
use serde::{Deserialize, Serialize};

/// Every option a UTXO or aggregate query accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UtxoQueryParams {
    pub address: Option<String>,
    pub asset_type: Option<String>,
    pub shard_id: Option<u16>,

    pub only_confirmed: Option<bool>,
    pub confirm_threshold: Option<u64>,

    pub first_evaluated_key: Option<String>,
    pub last_evaluated_key: Option<String>,
    pub items_per_page: Option<usize>,

    // Wait for the ingestion worker to reach the node tip first
    pub sync: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddressAssetParams {
    pub address: String,
    pub asset_type: String,
    pub shard_id: Option<u16>,
    pub only_confirmed: Option<bool>,
    pub confirm_threshold: Option<u64>,
    pub sync: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SnapshotParams {
    pub asset_type: String,
    /// RFC 3339 date-time, `YYYY-MM-DD` or unix seconds. A bare integer is
    /// always seconds, so `"2019"` is 1970-01-01T00:33:39Z and not a year.
    pub date: String,
    pub first_evaluated_key: Option<String>,
    pub last_evaluated_key: Option<String>,
    pub items_per_page: Option<usize>,
    pub sync: Option<bool>,
}

/// Validated filter columns, all ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoFilter {
    pub address: Option<String>,
    pub asset_type: Option<AssetType>,
    pub shard_id: Option<u16>,
}

impl UtxoFilter {
    pub fn to_predicate(&self, eligibility: Eligibility) -> OutputPredicate {
        OutputPredicate {
            address: self.address.clone(),
            asset_type: self.asset_type,
            shard_id: self.shard_id,
            eligibility,
        }
    }
}

pub fn parse_address(address: &str) -> QueryResult<String> {
    let address = address.trim();
    if address.is_empty() {
        return Err(QueryError::InvalidParams("address must not be empty".to_string()));
    }
    Ok(address.to_string())
}

pub fn parse_asset_type(asset_type: &str) -> QueryResult<AssetType> {
    indexer_util::parse_asset_type(asset_type.trim()).map_err(QueryError::InvalidAssetType)
}

pub fn parse_items_per_page(items_per_page: Option<usize>, config: &QueryConfig) -> QueryResult<usize> {
    let items_per_page = items_per_page.unwrap_or(config.default_items_per_page);
    if items_per_page == 0 || items_per_page > config.max_items_per_page {
        return Err(QueryError::InvalidParams(format!(
            "itemsPerPage must be in 1..={}, got {}",
            config.max_items_per_page, items_per_page
        )));
    }
    Ok(items_per_page)
}

impl UtxoQueryParams {
    pub fn filter(&self) -> QueryResult<UtxoFilter> {
        Ok(UtxoFilter {
            address: self.address.as_deref().map(parse_address).transpose()?,
            asset_type: self.asset_type.as_deref().map(parse_asset_type).transpose()?,
            shard_id: self.shard_id,
        })
    }

    pub fn items_per_page(&self, config: &QueryConfig) -> QueryResult<usize> {
        parse_items_per_page(self.items_per_page, config)
    }

    pub fn cursor<K: CursorKey>(&self, shape: K::Shape) -> QueryResult<Option<PageCursor<K>>> {
        parse_cursor(
            self.first_evaluated_key.as_deref(),
            self.last_evaluated_key.as_deref(),
            shape,
        )
    }

    pub fn wants_sync(&self) -> bool {
        self.sync.unwrap_or(false)
    }
}

impl AddressAssetParams {
    pub fn filter(&self) -> QueryResult<UtxoFilter> {
        Ok(UtxoFilter {
            address: Some(parse_address(&self.address)?),
            asset_type: Some(parse_asset_type(&self.asset_type)?),
            shard_id: self.shard_id,
        })
    }

    pub fn wants_sync(&self) -> bool {
        self.sync.unwrap_or(false)
    }
}

impl SnapshotParams {
    pub fn wants_sync(&self) -> bool {
        self.sync.unwrap_or(false)
    }
}
