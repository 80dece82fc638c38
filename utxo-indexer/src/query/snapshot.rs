use super::cursor::PageCursor;
use super::page::{Page, build_page};
use super::utxo::fetch_outputs;
use crate::db::{Eligibility, OutputPredicate, UtxoKey, UtxoStore};
use crate::error::{QueryError, QueryResult};
use crate::types::UtxoRecord;
use chrono::{DateTime, NaiveDate};
use indexer_util::{AssetType, H256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPage {
    pub block_number: u64,
    pub block_hash: H256,
    #[serde(flatten)]
    pub page: Page<UtxoRecord>,
}

/// Parse a snapshot time into unix seconds.
///
/// Accepts RFC 3339 (`2019-04-01T09:00:00+09:00`), a bare date (midnight UTC)
/// or integer unix seconds. Dates before 1970 are valid and yield negative values.
///
/// Integers are tried first and are never read as a year: `"2019"` is 2019 seconds.
pub fn parse_as_of(value: &str) -> QueryResult<i64> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<i64>() {
        return Ok(seconds);
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.timestamp());
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc().timestamp());
        }
    }

    Err(QueryError::InvalidDate(value.to_string()))
}

/// UTXO set of `asset_type` as it was at the last block produced at or before `as_of`.
///
/// `Ok(None)` when no block existed yet at that time. Paging is forward only.
pub fn snapshot(
    store: &dyn UtxoStore,
    asset_type: AssetType,
    as_of: &str,
    cursor: Option<&PageCursor<UtxoKey>>,
    items_per_page: usize,
) -> QueryResult<Option<SnapshotPage>> {
    if let Some(PageCursor::Before(_)) = cursor {
        return Err(QueryError::InvalidParams(
            "firstEvaluatedKey is not supported for snapshots".to_string(),
        ));
    }

    let timestamp = parse_as_of(as_of)?;
    if timestamp < 0 {
        return Ok(None);
    }

    let Some(block) = store.resolve_block_by_timestamp(timestamp as u64)? else {
        info!("No block at or before {} for snapshot of {}", as_of, asset_type);
        return Ok(None);
    };

    let predicate = OutputPredicate {
        address: None,
        asset_type: Some(asset_type),
        shard_id: None,
        eligibility: Eligibility::UnspentAt(block.number),
    };
    let rows = fetch_outputs(store, &predicate, cursor, items_per_page + 1)?;

    Ok(Some(SnapshotPage {
        block_number: block.number,
        block_hash: block.hash,
        page: build_page(rows, cursor, items_per_page, (), UtxoKey::of),
    }))
}
