mod aggregate;
mod confirm;
mod cursor;
mod filter;
mod page;
mod snapshot;
mod utxo;

pub use aggregate::*;
pub use confirm::*;
pub use cursor::*;
pub use filter::*;
pub use page::*;
pub use snapshot::*;
pub use utxo::*;

use crate::config::QueryConfig;
use crate::db::{AggregateKey, AggregateOrder, UtxoKey, UtxoStoreRef};
use crate::error::{QueryError, QueryResult};
use crate::types::{AggregateUtxo, AssetScheme, UtxoRecord};
use indexer_util::AssetType;
use std::sync::Arc;

/// Validated listing parameters, built without touching the store.
pub struct ListRequest<K> {
    filter: UtxoFilter,
    items_per_page: usize,
    cursor: Option<PageCursor<K>>,
}

pub struct SnapshotRequest {
    asset_type: AssetType,
    items_per_page: usize,
    cursor: Option<PageCursor<UtxoKey>>,
}

/// Request level entry points. The `prepare_*` methods only parse, so callers
/// can reject a bad request before waiting on anything. The `get_*` methods
/// prepare, then resolve the confirmation ceiling once and share it across
/// every store call of the request.
pub struct QueryEngine {
    store: UtxoStoreRef,
    config: QueryConfig,
}

impl QueryEngine {
    pub fn new(store: UtxoStoreRef, config: QueryConfig) -> Self {
        Self { store, config }
    }

    pub fn block_height(&self) -> QueryResult<Option<u64>> {
        Ok(self.store.current_head_height()?)
    }

    fn resolve_ceiling(
        &self,
        only_confirmed: Option<bool>,
        confirm_threshold: Option<u64>,
    ) -> QueryResult<ConfirmationCeiling> {
        let ceiling = ConfirmationCeiling::resolve(
            self.store.as_ref(),
            only_confirmed,
            confirm_threshold,
            self.config.confirm_threshold,
        )?;
        Ok(ceiling)
    }

    pub fn prepare_utxo(&self, params: &UtxoQueryParams) -> QueryResult<ListRequest<UtxoKey>> {
        Ok(ListRequest {
            filter: params.filter()?,
            items_per_page: params.items_per_page(&self.config)?,
            cursor: params.cursor::<UtxoKey>(())?,
        })
    }

    pub fn prepare_aggregate(
        &self,
        params: &UtxoQueryParams,
    ) -> QueryResult<(AggregateOrder, ListRequest<AggregateKey>)> {
        let filter = params.filter()?;
        let items_per_page = params.items_per_page(&self.config)?;
        let order = AggregateOrder::for_address_filter(filter.address.as_deref());
        let cursor = params.cursor::<AggregateKey>(order)?;

        Ok((
            order,
            ListRequest {
                filter,
                items_per_page,
                cursor,
            },
        ))
    }

    pub fn prepare_snapshot(&self, params: &SnapshotParams) -> QueryResult<SnapshotRequest> {
        let asset_type = parse_asset_type(&params.asset_type)?;
        parse_as_of(&params.date)?;
        let items_per_page = parse_items_per_page(params.items_per_page, &self.config)?;
        let cursor = parse_cursor::<UtxoKey>(
            params.first_evaluated_key.as_deref(),
            params.last_evaluated_key.as_deref(),
            (),
        )?;
        if let Some(PageCursor::Before(_)) = cursor {
            return Err(QueryError::InvalidParams(
                "firstEvaluatedKey is not supported for snapshots".to_string(),
            ));
        }

        Ok(SnapshotRequest {
            asset_type,
            items_per_page,
            cursor,
        })
    }

    pub fn get_utxo(&self, params: &UtxoQueryParams) -> QueryResult<Page<UtxoRecord>> {
        let request = self.prepare_utxo(params)?;

        let ceiling = self.resolve_ceiling(params.only_confirmed, params.confirm_threshold)?;
        get_utxo_page(
            self.store.as_ref(),
            &request.filter,
            ceiling,
            request.cursor.as_ref(),
            request.items_per_page,
        )
    }

    pub fn get_aggregate_utxo(&self, params: &UtxoQueryParams) -> QueryResult<Page<AggregateUtxo>> {
        let (order, request) = self.prepare_aggregate(params)?;

        let ceiling = self.resolve_ceiling(params.only_confirmed, params.confirm_threshold)?;
        get_aggregate_utxo_page(
            self.store.as_ref(),
            order,
            &request.filter,
            ceiling,
            request.cursor.as_ref(),
            request.items_per_page,
        )
    }

    /// Cursor and page size are ignored, the count covers every page.
    pub fn get_aggregate_utxo_count(&self, params: &UtxoQueryParams) -> QueryResult<u64> {
        let filter = params.filter()?;
        let ceiling = self.resolve_ceiling(params.only_confirmed, params.confirm_threshold)?;
        count_aggregate_utxo(self.store.as_ref(), &filter, ceiling)
    }

    pub fn get_address_asset_aggregate(
        &self,
        params: &AddressAssetParams,
    ) -> QueryResult<Option<AggregateUtxo>> {
        let filter = params.filter()?;
        let ceiling = self.resolve_ceiling(params.only_confirmed, params.confirm_threshold)?;
        get_aggregate_utxo(self.store.as_ref(), &filter, ceiling)
    }

    pub fn get_snapshot(&self, params: &SnapshotParams) -> QueryResult<Option<SnapshotPage>> {
        let request = self.prepare_snapshot(params)?;

        snapshot(
            self.store.as_ref(),
            request.asset_type,
            &params.date,
            request.cursor.as_ref(),
            request.items_per_page,
        )
    }

    pub fn get_asset_scheme(&self, asset_type: &str) -> QueryResult<Option<AssetScheme>> {
        let asset_type = parse_asset_type(asset_type)?;
        Ok(self.store.get_asset_scheme(&asset_type)?)
    }
}

pub type QueryEngineRef = Arc<QueryEngine>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::*;
    use crate::db::{Direction, OutputPredicate, UtxoStore};
    use crate::types::BlockRecord;

    // Fails the test if any query reaches the store
    struct UntouchableStore;

    impl UtxoStore for UntouchableStore {
        fn current_head_height(&self) -> Result<Option<u64>, String> {
            panic!("store must not be touched");
        }

        fn resolve_block_by_timestamp(&self, _: u64) -> Result<Option<BlockRecord>, String> {
            panic!("store must not be touched");
        }

        fn query_outputs(
            &self,
            _: &OutputPredicate,
            _: Option<&UtxoKey>,
            _: Direction,
            _: usize,
        ) -> Result<Vec<UtxoRecord>, String> {
            panic!("store must not be touched");
        }

        fn query_aggregates(
            &self,
            _: AggregateOrder,
            _: &OutputPredicate,
            _: Option<&AggregateKey>,
            _: Direction,
            _: usize,
        ) -> Result<Vec<AggregateUtxo>, String> {
            panic!("store must not be touched");
        }

        fn count_aggregates(&self, _: &OutputPredicate) -> Result<u64, String> {
            panic!("store must not be touched");
        }

        fn get_asset_scheme(&self, _: &AssetType) -> Result<Option<AssetScheme>, String> {
            panic!("store must not be touched");
        }
    }

    fn untouchable_engine() -> QueryEngine {
        QueryEngine::new(Arc::new(UntouchableStore), QueryConfig::default())
    }

    fn utxo_token() -> String {
        let key = UtxoKey {
            block_number: 1,
            transaction_hash: tx_hash(1, 0),
            output_index: 0,
        };
        encode_key(&key, ())
    }

    #[test]
    fn test_conflicting_cursor_rejected_before_storage() {
        let engine = untouchable_engine();
        let params = UtxoQueryParams {
            first_evaluated_key: Some(utxo_token()),
            last_evaluated_key: Some(utxo_token()),
            only_confirmed: Some(true),
            ..Default::default()
        };

        assert_eq!(engine.get_utxo(&params), Err(QueryError::ConflictingCursor));
        assert_eq!(
            engine.get_aggregate_utxo(&params),
            Err(QueryError::ConflictingCursor)
        );

        // Garbage in both slots is still a conflict, not a decode error
        let params = UtxoQueryParams {
            first_evaluated_key: Some("!!".to_string()),
            last_evaluated_key: Some("??".to_string()),
            ..Default::default()
        };
        assert_eq!(engine.get_utxo(&params), Err(QueryError::ConflictingCursor));
    }

    #[test]
    fn test_validation_before_storage() {
        let engine = untouchable_engine();

        let params = UtxoQueryParams {
            asset_type: Some("xyz".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            engine.get_utxo(&params),
            Err(QueryError::InvalidAssetType(_))
        ));
        assert!(matches!(
            engine.get_aggregate_utxo_count(&params),
            Err(QueryError::InvalidAssetType(_))
        ));

        let params = UtxoQueryParams {
            last_evaluated_key: Some("not-a-cursor".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            engine.get_utxo(&params),
            Err(QueryError::MalformedCursor(_))
        ));

        let params = UtxoQueryParams {
            items_per_page: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            engine.get_utxo(&params),
            Err(QueryError::InvalidParams(_))
        ));

        let params = SnapshotParams {
            asset_type: asset(1).to_hex(),
            date: "tomorrow".to_string(),
            first_evaluated_key: None,
            last_evaluated_key: None,
            items_per_page: None,
            sync: None,
        };
        assert!(matches!(
            engine.get_snapshot(&params),
            Err(QueryError::InvalidDate(_))
        ));

        let params = SnapshotParams {
            asset_type: asset(1).to_hex(),
            date: "2019-01-01".to_string(),
            first_evaluated_key: Some(utxo_token()),
            last_evaluated_key: None,
            items_per_page: None,
            sync: None,
        };
        assert!(matches!(
            engine.prepare_snapshot(&params),
            Err(QueryError::InvalidParams(_))
        ));

        assert!(matches!(
            engine.get_asset_scheme("0x12"),
            Err(QueryError::InvalidAssetType(_))
        ));
    }

    #[test]
    fn test_engine_queries() {
        let db = open_test_db("test_engine_queries");
        add_blocks(&db, 100);
        let early = add_utxo(&db, "alice", asset(1), 90, 0, 10);
        add_utxo(&db, "alice", asset(1), 91, 0, 20);
        add_utxo(&db, "bob", asset(2), 50, 0, 30);

        let engine = QueryEngine::new(db.clone(), QueryConfig::default());
        assert_eq!(engine.block_height().unwrap(), Some(100));

        let params = UtxoQueryParams {
            address: Some("alice".to_string()),
            only_confirmed: Some(true),
            confirm_threshold: Some(10),
            ..Default::default()
        };
        let page = engine.get_utxo(&params).unwrap();
        assert_eq!(page.data, vec![early]);

        // Threshold without onlyConfirmed has no effect
        let params = UtxoQueryParams {
            address: Some("alice".to_string()),
            confirm_threshold: Some(10),
            ..Default::default()
        };
        assert_eq!(engine.get_utxo(&params).unwrap().data.len(), 2);

        let page = engine.get_aggregate_utxo(&UtxoQueryParams::default()).unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].address, "alice");
        assert_eq!(page.data[0].utxo_quantity, 2);
        assert_eq!(
            engine
                .get_aggregate_utxo_count(&UtxoQueryParams::default())
                .unwrap(),
            2
        );

        let params = AddressAssetParams {
            address: "bob".to_string(),
            asset_type: asset(2).to_hex(),
            shard_id: None,
            only_confirmed: None,
            confirm_threshold: None,
            sync: None,
        };
        let aggregate = engine.get_address_asset_aggregate(&params).unwrap().unwrap();
        assert_eq!(aggregate.utxo_quantity, 1);

        let params = SnapshotParams {
            asset_type: asset(1).to_hex(),
            // Block 90 has timestamp 1900
            date: "1905".to_string(),
            first_evaluated_key: None,
            last_evaluated_key: None,
            items_per_page: Some(10),
            sync: None,
        };
        let snapshot = engine.get_snapshot(&params).unwrap().unwrap();
        assert_eq!(snapshot.block_number, 90);
        assert_eq!(snapshot.page.data.len(), 1);

        assert_eq!(engine.get_asset_scheme(&asset(1).to_hex()).unwrap(), None);
    }
}
