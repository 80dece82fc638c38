use super::confirm::ConfirmationCeiling;
use super::cursor::PageCursor;
use super::filter::UtxoFilter;
use super::page::{Page, build_page};
use crate::db::{AggregateKey, AggregateOrder, Direction, UtxoStore};
use crate::error::QueryResult;
use crate::types::AggregateUtxo;

/// Per `(address, asset_type)` totals in ascending order of `order`'s sort key.
pub fn list_aggregate_utxo(
    store: &dyn UtxoStore,
    order: AggregateOrder,
    filter: &UtxoFilter,
    ceiling: ConfirmationCeiling,
    cursor: Option<&PageCursor<AggregateKey>>,
    limit: usize,
) -> QueryResult<Vec<AggregateUtxo>> {
    let Some(eligibility) = ceiling.eligibility() else {
        return Ok(Vec::new());
    };

    let direction = cursor.map(|c| c.direction()).unwrap_or(Direction::Forward);
    let bound = cursor.map(|c| c.key());

    let mut rows = store.query_aggregates(
        order,
        &filter.to_predicate(eligibility),
        bound,
        direction,
        limit,
    )?;
    if direction == Direction::Backward {
        rows.reverse();
    }

    Ok(rows)
}

pub fn get_aggregate_utxo_page(
    store: &dyn UtxoStore,
    order: AggregateOrder,
    filter: &UtxoFilter,
    ceiling: ConfirmationCeiling,
    cursor: Option<&PageCursor<AggregateKey>>,
    items_per_page: usize,
) -> QueryResult<Page<AggregateUtxo>> {
    let rows = list_aggregate_utxo(store, order, filter, ceiling, cursor, items_per_page + 1)?;
    Ok(build_page(rows, cursor, items_per_page, order, AggregateKey::of))
}

/// Number of groups `list_aggregate_utxo` would page through for the same filter and ceiling.
pub fn count_aggregate_utxo(
    store: &dyn UtxoStore,
    filter: &UtxoFilter,
    ceiling: ConfirmationCeiling,
) -> QueryResult<u64> {
    let Some(eligibility) = ceiling.eligibility() else {
        return Ok(0);
    };

    Ok(store.count_aggregates(&filter.to_predicate(eligibility))?)
}

/// The single group of a pinned address and asset type.
pub fn get_aggregate_utxo(
    store: &dyn UtxoStore,
    filter: &UtxoFilter,
    ceiling: ConfirmationCeiling,
) -> QueryResult<Option<AggregateUtxo>> {
    let rows = list_aggregate_utxo(store, AggregateOrder::AssetType, filter, ceiling, None, 1)?;
    Ok(rows.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UtxoDB;
    use crate::db::test_util::*;
    use crate::query::cursor::decode_key;
    use crate::types::Quantity;

    fn seed(db: &UtxoDB) {
        add_blocks(db, 20);
        let addresses = ["alice", "bob", "carol", "dave"];
        let mut n = 0u8;
        for block_number in 1..=10u64 {
            for (i, address) in addresses.iter().enumerate() {
                if (block_number as usize + i) % 3 == 0 {
                    continue;
                }
                let asset_type = asset((block_number % 3) as u8);
                add_utxo(db, address, asset_type, block_number, n, block_number * 100);
                n = n.wrapping_add(1);
            }
        }
    }

    fn collect_all(
        db: &UtxoDB,
        order: AggregateOrder,
        filter: &UtxoFilter,
        ceiling: ConfirmationCeiling,
    ) -> Vec<AggregateUtxo> {
        let mut all = Vec::new();
        let mut cursor: Option<PageCursor<AggregateKey>> = None;
        loop {
            let page =
                get_aggregate_utxo_page(db, order, filter, ceiling, cursor.as_ref(), 2).unwrap();
            all.extend(page.data);
            if !page.has_next_page {
                break;
            }
            let key = decode_key::<AggregateKey>(&page.last_evaluated_key.unwrap(), order).unwrap();
            cursor = Some(PageCursor::After(key));
        }
        all
    }

    #[test]
    fn test_count_matches_paging() {
        let db = open_test_db("test_count_matches_paging");
        seed(&db);

        let ceilings = [
            ConfirmationCeiling::Unbounded,
            ConfirmationCeiling::AtMost(4),
            ConfirmationCeiling::Empty,
        ];
        let filters = [
            UtxoFilter::default(),
            UtxoFilter {
                address: Some("bob".to_string()),
                ..Default::default()
            },
            UtxoFilter {
                asset_type: Some(asset(1)),
                ..Default::default()
            },
        ];

        for ceiling in ceilings {
            for filter in &filters {
                let order = AggregateOrder::for_address_filter(filter.address.as_deref());
                let groups = collect_all(&db, order, filter, ceiling);
                let count = count_aggregate_utxo(&*db, filter, ceiling).unwrap();
                assert_eq!(count, groups.len() as u64, "{:?} {:?}", filter, ceiling);

                // No duplicate groups across pages
                let mut keys: Vec<_> = groups.iter().map(|g| (g.address.clone(), g.asset_type)).collect();
                keys.sort();
                keys.dedup();
                assert_eq!(keys.len(), groups.len());
            }
        }
    }

    #[test]
    fn test_order_selection() {
        let db = open_test_db("test_aggregate_order_selection");
        seed(&db);

        let groups = collect_all(
            &db,
            AggregateOrder::Address,
            &UtxoFilter::default(),
            ConfirmationCeiling::Unbounded,
        );
        let keys: Vec<_> = groups.iter().map(|g| (g.address.clone(), g.asset_type)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);

        let groups = collect_all(
            &db,
            AggregateOrder::AssetType,
            &UtxoFilter::default(),
            ConfirmationCeiling::Unbounded,
        );
        let keys: Vec<_> = groups.iter().map(|g| (g.asset_type, g.address.clone())).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);

        assert_eq!(
            AggregateOrder::for_address_filter(Some("alice")),
            AggregateOrder::AssetType
        );
        assert_eq!(AggregateOrder::for_address_filter(None), AggregateOrder::Address);
    }

    #[test]
    fn test_backward_aggregate_page() {
        let db = open_test_db("test_backward_aggregate_page");
        seed(&db);

        let order = AggregateOrder::Address;
        let filter = UtxoFilter::default();
        let all = collect_all(&db, order, &filter, ConfirmationCeiling::Unbounded);
        let last = all.last().unwrap();

        let cursor = PageCursor::Before(AggregateKey::of(last));
        let page = get_aggregate_utxo_page(
            &*db,
            order,
            &filter,
            ConfirmationCeiling::Unbounded,
            Some(&cursor),
            3,
        )
        .unwrap();

        assert_eq!(page.data, all[all.len() - 4..all.len() - 1].to_vec());
        assert!(page.has_previous_page);
        assert!(page.has_next_page);
    }

    #[test]
    fn test_single_aggregate() {
        let db = open_test_db("test_single_aggregate");
        add_blocks(&db, 5);
        add_utxo(&db, "alice", asset(1), 1, 0, 5);
        add_utxo(&db, "alice", asset(1), 2, 0, 7);
        add_utxo(&db, "alice", asset(2), 2, 1, 100);

        let filter = UtxoFilter {
            address: Some("alice".to_string()),
            asset_type: Some(asset(1)),
            shard_id: None,
        };
        let aggregate = get_aggregate_utxo(&*db, &filter, ConfirmationCeiling::Unbounded)
            .unwrap()
            .unwrap();
        assert_eq!(aggregate.total_asset_quantity, Quantity::from(12));
        assert_eq!(aggregate.utxo_quantity, 2);

        let aggregate = get_aggregate_utxo(&*db, &filter, ConfirmationCeiling::AtMost(1))
            .unwrap()
            .unwrap();
        assert_eq!(aggregate.total_asset_quantity, Quantity::from(5));

        let missing = UtxoFilter {
            address: Some("bob".to_string()),
            ..filter
        };
        assert_eq!(
            get_aggregate_utxo(&*db, &missing, ConfirmationCeiling::Unbounded).unwrap(),
            None
        );
    }
}
