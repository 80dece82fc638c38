use super::confirm::ConfirmationCeiling;
use super::cursor::PageCursor;
use super::filter::UtxoFilter;
use super::page::{Page, build_page};
use crate::db::{Direction, OutputPredicate, UtxoKey, UtxoStore};
use crate::error::QueryResult;
use crate::types::UtxoRecord;

/// Fetch up to `limit` outputs in ascending sort-key order.
pub fn list_utxo(
    store: &dyn UtxoStore,
    filter: &UtxoFilter,
    ceiling: ConfirmationCeiling,
    cursor: Option<&PageCursor<UtxoKey>>,
    limit: usize,
) -> QueryResult<Vec<UtxoRecord>> {
    let Some(eligibility) = ceiling.eligibility() else {
        return Ok(Vec::new());
    };

    fetch_outputs(store, &filter.to_predicate(eligibility), cursor, limit)
}

/// Backward pages come back from the store in descending order and are
/// reversed here, after the limit was applied.
pub(crate) fn fetch_outputs(
    store: &dyn UtxoStore,
    predicate: &OutputPredicate,
    cursor: Option<&PageCursor<UtxoKey>>,
    limit: usize,
) -> QueryResult<Vec<UtxoRecord>> {
    let direction = cursor.map(|c| c.direction()).unwrap_or(Direction::Forward);
    let bound = cursor.map(|c| c.key());

    let mut rows = store.query_outputs(predicate, bound, direction, limit)?;
    if direction == Direction::Backward {
        rows.reverse();
    }

    Ok(rows)
}

pub fn get_utxo_page(
    store: &dyn UtxoStore,
    filter: &UtxoFilter,
    ceiling: ConfirmationCeiling,
    cursor: Option<&PageCursor<UtxoKey>>,
    items_per_page: usize,
) -> QueryResult<Page<UtxoRecord>> {
    let rows = list_utxo(store, filter, ceiling, cursor, items_per_page + 1)?;
    Ok(build_page(rows, cursor, items_per_page, (), UtxoKey::of))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UtxoDB;
    use crate::db::test_util::*;
    use crate::query::cursor::decode_key;
    use indexer_util::AssetType;

    fn seed(db: &UtxoDB) -> Vec<UtxoRecord> {
        add_blocks(db, 20);
        let mut all = Vec::new();
        for block_number in [2u64, 3, 5, 8, 13] {
            for n in 0..3u8 {
                let address = if n % 2 == 0 { "alice" } else { "bob" };
                all.push(add_utxo(db, address, asset(1), block_number, n, 10 + n as u64));
            }
        }
        add_utxo(db, "alice", asset(2), 4, 9, 1);
        all
    }

    fn asset_filter(asset_type: AssetType) -> UtxoFilter {
        UtxoFilter {
            asset_type: Some(asset_type),
            ..Default::default()
        }
    }

    fn page_forward(
        db: &UtxoDB,
        filter: &UtxoFilter,
        key: Option<&str>,
        items_per_page: usize,
    ) -> Page<UtxoRecord> {
        let cursor = key.map(|k| PageCursor::After(decode_key::<UtxoKey>(k, ()).unwrap()));
        get_utxo_page(
            db,
            filter,
            ConfirmationCeiling::Unbounded,
            cursor.as_ref(),
            items_per_page,
        )
        .unwrap()
    }

    #[test]
    fn test_forward_paging_completeness() {
        let db = open_test_db("test_forward_paging_completeness");
        let expected = seed(&db);
        let filter = asset_filter(asset(1));

        let mut collected = Vec::new();
        let mut key: Option<String> = None;
        let mut pages = 0;
        loop {
            let page = page_forward(&db, &filter, key.as_deref(), 4);
            assert_eq!(page.has_previous_page, key.is_some());
            collected.extend(page.data.clone());
            pages += 1;
            if !page.has_next_page {
                break;
            }
            key = page.last_evaluated_key;
        }

        assert_eq!(pages, 4);
        assert_eq!(collected, expected);
    }

    #[test]
    fn test_backward_paging_symmetry() {
        let db = open_test_db("test_backward_paging_symmetry");
        let expected = seed(&db);
        let filter = asset_filter(asset(1));

        // Walk to the last page first
        let mut page = page_forward(&db, &filter, None, 4);
        while page.has_next_page {
            page = page_forward(&db, &filter, page.last_evaluated_key.as_deref(), 4);
        }

        let mut collected: Vec<UtxoRecord> = page.data.clone();
        while page.has_previous_page {
            let key = decode_key::<UtxoKey>(page.first_evaluated_key.as_ref().unwrap(), ()).unwrap();
            let cursor = PageCursor::Before(key);
            page = get_utxo_page(
                &*db,
                &filter,
                ConfirmationCeiling::Unbounded,
                Some(&cursor),
                4,
            )
            .unwrap();

            // Each backward page is itself ascending
            let keys: Vec<UtxoKey> = page.data.iter().map(UtxoKey::of).collect();
            let mut sorted = keys.clone();
            sorted.sort();
            assert_eq!(keys, sorted);
            assert!(page.has_next_page);

            let mut merged = page.data.clone();
            merged.extend(collected);
            collected = merged;
        }

        assert_eq!(collected, expected);
    }

    #[test]
    fn test_filters_are_anded() {
        let db = open_test_db("test_filters_are_anded");
        seed(&db);

        let filter = UtxoFilter {
            address: Some("bob".to_string()),
            asset_type: Some(asset(1)),
            shard_id: Some(0),
        };
        let rows = list_utxo(&*db, &filter, ConfirmationCeiling::Unbounded, None, 100).unwrap();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.address == "bob" && r.asset_type == asset(1)));

        let filter = UtxoFilter {
            shard_id: Some(1),
            ..Default::default()
        };
        let rows = list_utxo(&*db, &filter, ConfirmationCeiling::Unbounded, None, 100).unwrap();
        assert!(rows.is_empty());

        // No filter at all returns every output
        let rows = list_utxo(&*db, &UtxoFilter::default(), ConfirmationCeiling::Unbounded, None, 100)
            .unwrap();
        assert_eq!(rows.len(), 16);
    }

    #[test]
    fn test_ceiling() {
        let db = open_test_db("test_utxo_ceiling");
        seed(&db);
        let filter = asset_filter(asset(1));

        let rows = list_utxo(&*db, &filter, ConfirmationCeiling::AtMost(5), None, 100).unwrap();
        assert_eq!(rows.len(), 9);
        assert!(rows.iter().all(|r| r.block_number <= 5));

        let page = get_utxo_page(&*db, &filter, ConfirmationCeiling::Empty, None, 10).unwrap();
        assert!(page.data.is_empty());
        assert!(!page.has_next_page);
    }
}
