use super::cursor::{CursorKey, PageCursor, encode_key};
use crate::db::Direction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub first_evaluated_key: Option<String>,
    pub last_evaluated_key: Option<String>,
}

/// Build the page envelope from rows fetched with `items_per_page + 1`.
///
/// Rows are in ascending order for both directions. When paging backward the
/// surplus row is the earliest one and is dropped from the front.
///
/// A backward page always has a next page, the cursor row follows it. Its
/// `has_previous_page` comes from the surplus row and not from the presence of
/// a cursor, so the first page reached by paging back reports `false`.
pub fn build_page<T, K, F>(
    mut rows: Vec<T>,
    cursor: Option<&PageCursor<K>>,
    items_per_page: usize,
    shape: K::Shape,
    key_of: F,
) -> Page<T>
where
    K: CursorKey,
    F: Fn(&T) -> K,
{
    let has_more = rows.len() > items_per_page;
    let direction = cursor.map(|c| c.direction()).unwrap_or(Direction::Forward);

    let (has_next_page, has_previous_page) = match direction {
        Direction::Forward => {
            rows.truncate(items_per_page);
            (has_more, cursor.is_some())
        }
        Direction::Backward => {
            if has_more {
                let surplus = rows.len() - items_per_page;
                rows.drain(..surplus);
            }
            (true, has_more)
        }
    };

    let first_evaluated_key = rows.first().map(|row| encode_key(&key_of(row), shape));
    let last_evaluated_key = rows.last().map(|row| encode_key(&key_of(row), shape));

    Page {
        data: rows,
        has_next_page,
        has_previous_page,
        first_evaluated_key,
        last_evaluated_key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UtxoKey;
    use crate::query::cursor::decode_key;
    use indexer_util::H256;

    fn key(n: u64) -> UtxoKey {
        UtxoKey {
            block_number: n,
            transaction_hash: H256::default(),
            output_index: 0,
        }
    }

    fn page_of(
        rows: Vec<u64>,
        cursor: Option<PageCursor<UtxoKey>>,
        items_per_page: usize,
    ) -> Page<u64> {
        build_page(rows, cursor.as_ref(), items_per_page, (), |n| key(*n))
    }

    #[test]
    fn test_forward_page() {
        let page = page_of(vec![1, 2, 3, 4], None, 3);
        assert_eq!(page.data, vec![1, 2, 3]);
        assert!(page.has_next_page);
        assert!(!page.has_previous_page);
        assert_eq!(
            decode_key::<UtxoKey>(page.first_evaluated_key.as_ref().unwrap(), ()).unwrap(),
            key(1)
        );
        // The dropped row never leaks into the cursor
        assert_eq!(
            decode_key::<UtxoKey>(page.last_evaluated_key.as_ref().unwrap(), ()).unwrap(),
            key(3)
        );

        let page = page_of(vec![5, 6], Some(PageCursor::After(key(4))), 3);
        assert_eq!(page.data, vec![5, 6]);
        assert!(!page.has_next_page);
        assert!(page.has_previous_page);
    }

    #[test]
    fn test_backward_page() {
        let page = page_of(vec![1, 2, 3, 4], Some(PageCursor::Before(key(5))), 3);
        assert_eq!(page.data, vec![2, 3, 4]);
        assert!(page.has_next_page);
        assert!(page.has_previous_page);

        let page = page_of(vec![1, 2], Some(PageCursor::Before(key(3))), 3);
        assert_eq!(page.data, vec![1, 2]);
        assert!(page.has_next_page);
        assert!(!page.has_previous_page);
    }

    #[test]
    fn test_empty_page() {
        let page = page_of(vec![], None, 3);
        assert!(page.data.is_empty());
        assert!(!page.has_next_page);
        assert_eq!(page.first_evaluated_key, None);
        assert_eq!(page.last_evaluated_key, None);
    }
}
