use crate::db::{AggregateKey, AggregateOrder, Direction, UtxoKey};
use crate::error::{QueryError, QueryResult};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

/// A sort key that can travel to clients as an evaluated-key token.
///
/// The token is the key's columns as a JSON array, in sort order, wrapped in
/// URL-safe base64. `Shape` carries whatever context decides the column order.
pub trait CursorKey: Sized {
    type Shape: Copy;

    fn to_values(&self, shape: Self::Shape) -> Vec<Value>;

    fn from_values(values: &[Value], shape: Self::Shape) -> Result<Self, String>;
}

pub fn encode_key<K: CursorKey>(key: &K, shape: K::Shape) -> String {
    let json = Value::Array(key.to_values(shape)).to_string();
    URL_SAFE_NO_PAD.encode(json.as_bytes())
}

pub fn decode_key<K: CursorKey>(token: &str, shape: K::Shape) -> QueryResult<K> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.as_bytes())
        .map_err(|e| QueryError::MalformedCursor(format!("{}: {}", token, e)))?;

    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| QueryError::MalformedCursor(format!("{}: {}", token, e)))?;

    let Value::Array(values) = value else {
        return Err(QueryError::MalformedCursor(format!(
            "{}: expected an array of key values",
            token
        )));
    };

    K::from_values(&values, shape)
        .map_err(|e| QueryError::MalformedCursor(format!("{}: {}", token, e)))
}

fn check_arity(values: &[Value], arity: usize) -> Result<(), String> {
    if values.len() != arity {
        return Err(format!(
            "expected {} key values, got {}",
            arity,
            values.len()
        ));
    }
    Ok(())
}

fn u64_value(value: &Value, name: &str) -> Result<u64, String> {
    value
        .as_u64()
        .ok_or_else(|| format!("{} must be an unsigned integer", name))
}

fn str_value<'a>(value: &'a Value, name: &str) -> Result<&'a str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("{} must be a string", name))
}

impl CursorKey for UtxoKey {
    type Shape = ();

    fn to_values(&self, _shape: ()) -> Vec<Value> {
        vec![
            Value::from(self.block_number),
            Value::from(self.transaction_hash.to_hex()),
            Value::from(self.output_index),
        ]
    }

    fn from_values(values: &[Value], _shape: ()) -> Result<Self, String> {
        check_arity(values, 3)?;

        let block_number = u64_value(&values[0], "blockNumber")?;
        // Heights are stored as SQLite INTEGER
        if i64::try_from(block_number).is_err() {
            return Err(format!("blockNumber {} out of range", block_number));
        }

        let output_index = u64_value(&values[2], "outputIndex")?;
        Ok(UtxoKey {
            block_number,
            transaction_hash: str_value(&values[1], "transactionHash")?.parse()?,
            output_index: u32::try_from(output_index)
                .map_err(|_| format!("outputIndex {} out of range", output_index))?,
        })
    }
}

impl CursorKey for AggregateKey {
    type Shape = AggregateOrder;

    fn to_values(&self, order: AggregateOrder) -> Vec<Value> {
        let address = Value::from(self.address.clone());
        let asset_type = Value::from(self.asset_type.to_hex());
        match order {
            AggregateOrder::Address => vec![address, asset_type],
            AggregateOrder::AssetType => vec![asset_type, address],
        }
    }

    fn from_values(values: &[Value], order: AggregateOrder) -> Result<Self, String> {
        check_arity(values, 2)?;

        let (address, asset_type) = match order {
            AggregateOrder::Address => (&values[0], &values[1]),
            AggregateOrder::AssetType => (&values[1], &values[0]),
        };
        Ok(AggregateKey {
            address: str_value(address, "address")?.to_string(),
            asset_type: str_value(asset_type, "assetType")?.parse()?,
        })
    }
}

/// Decoded position of a page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor<K> {
    // lastEvaluatedKey: rows strictly after the key
    After(K),
    // firstEvaluatedKey: rows strictly before the key
    Before(K),
}

impl<K> PageCursor<K> {
    pub fn direction(&self) -> Direction {
        match self {
            PageCursor::After(_) => Direction::Forward,
            PageCursor::Before(_) => Direction::Backward,
        }
    }

    pub fn key(&self) -> &K {
        match self {
            PageCursor::After(key) | PageCursor::Before(key) => key,
        }
    }
}

/// Both keys at once is rejected before anything is decoded.
pub fn parse_cursor<K: CursorKey>(
    first_evaluated_key: Option<&str>,
    last_evaluated_key: Option<&str>,
    shape: K::Shape,
) -> QueryResult<Option<PageCursor<K>>> {
    match (first_evaluated_key, last_evaluated_key) {
        (Some(_), Some(_)) => Err(QueryError::ConflictingCursor),
        (Some(first), None) => Ok(Some(PageCursor::Before(decode_key(first, shape)?))),
        (None, Some(last)) => Ok(Some(PageCursor::After(decode_key(last, shape)?))),
        (None, None) => Ok(None),
    }
}
