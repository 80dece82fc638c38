use super::store::{
    AggregateKey, AggregateOrder, Direction, Eligibility, OutputPredicate, UtxoKey, UtxoStore,
};
use crate::types::{AggregateUtxo, AssetScheme, BlockRecord, Quantity, UtxoRecord};
use indexer_util::{AssetType, H256};
use rusqlite::types::{FromSql, Value};
use rusqlite::{Connection, Row};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

pub const UTXO_DB_FILE: &str = "utxo.db";

const UTXO_COLUMNS: &str = "
    address,
    asset_type,
    shard_id,
    quantity,
    transaction_hash,
    output_index,
    block_number,
    timestamp,
    spent_block_number
";

/// Positional `?` parameters are bound in push order.
#[derive(Default)]
struct WhereClause {
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl WhereClause {
    fn from_predicate(predicate: &OutputPredicate) -> Result<Self, String> {
        let mut clause = WhereClause::default();

        if let Some(address) = &predicate.address {
            clause.push("address = ?", vec![Value::Text(address.clone())]);
        }
        if let Some(asset_type) = &predicate.asset_type {
            clause.push("asset_type = ?", vec![Value::Text(asset_type.to_hex())]);
        }
        if let Some(shard_id) = predicate.shard_id {
            clause.push("shard_id = ?", vec![Value::Integer(i64::from(shard_id))]);
        }

        match predicate.eligibility {
            Eligibility::Unspent { max_block_number } => {
                clause.push("spent_block_number IS NULL", vec![]);
                if let Some(max) = max_block_number {
                    clause.push("block_number <= ?", vec![Value::Integer(sql_int(max, "block_number")?)]);
                }
            }
            Eligibility::UnspentAt(height) => {
                let height = sql_int(height, "block_number")?;
                clause.push("block_number <= ?", vec![Value::Integer(height)]);
                clause.push(
                    "(spent_block_number IS NULL OR spent_block_number > ?)",
                    vec![Value::Integer(height)],
                );
            }
        }

        Ok(clause)
    }

    fn push(&mut self, condition: &str, params: Vec<Value>) {
        self.conditions.push(condition.to_string());
        self.params.extend(params);
    }

    fn to_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }
}

/// SQLite integers are signed 64 bit.
fn sql_int<T>(value: T, name: &str) -> Result<i64, String>
where
    T: TryInto<i64> + Copy + Display,
{
    value.try_into().map_err(|_| {
        let msg = format!("{} {} is out of the storable integer range", name, value);
        error!("{}", msg);
        msg
    })
}

fn int_value<T: TryFrom<i64>>(value: i64, name: &str) -> Result<T, String> {
    T::try_from(value).map_err(|_| {
        let msg = format!("Stored {} value {} is out of range", name, value);
        error!("{}", msg);
        msg
    })
}

fn int_column<T: TryFrom<i64>>(row: &Row, index: usize, name: &str) -> Result<T, String> {
    int_value(column(row, index, name)?, name)
}

fn column<T: FromSql>(row: &Row, index: usize, name: &str) -> Result<T, String> {
    row.get::<_, T>(index).map_err(|e| {
        let msg = format!("Failed to get {} field from row: {}", name, e);
        error!("{}", msg);
        msg
    })
}

fn parse_column<T>(row: &Row, index: usize, name: &str) -> Result<T, String>
where
    T: FromStr<Err = String>,
{
    let s: String = column(row, index, name)?;
    s.parse().map_err(|e| {
        let msg = format!("Failed to parse {} from string {}: {}", name, s, e);
        error!("{}", msg);
        msg
    })
}

pub struct UtxoDB {
    db_path: PathBuf,
    conn: Mutex<Connection>,
}

impl UtxoDB {
    pub fn new(data_dir: &Path) -> Result<Self, String> {
        std::fs::create_dir_all(data_dir).map_err(|e| {
            let msg = format!("Failed to create data directory {:?}: {}", data_dir, e);
            error!("{}", msg);
            msg
        })?;

        let db_path = Self::get_db_path(data_dir);
        let conn = Connection::open(&db_path).map_err(|e| {
            let msg = format!("Failed to open UtxoDB database at {:?}: {}", db_path, e);
            error!("{}", msg);
            msg
        })?;

        let db = UtxoDB {
            db_path,
            conn: Mutex::new(conn),
        };
        db.init_db()?;

        info!("UtxoDB opened at {}", db.db_path.display());
        Ok(db)
    }

    pub fn get_db_path(data_dir: &Path) -> PathBuf {
        data_dir.join(UTXO_DB_FILE)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn init_db(&self) -> Result<(), String> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS blocks (
                number INTEGER NOT NULL PRIMARY KEY,
                hash TEXT NOT NULL UNIQUE,
                timestamp INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_blocks_timestamp
            ON blocks (timestamp);

            CREATE TABLE IF NOT EXISTS utxos (
                transaction_hash TEXT NOT NULL,
                output_index INTEGER NOT NULL,

                address TEXT NOT NULL,
                asset_type TEXT NOT NULL,
                shard_id INTEGER NOT NULL,
                quantity TEXT NOT NULL,

                block_number INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                spent_block_number INTEGER,

                PRIMARY KEY (transaction_hash, output_index)
            );

            CREATE INDEX IF NOT EXISTS idx_utxos_sort_key
            ON utxos (block_number, transaction_hash, output_index);

            CREATE INDEX IF NOT EXISTS idx_utxos_address_asset_type
            ON utxos (address, asset_type);

            CREATE INDEX IF NOT EXISTS idx_utxos_asset_type_address
            ON utxos (asset_type, address);

            CREATE TABLE IF NOT EXISTS asset_schemes (
                asset_type TEXT NOT NULL PRIMARY KEY,
                shard_id INTEGER NOT NULL,
                metadata TEXT NOT NULL,
                name TEXT,
                supply TEXT NOT NULL,
                registrar TEXT,
                block_number INTEGER NOT NULL
            );
            ",
        )
        .map_err(|e| {
            let msg = format!("Failed to initialize UtxoDB database: {}", e);
            error!("{}", msg);
            msg
        })?;

        Ok(())
    }

    pub fn insert_block(&self, block: &BlockRecord) -> Result<(), String> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO blocks (number, hash, timestamp) VALUES (?1, ?2, ?3);",
            rusqlite::params![
                sql_int(block.number, "number")?,
                block.hash.to_hex(),
                sql_int(block.timestamp, "timestamp")?
            ],
        )
        .map_err(|e| {
            let msg = format!("Failed to insert block {}: {}", block.number, e);
            error!("{}", msg);
            msg
        })?;

        debug!("Inserted block {} {}", block.number, block.hash);
        Ok(())
    }

    pub fn insert_utxo(&self, utxo: &UtxoRecord) -> Result<(), String> {
        let spent_block_number = utxo
            .spent_block_number
            .map(|n| sql_int(n, "spent_block_number"))
            .transpose()?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "
            INSERT INTO utxos (
                address,
                asset_type,
                shard_id,
                quantity,
                transaction_hash,
                output_index,
                block_number,
                timestamp,
                spent_block_number
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);
            ",
            rusqlite::params![
                utxo.address,
                utxo.asset_type.to_hex(),
                i64::from(utxo.shard_id),
                utxo.quantity.to_string(),
                utxo.transaction_hash.to_hex(),
                i64::from(utxo.output_index),
                sql_int(utxo.block_number, "block_number")?,
                sql_int(utxo.timestamp, "timestamp")?,
                spent_block_number,
            ],
        )
        .map_err(|e| {
            let msg = format!(
                "Failed to insert utxo {}:{}: {}",
                utxo.transaction_hash, utxo.output_index, e
            );
            error!("{}", msg);
            msg
        })?;

        Ok(())
    }

    /// Mark an output consumed by a transaction in `spent_block_number`.
    pub fn mark_spent(
        &self,
        transaction_hash: &H256,
        output_index: u32,
        spent_block_number: u64,
    ) -> Result<(), String> {
        let spent = sql_int(spent_block_number, "spent_block_number")?;

        let conn = self.conn.lock().unwrap();
        let affected = conn
            .execute(
                "
            UPDATE utxos
            SET spent_block_number = ?1
            WHERE transaction_hash = ?2 AND output_index = ?3 AND spent_block_number IS NULL;
            ",
                rusqlite::params![
                    spent,
                    transaction_hash.to_hex(),
                    i64::from(output_index),
                ],
            )
            .map_err(|e| {
                let msg = format!(
                    "Failed to mark utxo {}:{} spent: {}",
                    transaction_hash, output_index, e
                );
                error!("{}", msg);
                msg
            })?;

        if affected == 0 {
            let msg = format!(
                "No unspent utxo found for {}:{}",
                transaction_hash, output_index
            );
            error!("{}", msg);
            return Err(msg);
        }

        Ok(())
    }

    pub fn insert_asset_scheme(&self, scheme: &AssetScheme) -> Result<(), String> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "
            INSERT INTO asset_schemes (
                asset_type,
                shard_id,
                metadata,
                name,
                supply,
                registrar,
                block_number
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);
            ",
            rusqlite::params![
                scheme.asset_type.to_hex(),
                i64::from(scheme.shard_id),
                scheme.metadata,
                scheme.name,
                scheme.supply.to_string(),
                scheme.registrar,
                sql_int(scheme.block_number, "block_number")?,
            ],
        )
        .map_err(|e| {
            let msg = format!(
                "Failed to insert asset scheme {}: {}",
                scheme.asset_type, e
            );
            error!("{}", msg);
            msg
        })?;

        Ok(())
    }

    fn row_to_utxo(row: &Row) -> Result<UtxoRecord, String> {
        Ok(UtxoRecord {
            address: column(row, 0, "address")?,
            asset_type: parse_column(row, 1, "asset_type")?,
            shard_id: int_column(row, 2, "shard_id")?,
            quantity: parse_column(row, 3, "quantity")?,
            transaction_hash: parse_column(row, 4, "transaction_hash")?,
            output_index: int_column(row, 5, "output_index")?,
            block_number: int_column(row, 6, "block_number")?,
            timestamp: int_column(row, 7, "timestamp")?,
            spent_block_number: column::<Option<i64>>(row, 8, "spent_block_number")?
                .map(|n| int_value(n, "spent_block_number"))
                .transpose()?,
        })
    }

    fn row_to_aggregate(row: &Row) -> Result<AggregateUtxo, String> {
        let address: String = column(row, 0, "address")?;
        let asset_type: AssetType = parse_column(row, 1, "asset_type")?;
        let utxo_quantity: u64 = int_column(row, 2, "utxo_quantity")?;
        let quantities: String = column(row, 3, "quantities")?;

        // SUM() in SQLite is limited to 64 bits, so the exact total is summed here
        let mut total = Quantity::ZERO;
        for item in quantities.split(',') {
            let quantity = Quantity::from_str(item).map_err(|e| {
                let msg = format!("Failed to parse quantity of {} {}: {}", address, asset_type, e);
                error!("{}", msg);
                msg
            })?;
            total = total.checked_add(quantity).ok_or_else(|| {
                let msg = format!("Total quantity overflow for {} {}", address, asset_type);
                error!("{}", msg);
                msg
            })?;
        }

        Ok(AggregateUtxo {
            address,
            asset_type,
            total_asset_quantity: total,
            utxo_quantity,
        })
    }

    fn row_to_block(row: &Row) -> Result<BlockRecord, String> {
        Ok(BlockRecord {
            number: int_column(row, 0, "number")?,
            hash: parse_column(row, 1, "hash")?,
            timestamp: int_column(row, 2, "timestamp")?,
        })
    }

    fn row_to_asset_scheme(row: &Row) -> Result<AssetScheme, String> {
        Ok(AssetScheme {
            asset_type: parse_column(row, 0, "asset_type")?,
            shard_id: int_column(row, 1, "shard_id")?,
            metadata: column(row, 2, "metadata")?,
            name: column(row, 3, "name")?,
            supply: parse_column(row, 4, "supply")?,
            registrar: column(row, 5, "registrar")?,
            block_number: int_column(row, 6, "block_number")?,
        })
    }

    fn query_rows<T>(
        conn: &Connection,
        sql: &str,
        params: &[Value],
        parse: fn(&Row) -> Result<T, String>,
    ) -> Result<Vec<T>, String> {
        let mut stmt = conn.prepare(sql).map_err(|e| {
            let msg = format!("Failed to prepare statement {}: {}", sql.trim(), e);
            error!("{}", msg);
            msg
        })?;

        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(|e| {
                let msg = format!("Failed to execute query {}: {}", sql.trim(), e);
                error!("{}", msg);
                msg
            })?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().map_err(|e| {
            let msg = format!("Failed to get next row: {}", e);
            error!("{}", msg);
            msg
        })? {
            items.push(parse(row)?);
        }

        Ok(items)
    }
}

impl UtxoStore for UtxoDB {
    fn current_head_height(&self) -> Result<Option<u64>, String> {
        let conn = self.conn.lock().unwrap();
        let height = conn
            .query_row("SELECT MAX(number) FROM blocks", [], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .map_err(|e| {
                let msg = format!("Failed to query head block height: {}", e);
                error!("{}", msg);
                msg
            })?;

        height.map(|h| int_value(h, "number")).transpose()
    }

    fn resolve_block_by_timestamp(&self, timestamp: u64) -> Result<Option<BlockRecord>, String> {
        let conn = self.conn.lock().unwrap();
        let blocks = Self::query_rows(
            &conn,
            "
            SELECT number, hash, timestamp
            FROM blocks
            WHERE timestamp <= ?
            ORDER BY number DESC
            LIMIT 1;
            ",
            &[Value::Integer(sql_int(timestamp, "timestamp")?)],
            Self::row_to_block,
        )?;

        Ok(blocks.into_iter().next())
    }

    fn query_outputs(
        &self,
        predicate: &OutputPredicate,
        bound: Option<&UtxoKey>,
        direction: Direction,
        limit: usize,
    ) -> Result<Vec<UtxoRecord>, String> {
        let mut clause = WhereClause::from_predicate(predicate)?;
        if let Some(key) = bound {
            clause.push(
                &format!(
                    "(block_number, transaction_hash, output_index) {} (?, ?, ?)",
                    direction.comparison()
                ),
                vec![
                    Value::Integer(sql_int(key.block_number, "block_number")?),
                    Value::Text(key.transaction_hash.to_hex()),
                    Value::Integer(i64::from(key.output_index)),
                ],
            );
        }

        let order = direction.sort_order();
        let sql = format!(
            "SELECT {} FROM utxos {} ORDER BY block_number {}, transaction_hash {}, output_index {} LIMIT ?",
            UTXO_COLUMNS,
            clause.to_sql(),
            order,
            order,
            order
        );
        clause.params.push(Value::Integer(sql_int(limit, "limit")?));

        let conn = self.conn.lock().unwrap();
        Self::query_rows(&conn, &sql, &clause.params, Self::row_to_utxo)
    }

    fn query_aggregates(
        &self,
        order: AggregateOrder,
        predicate: &OutputPredicate,
        bound: Option<&AggregateKey>,
        direction: Direction,
        limit: usize,
    ) -> Result<Vec<AggregateUtxo>, String> {
        let [primary, secondary] = order.columns();

        let mut clause = WhereClause::from_predicate(predicate)?;
        if let Some(key) = bound {
            let address = Value::Text(key.address.clone());
            let asset_type = Value::Text(key.asset_type.to_hex());
            let params = match order {
                AggregateOrder::Address => vec![address, asset_type],
                AggregateOrder::AssetType => vec![asset_type, address],
            };
            clause.push(
                &format!(
                    "({}, {}) {} (?, ?)",
                    primary,
                    secondary,
                    direction.comparison()
                ),
                params,
            );
        }

        let sort = direction.sort_order();
        let sql = format!(
            "SELECT address, asset_type, COUNT(*), group_concat(quantity, ',')
            FROM utxos {}
            GROUP BY address, asset_type
            ORDER BY {} {}, {} {}
            LIMIT ?",
            clause.to_sql(),
            primary,
            sort,
            secondary,
            sort
        );
        clause.params.push(Value::Integer(sql_int(limit, "limit")?));

        let conn = self.conn.lock().unwrap();
        Self::query_rows(&conn, &sql, &clause.params, Self::row_to_aggregate)
    }

    fn count_aggregates(&self, predicate: &OutputPredicate) -> Result<u64, String> {
        let clause = WhereClause::from_predicate(predicate)?;
        let sql = format!(
            "SELECT COUNT(*) FROM (SELECT 1 FROM utxos {} GROUP BY address, asset_type)",
            clause.to_sql()
        );

        let conn = self.conn.lock().unwrap();
        let count = conn
            .query_row(&sql, rusqlite::params_from_iter(clause.params.iter()), |row| {
                row.get::<_, i64>(0)
            })
            .map_err(|e| {
                let msg = format!("Failed to count aggregate utxos: {}", e);
                error!("{}", msg);
                msg
            })?;

        int_value(count, "count")
    }

    fn get_asset_scheme(&self, asset_type: &AssetType) -> Result<Option<AssetScheme>, String> {
        let conn = self.conn.lock().unwrap();
        let schemes = Self::query_rows(
            &conn,
            "
            SELECT asset_type, shard_id, metadata, name, supply, registrar, block_number
            FROM asset_schemes
            WHERE asset_type = ?;
            ",
            &[Value::Text(asset_type.to_hex())],
            Self::row_to_asset_scheme,
        )?;

        Ok(schemes.into_iter().next())
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use std::sync::Arc;

    pub fn asset(n: u8) -> AssetType {
        let mut bytes = [0u8; 20];
        bytes[0] = 0x53;
        bytes[19] = n;
        AssetType::from_byte_array(bytes)
    }

    pub fn tx_hash(block_number: u64, n: u8) -> H256 {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&block_number.to_be_bytes());
        bytes[31] = n;
        H256::from_byte_array(bytes)
    }

    pub fn open_test_db(name: &str) -> Arc<UtxoDB> {
        let dir = std::env::temp_dir().join("utxo-indexer").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        Arc::new(UtxoDB::new(&dir).unwrap())
    }

    /// Blocks 0..=head, one every 10 seconds from t=1000.
    pub fn add_blocks(db: &UtxoDB, head: u64) {
        for number in 0..=head {
            let mut hash = [0u8; 32];
            hash[..8].copy_from_slice(&number.to_be_bytes());
            hash[31] = 0xbb;
            db.insert_block(&BlockRecord {
                number,
                hash: H256::from_byte_array(hash),
                timestamp: 1000 + number * 10,
            })
            .unwrap();
        }
    }

    pub fn add_utxo(
        db: &UtxoDB,
        address: &str,
        asset_type: AssetType,
        block_number: u64,
        n: u8,
        quantity: u64,
    ) -> UtxoRecord {
        let utxo = UtxoRecord {
            address: address.to_string(),
            asset_type,
            shard_id: 0,
            quantity: Quantity::from(quantity),
            transaction_hash: tx_hash(block_number, n),
            output_index: n as u32,
            block_number,
            timestamp: 1000 + block_number * 10,
            spent_block_number: None,
        };
        db.insert_utxo(&utxo).unwrap();
        utxo
    }
}
