use indexer_util::{AssetType, H256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Asset amount. Persisted and serialized as a decimal string so large supplies
/// survive JSON clients and SQLite's 64-bit integers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity(u128);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u128 {
        self.0
    }

    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Quantity)
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self(value as u128)
    }
}

impl FromStr for Quantity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("Invalid quantity {}: expected a decimal string", s));
        }

        s.parse::<u128>()
            .map(Quantity)
            .map_err(|e| format!("Invalid quantity {}: {}", s, e))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quantity({})", self.0)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub number: u64,
    pub hash: H256,
    pub timestamp: u64, // UNIX timestamp in seconds
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoRecord {
    pub address: String,
    pub asset_type: AssetType,
    pub shard_id: u16,
    pub quantity: Quantity,

    // The creating transaction and the output position inside it
    pub transaction_hash: H256,
    pub output_index: u32,

    pub block_number: u64,
    pub timestamp: u64,

    // Set when a later transaction consumes the output
    pub spent_block_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateUtxo {
    pub address: String,
    pub asset_type: AssetType,
    pub total_asset_quantity: Quantity,
    pub utxo_quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetScheme {
    pub asset_type: AssetType,
    pub shard_id: u16,
    pub metadata: String,
    pub name: Option<String>,
    pub supply: Quantity,
    pub registrar: Option<String>,
    pub block_number: u64,
}

impl AssetScheme {
    /// Asset metadata is usually a JSON document carrying a `name` field.
    pub fn name_from_metadata(metadata: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(metadata).ok()?;
        value.get("name")?.as_str().map(|s| s.to_string())
    }
}
