use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Fixed-length hash newtype, displayed and parsed as lower-case hex.
/// Parsing accepts an optional `0x` prefix.
macro_rules! hex_hash_newtype {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub const fn from_byte_array(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn from_slice(data: &[u8]) -> Result<Self, String> {
                let bytes: [u8; $len] = data.try_into().map_err(|_| {
                    format!(
                        "Invalid {} length: expected {} bytes, got {}",
                        stringify!($name),
                        $len,
                        data.len()
                    )
                })?;
                Ok(Self(bytes))
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix("0x").unwrap_or(s);
                if raw.len() != $len * 2 {
                    return Err(format!(
                        "Invalid {} {}: expected {} hex characters",
                        stringify!($name),
                        s,
                        $len * 2
                    ));
                }

                let mut bytes = [0u8; $len];
                hex::decode_to_slice(raw, &mut bytes)
                    .map_err(|e| format!("Invalid {} {}: {}", stringify!($name), s, e))?;
                Ok(Self(bytes))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_hash_newtype!(
    /// Asset type identifier, a 160-bit hash.
    AssetType,
    20
);

hex_hash_newtype!(
    /// Block and transaction hashes.
    H256,
    32
);

pub fn parse_asset_type(s: &str) -> Result<AssetType, String> {
    AssetType::from_str(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_type_parse() {
        let hex_str = "5300000000000000000000000000000000000001";
        let asset_type = AssetType::from_str(hex_str).unwrap();
        assert_eq!(asset_type.to_string(), hex_str);

        // Prefixed form parses to the same value
        let prefixed = AssetType::from_str(&format!("0x{}", hex_str)).unwrap();
        assert_eq!(prefixed, asset_type);

        assert!(AssetType::from_str("53").is_err());
        assert!(AssetType::from_str("zz00000000000000000000000000000000000001").is_err());
        assert!(H256::from_str(hex_str).is_err());
    }

    #[test]
    fn test_hash_serde() {
        let hash = H256::from_byte_array([0xab; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));

        let decoded: H256 = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, hash);

        let bad: Result<H256, _> = serde_json::from_str("\"abcd\"");
        assert!(bad.is_err());
    }
}
