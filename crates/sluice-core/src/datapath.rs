use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Stable 64-bit identifier of a managed switch.
///
/// The canonical textual form is the lowercase hex string with a `0x`
/// prefix (for example `0x1a4`); that form keys every journal document
/// that refers to the switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatapathId(pub u64);

impl DatapathId {
    /// Canonical lowercase hex form with the `0x` prefix.
    pub fn as_hex(&self) -> String {
        format!("{:#x}", self.0)
    }
}

impl fmt::Display for DatapathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for DatapathId {
    fn from(id: u64) -> Self {
        DatapathId(id)
    }
}

/// Error returned when a datapath id string is neither `0x`-prefixed hex
/// nor plain decimal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid datapath id: {0}")]
pub struct ParseDatapathIdError(pub String);

impl FromStr for DatapathId {
    type Err = ParseDatapathIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => s.parse::<u64>(),
        };
        parsed
            .map(DatapathId)
            .map_err(|_| ParseDatapathIdError(s.to_string()))
    }
}

impl Serialize for DatapathId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_hex())
    }
}

impl<'de> Deserialize<'de> for DatapathId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl<'de> de::Visitor<'de> for IdVisitor {
            type Value = DatapathId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a datapath id as a hex string or an unsigned integer")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(DatapathId(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                value.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}
