//! Block number selectors.

use crate::utils::error::ClientError;
use serde::{Serialize, Serializer};
use std::fmt;

/// Sentinel for the latest mined block
pub const LATEST_BLOCK_NUMBER: i64 = -1;

/// Sentinel for the pending block
pub const PENDING_BLOCK_NUMBER: i64 = -2;

/// Which block a state query runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockNumber {
    Number(u64),
    #[default]
    Latest,
    Pending,
    Earliest,
}

impl BlockNumber {
    /// Parameter value as the node expects it
    pub fn to_param(self) -> String {
        match self {
            BlockNumber::Number(n) => format!("{:#x}", n),
            BlockNumber::Latest => "latest".to_string(),
            BlockNumber::Pending => "pending".to_string(),
            BlockNumber::Earliest => "earliest".to_string(),
        }
    }
}

impl From<u64> for BlockNumber {
    fn from(number: u64) -> Self {
        BlockNumber::Number(number)
    }
}

impl TryFrom<i64> for BlockNumber {
    type Error = ClientError;

    /// Non-negative values are heights, `-1` is latest and `-2` is pending
    fn try_from(number: i64) -> Result<Self, Self::Error> {
        match number {
            n if n >= 0 => Ok(BlockNumber::Number(n as u64)),
            LATEST_BLOCK_NUMBER => Ok(BlockNumber::Latest),
            PENDING_BLOCK_NUMBER => Ok(BlockNumber::Pending),
            n => Err(ClientError::InvalidBlockNumber(n)),
        }
    }
}

impl std::str::FromStr for BlockNumber {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(BlockNumber::Latest),
            "pending" => Ok(BlockNumber::Pending),
            "earliest" => Ok(BlockNumber::Earliest),
            _ => {
                let parsed = match s.strip_prefix("0x") {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => s.parse::<u64>(),
                };
                parsed
                    .map(BlockNumber::Number)
                    .map_err(|e| format!("invalid block number {:?}: {}", s, e))
            }
        }
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockNumber::Number(n) => write!(f, "{}", n),
            other => f.write_str(&other.to_param()),
        }
    }
}

impl Serialize for BlockNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_param())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_selector() {
        assert_eq!(BlockNumber::try_from(0i64).unwrap(), BlockNumber::Number(0));
        assert_eq!(BlockNumber::try_from(42i64).unwrap(), BlockNumber::Number(42));
        assert_eq!(BlockNumber::try_from(-1i64).unwrap(), BlockNumber::Latest);
        assert_eq!(BlockNumber::try_from(-2i64).unwrap(), BlockNumber::Pending);
        assert!(matches!(
            BlockNumber::try_from(-7i64),
            Err(ClientError::InvalidBlockNumber(-7))
        ));
    }

    #[test]
    fn test_param_encoding() {
        assert_eq!(BlockNumber::Number(255).to_param(), "0xff");
        assert_eq!(BlockNumber::Number(0).to_param(), "0x0");
        assert_eq!(BlockNumber::Latest.to_param(), "latest");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("0x10".parse::<BlockNumber>().unwrap(), BlockNumber::Number(16));
        assert_eq!("16".parse::<BlockNumber>().unwrap(), BlockNumber::Number(16));
        assert_eq!("pending".parse::<BlockNumber>().unwrap(), BlockNumber::Pending);
        assert!("soon".parse::<BlockNumber>().is_err());
    }
}
