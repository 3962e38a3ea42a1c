use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend types
///
/// Identifies the kind of medium a version's bytes live on. Adapters report
/// their type in the metadata returned from `save`, and the value is persisted
/// on every version record.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum StorageType {
    #[default]
    Local,
    Network,
    Cloud,
}

impl FromStr for StorageType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageType::Local),
            "network" => Ok(StorageType::Network),
            "cloud" => Ok(StorageType::Cloud),
            _ => Err(anyhow::anyhow!("Invalid storage type: {}", s)),
        }
    }
}

impl Display for StorageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageType::Local => write!(f, "LOCAL"),
            StorageType::Network => write!(f, "NETWORK"),
            StorageType::Cloud => write!(f, "CLOUD"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("LOCAL".parse::<StorageType>().unwrap(), StorageType::Local);
        assert_eq!("network".parse::<StorageType>().unwrap(), StorageType::Network);
        assert_eq!("Cloud".parse::<StorageType>().unwrap(), StorageType::Cloud);
        assert!("tape".parse::<StorageType>().is_err());
    }

    #[test]
    fn serializes_uppercase() {
        let json = serde_json::to_string(&StorageType::Network).unwrap();
        assert_eq!(json, "\"NETWORK\"");
        let parsed: StorageType = serde_json::from_str("\"CLOUD\"").unwrap();
        assert_eq!(parsed, StorageType::Cloud);
    }
}
