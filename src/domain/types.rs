//! Core identifier types for domain entities.
//!
//! These newtype wrappers provide type safety for entity identifiers,
//! preventing accidental mixing of different ID types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider-assigned identifier for a subaccount.
///
/// Watermarks in the persisted state file are keyed by this id rather than
/// the configured subaccount name, so renaming a subaccount in the config
/// does not orphan its watermark as long as the provider id is stable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubaccountId(pub String);

impl fmt::Display for SubaccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SubaccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SubaccountId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<i64> for SubaccountId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subaccount_id_display() {
        let id = SubaccountId("42".to_string());
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn subaccount_id_from_numeric() {
        let id = SubaccountId::from(1234);
        assert_eq!(id, SubaccountId::from("1234"));
    }

    #[test]
    fn subaccount_id_as_map_key() {
        use std::collections::BTreeMap;
        let mut map = BTreeMap::new();
        map.insert(SubaccountId::from("a"), 1);
        map.insert(SubaccountId::from("b"), 2);
        assert_eq!(map.get(&SubaccountId::from("a")), Some(&1));
    }
}
