// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;

use serde::{Deserialize, Serialize};

/// Capability contract operations, used as the `operation` log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    ResolveVolume,
    EnsureInitiatorGroup,
    Map,
    Unmap,
    MappedGroups,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResolveVolume => "resolve_volume",
            Self::EnsureInitiatorGroup => "ensure_initiator_group",
            Self::Map => "map",
            Self::Unmap => "unmap",
            Self::MappedGroups => "mapped_groups",
        }
    }

    /// Whether the operation may change array state.
    pub fn is_mutating(self) -> bool {
        matches!(self, Self::EnsureInitiatorGroup | Self::Map | Self::Unmap)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OperationId;

    #[test]
    fn operation_id_roundtrips_as_uuid_string() {
        let id = OperationId::new();
        let json = serde_json::to_string(&id).expect("serialize operation id");
        let parsed: OperationId = serde_json::from_str(&json).expect("deserialize operation id");
        assert_eq!(parsed, id);
    }

    #[test]
    fn operation_names_match_serde_names() {
        for kind in [
            OperationKind::ResolveVolume,
            OperationKind::EnsureInitiatorGroup,
            OperationKind::Map,
            OperationKind::Unmap,
            OperationKind::MappedGroups,
        ] {
            let json = serde_json::to_string(&kind).expect("serialize kind");
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn only_group_and_mapping_changes_are_mutating() {
        assert!(OperationKind::Map.is_mutating());
        assert!(OperationKind::Unmap.is_mutating());
        assert!(OperationKind::EnsureInitiatorGroup.is_mutating());
        assert!(!OperationKind::MappedGroups.is_mutating());
        assert!(!OperationKind::ResolveVolume.is_mutating());
    }
}
