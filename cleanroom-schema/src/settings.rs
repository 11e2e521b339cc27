//! Client settings and the policy a run is held to.

use serde::{Deserialize, Serialize};

/// The boolean options a collaboration sets for its members.
///
/// JSON accepts both the snake_case field names and the camelCase spellings
/// used by the collaboration service (`allowCleartext`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Cleartext output columns are permitted.
    #[serde(alias = "allowCleartext")]
    pub allow_cleartext: bool,
    /// Several output columns may share a name.
    #[serde(alias = "allowDuplicates")]
    pub allow_duplicates: bool,
    /// Fingerprints of differently-named columns may be joined.
    #[serde(alias = "allowJoinsOnColumnsWithDifferentNames")]
    pub allow_joins_on_columns_with_different_names: bool,
    /// Null inputs are passed through as nulls.
    #[serde(alias = "preserveNulls")]
    pub preserve_nulls: bool,
}

impl ClientSettings {
    /// Every restriction off.
    pub fn lowest_privacy() -> Self {
        Self {
            allow_cleartext: true,
            allow_duplicates: true,
            allow_joins_on_columns_with_different_names: true,
            preserve_nulls: true,
        }
    }

    /// Every restriction on.
    pub fn highest_privacy() -> Self {
        Self {
            allow_cleartext: false,
            allow_duplicates: false,
            allow_joins_on_columns_with_different_names: false,
            preserve_nulls: false,
        }
    }
}

/// Where a run's settings came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyOrigin {
    /// Published by the collaboration. Binding for real runs.
    Collaboration,
    /// Supplied by the local user. Only good for dry runs.
    Local,
}

/// Settings paired with their origin. Resolved once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub settings: ClientSettings,
    pub origin: PolicyOrigin,
}

impl Policy {
    pub fn from_collaboration(settings: ClientSettings) -> Self {
        Self {
            settings,
            origin: PolicyOrigin::Collaboration,
        }
    }

    pub fn local(settings: ClientSettings) -> Self {
        Self {
            settings,
            origin: PolicyOrigin::Local,
        }
    }

    /// Whether this policy may govern a run that writes output.
    pub fn is_enforceable(&self) -> bool {
        self.origin == PolicyOrigin::Collaboration
    }
}
