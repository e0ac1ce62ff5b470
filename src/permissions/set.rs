use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use taskboard_common::PermissionLevel;

use super::catalog::Permission;

/// A level for every catalogue field. Fields never set are `none`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Value>",
    into = "BTreeMap<String, PermissionLevel>"
)]
pub struct PermissionSet {
    levels: BTreeMap<Permission, PermissionLevel>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every field at `level`.
    pub fn all(level: PermissionLevel) -> Self {
        Self {
            levels: Permission::ALL.iter().map(|p| (*p, level)).collect(),
        }
    }

    /// The posture used when no role could be resolved: everything `any`
    /// except report and admin fields, which stay `none`.
    pub fn fallback() -> Self {
        Self {
            levels: Permission::ALL
                .iter()
                .map(|p| {
                    let level = if p.is_sensitive() {
                        PermissionLevel::None
                    } else {
                        PermissionLevel::Any
                    };
                    (*p, level)
                })
                .collect(),
        }
    }

    /// Read the catalogue fields from role attributes. Unknown attributes
    /// are ignored; missing or unreadable values are `none`.
    pub fn from_attributes(attributes: &Map<String, Value>) -> Self {
        let mut set = Self::new();
        for permission in Permission::ALL {
            if let Some(level) = attributes
                .get(permission.field())
                .and_then(PermissionLevel::from_value)
            {
                set.levels.insert(*permission, level);
            }
        }
        set
    }

    pub fn with(mut self, permission: Permission, level: PermissionLevel) -> Self {
        self.set(permission, level);
        self
    }

    pub fn set(&mut self, permission: Permission, level: PermissionLevel) {
        self.levels.insert(permission, level);
    }

    pub fn level(&self, permission: Permission) -> PermissionLevel {
        self.levels.get(&permission).copied().unwrap_or_default()
    }

    pub fn allows(&self, permission: Permission, is_owner: bool) -> bool {
        self.level(permission).allows(is_owner)
    }

    /// `(permission, level)` for every catalogue field, in catalogue order.
    pub fn iter(&self) -> impl Iterator<Item = (Permission, PermissionLevel)> + '_ {
        Permission::ALL.iter().map(|p| (*p, self.level(*p)))
    }
}

impl PartialEq for PermissionSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for PermissionSet {}

impl From<BTreeMap<String, Value>> for PermissionSet {
    fn from(raw: BTreeMap<String, Value>) -> Self {
        let attributes: Map<String, Value> = raw.into_iter().collect();
        Self::from_attributes(&attributes)
    }
}

impl From<PermissionSet> for BTreeMap<String, PermissionLevel> {
    fn from(set: PermissionSet) -> Self {
        set.iter()
            .map(|(p, level)| (p.field().to_string(), level))
            .collect()
    }
}
