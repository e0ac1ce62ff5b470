use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How far a single permission field reaches.
///
/// | Level  | Meaning                                   |
/// |--------|-------------------------------------------|
/// | `Any`  | allowed on every resource of the kind     |
/// | `Own`  | allowed only on resources the caller owns |
/// | `None` | never allowed                             |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Any,
    Own,
    #[default]
    None,
}

impl PermissionLevel {
    /// Whether this level permits an action, given whether the caller owns
    /// the target. Ownership is always decided by the caller.
    pub fn allows(self, is_owner: bool) -> bool {
        match self {
            PermissionLevel::Any => true,
            PermissionLevel::Own => is_owner,
            PermissionLevel::None => false,
        }
    }

    /// Read a level from a role attribute value.
    ///
    /// Older role documents store plain booleans instead of levels, so
    /// `true` maps to `Any` and `false` to `None`.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => s.parse().ok(),
            serde_json::Value::Bool(true) => Some(PermissionLevel::Any),
            serde_json::Value::Bool(false) => Some(PermissionLevel::None),
            _ => None,
        }
    }
}

/// Free-standing form of [`PermissionLevel::allows`].
pub fn allows(level: PermissionLevel, is_owner: bool) -> bool {
    level.allows(is_owner)
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionLevel::Any => write!(f, "any"),
            PermissionLevel::Own => write!(f, "own"),
            PermissionLevel::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid permission level '{0}'. Valid values: any, own, none")]
pub struct ParseLevelError(pub String);

impl std::str::FromStr for PermissionLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" => Ok(PermissionLevel::Any),
            "own" => Ok(PermissionLevel::Own),
            "none" => Ok(PermissionLevel::None),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}
