//! Workspace permission evaluation.
//!
//! Every permission field holds a [`PermissionLevel`]; a predicate is true
//! for `any`, true for `own` only when the caller asserts ownership, and
//! false for `none`. Ownership is never decided here.
//!
//! Posture when the real role is unknown (loading, fetch failure, no role):
//!
//! | Predicate family       | Answer  |
//! |------------------------|---------|
//! | workspace … template   | allowed |
//! | report (`report*`)     | denied  |
//! | admin pages (`admin*`) | denied  |

pub mod catalog;
pub mod evaluator;
pub mod set;
pub mod source;

pub use catalog::{Action, ParseCatalogError, Permission, Resource};
pub use evaluator::{
    EffectivePermissions, PermissionEvaluator, PermissionHandle, PermissionOrigin,
    PermissionSource, UserContext,
};
pub use set::PermissionSet;
pub use source::JsonApiPermissionSource;
pub use taskboard_common::{PermissionLevel, allows};
