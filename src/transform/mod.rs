//! JSON:API documents → flat view models.
//!
//! | Module          | View model                                     |
//! |-----------------|------------------------------------------------|
//! | `cards`         | [`Card`]                                       |
//! | `checklists`    | [`Checklist`] with a nested item tree          |
//! | `comments`      | [`Comment`] threads with resolved authors      |
//! | `roles`         | [`WorkspaceRole`], [`MemberRoleAssignment`]    |
//! | `relationships` | [`RelationshipGraph`] of card-to-card links    |
//! | `attachments`   | [`Attachment`]                                 |
//!
//! Transforms never fail: missing attributes become `None`/defaults so a
//! partially populated document still renders.

pub mod attachments;
pub mod cards;
pub mod checklists;
pub mod comments;
pub mod relationships;
pub mod roles;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use taskboard_common::Resource;

pub use attachments::Attachment;
pub use cards::Card;
pub use checklists::{Checklist, ChecklistItem};
pub use comments::{Author, Comment};
pub use relationships::{CardLink, RelationKind, RelationshipGraph};
pub use roles::{MemberRoleAssignment, WorkspaceRole};

/// Backend resource types.
pub mod types {
    pub const WORKSPACE: &str = "node--workspace";
    pub const BOARD: &str = "node--board";
    pub const LIST: &str = "node--board_list";
    pub const CARD: &str = "node--card";
    pub const CHECKLIST: &str = "node--checklist";
    pub const CHECKLIST_ITEM: &str = "checklist_item--checklist_item";
    pub const COMMENT: &str = "comment--card_comment";
    pub const CARD_RELATIONSHIP: &str = "card_relationship--card_relationship";
    pub const FILE: &str = "file--file";
    pub const USER: &str = "user--user";
    pub const WORKSPACE_ROLE: &str = "workspace_role--workspace_role";
    pub const MEMBER_ROLE: &str = "member_role--member_role";
}

/// Timestamps arrive as RFC 3339 strings or as Unix seconds.
pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<i64>().ok().and_then(from_unix)),
        Value::Number(n) => n.as_i64().and_then(from_unix),
        _ => None,
    }
}

fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

pub(crate) fn timestamp_attr(resource: &Resource, name: &str) -> Option<DateTime<Utc>> {
    resource.attr(name).and_then(parse_timestamp)
}

pub(crate) fn owned_ids(ids: Vec<&str>) -> Vec<String> {
    ids.into_iter().map(str::to_string).collect()
}
