//! Shared wire types for the Taskboard client.
//!
//! - [`jsonapi`]: JSON:API documents, resources and relationships
//! - [`query`]: the `filter`/`include`/`sort`/`page` query convention
//! - [`permission`]: the `any | own | none` permission level

pub mod jsonapi;
pub mod permission;
pub mod query;

pub use jsonapi::{
    Document, ErrorObject, PrimaryData, Relationship, RelationshipData, Resource,
    ResourceIdentifier,
};
pub use permission::{ParseLevelError, PermissionLevel, allows};
pub use query::Query;
