//! Client for the Taskboard kanban backend.
//!
//! The crate owns the parts of the web client that sit between the UI and
//! the JSON:API backend: the OAuth session, the authenticated HTTP wrapper
//! with its refresh and CSRF retries, expiry monitoring, and workspace
//! permission resolution. [`TaskboardClient`] wires them together.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod http;
pub mod navigation;
pub mod permissions;
pub mod session;
pub mod transform;

pub use client::TaskboardClient;
