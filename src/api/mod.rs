//! Clients for the backend's convenience endpoints and common resource
//! queries. Each function takes the shared [`ApiClient`](crate::http::ApiClient)
//! and goes through its header and retry policy.
//!
//! | Module        | Endpoint                                  |
//! |---------------|-------------------------------------------|
//! | `me`          | `GET /api/me`                             |
//! | `roles`       | `/api/roles`, member role assignments     |
//! | `presence`    | `/api/presence/{board}`                   |
//! | `attachments` | `POST /api/cards/{id}/attachments`        |
//! | `cards`       | JSON:API cards, comments, checklists, links |

pub mod attachments;
pub mod cards;
pub mod me;
pub mod presence;
pub mod roles;

pub use me::CurrentUser;
pub use presence::{PresenceHeartbeat, Viewer};
