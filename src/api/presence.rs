//! Board presence: who else is looking at a board.
//!
//! A [`PresenceHeartbeat`] posts to `/api/presence/{board}/heartbeat` on a
//! fixed interval and publishes the returned viewer list on a watch
//! channel. It stops when told to, when dropped, or when the session is no
//! longer authorized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::http::{ApiClient, ApiRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

fn presence_path(board_id: &str) -> String {
    format!("api/presence/{}", board_id)
}

pub async fn viewers(api: &ApiClient, board_id: &str) -> Result<Vec<Viewer>, ApiError> {
    api.get_json(&presence_path(board_id)).await
}

/// One heartbeat. `session_id` distinguishes several tabs or terminals of
/// the same user.
pub async fn heartbeat(
    api: &ApiClient,
    board_id: &str,
    session_id: &str,
) -> Result<Vec<Viewer>, ApiError> {
    let req = ApiRequest::post(format!("{}/heartbeat", presence_path(board_id)))
        .json(serde_json::json!({ "sessionId": session_id }));
    api.send_json(&req).await
}

/// Background heartbeat for one board.
pub struct PresenceHeartbeat {
    session_id: String,
    viewers: watch::Receiver<Vec<Viewer>>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PresenceHeartbeat {
    pub fn start(api: ApiClient, board_id: impl Into<String>, every: Duration) -> Self {
        let board_id = board_id.into();
        let session_id = Uuid::new_v4().to_string();
        let (tx, rx) = watch::channel(Vec::new());
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        let task_session = session_id.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                match heartbeat(&api, &board_id, &task_session).await {
                    Ok(list) => {
                        let _ = tx.send(list);
                    }
                    Err(ApiError::Unauthorized) => {
                        tracing::info!(board = %board_id, "presence heartbeat stopped: not authorized");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(board = %board_id, error = %e, "presence heartbeat failed");
                    }
                }
            }
        });

        tracing::debug!(session_id = %session_id, "presence heartbeat started");
        Self {
            session_id,
            viewers: rx,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Latest viewer list; empty until the first heartbeat answers.
    pub fn viewers(&self) -> Vec<Viewer> {
        self.viewers.borrow().clone()
    }

    /// Receiver that wakes on every new viewer list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Viewer>> {
        self.viewers.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop and wait for the task to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PresenceHeartbeat {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_path() {
        assert_eq!(presence_path("b1"), "api/presence/b1");
    }

    #[test]
    fn test_viewer_payload() {
        let viewers: Vec<Viewer> = serde_json::from_str(
            r#"[{"userId":"u1","name":"Alice","lastSeen":"2024-05-01T09:00:00Z"},{"userId":"u2"}]"#,
        )
        .unwrap();
        assert_eq!(viewers[0].name, "Alice");
        assert!(viewers[0].last_seen.is_some());
        assert!(viewers[1].last_seen.is_none());
    }
}
