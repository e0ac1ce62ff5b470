use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::http::ApiClient;
use crate::permissions::UserContext;

const ME_PATH: &str = "api/me";

/// The authenticated account, from `GET /api/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    #[serde(default)]
    pub uid: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl CurrentUser {
    pub fn user_context(&self) -> UserContext {
        UserContext {
            id: self.id.clone(),
            uid: self.uid,
            roles: self.roles.clone(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

pub async fn current_user(api: &ApiClient) -> Result<CurrentUser, ApiError> {
    api.get_json(ME_PATH).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_minimal_payload() {
        let user: CurrentUser = serde_json::from_str(r#"{"id":"u-1"}"#).unwrap();
        assert_eq!(user.id, "u-1");
        assert!(user.roles.is_empty());
        assert!(user.uid.is_none());
    }

    #[test]
    fn test_user_context_carries_uid_and_roles() {
        let user: CurrentUser = serde_json::from_str(
            r#"{"id":"u-1","uid":12,"name":"alice","email":"alice@example.com","roles":["authenticated","board_admin"]}"#,
        )
        .unwrap();
        let ctx = user.user_context();
        assert_eq!(ctx.uid, Some(12));
        assert!(user.has_role("board_admin"));
        assert!(!user.has_role("administrator"));
        assert_eq!(ctx.roles.len(), 2);
    }
}
