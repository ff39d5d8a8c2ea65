use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::transitions::FriendshipStatus;
use crate::{auth::dto::PublicUser, error::AppError};

/// Body of `send` and `remove`. Both spellings the client uses are accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FriendTarget {
    #[serde(alias = "friendUserId")]
    pub friend_user_id: Option<String>,
}

impl FriendTarget {
    pub fn id(&self) -> Result<Uuid, AppError> {
        parse_id(self.friend_user_id.as_deref(), "friendUserId")
    }
}

/// Body of `accept` and `decline`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FriendshipRef {
    #[serde(alias = "friendshipId", alias = "request_id", alias = "requestId")]
    pub friendship_id: Option<String>,
}

impl FriendshipRef {
    pub fn id(&self) -> Result<Uuid, AppError> {
        parse_id(self.friendship_id.as_deref(), "friendshipId")
    }
}

fn parse_id(raw: Option<&str>, field: &str) -> Result<Uuid, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::bad_request(format!("{} is required", field)))?;
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request(format!("{} is not a valid id", field)))
}

#[derive(Debug, Serialize)]
pub struct FriendsResponse {
    pub friends: Vec<PublicUser>,
}

/// Incoming request plus the requester's name.
#[derive(Debug, Serialize, FromRow)]
pub struct PendingRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub friend_user_id: Uuid,
    pub status: FriendshipStatus,
    pub username: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequestsResponse {
    pub pending_requests: Vec<PendingRequest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_accepts_both_spellings() {
        let id = Uuid::new_v4();
        for body in [
            serde_json::json!({ "friendUserId": id }),
            serde_json::json!({ "friend_user_id": id }),
        ] {
            let t: FriendTarget = serde_json::from_value(body).unwrap();
            assert_eq!(t.id().unwrap(), id);
        }
    }

    #[test]
    fn friendship_ref_accepts_request_id() {
        let id = Uuid::new_v4();
        let r: FriendshipRef = serde_json::from_value(serde_json::json!({ "request_id": id })).unwrap();
        assert_eq!(r.id().unwrap(), id);
    }

    #[test]
    fn missing_or_malformed_ids_are_bad_requests() {
        let empty: FriendTarget = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(empty.id().unwrap_err().to_string(), "friendUserId is required");

        let bad: FriendshipRef =
            serde_json::from_value(serde_json::json!({ "friendshipId": "abc" })).unwrap();
        assert_eq!(
            bad.id().unwrap_err().status(),
            axum::http::StatusCode::BAD_REQUEST
        );
    }
}
