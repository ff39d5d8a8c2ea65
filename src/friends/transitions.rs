//! Friendship lifecycle: `none -> pending -> accepted | rejected`, and back to
//! `none` when either side removes the other.
//!
//! The checks here are pure; the repository applies them with conditional
//! statements so a concurrent change cannot slip past a check.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "friendship_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Rejected,
}

/// One directional row: `user_id` asked, `friend_user_id` answers.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Friendship {
    pub id: Uuid,
    pub user_id: Uuid,
    pub friend_user_id: Uuid,
    pub status: FriendshipStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Friendship {
    /// True when the row links `a` and `b`, in either direction.
    pub fn involves(&self, a: Uuid, b: Uuid) -> bool {
        (self.user_id == a && self.friend_user_id == b)
            || (self.user_id == b && self.friend_user_id == a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Accept,
    Decline,
}

impl Answer {
    pub fn target(self) -> FriendshipStatus {
        match self {
            Answer::Accept => FriendshipStatus::Accepted,
            Answer::Decline => FriendshipStatus::Rejected,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Answer::Accept => "accept",
            Answer::Decline => "decline",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("You cannot send a friend request to yourself.")]
    SelfRequest,
    #[error("Friendship already exists or pending.")]
    AlreadyExists,
    #[error("You are not authorized to {} this request.", .0.verb())]
    NotRecipient(Answer),
    #[error("Friend request is not pending.")]
    NotPending,
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::NotRecipient(_) => AppError::forbidden(e.to_string()),
            _ => AppError::bad_request(e.to_string()),
        }
    }
}

/// A request is allowed only between two different users with no row between them.
/// A rejected request blocks any new one in either direction.
pub fn check_request(
    requester: Uuid,
    recipient: Uuid,
    existing: Option<&Friendship>,
) -> Result<(), TransitionError> {
    if requester == recipient {
        return Err(TransitionError::SelfRequest);
    }
    if existing.is_some_and(|f| f.involves(requester, recipient)) {
        return Err(TransitionError::AlreadyExists);
    }
    Ok(())
}

/// Only the recipient may answer, and only while the request is pending.
pub fn check_answer(
    actor: Uuid,
    friendship: &Friendship,
    answer: Answer,
) -> Result<FriendshipStatus, TransitionError> {
    if friendship.friend_user_id != actor {
        return Err(TransitionError::NotRecipient(answer));
    }
    if friendship.status != FriendshipStatus::Pending {
        return Err(TransitionError::NotPending);
    }
    Ok(answer.target())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory stand-in for the friendships table.
    #[derive(Default)]
    struct Ledger {
        rows: Vec<Friendship>,
    }

    impl Ledger {
        fn send(&mut self, from: Uuid, to: Uuid) -> Result<Uuid, TransitionError> {
            let existing = self.rows.iter().find(|f| f.involves(from, to));
            check_request(from, to, existing)?;
            let now = OffsetDateTime::now_utc();
            let row = Friendship {
                id: Uuid::new_v4(),
                user_id: from,
                friend_user_id: to,
                status: FriendshipStatus::Pending,
                created_at: now,
                updated_at: now,
            };
            let id = row.id;
            self.rows.push(row);
            Ok(id)
        }

        fn answer(&mut self, actor: Uuid, id: Uuid, answer: Answer) -> Result<(), TransitionError> {
            let row = self.rows.iter_mut().find(|f| f.id == id).expect("row");
            row.status = check_answer(actor, row, answer)?;
            Ok(())
        }

        fn remove(&mut self, a: Uuid, b: Uuid) -> usize {
            let before = self.rows.len();
            self.rows.retain(|f| !f.involves(a, b));
            before - self.rows.len()
        }

        fn status(&self, id: Uuid) -> FriendshipStatus {
            self.rows.iter().find(|f| f.id == id).unwrap().status
        }
    }

    fn pair() -> (Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn cannot_befriend_yourself() {
        let a = Uuid::new_v4();
        assert_eq!(check_request(a, a, None), Err(TransitionError::SelfRequest));
    }

    #[test]
    fn reverse_request_after_request_fails() {
        let (a, b) = pair();
        let mut ledger = Ledger::default();
        ledger.send(a, b).unwrap();
        assert_eq!(ledger.send(b, a), Err(TransitionError::AlreadyExists));
        assert_eq!(ledger.send(a, b), Err(TransitionError::AlreadyExists));
        assert_eq!(ledger.rows.len(), 1);
    }

    #[test]
    fn rejected_pair_cannot_re_request() {
        let (a, b) = pair();
        let mut ledger = Ledger::default();
        let id = ledger.send(a, b).unwrap();
        ledger.answer(b, id, Answer::Decline).unwrap();
        assert_eq!(ledger.status(id), FriendshipStatus::Rejected);
        assert_eq!(ledger.send(a, b), Err(TransitionError::AlreadyExists));
        assert_eq!(ledger.send(b, a), Err(TransitionError::AlreadyExists));
    }

    #[test]
    fn requester_cannot_accept_own_request() {
        let (a, b) = pair();
        let mut ledger = Ledger::default();
        let id = ledger.send(a, b).unwrap();
        let err = ledger.answer(a, id, Answer::Accept).unwrap_err();
        assert_eq!(err, TransitionError::NotRecipient(Answer::Accept));
        assert_eq!(
            AppError::from(err).status(),
            axum::http::StatusCode::FORBIDDEN
        );
        assert_eq!(ledger.status(id), FriendshipStatus::Pending);
    }

    #[test]
    fn outsider_cannot_decline() {
        let (a, b) = pair();
        let mut ledger = Ledger::default();
        let id = ledger.send(a, b).unwrap();
        let err = ledger.answer(Uuid::new_v4(), id, Answer::Decline).unwrap_err();
        assert_eq!(err.to_string(), "You are not authorized to decline this request.");
    }

    #[test]
    fn recipient_accepts_once() {
        let (a, b) = pair();
        let mut ledger = Ledger::default();
        let id = ledger.send(a, b).unwrap();
        ledger.answer(b, id, Answer::Accept).unwrap();
        assert_eq!(ledger.status(id), FriendshipStatus::Accepted);

        let err = ledger.answer(b, id, Answer::Decline).unwrap_err();
        assert_eq!(err, TransitionError::NotPending);
        assert_eq!(
            AppError::from(err).status(),
            axum::http::StatusCode::BAD_REQUEST
        );
        assert_eq!(ledger.status(id), FriendshipStatus::Accepted);
    }

    #[test]
    fn remove_works_from_either_side() {
        let (a, b) = pair();
        let mut ledger = Ledger::default();
        let id = ledger.send(a, b).unwrap();
        ledger.answer(b, id, Answer::Accept).unwrap();
        // the recipient removes; the row was recorded as a -> b
        assert_eq!(ledger.remove(b, a), 1);
        assert!(ledger.rows.is_empty());
        // and they may start over
        ledger.send(b, a).unwrap();
    }

    #[test]
    fn remove_ignores_other_pairs() {
        let (a, b) = pair();
        let c = Uuid::new_v4();
        let mut ledger = Ledger::default();
        ledger.send(a, b).unwrap();
        ledger.send(a, c).unwrap();
        assert_eq!(ledger.remove(a, b), 1);
        assert_eq!(ledger.rows.len(), 1);
        assert!(ledger.rows[0].involves(a, c));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(FriendshipStatus::Accepted).unwrap(),
            "accepted"
        );
    }
}
