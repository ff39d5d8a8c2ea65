use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{FriendTarget, FriendsResponse, FriendshipRef, PendingRequestsResponse},
    repo,
    transitions::{check_answer, check_request, Answer, TransitionError},
};
use crate::{
    auth::{dto::PublicUser, jwt::AuthUser, repo::User},
    db::is_unique_violation,
    error::{AppError, MessageResponse},
    extract::AppJson,
    state::AppState,
};

pub fn friend_routes() -> Router<AppState> {
    Router::new()
        .route("/friends/send", post(send_friend_request))
        .route("/friends/accept", post(accept_friend_request))
        .route("/friends/decline", post(decline_friend_request))
        .route("/friends/remove", delete(remove_friend))
        .route("/friends/user-friends", get(get_user_friends))
        .route("/friends/getPendingFriendRequests", get(get_pending_friend_requests))
}

#[instrument(skip(state, body))]
pub async fn send_friend_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<FriendTarget>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let friend_id = body.id()?;

    check_request(user_id, friend_id, None)?;
    if User::find_by_id(&state.db, friend_id).await?.is_none() {
        return Err(AppError::not_found("User not found."));
    }

    let existing = repo::find_between(&state.db, user_id, friend_id).await?;
    if let Err(e) = check_request(user_id, friend_id, existing.as_ref()) {
        warn!(%user_id, %friend_id, "friendship already exists");
        return Err(e.into());
    }

    let friendship = match repo::insert_pending(&state.db, user_id, friend_id).await {
        Ok(f) => f,
        Err(e) if is_unique_violation(&e) => {
            warn!(%user_id, %friend_id, "friend request raced with another");
            return Err(TransitionError::AlreadyExists.into());
        }
        Err(e) => return Err(e.into()),
    };

    info!(friendship_id = %friendship.id, %user_id, %friend_id, "friend request sent");
    Ok((
        StatusCode::CREATED,
        MessageResponse::new("Friend request sent successfully."),
    ))
}

async fn answer(
    state: &AppState,
    user_id: Uuid,
    body: FriendshipRef,
    answer: Answer,
) -> Result<(), AppError> {
    let id = body.id()?;
    let friendship = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Friend request not found."))?;

    let to = match check_answer(user_id, &friendship, answer) {
        Ok(to) => to,
        Err(e) => {
            warn!(friendship_id = %id, %user_id, error = %e, "friend request answer refused");
            return Err(e.into());
        }
    };

    if !repo::answer_pending(&state.db, id, user_id, to).await? {
        // answered by a concurrent request in the meantime
        return Err(TransitionError::NotPending.into());
    }

    info!(friendship_id = %id, %user_id, status = ?to, "friend request answered");
    Ok(())
}

#[instrument(skip(state, body))]
pub async fn accept_friend_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<FriendshipRef>,
) -> Result<Json<MessageResponse>, AppError> {
    answer(&state, user_id, body, Answer::Accept).await?;
    Ok(MessageResponse::new("Friend request accepted."))
}

#[instrument(skip(state, body))]
pub async fn decline_friend_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<FriendshipRef>,
) -> Result<Json<MessageResponse>, AppError> {
    answer(&state, user_id, body, Answer::Decline).await?;
    Ok(MessageResponse::new("Friend request declined."))
}

#[instrument(skip(state, body))]
pub async fn remove_friend(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<FriendTarget>,
) -> Result<Json<MessageResponse>, AppError> {
    let friend_id = body.id()?;
    let removed = repo::delete_between(&state.db, user_id, friend_id).await?;
    info!(%user_id, %friend_id, removed, "friend removed");
    Ok(MessageResponse::new("Friend removed successfully."))
}

#[instrument(skip(state))]
pub async fn get_user_friends(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<FriendsResponse>, AppError> {
    let friends = repo::list_friends(&state.db, user_id).await?;
    Ok(Json(FriendsResponse {
        friends: friends.into_iter().map(PublicUser::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn get_pending_friend_requests(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PendingRequestsResponse>, AppError> {
    let pending_requests = repo::list_incoming_pending(&state.db, user_id).await?;
    Ok(Json(PendingRequestsResponse { pending_requests }))
}
