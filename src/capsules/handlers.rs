use anyhow::anyhow;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::Date;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CapsuleDraft, CapsuleListResponse, CapsuleStatus, CapsuleType, CapsuleView},
    repo::{self, CapsuleRow},
};
use crate::{
    auth::jwt::AuthUser,
    dates::today_utc,
    error::{AppError, MessageResponse},
    extract::AppPath,
    friends::repo::accepted_among,
    state::AppState,
    uploads::{discard_object, store_image, MultipartForm},
};

const MEDIA_PREFIX: &str = "capsules";

pub fn capsule_routes() -> Router<AppState> {
    Router::new()
        .route("/timecapsules/create", post(create_capsule))
        .route("/timecapsules/getLoginUserCapsules", get(get_login_user_capsules))
        .route("/timecapsules/:id", get(get_capsule).delete(delete_capsule))
}

async fn to_view(state: &AppState, row: CapsuleRow, today: Date) -> anyhow::Result<CapsuleView> {
    let capsule_type: CapsuleType = row
        .capsule_type
        .parse()
        .map_err(|_| anyhow!("capsule {} has unknown type {}", row.id, row.capsule_type))?;
    let status = CapsuleStatus::at(row.unlock_date, today);
    let media = match status {
        CapsuleStatus::Open => Some(state.storage.object_url(&row.media).await?),
        CapsuleStatus::Locked => None,
    };
    Ok(CapsuleView {
        id: row.id,
        owner: row.owner_id,
        title: row.title,
        description: row.description,
        unlock_date: row.unlock_date,
        capsule_type,
        status,
        media,
        friends: row.friends,
        created_at: row.created_at,
    })
}

#[instrument(skip(state, form))]
pub async fn create_capsule(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut form: MultipartForm,
) -> Result<(StatusCode, Json<CapsuleView>), AppError> {
    let today = today_utc();
    let draft = CapsuleDraft::from_form(&form, user_id, today)?;
    let file = form
        .file
        .take()
        .ok_or_else(|| AppError::bad_request("file is required"))?;

    if !draft.friends.is_empty() {
        let accepted = accepted_among(&state.db, user_id, &draft.friends).await?;
        if let Some(stranger) = draft.friends.iter().find(|id| !accepted.contains(id)) {
            warn!(%user_id, friend_id = %stranger, "capsule shared with a non-friend");
            return Err(AppError::bad_request(
                "Capsules can only be shared with accepted friends",
            ));
        }
    }

    let media = store_image(&state, MEDIA_PREFIX, user_id, file).await?;
    let id = match repo::insert(&state.db, user_id, &draft, &media).await {
        Ok(id) => id,
        Err(e) => {
            discard_object(&state, &media).await;
            return Err(e.into());
        }
    };

    let row = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| anyhow!("capsule {} vanished after insert", id))?;

    info!(capsule_id = %id, %user_id, capsule_type = %draft.capsule_type, recipients = draft.friends.len(), "capsule created");
    Ok((StatusCode::CREATED, Json(to_view(&state, row, today).await?)))
}

#[instrument(skip(state))]
pub async fn get_login_user_capsules(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<CapsuleListResponse>, AppError> {
    let today = today_utc();
    let rows = repo::list_visible(&state.db, user_id).await?;
    let mut capsules = Vec::with_capacity(rows.len());
    for row in rows {
        capsules.push(to_view(&state, row, today).await?);
    }
    Ok(Json(CapsuleListResponse { capsules }))
}

#[instrument(skip(state))]
pub async fn get_capsule(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<CapsuleView>, AppError> {
    let row = repo::find_by_id(&state.db, id)
        .await?
        .filter(|row| row.owner_id == user_id || row.is_recipient(user_id))
        .ok_or_else(|| AppError::not_found("Capsule not found"))?;
    Ok(Json(to_view(&state, row, today_utc()).await?))
}

#[instrument(skip(state))]
pub async fn delete_capsule(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    let capsule = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Capsule not found"))?;
    if capsule.owner_id != user_id {
        if capsule.is_recipient(user_id) {
            warn!(capsule_id = %id, %user_id, "recipient tried to delete capsule");
            return Err(AppError::forbidden("Only the owner can delete this capsule"));
        }
        return Err(AppError::not_found("Capsule not found"));
    }

    let media = repo::delete(&state.db, id, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Capsule not found"))?;
    discard_object(&state, &media).await;

    info!(capsule_id = %id, %user_id, "capsule deleted");
    Ok(MessageResponse::new("Capsule deleted successfully."))
}
