use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{ProfilePatch, ProfileView, DEFAULT_AVATAR},
    repo::{self, ProfileRow},
};
use crate::{
    auth::{jwt::AuthUser, repo::User},
    db::is_unique_violation,
    error::{AppError, MessageResponse},
    extract::AppPath,
    state::AppState,
    uploads::{discard_object, store_image, MultipartForm},
};

const PICTURE_PREFIX: &str = "profiles";

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile/createProfile", post(create_profile))
        .route("/profile/updateProfile", put(update_profile))
        .route("/profile/getProfile", get(get_profile))
        .route("/profile/getProfileByID/:user_id", get(get_profile_by_id))
        .route("/profile/getAllProfiles", get(get_all_profiles))
        .route("/profile/deleteProfile", delete(delete_profile))
}

async fn to_view(state: &AppState, row: ProfileRow) -> anyhow::Result<ProfileView> {
    let profile_picture = match row.profile_picture.as_deref() {
        Some(key) => state.storage.object_url(key).await?,
        None => DEFAULT_AVATAR.to_string(),
    };
    Ok(ProfileView {
        id: row.id,
        user_id: row.user_id,
        username: row.username,
        email: row.email,
        bio: row.bio,
        profile_picture,
        contact_no: row.contact_no,
        cnic: row.cnic,
        dob: row.dob,
        gender: row.gender,
        address: row.address,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[derive(Debug, Clone, Copy)]
enum SaveMode {
    Insert,
    Update,
}

/// Writes the profile and the optional username change together.
/// Returns false, with nothing written, when an update finds no profile.
async fn save(
    db: &PgPool,
    user_id: Uuid,
    patch: &ProfilePatch,
    picture: Option<&str>,
    mode: SaveMode,
) -> anyhow::Result<bool> {
    let mut tx = db.begin().await.context("begin profile transaction")?;
    let written = match mode {
        SaveMode::Insert => {
            repo::insert(&mut *tx, user_id, patch, picture).await?;
            true
        }
        SaveMode::Update => repo::update(&mut *tx, user_id, patch, picture).await?,
    };
    if !written {
        return Ok(false);
    }
    if let Some(username) = &patch.username {
        User::update_username(&mut *tx, user_id, username).await?;
    }
    tx.commit().await.context("commit profile")?;
    Ok(true)
}

async fn load_view(state: &AppState, user_id: Uuid) -> Result<ProfileView, AppError> {
    let row = repo::find_by_user(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Profile not found"))?;
    Ok(to_view(state, row).await?)
}

#[instrument(skip(state, form))]
pub async fn create_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut form: MultipartForm,
) -> Result<(StatusCode, Json<ProfileView>), AppError> {
    let patch = ProfilePatch::from_form(&form)?;

    if repo::find_by_user(&state.db, user_id).await?.is_some() {
        warn!(%user_id, "profile already exists");
        return Err(AppError::bad_request("Profile already exists"));
    }

    let picture = match form.file.take() {
        Some(item) => Some(store_image(&state, PICTURE_PREFIX, user_id, item).await?),
        None => None,
    };

    if let Err(e) = save(&state.db, user_id, &patch, picture.as_deref(), SaveMode::Insert).await {
        if let Some(key) = &picture {
            discard_object(&state, key).await;
        }
        if is_unique_violation(&e) {
            return Err(AppError::bad_request("Profile already exists"));
        }
        return Err(e.into());
    }

    info!(%user_id, "profile created");
    Ok((StatusCode::CREATED, Json(load_view(&state, user_id).await?)))
}

#[instrument(skip(state, form))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut form: MultipartForm,
) -> Result<Json<ProfileView>, AppError> {
    let patch = ProfilePatch::from_form(&form)?;

    let existing = repo::find_by_user(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Profile not found"))?;

    let picture = match form.file.take() {
        Some(item) => Some(store_image(&state, PICTURE_PREFIX, user_id, item).await?),
        None => None,
    };

    let updated = match save(&state.db, user_id, &patch, picture.as_deref(), SaveMode::Update).await {
        Ok(updated) => updated,
        Err(e) => {
            if let Some(key) = &picture {
                discard_object(&state, key).await;
            }
            return Err(e.into());
        }
    };
    if !updated {
        // deleted between the lookup and the update
        if let Some(key) = &picture {
            discard_object(&state, key).await;
        }
        return Err(AppError::not_found("Profile not found"));
    }

    if let (Some(_), Some(old)) = (&picture, existing.profile_picture.as_deref()) {
        discard_object(&state, old).await;
    }

    info!(%user_id, picture_replaced = picture.is_some(), "profile updated");
    Ok(Json(load_view(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileView>, AppError> {
    Ok(Json(load_view(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn get_profile_by_id(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    AppPath(user_id): AppPath<Uuid>,
) -> Result<Json<ProfileView>, AppError> {
    Ok(Json(load_view(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn get_all_profiles(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ProfileView>>, AppError> {
    let rows = repo::list_except(&state.db, user_id).await?;
    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(to_view(&state, row).await?);
    }
    Ok(Json(views))
}

#[instrument(skip(state))]
pub async fn delete_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    let picture = repo::delete(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Profile not found"))?;
    if let Some(key) = picture {
        discard_object(&state, &key).await;
    }
    info!(%user_id, "profile deleted");
    Ok(MessageResponse::new("Profile deleted successfully."))
}
