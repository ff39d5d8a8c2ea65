use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use axum::extract::{FromRequest, Multipart, Request};
use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Name of the multipart part that carries the uploaded image.
pub const FILE_FIELD: &str = "file";

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Text fields plus the optional `file` part of a multipart request.
#[derive(Default)]
pub struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    pub file: Option<UploadItem>,
}

impl MultipartForm {
    pub async fn read(mut mp: Multipart) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();
        while let Some(field) = mp.next_field().await? {
            let Some(name) = field.name().map(|s| s.to_string()) else {
                continue;
            };
            if name == FILE_FIELD {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field.bytes().await?;
                if body.is_empty() {
                    continue;
                }
                if form.file.is_some() {
                    return Err(AppError::bad_request("Only one file may be uploaded"));
                }
                form.file = Some(UploadItem { body, content_type });
            } else {
                let value = field.text().await?;
                form.push(&name, value);
            }
        }
        Ok(form)
    }

    /// `friends[]` and `friends` land under the same key.
    pub fn push(&mut self, name: &str, value: String) {
        let key = name.strip_suffix("[]").unwrap_or(name).to_string();
        self.fields.entry(key).or_default().push(value);
    }

    /// Trimmed, non-blank value of the first of `names` that has one.
    /// Aliases go after the canonical name.
    pub fn text(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|n| {
            self.fields
                .get(*n)?
                .iter()
                .rev()
                .map(|v| v.trim())
                .find(|v| !v.is_empty())
                .map(str::to_string)
        })
    }

    /// All non-blank values for `name`; comma separated values are split.
    pub fn list(&self, name: &str) -> Vec<String> {
        self.fields
            .get(name)
            .into_iter()
            .flatten()
            .flat_map(|v| v.split(','))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mp = Multipart::from_request(req, state).await?;
        MultipartForm::read(mp).await
    }
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Stores an image under `<prefix>/<user_id>/<uuid>.<ext>` and returns the key.
pub async fn store_image(
    st: &AppState,
    prefix: &str,
    user_id: Uuid,
    item: UploadItem,
) -> Result<String, AppError> {
    let ext = ext_from_mime(&item.content_type).ok_or_else(|| {
        warn!(content_type = %item.content_type, "unsupported upload type");
        AppError::bad_request("Only jpeg, png, webp, heic or gif images are accepted")
    })?;
    let key = format!("{}/{}/{}.{}", prefix, user_id, Uuid::new_v4(), ext);
    st.storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Deletes an object, logging instead of failing.
pub async fn discard_object(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        warn!(error = %e, key, "failed to delete stored object");
    }
}
