//! Handlers for the `/videos` resource.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use validator::Validate;
use vidshare_core::assets::{AssetSlot, UploadPlan};
use vidshare_core::error::CoreError;
use vidshare_core::media::{MediaPatch, MediaRecord, NewMediaRecord, DEFAULT_DESCRIPTION};
use vidshare_core::types::DbId;
use vidshare_core::validation::{validate_not_blank, DESCRIPTION_MAX_LEN, TITLE_MAX_LEN};

use crate::assets::multipart::{read_form, MultipartForm};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Upload plan for `PATCH /videos/{id}`: only the thumbnail may change.
const UPDATE_PLAN: UploadPlan = UploadPlan {
    required: &[],
    optional: &[AssetSlot::Thumbnail],
};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Text fields of the `POST /videos` multipart form.
#[derive(Debug, Validate)]
pub struct PublishVideoForm {
    #[validate(
        length(min = 1, max = TITLE_MAX_LEN),
        custom(function = "validate_not_blank")
    )]
    pub title: String,
    #[validate(length(max = DESCRIPTION_MAX_LEN))]
    pub description: String,
}

/// Text fields of the `PATCH /videos/{id}` multipart form.
#[derive(Debug, Validate)]
pub struct UpdateVideoForm {
    #[validate(
        length(min = 1, max = TITLE_MAX_LEN),
        custom(function = "validate_not_blank")
    )]
    pub title: Option<String>,
    #[validate(length(max = DESCRIPTION_MAX_LEN))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublishState {
    pub id: DbId,
    pub is_published: bool,
}

fn trimmed(form: &mut MultipartForm, name: &str) -> Option<String> {
    form.take_text(name).map(|s| s.trim().to_string())
}

/// Blank descriptions are stored as [`DEFAULT_DESCRIPTION`].
fn description_or_default(description: String) -> String {
    if description.is_empty() {
        DEFAULT_DESCRIPTION.to_string()
    } else {
        description
    }
}

/// Load `id` and require that `user` owns it.
async fn owned_video(state: &AppState, id: DbId, user: AuthUser) -> AppResult<MediaRecord> {
    let record = state
        .media
        .find_by_id(id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Video", id })?;
    if record.owner_id != user.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the owner can modify this video".into(),
        )));
    }
    Ok(record)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/videos
///
/// Multipart form: `title`, `description`, `video` (required file),
/// `thumbnail` (optional file).
pub async fn publish_video(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = read_form(multipart, &UploadPlan::VIDEO, &state.config.upload).await?;

    let input = PublishVideoForm {
        title: trimmed(&mut form, "title").unwrap_or_default(),
        description: trimmed(&mut form, "description")
            .map(description_or_default)
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
    };
    if let Err(errors) = input.validate() {
        form.discard().await;
        return Err(errors.into());
    }

    let staged = state
        .assets
        .stage_upload(form.files, &UploadPlan::VIDEO)
        .await?;

    let new_video = NewMediaRecord {
        owner_id: user.user_id,
        title: input.title,
        description: input.description,
        video: staged.required(AssetSlot::Video)?,
        thumbnail: staged.get(AssetSlot::Thumbnail).cloned(),
        duration: staged.duration().unwrap_or_default(),
    };

    let video = match state.media.create(&new_video).await {
        Ok(video) => video,
        Err(e) => {
            state.assets.discard_staged(staged, None).await;
            return Err(e.into());
        }
    };

    tracing::info!(video_id = video.id, owner_id = user.user_id, "Video published");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message(video, "Video uploaded successfully")),
    ))
}

/// GET /api/v1/videos/{id}
///
/// Unpublished videos are only visible to their owner.
pub async fn get_video(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<MediaRecord>>> {
    let record = state
        .media
        .find_by_id(id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Video", id })?;

    let is_owner = user.is_some_and(|u| u.user_id == record.owner_id);
    if !record.is_published && !is_owner {
        return Err(AppError::Core(CoreError::NotFound { entity: "Video", id }));
    }

    Ok(Json(DataResponse::new(record)))
}

/// PATCH /api/v1/videos/{id}
///
/// Multipart form with any of `title`, `description`, `thumbnail` (file).
/// A new thumbnail is uploaded and swapped in before the text fields change.
pub async fn update_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<MediaRecord>>> {
    let mut form = read_form(multipart, &UPDATE_PLAN, &state.config.upload).await?;

    let input = UpdateVideoForm {
        title: trimmed(&mut form, "title"),
        description: trimmed(&mut form, "description").map(description_or_default),
    };
    let checked = match input.validate() {
        Err(errors) => Err(AppError::from(errors)),
        Ok(()) if input.title.is_none()
            && input.description.is_none()
            && !form.files.contains(AssetSlot::Thumbnail) =>
        {
            Err(AppError::BadRequest(
                "Provide a title, description or thumbnail to update".into(),
            ))
        }
        Ok(()) => owned_video(&state, id, user).await.map(|_| ()),
    };
    if let Err(e) = checked {
        form.discard().await;
        return Err(e);
    }

    let mut record = None;
    let mut warning = None;

    if let Some(thumbnail) = form.files.take(AssetSlot::Thumbnail) {
        let replaced = state
            .assets
            .replace_asset(id, AssetSlot::Thumbnail, thumbnail)
            .await?;
        warning = replaced.cleanup_warning;
        record = Some(replaced.record);
    }

    if input.title.is_some() || input.description.is_some() {
        let patch = MediaPatch {
            title: input.title,
            description: input.description,
        };
        record = state.media.update(id, &patch).await?;
    }

    let record = record.ok_or(CoreError::NotFound { entity: "Video", id })?;
    tracing::info!(video_id = id, "Video updated");

    Ok(Json(match warning {
        Some(message) => DataResponse::with_message(record, message),
        None => DataResponse::with_message(record, "Video updated successfully"),
    }))
}

/// DELETE /api/v1/videos/{id}
///
/// Removes the remote assets first; the record is kept if any of them could
/// not be deleted.
pub async fn delete_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<MediaRecord>>> {
    owned_video(&state, id, user).await?;
    let deleted = state.assets.delete_media_and_assets(id).await?;
    Ok(Json(DataResponse::with_message(
        deleted,
        "Video deleted successfully",
    )))
}

/// PATCH /api/v1/videos/toggle/publish/{id}
pub async fn toggle_publish(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<PublishState>>> {
    owned_video(&state, id, user).await?;
    let is_published = state.assets.toggle_publish(id).await?;
    tracing::info!(video_id = id, is_published, "Publish state toggled");
    Ok(Json(DataResponse::new(PublishState { id, is_published })))
}
