use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use bytes::Bytes;
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::{
    dto::{
        email_taken, normalize_email, parse_body, password_too_short, validation_failed,
        CreateUserRequest, EditUserRequest, PasswordChangeRequest, ProfileFields,
        MIN_PASSWORD_LEN,
    },
    error::ApiError,
    pictures::picture_key,
    views::{self, AdView, InactiveAdsView, UserBrowseView, UserDetailView, UserOffersView, UserReadView},
};
use crate::{
    auth::{
        password::{hash_password, verify_password},
        CurrentUser, TargetUser,
    },
    state::AppState,
    store::User,
};

pub fn user_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/users", get(browse_all).post(create))
        .route(
            "/api/users/current",
            put(edit_current).patch(edit_current).delete(delete_current),
        )
        .route("/api/users/current/profile", get(get_current_profile))
        .route("/api/users/current/offers", get(get_current_offers))
        .route("/api/users/current/wishes", get(get_current_wishes))
        .route("/api/users/current/advertisements", get(get_current_inactive_ads))
        .route(
            "/api/users/current/password",
            put(edit_current_password).patch(edit_current_password),
        )
        .route(
            "/api/users/current/pictures",
            post(upload_current_picture).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/users/:id", get(read_by_id))
        .route("/api/users/:id/offers", get(browse_by_owner_id))
}

// --- current user ---

#[instrument(skip_all)]
pub async fn get_current_offers(
    State(state): State<AppState>,
    principal: CurrentUser,
) -> Result<Json<Vec<AdView>>, ApiError> {
    let user = principal.require()?;
    let offers = state.repo.offers_by_owner(user.id, true).await?;
    Ok(Json(offers.iter().map(views::offer_view).collect()))
}

#[instrument(skip_all)]
pub async fn get_current_wishes(
    State(state): State<AppState>,
    principal: CurrentUser,
) -> Result<Json<Vec<AdView>>, ApiError> {
    let user = principal.require()?;
    let wishes = state.repo.wishes_by_owner(user.id, true).await?;
    Ok(Json(wishes.iter().map(views::wish_view).collect()))
}

#[instrument(skip_all)]
pub async fn get_current_inactive_ads(
    State(state): State<AppState>,
    principal: CurrentUser,
) -> Result<Json<InactiveAdsView>, ApiError> {
    let user = principal.require()?;
    let wishes = state.repo.wishes_by_owner(user.id, false).await?;
    let offers = state.repo.offers_by_owner(user.id, false).await?;
    Ok(Json(views::inactive_ads(&offers, &wishes)))
}

#[instrument(skip_all)]
pub async fn get_current_profile(principal: CurrentUser) -> Result<Json<UserReadView>, ApiError> {
    let user = principal.require()?;
    Ok(Json(views::user_read(&user)))
}

#[instrument(skip_all)]
pub async fn edit_current(
    State(state): State<AppState>,
    principal: CurrentUser,
    body: Bytes,
) -> Result<(StatusCode, Json<UserReadView>), ApiError> {
    let mut user = principal.require()?;
    let patch: EditUserRequest = parse_body(&body)?;

    if let Some(email) = patch.email {
        user.email = normalize_email(&email);
    }
    if let Some(name) = patch.display_name {
        user.display_name = name.trim().to_string();
    }

    let fields = ProfileFields {
        email: user.email.clone(),
        display_name: user.display_name.clone(),
    };
    let mut errors = fields.validate().err().unwrap_or_else(ValidationErrors::new);
    if let Some(other) = state.repo.find_user_by_email(&user.email).await? {
        if other.id != user.id {
            errors.add("email", email_taken());
        }
    }
    if !errors.is_empty() {
        warn!(user_id = %user.id, "profile edit rejected");
        return Err(validation_failed(errors));
    }

    user.updated_at = Some(OffsetDateTime::now_utc());
    save_user(&state, &user).await?;
    user.version += 1;

    info!(user_id = %user.id, "profile updated");
    Ok((StatusCode::PARTIAL_CONTENT, Json(views::user_read(&user))))
}

#[instrument(skip_all)]
pub async fn edit_current_password(
    State(state): State<AppState>,
    principal: CurrentUser,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut user = principal.require()?;
    let req: PasswordChangeRequest = parse_body(&body)?;

    if req.newpassword != req.passwordconfirmation {
        warn!(user_id = %user.id, "password confirmation mismatch");
        return Err(ApiError::ConfirmationMismatch);
    }

    let current_ok = match req.currentpassword.as_deref() {
        Some(current) => verify_password(current, &user.password_hash)?,
        None => false,
    };
    if !current_ok {
        warn!(user_id = %user.id, "current password rejected");
        return Err(ApiError::InvalidCredentials);
    }

    let new_password = req
        .newpassword
        .filter(|p| p.len() >= MIN_PASSWORD_LEN)
        .ok_or_else(|| validation_failed(password_too_short()))?;

    user.password_hash = hash_password(&new_password)?;
    user.updated_at = Some(OffsetDateTime::now_utc());
    save_user(&state, &user).await?;

    info!(user_id = %user.id, "password changed");
    Ok((
        StatusCode::PARTIAL_CONTENT,
        Json(json!({ "success": "password updated" })),
    ))
}

/// POST /api/users/current/pictures (multipart, field `file`)
///
/// The new object is stored and committed before the previous one is
/// removed; removal of the old object never fails the request.
#[instrument(skip_all)]
pub async fn upload_current_picture(
    State(state): State<AppState>,
    principal: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let Some(mut user) = principal.0 else {
        return Err(ApiError::NotFound("user not found"));
    };
    let mut mp = multipart.map_err(|e| {
        warn!(error = %e, "picture upload is not multipart");
        ApiError::StorageFailure
    })?;

    let upload = read_file_field(&mut mp).await?;
    let key = picture_key(user.id, upload.file_name.as_deref());

    state
        .storage
        .put_object(&key, upload.body, &upload.content_type)
        .await
        .map_err(|e| {
            error!(error = %e, %key, "put_object failed");
            ApiError::StorageFailure
        })?;

    let old_key = user.picture_key.replace(key.clone());
    user.picture = state.storage.object_url(&key);
    user.updated_at = Some(OffsetDateTime::now_utc());

    if let Err(e) = save_user(&state, &user).await {
        discard_object(&state, &key).await;
        return Err(match e {
            ApiError::Conflict => ApiError::Conflict,
            other => {
                error!(error = %other, user_id = %user.id, "picture commit failed");
                ApiError::StorageFailure
            }
        });
    }

    if let Some(old) = old_key {
        discard_object(&state, &old).await;
    }

    info!(user_id = %user.id, %key, "profile picture replaced");
    Ok(Json(json!({ "success": "image uploaded" })))
}

#[instrument(skip_all)]
pub async fn delete_current(
    State(state): State<AppState>,
    principal: CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let user = principal.require()?;

    let mut session = state.uow.begin().await?;
    if let Err(e) = session.stage_removal(user.id).await {
        error!(error = %e, user_id = %user.id, "stage removal failed");
        return Err(ApiError::DeletionFailed);
    }
    session.commit().await?;

    if let Some(key) = &user.picture_key {
        discard_object(&state, key).await;
    }

    info!(user_id = %user.id, "user deleted");
    Ok(Json(json!({ "success": "user deleted" })))
}

// --- public ---

#[instrument(skip_all)]
pub async fn browse_all(State(state): State<AppState>) -> Result<Json<Vec<UserBrowseView>>, ApiError> {
    let users = state.repo.list_users().await?;
    Ok(Json(users.iter().map(views::user_browse).collect()))
}

#[instrument(skip_all)]
pub async fn read_by_id(
    State(state): State<AppState>,
    target: TargetUser,
) -> Result<Json<UserDetailView>, ApiError> {
    let Some(user) = target.0 else {
        return Err(ApiError::NotFound("user not found"));
    };
    let offers = state.repo.offers_by_owner(user.id, true).await?;
    let wishes = state.repo.wishes_by_owner(user.id, true).await?;
    Ok(Json(views::user_detail(&user, &offers, &wishes)))
}

#[instrument(skip_all)]
pub async fn browse_by_owner_id(
    State(state): State<AppState>,
    target: TargetUser,
) -> Result<Json<UserOffersView>, ApiError> {
    let Some(user) = target.0 else {
        return Err(ApiError::NotFound("request not found"));
    };
    let offers = state.repo.offers_by_owner(user.id, true).await?;
    Ok(Json(views::user_offers(&user, &offers)))
}

/// POST /api/users
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<UserReadView>), ApiError> {
    let mut payload: CreateUserRequest = parse_body(&body)?;
    payload.email = normalize_email(&payload.email);
    payload.display_name = payload.display_name.trim().to_string();

    let mut errors = payload.validate().err().unwrap_or_else(ValidationErrors::new);
    if !payload.email.is_empty()
        && state.repo.find_user_by_email(&payload.email).await?.is_some()
    {
        errors.add("email", email_taken());
    }
    if !errors.is_empty() {
        warn!(email = %payload.email, "registration rejected");
        return Err(validation_failed(errors));
    }

    let user = User {
        id: Uuid::new_v4(),
        email: payload.email,
        display_name: payload.display_name,
        password_hash: hash_password(&payload.password)?,
        picture: state.config.default_picture_url.clone(),
        picture_key: None,
        created_at: OffsetDateTime::now_utc(),
        updated_at: None,
        version: 0,
    };

    let mut session = state.uow.begin().await?;
    session.stage_insert(&user).await?;
    session.commit().await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/users/{}", user.id))],
        Json(views::user_read(&user)),
    ))
}

// --- helpers ---

async fn save_user(state: &AppState, user: &User) -> Result<(), ApiError> {
    let mut session = state.uow.begin().await?;
    if !session.stage_update(user).await? {
        warn!(user_id = %user.id, version = user.version, "stale user version");
        return Err(ApiError::Conflict);
    }
    session.commit().await?;
    Ok(())
}

/// Best-effort removal of a storage object.
async fn discard_object(state: &AppState, key: &str) {
    if let Err(e) = state.storage.delete_object(key).await {
        warn!(error = %e, %key, "could not remove stored picture");
    }
}

struct UploadedFile {
    file_name: Option<String>,
    content_type: String,
    body: Bytes,
}

async fn read_file_field(mp: &mut Multipart) -> Result<UploadedFile, ApiError> {
    loop {
        let field = match mp.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "multipart read failed");
                return Err(ApiError::StorageFailure);
            }
        };
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = field.bytes().await.map_err(|e| {
            warn!(error = %e, "reading upload failed");
            ApiError::StorageFailure
        })?;
        if body.is_empty() {
            warn!("empty upload");
            return Err(ApiError::StorageFailure);
        }
        return Ok(UploadedFile {
            file_name,
            content_type,
            body,
        });
    }
    warn!("multipart body has no `file` field");
    Err(ApiError::StorageFailure)
}
