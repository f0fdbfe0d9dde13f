use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::{
    dto::{CleanupResponse, FileNameRequest, UploadResponse},
    services::{self, MISSING_FIELDS},
};
use crate::{
    auth::{ActingUser, AuthUser},
    error::{AppError, AppResult},
    state::AppState,
    store::FileRecord,
};

/// Multipart field carrying the CSV.
const FILE_FIELD: &str = "file";

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/files", get(list_files))
}

pub fn write_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/delete_file", post(delete_file))
        .route("/convert_file", post(convert_file))
        .route("/clear", post(clear))
}

#[instrument(skip(state, mp), fields(email = %user.email))]
pub async fn upload_file(
    State(state): State<AppState>,
    user: ActingUser,
    mut mp: Multipart,
) -> AppResult<Json<UploadResponse>> {
    while let Some(field) = mp.next_field().await.map_err(|e| {
        warn!(error = %e, "bad multipart body");
        AppError::validation(e.body_text())
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        services::validate_upload_name(&file_name)?;

        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        let file = services::upload(&state, &user.email, &file_name, body).await?;
        return Ok(Json(UploadResponse {
            message: "File uploaded".into(),
            file,
        }));
    }
    Err(AppError::validation("No file uploaded"))
}

#[instrument(skip(state), fields(email = %user.email))]
pub async fn list_files(
    State(state): State<AppState>,
    user: ActingUser,
) -> AppResult<Json<Vec<FileRecord>>> {
    Ok(Json(services::list(&state, &user.email).await?))
}

#[instrument(skip(state, body), fields(email = %user.email))]
pub async fn delete_file(
    State(state): State<AppState>,
    user: ActingUser,
    Json(body): Json<FileNameRequest>,
) -> AppResult<Json<CleanupResponse>> {
    let file_name = body.file_name.unwrap_or_default();
    if file_name.is_empty() {
        return Err(AppError::validation(MISSING_FIELDS));
    }
    let cleanup_failures = services::delete(&state, &user.email, &file_name).await?;
    Ok(Json(CleanupResponse {
        message: format!("File {file_name} deleted."),
        cleanup_failures,
    }))
}

#[instrument(skip(state, body), fields(email = %user.email))]
pub async fn convert_file(
    State(state): State<AppState>,
    user: ActingUser,
    Json(body): Json<FileNameRequest>,
) -> AppResult<Json<FileRecord>> {
    let file_name = body.file_name.unwrap_or_default();
    Ok(Json(services::reconvert(&state, &user.email, &file_name).await?))
}

/// Global wipe of every user's files; any authenticated caller may run it.
#[instrument(skip_all, fields(email = %user.email))]
pub async fn clear(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<CleanupResponse>> {
    let cleanup_failures = services::clear_all(&state).await?;
    Ok(Json(CleanupResponse {
        message: "All files and metadata cleared.".into(),
        cleanup_failures,
    }))
}
