//! Upload pipeline and file registry operations.
//!
//! Raw uploads and Parquet artifacts live in two flat directories keyed by file
//! name; metadata rows are per owner. Work on one file name is serialized through
//! [`FileLocks`](super::locks::FileLocks).

use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    convert::{convert, parquet_name},
    error::{AppError, AppResult},
    state::AppState,
    storage::is_safe_file_name,
    store::{FileRecord, FileStatus},
};

pub const MISSING_FIELDS: &str = "User email or file name missing";

fn validate_name(file_name: &str) -> AppResult<()> {
    if file_name.is_empty() {
        return Err(AppError::validation(MISSING_FIELDS));
    }
    if !is_safe_file_name(file_name) {
        warn!(file_name, "unsafe file name");
        return Err(AppError::validation("Invalid file name"));
    }
    Ok(())
}

/// Checks an upload's name before anything touches disk.
pub fn validate_upload_name(file_name: &str) -> AppResult<()> {
    if !file_name.ends_with(".csv") {
        return Err(AppError::validation("Only CSV files are allowed."));
    }
    validate_name(file_name)
}

/// Converts the saved raw file, logging and absorbing conversion failures.
async fn convert_saved(st: &AppState, file_name: &str) -> (i64, String) {
    let raw = st.uploads.path_for(file_name);
    let dest = st.parquet.path_for(&parquet_name(file_name));
    let storage_path = dest.display().to_string();

    let row_count = match convert(raw, dest).await {
        Ok(rows) => i64::try_from(rows).unwrap_or(i64::MAX),
        Err(e) => {
            error!(file_name, error = %e, "failed to convert csv to parquet");
            0
        }
    };
    (row_count, storage_path)
}

fn now_utc() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_microsecond(now.microsecond()).unwrap_or(now)
}

/// Save, convert, then record. A failed conversion still yields a record with
/// status `Error`; only a failed save or metadata write fails the request.
#[instrument(skip(st, body), fields(bytes = body.len()))]
pub async fn upload(st: &AppState, owner: &str, file_name: &str, body: Bytes) -> AppResult<FileRecord> {
    validate_upload_name(file_name)?;
    let _guard = st.locks.lock(file_name).await;

    st.uploads.save(file_name, body).await.map_err(|e| {
        error!(file_name, error = %format!("{e:#}"), "failed to save uploaded file");
        AppError::Storage(e)
    })?;

    let (row_count, storage_path) = convert_saved(st, file_name).await;

    let record = FileRecord {
        file_name: file_name.to_string(),
        upload_time: now_utc(),
        row_count,
        storage_path,
        status: FileStatus::from_row_count(row_count),
        owner_email: owner.to_string(),
    };
    st.store.add_file_record(&record).await?;

    info!(file_name, row_count, status = %record.status, "file uploaded");
    Ok(record)
}

pub async fn list(st: &AppState, owner: &str) -> AppResult<Vec<FileRecord>> {
    Ok(st.store.list_files(owner).await?)
}

/// Removes the owner's records for `file_name` and, if there were any, the raw
/// and converted artifacts. Returns the number of artifacts that could not be
/// removed.
#[instrument(skip(st))]
pub async fn delete(st: &AppState, owner: &str, file_name: &str) -> AppResult<usize> {
    validate_name(file_name)?;
    let _guard = st.locks.lock(file_name).await;

    let mut failures = 0;
    if st.store.has_file(owner, file_name).await? {
        if !st.uploads.remove(file_name).await {
            failures += 1;
        }
        if !st.parquet.remove(&parquet_name(file_name)).await {
            failures += 1;
        }
    }

    let removed = st.store.delete_file(owner, file_name).await?;
    info!(file_name, removed, failures, "file deleted");
    Ok(failures)
}

/// Re-runs conversion on the saved raw file and overwrites the owner's records.
#[instrument(skip(st))]
pub async fn reconvert(st: &AppState, owner: &str, file_name: &str) -> AppResult<FileRecord> {
    validate_name(file_name)?;
    let _guard = st.locks.lock(file_name).await;

    if !st.uploads.exists(file_name).await {
        return Err(AppError::not_found("CSV file not found"));
    }
    if !st.store.has_file(owner, file_name).await? {
        return Err(AppError::not_found("File metadata not found"));
    }

    let (row_count, storage_path) = convert_saved(st, file_name).await;
    let status = FileStatus::from_row_count(row_count);

    let record = st
        .store
        .update_file_after_reconvert(owner, file_name, row_count, &storage_path, status)
        .await?
        .ok_or_else(|| AppError::not_found("File metadata not found"))?;

    info!(file_name, row_count, status = %status, "file reconverted");
    Ok(record)
}

/// Wipes both artifact directories and every user's records.
/// Returns the number of artifacts that could not be removed.
#[instrument(skip(st))]
pub async fn clear_all(st: &AppState) -> AppResult<usize> {
    let _all = st.locks.lock_all().await;
    let failures = st.uploads.clear().await + st.parquet.clear().await;
    let removed = st.store.clear_all().await?;
    info!(removed, failures, "all files cleared");
    Ok(failures)
}
