use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never exposed
    pub created_at: OffsetDateTime,
}

/// Outcome of converting an uploaded file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileStatus {
    Processing,
    Done,
    Error,
}

impl FileStatus {
    /// A conversion that yields no data rows counts as failed.
    pub fn from_row_count(rows: i64) -> Self {
        if rows > 0 {
            FileStatus::Done
        } else {
            FileStatus::Error
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Processing => "Processing",
            FileStatus::Done => "Done",
            FileStatus::Error => "Error",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Processing" => Ok(FileStatus::Processing),
            "Done" => Ok(FileStatus::Done),
            "Error" => Ok(FileStatus::Error),
            other => anyhow::bail!("unknown file status {other:?}"),
        }
    }
}

/// Per-user metadata for one uploaded CSV and its Parquet counterpart.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileRecord {
    pub file_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub upload_time: OffsetDateTime,
    pub row_count: i64,
    #[serde(rename = "parquet_path")]
    pub storage_path: String,
    pub status: FileStatus,
    #[serde(skip_serializing)]
    pub owner_email: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct FileRow {
    pub file_name: String,
    pub upload_time: OffsetDateTime,
    pub row_count: i64,
    pub parquet_path: String,
    pub status: String,
    pub user_email: String,
}

impl TryFrom<FileRow> for FileRecord {
    type Error = anyhow::Error;

    fn try_from(r: FileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            file_name: r.file_name,
            upload_time: r.upload_time,
            row_count: r.row_count,
            storage_path: r.parquet_path,
            status: r.status.parse()?,
            owner_email: r.user_email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn zero_rows_is_error() {
        assert_eq!(FileStatus::from_row_count(0), FileStatus::Error);
        assert_eq!(FileStatus::from_row_count(1), FileStatus::Done);
    }

    #[test]
    fn status_round_trips_through_text() {
        for s in [FileStatus::Processing, FileStatus::Done, FileStatus::Error] {
            assert_eq!(s.to_string().parse::<FileStatus>().unwrap(), s);
        }
        assert!("done".parse::<FileStatus>().is_err());
    }

    #[test]
    fn file_record_wire_shape() {
        let rec = FileRecord {
            file_name: "data.csv".into(),
            upload_time: datetime!(2024-05-01 12:30:00 UTC),
            row_count: 10,
            storage_path: "parquet/data.parquet".into(),
            status: FileStatus::Done,
            owner_email: "a@example.com".into(),
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["file_name"], "data.csv");
        assert_eq!(v["upload_time"], "2024-05-01T12:30:00Z");
        assert_eq!(v["row_count"], 10);
        assert_eq!(v["parquet_path"], "parquet/data.parquet");
        assert_eq!(v["status"], "Done");
        assert!(v.get("owner_email").is_none());
    }

    #[test]
    fn user_hides_password_hash() {
        let user = User {
            id: 1,
            full_name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: datetime!(2024-05-01 0:00 UTC),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("ada@example.com"));
        assert!(!json.contains("argon2"));
    }
}
