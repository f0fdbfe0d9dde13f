use anyhow::Context;

use super::{types::FileRow, FileRecord, FileStatus, Store};

const FILE_COLUMNS: &str = "file_name, upload_time, row_count, parquet_path, status, user_email";

impl Store {
    /// Appends a file record. The owner is not checked against `users`.
    pub async fn add_file_record(&self, record: &FileRecord) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO files (file_name, upload_time, row_count, parquet_path, status, user_email)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.file_name)
        .bind(record.upload_time)
        .bind(record.row_count)
        .bind(&record.storage_path)
        .bind(record.status.as_str())
        .bind(&record.owner_email)
        .execute(&self.pool)
        .await
        .context("insert file record")?;
        Ok(())
    }

    /// Records owned by `owner_email`, newest first.
    pub async fn list_files(&self, owner_email: &str) -> anyhow::Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE user_email = ? ORDER BY id DESC"
        ))
        .bind(owner_email)
        .fetch_all(&self.pool)
        .await
        .context("list files")?;
        rows.into_iter().map(FileRecord::try_from).collect()
    }

    /// Whether `owner_email` has at least one record named `file_name`.
    pub async fn has_file(&self, owner_email: &str, file_name: &str) -> anyhow::Result<bool> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM files WHERE file_name = ? AND user_email = ?)",
        )
        .bind(file_name)
        .bind(owner_email)
        .fetch_one(&self.pool)
        .await
        .context("check file record")?;
        Ok(found)
    }

    /// Deletes every record matching owner and name exactly. Returns rows removed.
    pub async fn delete_file(&self, owner_email: &str, file_name: &str) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM files WHERE file_name = ? AND user_email = ?")
            .bind(file_name)
            .bind(owner_email)
            .execute(&self.pool)
            .await
            .context("delete file records")?;
        Ok(res.rows_affected())
    }

    /// Overwrites conversion results on every matching record and returns the
    /// most recent one, or `None` if nothing matched.
    pub async fn update_file_after_reconvert(
        &self,
        owner_email: &str,
        file_name: &str,
        row_count: i64,
        storage_path: &str,
        status: FileStatus,
    ) -> anyhow::Result<Option<FileRecord>> {
        let mut tx = self.pool.begin().await.context("begin tx")?;

        let updated = sqlx::query(
            r#"
            UPDATE files
               SET row_count = ?, parquet_path = ?, status = ?
             WHERE file_name = ? AND user_email = ?
            "#,
        )
        .bind(row_count)
        .bind(storage_path)
        .bind(status.as_str())
        .bind(file_name)
        .bind(owner_email)
        .execute(&mut *tx)
        .await
        .context("update file records")?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await.context("rollback tx")?;
            return Ok(None);
        }

        let row = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE file_name = ? AND user_email = ? ORDER BY id DESC LIMIT 1"
        ))
        .bind(file_name)
        .bind(owner_email)
        .fetch_one(&mut *tx)
        .await
        .context("select updated file record")?;

        tx.commit().await.context("commit tx")?;
        Ok(Some(row.try_into()?))
    }

    /// Deletes every file record of every user.
    pub async fn clear_all(&self) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM files")
            .execute(&self.pool)
            .await
            .context("clear file records")?;
        Ok(res.rows_affected())
    }
}
