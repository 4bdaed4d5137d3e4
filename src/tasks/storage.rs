use anyhow::{anyhow, Result};
use sqlx::{SqliteConnection, SqlitePool};

use super::schema::{TaskCreate, TaskPatch, TaskRow};

/// Current UTC time in the stored `created_at` form (RFC 3339).
fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

// ─── TaskStorage ──────────────────────────────────────────────────────────────

/// Task table operations. Every public method checks a connection out of the
/// pool on entry and releases it when the method returns, on success and
/// error paths alike, so one HTTP request never holds more than one
/// connection.
#[derive(Clone)]
pub struct TaskStorage {
    pool: SqlitePool,
}

impl TaskStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List tasks with the title filter applied before pagination, so
    /// `limit`/`offset` address positions in the filtered set.
    pub async fn list(&self, offset: i64, limit: i64, title: &str) -> Result<Vec<TaskRow>> {
        let mut conn = self.pool.acquire().await?;
        // SQLite LIKE is case-insensitive for ASCII, which is the filter
        // contract. An empty filter becomes '%%' and matches every row.
        let rows: Vec<TaskRow> =
            sqlx::query_as("SELECT * FROM tasks WHERE title LIKE ? LIMIT ? OFFSET ?")
                .bind(format!("%{title}%"))
                .bind(limit)
                .bind(offset)
                .fetch_all(&mut *conn)
                .await?;
        Ok(rows)
    }

    pub async fn get(&self, id: i64) -> Result<Option<TaskRow>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_row(&mut conn, id).await
    }

    /// Insert a task and re-read the stored row, so generated fields (`id`,
    /// `created_at`) come back exactly as persisted.
    pub async fn create(&self, input: &TaskCreate) -> Result<TaskRow> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(
            "INSERT INTO tasks (title, description, completed, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&input.title)
        .bind(input.description.clone().flatten())
        .bind(input.completed.unwrap_or(false))
        .bind(now_rfc3339())
        .execute(&mut *conn)
        .await?;

        // last_insert_rowid is per-connection; the re-read must happen on the
        // same connection the insert ran on.
        let id = result.last_insert_rowid();
        Self::fetch_row(&mut conn, id)
            .await?
            .ok_or_else(|| anyhow!("task not found after insert"))
    }

    /// Replace semantics over an existing row: merge the payload (absent
    /// fields keep their stored values), write, re-read. `None` means the id
    /// matched nothing.
    pub async fn replace(&self, id: i64, input: &TaskCreate) -> Result<Option<TaskRow>> {
        let mut conn = self.pool.acquire().await?;
        let mut row = match Self::fetch_row(&mut conn, id).await? {
            Some(row) => row,
            None => return Ok(None),
        };
        input.apply_to(&mut row);
        Self::update_row(&mut conn, &row).await?;
        Self::fetch_row(&mut conn, id).await
    }

    /// Partial update: merge only the fields present in the patch, write,
    /// re-read. `None` means the id matched nothing.
    pub async fn patch(&self, id: i64, patch: &TaskPatch) -> Result<Option<TaskRow>> {
        let mut conn = self.pool.acquire().await?;
        let mut row = match Self::fetch_row(&mut conn, id).await? {
            Some(row) => row,
            None => return Ok(None),
        };
        patch.apply_to(&mut row)?;
        Self::update_row(&mut conn, &row).await?;
        Self::fetch_row(&mut conn, id).await
    }

    /// Returns false when the id matched nothing.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn fetch_row(conn: &mut SqliteConnection, id: i64) -> Result<Option<TaskRow>> {
        Ok(sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?)
    }

    async fn update_row(conn: &mut SqliteConnection, row: &TaskRow) -> Result<()> {
        sqlx::query(
            "UPDATE tasks SET title = ?, description = ?, completed = ?, created_at = ? WHERE id = ?",
        )
        .bind(&row.title)
        .bind(&row.description)
        .bind(row.completed)
        .bind(&row.created_at)
        .bind(row.id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
