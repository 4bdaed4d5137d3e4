use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Maximum title length, counted in characters (not bytes).
pub const MAX_TITLE_LEN: usize = 120;
/// Maximum description length, counted in characters (not bytes).
pub const MAX_DESCRIPTION_LEN: usize = 255;

// ─── Validation ──────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("title must be at most {} characters", MAX_TITLE_LEN)]
    TitleTooLong,
    #[error("description must be at most {} characters", MAX_DESCRIPTION_LEN)]
    DescriptionTooLong,
    #[error("created_at must be an RFC 3339 timestamp")]
    InvalidTimestamp,
}

pub fn ensure_title(title: &str) -> Result<(), ValidationError> {
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(())
}

pub fn ensure_description(description: &str) -> Result<(), ValidationError> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::DescriptionTooLong);
    }
    Ok(())
}

/// Parse an RFC 3339 timestamp and re-render it in UTC, the stored form of
/// `created_at`. Offsets are folded into the time, not kept.
pub fn normalize_rfc3339(value: &str) -> Result<String, ValidationError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc).to_rfc3339())
        .map_err(|_| ValidationError::InvalidTimestamp)
}

// ─── Row and output types ────────────────────────────────────────────────────

/// A task exactly as persisted in the `tasks` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    /// RFC 3339, UTC. Assigned by storage on insert.
    pub created_at: String,
}

/// The one shape ever serialized back to clients.
#[derive(Debug, Clone, Serialize)]
pub struct TaskPublic {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: String,
}

impl From<TaskRow> for TaskPublic {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            completed: row.completed,
            created_at: row.created_at,
        }
    }
}

// ─── Input projections ───────────────────────────────────────────────────────

/// Deserialize a field that was present in the payload, keeping an explicit
/// `null` distinct from the field being absent (absent takes the `default`,
/// i.e. the outer `None`).
fn present_or_null<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Create/replace payload. `title` is required; the other fields track
/// presence so a replace without them leaves stored values untouched, while
/// an explicit `"description": null` clears the column.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskCreate {
    pub title: String,
    #[serde(default, deserialize_with = "present_or_null")]
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
}

impl TaskCreate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_title(&self.title)?;
        if let Some(Some(description)) = &self.description {
            ensure_description(description)?;
        }
        Ok(())
    }

    /// Merge into an existing row: `title` always wins, the optional fields
    /// only when they were present in the payload.
    pub fn apply_to(&self, row: &mut TaskRow) {
        row.title = self.title.clone();
        if let Some(description) = &self.description {
            row.description = description.clone();
        }
        if let Some(completed) = self.completed {
            row.completed = completed;
        }
    }
}

/// Partial-update payload. Every field is optional; only fields present in
/// the payload are merged. `created_at` may be overridden here and is
/// normalized to UTC before storage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub created_at: Option<String>,
}

impl TaskPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            ensure_title(title)?;
        }
        if let Some(Some(description)) = &self.description {
            ensure_description(description)?;
        }
        if let Some(created_at) = &self.created_at {
            normalize_rfc3339(created_at)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, row: &mut TaskRow) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            row.title = title.clone();
        }
        if let Some(description) = &self.description {
            row.description = description.clone();
        }
        if let Some(completed) = self.completed {
            row.completed = completed;
        }
        if let Some(created_at) = &self.created_at {
            row.created_at = normalize_rfc3339(created_at)?;
        }
        Ok(())
    }
}
