//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` against the column order its query
//! module selects.

use std::collections::BTreeMap;
use std::str::FromStr;

use rusqlite::types::Type;
use uuid::Uuid;
use vs_core::{CommentId, UserId, UserRole, VideoId, VideoStatus};

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))?;
    Ok(T::from(uuid))
}

fn parse_enum<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = vs_core::Error>,
{
    let s: String = row.get(idx)?;
    s.parse().map_err(|e| conversion_error(idx, e))
}

/// Decode a JSON object column (`formats`, `qualities`).
fn parse_refs(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<BTreeMap<String, String>> {
    let s: String = row.get(idx)?;
    serde_json::from_str(&s).map_err(|e| conversion_error(idx, e))
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub bio: Option<String>,
    pub created_at: String,
}

impl User {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            role: parse_enum(row, 4)?,
            bio: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------

/// One uploaded asset and its processing lifecycle.
///
/// File references (`source_path`, `file_path`, `formats`, ...) are stored
/// relative to the upload root.
#[derive(Debug, Clone)]
pub struct Video {
    pub id: VideoId,
    pub title: String,
    pub description: String,
    pub source_path: String,
    pub file_path: Option<String>,
    pub thumbnail_path: Option<String>,
    /// Container format name to file reference.
    pub formats: BTreeMap<String, String>,
    /// Rendition label to file reference.
    pub qualities: BTreeMap<String, String>,
    pub duration_secs: Option<f64>,
    pub size_bytes: Option<i64>,
    pub views: i64,
    pub likes: i64,
    pub status: VideoStatus,
    /// Why processing failed, when it did.
    pub error: Option<String>,
    pub uploader_id: UserId,
    pub created_at: String,
    pub updated_at: String,
}

impl Video {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            source_path: row.get(3)?,
            file_path: row.get(4)?,
            thumbnail_path: row.get(5)?,
            formats: parse_refs(row, 6)?,
            qualities: parse_refs(row, 7)?,
            duration_secs: row.get(8)?,
            size_bytes: row.get(9)?,
            views: row.get(10)?,
            likes: row.get(11)?,
            status: parse_enum(row, 12)?,
            error: row.get(13)?,
            uploader_id: parse_id(row, 14)?,
            created_at: row.get(15)?,
            updated_at: row.get(16)?,
        })
    }
}

/// Aggregate numbers for a creator's dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploaderStats {
    pub total_videos: i64,
    pub total_views: i64,
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: CommentId,
    pub video_id: VideoId,
    pub user_id: UserId,
    /// Author's username, joined in at read time.
    pub username: String,
    pub text: String,
    pub created_at: String,
}

impl Comment {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            video_id: parse_id(row, 1)?,
            user_id: parse_id(row, 2)?,
            username: row.get(3)?,
            text: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}
