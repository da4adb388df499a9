//! Video records: placeholder creation, the two terminal write-backs, and
//! the listing queries the API serves.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use rusqlite::Connection;
use vs_core::{Error, Result, UserId, VideoId, VideoStatus};

use crate::models::{UploaderStats, Video};

const COLS: &str = "id, title, description, source_path, file_path, thumbnail_path, \
                    formats, qualities, duration_secs, size_bytes, views, likes, status, \
                    error, uploader_id, created_at, updated_at";

pub const FEATURED_LIMIT: i64 = 6;
pub const TRENDING_LIMIT: i64 = 8;
pub const TRENDING_WINDOW_DAYS: i64 = 7;

/// Error message written onto records left `processing` by a previous run
/// of the server.
pub const INTERRUPTED: &str = "interrupted by restart";

/// Final file references written by [`mark_ready`].
#[derive(Debug, Clone, Default)]
pub struct ReadyRecord {
    pub file_path: String,
    pub thumbnail_path: Option<String>,
    pub formats: BTreeMap<String, String>,
    pub qualities: BTreeMap<String, String>,
    pub duration_secs: Option<f64>,
    pub size_bytes: Option<i64>,
}

fn to_json(refs: &BTreeMap<String, String>) -> Result<String> {
    serde_json::to_string(refs).map_err(|e| Error::Internal(e.to_string()))
}

fn query_videos(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<Video>> {
    let mut stmt = conn.prepare(sql).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(params, Video::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Insert a `processing` record with no output references.
pub fn create_placeholder(
    conn: &Connection,
    title: &str,
    description: &str,
    source_path: &str,
    uploader_id: UserId,
) -> Result<Video> {
    let id = VideoId::new();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO videos (id, title, description, source_path, status, uploader_id,
                             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        rusqlite::params![
            id.to_string(),
            title,
            description,
            source_path,
            VideoStatus::Processing.as_str(),
            uploader_id.to_string(),
            now
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Video {
        id,
        title: title.to_string(),
        description: description.to_string(),
        source_path: source_path.to_string(),
        file_path: None,
        thumbnail_path: None,
        formats: BTreeMap::new(),
        qualities: BTreeMap::new(),
        duration_secs: None,
        size_bytes: None,
        views: 0,
        likes: 0,
        status: VideoStatus::Processing,
        error: None,
        uploader_id,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Status becomes `ready` and every reference is overwritten.
pub fn mark_ready(conn: &Connection, id: VideoId, record: &ReadyRecord) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE videos SET status = ?1, file_path = ?2, thumbnail_path = ?3,
                formats = ?4, qualities = ?5, duration_secs = ?6, size_bytes = ?7,
                error = NULL, updated_at = ?8
             WHERE id = ?9",
            rusqlite::params![
                VideoStatus::Ready.as_str(),
                record.file_path,
                record.thumbnail_path,
                to_json(&record.formats)?,
                to_json(&record.qualities)?,
                record.duration_secs,
                record.size_bytes,
                Utc::now().to_rfc3339(),
                id.to_string()
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Status becomes `failed`. Output references are cleared so a failed record
/// never points at files that may be gone.
pub fn mark_failed(conn: &Connection, id: VideoId, error: &str) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE videos SET status = ?1, error = ?2, file_path = NULL,
                thumbnail_path = NULL, formats = '{}', qualities = '{}', updated_at = ?3
             WHERE id = ?4",
            rusqlite::params![
                VideoStatus::Failed.as_str(),
                error,
                Utc::now().to_rfc3339(),
                id.to_string()
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

pub fn get_video(conn: &Connection, id: VideoId) -> Result<Option<Video>> {
    let result = conn.query_row(
        &format!("SELECT {COLS} FROM videos WHERE id = ?1"),
        [id.to_string()],
        Video::from_row,
    );
    match result {
        Ok(v) => Ok(Some(v)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Newest first, optionally filtered by status.
pub fn list_videos(
    conn: &Connection,
    status: Option<VideoStatus>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Video>> {
    let (sql, params): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status {
        Some(s) => (
            format!(
                "SELECT {COLS} FROM videos WHERE status = ?1
                 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
            ),
            vec![Box::new(s.as_str()), Box::new(limit), Box::new(offset)],
        ),
        None => (
            format!("SELECT {COLS} FROM videos ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"),
            vec![Box::new(limit), Box::new(offset)],
        ),
    };
    let params_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    query_videos(conn, &sql, &params_refs)
}

pub fn count_videos(conn: &Connection, status: Option<VideoStatus>) -> Result<i64> {
    let result = match status {
        Some(s) => conn.query_row(
            "SELECT COUNT(*) FROM videos WHERE status = ?1",
            [s.as_str()],
            |row| row.get(0),
        ),
        None => conn.query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0)),
    };
    result.map_err(|e| Error::database(e.to_string()))
}

/// Every video by one uploader, newest first, whatever its status.
pub fn list_by_uploader(conn: &Connection, uploader_id: UserId) -> Result<Vec<Video>> {
    query_videos(
        conn,
        &format!("SELECT {COLS} FROM videos WHERE uploader_id = ?1 ORDER BY created_at DESC"),
        rusqlite::params![uploader_id.to_string()],
    )
}

/// Most viewed ready videos of all time.
pub fn list_featured(conn: &Connection) -> Result<Vec<Video>> {
    query_videos(
        conn,
        &format!(
            "SELECT {COLS} FROM videos WHERE status = 'ready'
             ORDER BY views DESC, created_at DESC LIMIT ?1"
        ),
        rusqlite::params![FEATURED_LIMIT],
    )
}

/// Most viewed ready videos uploaded within the trending window.
pub fn list_trending(conn: &Connection) -> Result<Vec<Video>> {
    let since = (Utc::now() - Duration::days(TRENDING_WINDOW_DAYS)).to_rfc3339();
    query_videos(
        conn,
        &format!(
            "SELECT {COLS} FROM videos WHERE status = 'ready' AND created_at >= ?1
             ORDER BY views DESC, likes DESC, created_at DESC LIMIT ?2"
        ),
        rusqlite::params![since, TRENDING_LIMIT],
    )
}

/// Bump the view counter. Returns the new count, or `None` if the video does
/// not exist.
pub fn increment_views(conn: &Connection, id: VideoId) -> Result<Option<i64>> {
    let result = conn.query_row(
        "UPDATE videos SET views = views + 1 WHERE id = ?1 RETURNING views",
        [id.to_string()],
        |row| row.get(0),
    );
    match result {
        Ok(v) => Ok(Some(v)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Delete a record, returning the status it had at the moment of deletion,
/// or `None` when it did not exist.
pub fn delete_video(conn: &Connection, id: VideoId) -> Result<Option<VideoStatus>> {
    let result = conn.query_row(
        "DELETE FROM videos WHERE id = ?1 RETURNING status",
        [id.to_string()],
        |row| row.get::<_, String>(0),
    );
    match result {
        Ok(status) => Ok(Some(status.parse()?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

pub fn uploader_stats(conn: &Connection, uploader_id: UserId) -> Result<UploaderStats> {
    conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(views), 0) FROM videos WHERE uploader_id = ?1",
        [uploader_id.to_string()],
        |row| {
            Ok(UploaderStats {
                total_videos: row.get(0)?,
                total_views: row.get(1)?,
            })
        },
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Settle records a previous process left in `processing`. Returns how many
/// were marked failed.
pub fn fail_interrupted(conn: &Connection) -> Result<usize> {
    let n = conn
        .execute(
            "UPDATE videos SET status = ?1, error = ?2, updated_at = ?3 WHERE status = ?4",
            rusqlite::params![
                VideoStatus::Failed.as_str(),
                INTERRUPTED,
                Utc::now().to_rfc3339(),
                VideoStatus::Processing.as_str()
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n)
}
