//! Comments on videos.

use chrono::Utc;
use rusqlite::Connection;
use vs_core::{CommentId, Error, Result, UserId, VideoId};

use crate::models::Comment;

const SELECT: &str = "SELECT c.id, c.video_id, c.user_id, u.username, c.text, c.created_at
                      FROM comments c JOIN users u ON u.id = c.user_id";

/// Insert a comment and return it with the author's username.
pub fn create_comment(
    conn: &Connection,
    video_id: VideoId,
    user_id: UserId,
    text: &str,
) -> Result<Comment> {
    let id = CommentId::new();
    conn.execute(
        "INSERT INTO comments (id, video_id, user_id, text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            id.to_string(),
            video_id.to_string(),
            user_id.to_string(),
            text,
            Utc::now().to_rfc3339()
        ],
    )
    .map_err(|e| {
        if e.to_string().contains("FOREIGN KEY constraint failed") {
            Error::not_found("video", video_id)
        } else {
            Error::database(e.to_string())
        }
    })?;

    conn.query_row(
        &format!("{SELECT} WHERE c.id = ?1"),
        [id.to_string()],
        Comment::from_row,
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Oldest first.
pub fn list_comments_for_video(conn: &Connection, video_id: VideoId) -> Result<Vec<Comment>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT} WHERE c.video_id = ?1 ORDER BY c.created_at ASC, c.rowid ASC"
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([video_id.to_string()], Comment::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}
