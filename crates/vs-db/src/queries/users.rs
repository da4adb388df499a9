//! User accounts.

use chrono::Utc;
use rusqlite::Connection;
use vs_core::{Error, Result, UserId, UserRole};

use crate::models::User;

const COLS: &str = "id, username, email, password_hash, role, bio, created_at";

/// Emails are matched case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn unique_violation(e: rusqlite::Error) -> Error {
    let msg = e.to_string();
    if msg.contains("UNIQUE constraint failed") {
        if msg.contains("users.email") {
            Error::Conflict("Email already registered".into())
        } else {
            Error::Conflict("Username already taken".into())
        }
    } else {
        Error::database(msg)
    }
}

pub fn create_user(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
    role: UserRole,
) -> Result<User> {
    let id = UserId::new();
    let username = username.trim().to_string();
    let email = normalize_email(email);
    let created_at = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            id.to_string(),
            username,
            email,
            password_hash,
            role.as_str(),
            created_at
        ],
    )
    .map_err(unique_violation)?;

    Ok(User {
        id,
        username,
        email,
        password_hash: password_hash.to_string(),
        role,
        bio: None,
        created_at,
    })
}

pub fn get_user_by_id(conn: &Connection, id: UserId) -> Result<Option<User>> {
    let result = conn.query_row(
        &format!("SELECT {COLS} FROM users WHERE id = ?1"),
        [id.to_string()],
        User::from_row,
    );
    match result {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let result = conn.query_row(
        &format!("SELECT {COLS} FROM users WHERE email = ?1"),
        [normalize_email(email)],
        User::from_row,
    );
    match result {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Update whichever profile fields are given. Returns false if the user does
/// not exist.
pub fn update_profile(
    conn: &Connection,
    id: UserId,
    username: Option<&str>,
    email: Option<&str>,
    bio: Option<&str>,
) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE users SET
                username = COALESCE(?1, username),
                email    = COALESCE(?2, email),
                bio      = COALESCE(?3, bio)
             WHERE id = ?4",
            rusqlite::params![
                username.map(str::trim),
                email.map(normalize_email),
                bio,
                id.to_string()
            ],
        )
        .map_err(unique_violation)?;
    Ok(n > 0)
}
