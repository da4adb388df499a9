//! Database query modules.

pub mod comments;
pub mod users;
pub mod videos;
