//! vs-db: persistence for users, video records and comments.
//!
//! SQLite behind an r2d2 pool, embedded migrations, typed models and one
//! query module per table. The ingest pipeline never touches this crate
//! directly; its caller writes results back by video id.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

pub use pool::{get_conn, init_memory_pool, init_pool, DbPool, PooledConnection};
