//! # SQLite storage
//!
//! The query modules ([`users`] and [`listings`]) are plain functions that take a `&mut SqliteConnection`. They do not
//! know whether that connection was freshly checked out of the pool or belongs to an open transaction.
//! [`SqliteDatabase`] decides which one to hand them, based on the call context.
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

mod errors;
mod sqlite_impl;

pub mod listings;
pub mod users;

pub use errors::SqliteDatabaseError;
pub use sqlite_impl::SqliteDatabase;

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqliteDatabaseError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
