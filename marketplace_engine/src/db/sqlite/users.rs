use log::*;
use sqlx::SqliteConnection;

use super::errors::{db_id, SqliteDatabaseError};
use crate::{
    db_types::{NewUser, User},
    UserId,
};

/// Inserts a new user. A username that is already taken violates the unique constraint and yields
/// [`SqliteDatabaseError::DuplicateUsername`].
pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, SqliteDatabaseError> {
    let result = sqlx::query_as::<_, User>(
        r#"INSERT INTO users (username, password_hash) VALUES ($1, $2)
        RETURNING id, username, password_hash, created_at"#,
    )
    .bind(&user.username)
    .bind(&user.password_hash)
    .fetch_one(conn)
    .await;
    match result {
        Err(e) if SqliteDatabaseError::is_unique_violation(&e) => {
            debug!("🧑️ Username {} is already taken", user.username);
            Err(SqliteDatabaseError::DuplicateUsername(user.username))
        },
        Err(e) => Err(e.into()),
        Ok(u) => {
            trace!("🧑️ Created user #{} ({})", u.id, u.username);
            Ok(u)
        },
    }
}

pub async fn user_by_username(username: &str, conn: &mut SqliteConnection) -> Result<Option<User>, SqliteDatabaseError> {
    let user = sqlx::query_as("SELECT id, username, password_hash, created_at FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

pub async fn user_by_id(id: UserId, conn: &mut SqliteConnection) -> Result<Option<User>, SqliteDatabaseError> {
    let user = sqlx::query_as("SELECT id, username, password_hash, created_at FROM users WHERE id = $1")
        .bind(db_id(id)?)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}
