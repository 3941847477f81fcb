//! Helpers for tests that need a real, migrated database.
use log::*;
use tempfile::TempDir;

use crate::SqliteDatabase;

/// Creates a fresh SQLite database in a temporary directory and runs the migrations on it.
///
/// The database lives as long as the returned [`TempDir`], so keep it in scope for the duration of the test.
pub async fn prepare_test_db() -> (SqliteDatabase, TempDir) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let dir = tempfile::tempdir().expect("Error creating temporary directory");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("marketplace_test.db").display());
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    debug!("🚀️ Test database ready at {url}");
    (db, dir)
}
