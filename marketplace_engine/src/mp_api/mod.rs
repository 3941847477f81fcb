//! # Marketplace engine public API
//!
//! * [`auth_api`] registers users and checks their credentials.
//! * [`listings_api`] creates, searches and fetches marketplace listings.
//!
//! Every API is created by handing it a storage backend that implements the data-access traits it needs:
//!
//! ```rust,ignore
//! use marketplace_engine::{AuthApi, Context, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements UserManagement
//! let api = AuthApi::new(db);
//! let user = api.register(&Context::new(), "alice", "s3cr3t-pw").await?;
//! ```
pub mod auth_api;
pub mod listings_api;
