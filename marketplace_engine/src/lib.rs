//! Marketplace Engine
//!
//! This library contains the storage and business logic for the marketplace API. It knows nothing about HTTP or the
//! request pipeline; callers hand it a [`Context`] describing the current call and get [`AppError`]s back.
//!
//! The library is divided into three main sections:
//! 1. Database management ([`mod@db`]). SQLite is the supported backend. Every data-access call goes through a
//!    [`Context`], so that storage work issued inside [`TransactionManager::run`] transparently joins the surrounding
//!    transaction.
//! 2. The public API ([`mod@mp_api`]): [`AuthApi`] registers and authenticates users, and [`ListingsApi`] creates and
//!    searches listings. APIs are generic over the data-access traits so that they can be exercised with mocks.
//! 3. The error taxonomy ([`AppError`], [`ErrorKind`]) that the server translates into stable client-facing codes.
mod context;
mod db;
mod errors;

pub mod db_types;
pub mod helpers;
pub mod mp_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use context::{Context, UserId};
pub use db::{
    sqlite::{SqliteDatabase, SqliteDatabaseError},
    traits,
    transaction::{
        RollbackFailure,
        TransactionBackend,
        TransactionError,
        TransactionManager,
        ON_ROLLBACK_FAILURE,
    },
};
pub use errors::{AppError, ErrorKind, INTERNAL_CLIENT_MESSAGE};
pub use mp_api::{auth_api::AuthApi, listings_api::ListingsApi};
