//! `SqliteDatabase` is the SQLite storage backend for the marketplace engine.
//!
//! It implements the data-access traits in [`crate::traits`] and owns the [`TransactionManager`] for its pool.
use std::fmt::Debug;

use futures_util::future::BoxFuture;
use log::*;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use super::{listings, new_pool, users, SqliteDatabaseError};
use crate::{
    db::transaction::{active_transaction, TransactionBackend, TransactionError, TransactionManager},
    db_types::{Listing, ListingFilter, ListingId, NewListing, NewUser, User},
    traits::{ListingManagement, UserManagement},
    AppError,
    Context,
    UserId,
};

type SqliteTransaction = Transaction<'static, Sqlite>;

impl TransactionBackend for SqlitePool {
    type Transaction = SqliteTransaction;

    async fn begin(&self) -> Result<SqliteTransaction, TransactionError> {
        SqlitePool::begin(self).await.map_err(|e| TransactionError::Begin(e.to_string()))
    }

    // sqlx rolls back a transaction whose commit failed when it is dropped, which happens on return.
    async fn commit(&self, tx: SqliteTransaction) -> Result<(), TransactionError> {
        tx.commit().await.map_err(|e| TransactionError::Commit(e.to_string()))
    }

    async fn rollback(&self, tx: SqliteTransaction) -> Result<(), TransactionError> {
        tx.rollback().await.map_err(|e| TransactionError::Rollback(e.to_string()))
    }
}

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    transactions: TransactionManager<SqlitePool>,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        let transactions = TransactionManager::new(pool.clone());
        Ok(Self { url: url.to_string(), pool, transactions })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// The transaction manager for this database. Business APIs use it to group several storage calls into one unit
    /// of work.
    pub fn transactions(&self) -> &TransactionManager<SqlitePool> {
        &self.transactions
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Runs `f` on the connection that belongs to this call: the open transaction if `ctx` carries one, otherwise a
    /// connection checked out from the pool for just this call.
    pub(crate) async fn with_conn<T, F>(&self, ctx: &Context, f: F) -> Result<T, SqliteDatabaseError>
    where F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, SqliteDatabaseError>> {
        if let Some(slot) = active_transaction::<SqliteTransaction>(ctx) {
            let mut guard = slot.lock().await;
            if let Some(tx) = guard.as_mut() {
                return f(&mut **tx).await;
            }
            warn!("🗃️ [{}] Context refers to a finished transaction. Using a pooled connection.", ctx.request_id());
        }
        let mut conn = self.pool.acquire().await?;
        f(&mut *conn).await
    }
}

impl UserManagement for SqliteDatabase {
    async fn insert_user(&self, ctx: &Context, user: NewUser) -> Result<User, AppError> {
        let user = self
            .transactions
            // Write units must write first. A deferred transaction that reads before writing cannot wait for the
            // write lock and fails with SQLITE_BUSY when another writer holds it.
            .run(ctx, |ctx| async move {
                let user = self.with_conn(&ctx, move |conn| Box::pin(users::insert_user(user, conn))).await?;
                Ok::<_, AppError>(user)
            })
            .await?;
        debug!("🗃️ [{}] User #{} ({}) saved", ctx.request_id(), user.id, user.username);
        Ok(user)
    }

    async fn fetch_user_by_username(&self, ctx: &Context, username: &str) -> Result<Option<User>, AppError> {
        let username = username.to_string();
        let user = self
            .with_conn(ctx, move |conn| Box::pin(async move { users::user_by_username(&username, conn).await }))
            .await?;
        Ok(user)
    }

    async fn fetch_user_by_id(&self, ctx: &Context, id: UserId) -> Result<Option<User>, AppError> {
        let user = self.with_conn(ctx, move |conn| Box::pin(users::user_by_id(id, conn))).await?;
        Ok(user)
    }
}

impl ListingManagement for SqliteDatabase {
    async fn insert_listing(&self, ctx: &Context, author_id: UserId, listing: NewListing) -> Result<Listing, AppError> {
        let listing = self
            .transactions
            .run(ctx, |ctx| async move {
                let id =
                    self.with_conn(&ctx, move |conn| Box::pin(listings::insert_listing(author_id, listing, conn))).await?;
                self.fetch_listing_by_id(&ctx, id)
                    .await?
                    .ok_or_else(|| AppError::internal(format!("Listing #{id} vanished inside its own transaction")))
            })
            .await?;
        debug!("🗃️ [{}] Listing #{} saved for user #{author_id}", ctx.request_id(), listing.id);
        Ok(listing)
    }

    async fn fetch_listings(&self, ctx: &Context, filter: &ListingFilter) -> Result<(Vec<Listing>, u32), AppError> {
        let count_filter = filter.clone();
        let page_filter = filter.clone();
        let result = self
            .transactions
            .run(ctx, |ctx| async move {
                let total = self
                    .with_conn(&ctx, move |conn| {
                        Box::pin(async move { listings::count_listings(&count_filter, conn).await })
                    })
                    .await?;
                if total == 0 {
                    return Ok::<_, AppError>((Vec::new(), 0));
                }
                let page = self
                    .with_conn(&ctx, move |conn| {
                        Box::pin(async move { listings::fetch_listings(&page_filter, conn).await })
                    })
                    .await?;
                Ok((page, total))
            })
            .await?;
        trace!("🗃️ [{}] {} of {} listings fetched", ctx.request_id(), result.0.len(), result.1);
        Ok(result)
    }

    async fn fetch_listing_by_id(&self, ctx: &Context, id: ListingId) -> Result<Option<Listing>, AppError> {
        let listing = self.with_conn(ctx, move |conn| Box::pin(listings::listing_by_id(id, conn))).await?;
        Ok(listing)
    }
}
