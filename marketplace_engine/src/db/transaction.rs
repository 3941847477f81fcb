//! Scoped transactions.
//!
//! [`TransactionManager::run`] executes a unit of work inside a single storage transaction. The open transaction is
//! stored on the [`Context`] handed to the unit of work, and every data-access call made with that context uses it
//! instead of checking out its own connection. Calling `run` again with a context that already carries a live
//! transaction does not begin a new one: the inner unit of work simply joins the outer transaction, and only the
//! outermost `run` commits or rolls back.
//!
//! No transaction outlives `run`. A unit of work that succeeds is committed; one that fails, or is cancelled because
//! the context deadline passed, is rolled back. If the `run` future itself is dropped, the transaction is dropped with
//! it and the backend rolls it back.
use std::{future::Future, sync::Arc};

use log::*;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::Context;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("Could not begin transaction. {0}")]
    Begin(String),
    #[error("Could not commit transaction. {0}")]
    Commit(String),
    #[error("Could not roll back transaction. {0}")]
    Rollback(String),
    #[error("The unit of work did not complete before the call deadline")]
    Cancelled,
}

/// A storage engine that can begin, commit and roll back transactions.
///
/// Implementations must uphold two rules:
/// * if `commit` fails, the transaction has been released (rolled back) by the time it returns;
/// * dropping a transaction that was neither committed nor rolled back rolls it back.
#[allow(async_fn_in_trait)]
pub trait TransactionBackend {
    type Transaction: Send + 'static;

    async fn begin(&self) -> Result<Self::Transaction, TransactionError>;

    async fn commit(&self, tx: Self::Transaction) -> Result<(), TransactionError>;

    async fn rollback(&self, tx: Self::Transaction) -> Result<(), TransactionError>;
}

/// What [`TransactionManager::run`] reports when a unit of work fails and the rollback that follows fails too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackFailure {
    /// Log the rollback error and return the unit of work's own error.
    Suppress,
    /// Return the rollback error instead of the unit of work's error.
    Surface,
}

/// Rollback errors are logged and the unit of work's error is returned.
pub const ON_ROLLBACK_FAILURE: RollbackFailure = RollbackFailure::Suppress;

pub(crate) type TransactionSlot<T> = Mutex<Option<T>>;

/// Fetch the transaction slot carried by `ctx`, if it holds one for backend transactions of type `T`.
pub(crate) fn active_transaction<T: Send + 'static>(ctx: &Context) -> Option<Arc<TransactionSlot<T>>> {
    ctx.transaction()?.downcast::<TransactionSlot<T>>().ok()
}

enum Outcome<E> {
    Failed(E),
    Cancelled,
}

#[derive(Clone)]
pub struct TransactionManager<B> {
    backend: B,
}

impl<B> TransactionManager<B>
where B: TransactionBackend
{
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Run `unit` atomically.
    ///
    /// `unit` receives a child of `ctx` carrying the transaction; all storage calls it makes must use that context.
    /// The unit of work's own error is returned unchanged. Failures of the transaction machinery itself are converted
    /// from [`TransactionError`].
    pub async fn run<F, Fut, T, E>(&self, ctx: &Context, unit: F) -> Result<T, E>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TransactionError>,
    {
        let rid = ctx.request_id();
        if let Some(slot) = active_transaction::<B::Transaction>(ctx) {
            if slot.lock().await.is_some() {
                trace!("🗃️ [{rid}] Joining the transaction already open on this context");
                return unit(ctx.clone()).await;
            }
            debug!("🗃️ [{rid}] Context carries a finished transaction. Starting a new one.");
        }
        let tx = self.backend.begin().await?;
        trace!("🗃️ [{rid}] Transaction started");
        let slot = Arc::new(TransactionSlot::new(Some(tx)));
        let child = ctx.with_transaction(slot.clone());
        let outcome = match ctx.deadline() {
            Some(deadline) => match tokio::time::timeout_at(deadline.into(), unit(child)).await {
                Ok(result) => result.map_err(Outcome::Failed),
                Err(_) => Err(Outcome::Cancelled),
            },
            None => unit(child).await.map_err(Outcome::Failed),
        };
        // Taking the transaction out of the slot also turns any later use of a leaked child context into a no-op.
        let pending = slot.lock().await.take();
        let Some(tx) = pending else {
            error!("🗃️ [{rid}] The transaction disappeared from its slot before it was finished");
            return Err(TransactionError::Commit("transaction was already finished".into()).into());
        };
        match outcome {
            Ok(value) => {
                self.backend.commit(tx).await.map_err(|e| {
                    error!("🗃️ [{rid}] Commit failed. {e}");
                    E::from(e)
                })?;
                trace!("🗃️ [{rid}] Transaction committed");
                Ok(value)
            },
            Err(Outcome::Failed(e)) => {
                debug!("🗃️ [{rid}] Unit of work failed. Rolling back.");
                self.release(rid, tx).await?;
                Err(e)
            },
            Err(Outcome::Cancelled) => {
                warn!("🗃️ [{rid}] Call deadline passed before the unit of work completed. Rolling back.");
                self.release(rid, tx).await?;
                Err(TransactionError::Cancelled.into())
            },
        }
    }

    async fn release(&self, rid: &str, tx: B::Transaction) -> Result<(), TransactionError> {
        match self.backend.rollback(tx).await {
            Ok(()) => {
                trace!("🗃️ [{rid}] Transaction rolled back");
                Ok(())
            },
            Err(e) => {
                warn!("🗃️ [{rid}] Rollback failed. {e}");
                match ON_ROLLBACK_FAILURE {
                    RollbackFailure::Suppress => Ok(()),
                    RollbackFailure::Surface => Err(e),
                }
            },
        }
    }
}
