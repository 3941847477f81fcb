use std::{
    any::Any,
    fmt::{self, Debug},
    sync::Arc,
    time::Instant,
};

pub type UserId = u64;

/// Per-call state threaded through one request.
///
/// A `Context` is append-only: every `with_*` method returns a new value and leaves the original untouched, so a
/// context handed to a nested call can never change what the caller sees. Cloning is cheap.
///
/// Besides the request id, the authenticated user and an optional deadline, a context can carry the active
/// transaction for the call. That slot is private to the crate and is only read and written by
/// [`TransactionManager`](crate::TransactionManager); callers never see or pass transaction handles.
#[derive(Clone, Default)]
pub struct Context {
    request_id: Option<Arc<str>>,
    user_id: Option<UserId>,
    deadline: Option<Instant>,
    transaction: Option<Arc<dyn Any + Send + Sync>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_id<S: AsRef<str>>(&self, request_id: S) -> Self {
        Self { request_id: Some(Arc::from(request_id.as_ref())), ..self.clone() }
    }

    pub fn with_user_id(&self, user_id: UserId) -> Self {
        Self { user_id: Some(user_id), ..self.clone() }
    }

    /// Attach a deadline to the call. Units of work run through the transaction manager are cancelled and rolled
    /// back once it passes.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self { deadline: Some(deadline), ..self.clone() }
    }

    pub fn request_id(&self) -> &str {
        self.request_id.as_deref().unwrap_or("-")
    }

    /// The id of the authenticated caller, if the call carried a valid token.
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    pub(crate) fn with_transaction(&self, handle: Arc<dyn Any + Send + Sync>) -> Self {
        Self { transaction: Some(handle), ..self.clone() }
    }

    pub(crate) fn transaction(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.transaction.clone()
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id())
            .field("user_id", &self.user_id)
            .field("deadline", &self.deadline)
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}
