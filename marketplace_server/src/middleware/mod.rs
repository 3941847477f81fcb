//! The request pipeline.
//!
//! Every RPC route is wrapped in three stages, outermost first: validation, logging, authorization. The `route!`
//! macro in [`routes`](crate::routes) applies them in that order. Handlers read the outcome through the
//! [`CallContext`] extractor.
mod authorization;
mod call_context;
mod logging;
mod validation;

pub use authorization::{bearer_token, AuthenticatedUser, AuthorizationMiddlewareFactory, AuthorizationMiddlewareService};
pub use call_context::CallContext;
pub use logging::{LoggingMiddlewareFactory, LoggingMiddlewareService, RequestId, ACCESS_LOG_TARGET, REQUEST_ID_HEADER};
pub use validation::{ValidationMiddlewareFactory, ValidationMiddlewareService};
