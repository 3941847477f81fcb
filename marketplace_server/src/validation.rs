//! Request self-validation.
//!
//! A request type that knows how to check itself implements [`Validate`] and exposes it through
//! [`RpcRequest::as_validatable`]. The validation stage of the pipeline only ever asks for that capability; request
//! types without it pass straight through.
use marketplace_engine::AppError;
use serde::de::DeserializeOwned;

pub trait Validate {
    /// Returns [`AppError::ValidationFailed`] describing the first rule the request breaks.
    fn validate(&self) -> Result<(), AppError>;
}

/// A JSON payload accepted by an RPC method.
pub trait RpcRequest: DeserializeOwned + 'static {
    fn as_validatable(&self) -> Option<&dyn Validate> {
        None
    }
}

pub(crate) fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::validation(format!("{field} must be between {min} and {max} characters long")));
    }
    Ok(())
}

pub(crate) fn check_not_blank(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(())
}
