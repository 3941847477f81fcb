//! Per-method authorization requirements.
//!
//! Every RPC method is classified as [`AuthRequirement::Exempt`], [`AuthRequirement::Optional`] or
//! [`AuthRequirement::Required`]. The table is built once at start-up and handed to the request pipeline; it is never
//! modified afterwards, so it can be shared between workers without locking.
use std::collections::HashMap;

pub const REGISTER_METHOD: &str = "/auth.AuthService/Register";
pub const LOGIN_METHOD: &str = "/auth.AuthService/Login";
pub const CREATE_LISTING_METHOD: &str = "/listings.ListingsService/CreateListing";
pub const GET_LISTINGS_METHOD: &str = "/listings.ListingsService/GetListings";
pub const GET_LISTING_METHOD: &str = "/listings.ListingsService/GetListing";
pub const HEALTH_CHECK_METHOD: &str = "/grpc.health.v1.Health/Check";

/// Prefix shared by framework methods (health checks, reflection) that bypass request validation.
pub const META_METHOD_PREFIX: &str = "/grpc.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthRequirement {
    /// The method never looks for a credential.
    Exempt,
    /// The method runs with or without an authenticated caller.
    Optional,
    /// The method fails with `Unauthorized` unless the caller presents a valid token.
    Required,
}

/// The requirement applied to any method that is not in the table.
///
/// This is fail-open: a newly added method is callable anonymously until it is classified. Review this whenever the
/// method table changes.
pub const UNLISTED_METHOD_REQUIREMENT: AuthRequirement = AuthRequirement::Optional;

/// What happens when an `Optional` method receives a credential that does not verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalAuthFailure {
    /// Log the failure and continue as an anonymous caller.
    ProceedAnonymously,
    /// Reject the call.
    Reject,
}

pub const ON_OPTIONAL_AUTH_FAILURE: OptionalAuthFailure = OptionalAuthFailure::ProceedAnonymously;

#[derive(Debug, Clone, Default)]
pub struct AuthorizationPolicy {
    requirements: HashMap<String, AuthRequirement>,
}

impl AuthorizationPolicy {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, AuthRequirement)>,
        S: Into<String>,
    {
        Self { requirements: entries.into_iter().map(|(m, r)| (m.into(), r)).collect() }
    }

    /// The method table for the marketplace services.
    pub fn marketplace_default() -> Self {
        Self::new([
            (REGISTER_METHOD, AuthRequirement::Exempt),
            (LOGIN_METHOD, AuthRequirement::Exempt),
            (HEALTH_CHECK_METHOD, AuthRequirement::Exempt),
            (CREATE_LISTING_METHOD, AuthRequirement::Required),
            (GET_LISTINGS_METHOD, AuthRequirement::Optional),
            (GET_LISTING_METHOD, AuthRequirement::Optional),
        ])
    }

    pub fn requirement_for(&self, method: &str) -> AuthRequirement {
        self.requirements.get(method).copied().unwrap_or(UNLISTED_METHOD_REQUIREMENT)
    }
}

pub fn is_meta_method(method: &str) -> bool {
    method.starts_with(META_METHOD_PREFIX)
}
