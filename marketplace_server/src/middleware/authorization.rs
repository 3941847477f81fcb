//! Authorization middleware.
//!
//! Looks up the method's [`AuthRequirement`] in the [`AuthorizationPolicy`] registered as app data and, unless the
//! method is exempt, reads an `Authorization: Bearer <token>` credential and verifies it with the [`TokenService`].
//!
//! | requirement | no credential     | credential fails to verify    | credential verifies |
//! |-------------|-------------------|-------------------------------|---------------------|
//! | Exempt      | proceed           | not inspected                 | not inspected       |
//! | Optional    | proceed anonymous | proceed anonymous (logged)    | user attached       |
//! | Required    | `UNAUTHORIZED`    | `UNAUTHORIZED`                | user attached       |
//!
//! The authenticated user is stored in the request extensions as [`AuthenticatedUser`].
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    web,
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::*;
use marketplace_engine::{AppError, UserId};

use crate::{
    auth::TokenService,
    errors::ServerError,
    middleware::logging::RequestId,
    policy::{AuthRequirement, AuthorizationPolicy, OptionalAuthFailure, ON_OPTIONAL_AUTH_FAILURE},
};

const BEARER_PREFIX: &str = "Bearer ";

/// The caller whose access token was verified for this call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

/// Returns the token in an `Authorization: Bearer <token>` header. A missing header, a different scheme or an empty
/// token all count as no credential.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub struct AuthorizationMiddlewareFactory;

impl AuthorizationMiddlewareFactory {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthorizationMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AuthorizationMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthorizationMiddlewareService { service: Rc::new(service) }))
    }
}

pub struct AuthorizationMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthorizationMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let rid = req.extensions().get::<RequestId>().map(|r| r.0.clone()).unwrap_or_else(|| "-".into());
            let policy = req.app_data::<web::Data<AuthorizationPolicy>>().cloned().ok_or_else(|| {
                error!("🔐️ [{rid}] No authorization policy is registered. Denying access.");
                ServerError::ConfigurationError("Authorization policy is missing".into())
            })?;
            let method = req.path().to_string();
            let requirement = policy.requirement_for(&method);
            if requirement == AuthRequirement::Exempt {
                trace!("🔐️ [{rid}] {method} is exempt from authorization");
                return service.call(req).await;
            }
            let tokens = req.app_data::<web::Data<TokenService>>().cloned().ok_or_else(|| {
                error!("🔐️ [{rid}] No token service is registered. Denying access.");
                ServerError::ConfigurationError("Token service is missing".into())
            })?;
            let token = bearer_token(req.headers()).map(String::from);
            let subject = match token {
                None => None,
                Some(token) => match tokens.verify(&token) {
                    Ok(user_id) => Some(user_id),
                    Err(e) if requirement == AuthRequirement::Optional => match ON_OPTIONAL_AUTH_FAILURE {
                        OptionalAuthFailure::ProceedAnonymously => {
                            warn!("🔐️ [{rid}] Ignoring credential on {method}, continuing anonymously. {e}");
                            None
                        },
                        OptionalAuthFailure::Reject => {
                            warn!("🔐️ [{rid}] Rejecting credential on {method}. {e}");
                            return Err(ServerError::from(e).into());
                        },
                    },
                    Err(e) => {
                        debug!("🔐️ [{rid}] Credential on {method} did not verify. {e}");
                        None
                    },
                },
            };
            match (subject, requirement) {
                (Some(user_id), _) => {
                    trace!("🔐️ [{rid}] Caller is user #{user_id}");
                    req.extensions_mut().insert(AuthenticatedUser(user_id));
                },
                (None, AuthRequirement::Required) => {
                    info!("🔐️ [{rid}] {method} requires authentication. Denying access.");
                    return Err(ServerError::from(AppError::Unauthorized).into());
                },
                (None, _) => trace!("🔐️ [{rid}] Anonymous call to {method}"),
            }
            service.call(req).await
        })
    }
}
