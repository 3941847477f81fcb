use std::{
    future::{ready, Ready},
    ops::Deref,
    time::Instant,
};

use actix_web::{dev::Payload, web, FromRequest, HttpMessage, HttpRequest};
use marketplace_engine::Context;

use crate::{
    config::ServerOptions,
    errors::ServerError,
    middleware::{authorization::AuthenticatedUser, logging::RequestId},
};

/// Handler extractor for the engine [`Context`] of the current call.
///
/// The context carries the request id assigned by the logging stage, the user attached by the authorization stage
/// (if any) and a deadline `request_timeout` from now, taken from the [`ServerOptions`] app data.
#[derive(Clone, Debug)]
pub struct CallContext(pub Context);

impl CallContext {
    pub fn into_inner(self) -> Context {
        self.0
    }
}

impl Deref for CallContext {
    type Target = Context;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for CallContext {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let timeout = req.app_data::<web::Data<ServerOptions>>().map(|o| o.request_timeout).unwrap_or_else(|| {
            ServerOptions::default().request_timeout
        });
        let extensions = req.extensions();
        let mut ctx = Context::new().with_deadline(Instant::now() + timeout);
        if let Some(rid) = extensions.get::<RequestId>() {
            ctx = ctx.with_request_id(rid.as_str());
        }
        if let Some(AuthenticatedUser(user_id)) = extensions.get::<AuthenticatedUser>() {
            ctx = ctx.with_user_id(*user_id);
        }
        ready(Ok(CallContext(ctx)))
    }
}
