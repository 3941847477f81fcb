//! Request validation middleware.
//!
//! This is the outermost stage of every RPC route. It reads the request body, decodes it as the route's payload type
//! and, if that type exposes the [`Validate`](crate::validation::Validate) capability, runs it. A payload that cannot
//! be decoded or that fails its own checks is rejected with `VALIDATION_FAILED` before logging, authorization or the
//! handler see the call. The body is put back on the request afterwards so that the handler can extract it again.
//!
//! Meta calls (health checks, reflection) are passed through untouched.
use std::{
    future::{ready, Ready},
    marker::PhantomData,
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::*;
use marketplace_engine::AppError;

use crate::{errors::ServerError, policy::is_meta_method, validation::RpcRequest};

pub struct ValidationMiddlewareFactory<T> {
    _payload: PhantomData<fn() -> T>,
}

impl<T: RpcRequest> ValidationMiddlewareFactory<T> {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self { _payload: PhantomData }
    }
}

impl<S, B, T> Transform<S, ServiceRequest> for ValidationMiddlewareFactory<T>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    T: RpcRequest,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = ValidationMiddlewareService<S, T>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ValidationMiddlewareService { service: Rc::new(service), _payload: PhantomData }))
    }
}

pub struct ValidationMiddlewareService<S, T> {
    service: Rc<S>,
    _payload: PhantomData<fn() -> T>,
}

impl<S, B, T> Service<ServiceRequest> for ValidationMiddlewareService<S, T>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    T: RpcRequest,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let method = req.path().to_string();
            if is_meta_method(&method) {
                trace!("💻️ {method} is a meta call. Skipping validation.");
                return service.call(req).await;
            }
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("💻️ Failed to read request body for {method}. {e}");
                ServerError::from(AppError::validation("The request body could not be read"))
            })?;
            let payload = serde_json::from_slice::<T>(&data).map_err(|e| {
                debug!("💻️ Request body for {method} is not a valid payload. {e}");
                ServerError::from(AppError::validation(format!("Malformed request. {e}")))
            })?;
            if let Some(validatable) = payload.as_validatable() {
                validatable.validate().map_err(|e| {
                    debug!("💻️ Request to {method} failed validation. {e}");
                    ServerError::from(e)
                })?;
            }
            trace!("💻️ Request to {method} passed validation ✅️");
            req.set_payload(bytes_to_payload(data));
            service.call(req).await
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
