//! Access logging middleware.
//!
//! Assigns every call a request id, taken from the inbound `x-request-id` header when the client sent one and freshly
//! generated otherwise. The id is stored in the request extensions (see [`RequestId`]) for the stages and handlers
//! further in, and echoed back on the response. Once the call completes, one line is written to the
//! `mp::access_log` target with the request id, method, HTTP and RPC status, and latency.
//!
//! Errors raised by inner stages are rendered into their response here, so the logged status is the one the client
//! receives.
use std::{
    future::{ready, Ready},
    rc::Rc,
    time::Instant,
};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::*;
use uuid::Uuid;

use crate::errors::GRPC_STATUS_HEADER;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const ACCESS_LOG_TARGET: &str = "mp::access_log";
const MAX_REQUEST_ID_LEN: usize = 128;

/// The correlation id of the current call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Use the client's id if it is usable as a header value and not absurdly long; otherwise make one up.
fn request_id_for(req: &ServiceRequest) -> RequestId {
    let inbound = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= MAX_REQUEST_ID_LEN);
    match inbound {
        Some(id) => RequestId(id.to_string()),
        None => RequestId(Uuid::new_v4().to_string()),
    }
}

pub struct LoggingMiddlewareFactory;

impl LoggingMiddlewareFactory {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for LoggingMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<BoxBody>;
    type Transform = LoggingMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggingMiddlewareService { service: Rc::new(service) }))
    }
}

pub struct LoggingMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggingMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<BoxBody>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let started = Instant::now();
        let request_id = request_id_for(&req);
        req.extensions_mut().insert(request_id.clone());
        let method = req.path().to_string();
        let http_req = req.request().clone();
        Box::pin(async move {
            let mut res = match service.call(req).await {
                Ok(res) => res.map_into_boxed_body(),
                Err(e) => ServiceResponse::from_err(e, http_req),
            };
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            let rpc_status = res.headers().get(GRPC_STATUS_HEADER).and_then(|v| v.to_str().ok()).unwrap_or("0");
            info!(
                target: ACCESS_LOG_TARGET,
                "[{}] {method} {} grpc-status={rpc_status} ({elapsed_ms:.2} ms)",
                request_id.as_str(),
                res.status().as_u16()
            );
            match HeaderValue::from_str(request_id.as_str()) {
                Ok(value) => {
                    res.headers_mut().insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                },
                Err(e) => warn!("💻️ [{}] Request id cannot be echoed back. {e}", request_id.as_str()),
            }
            Ok(res)
        })
    }
}
