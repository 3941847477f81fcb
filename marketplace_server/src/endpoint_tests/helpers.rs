use actix_http::Request;
use actix_web::{
    body::{to_bytes, MessageBody},
    dev::{Service, ServiceResponse},
    http::{
        header::{HeaderMap, AUTHORIZATION},
        StatusCode,
    },
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
};
use chrono::Duration;
use log::debug;
use marketplace_engine::{
    traits::{ListingManagement, UserManagement},
    AuthApi,
    ListingsApi,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    auth::TokenService,
    config::{AuthConfig, ServerOptions},
    errors::{ErrorEnvelope, GRPC_STATUS_HEADER},
    policy::AuthorizationPolicy,
    routes::rpc_services,
    server::json_config,
};

// DO NOT re-use this secret anywhere.
pub const TEST_SECRET: &str = "endpoint-tests-signing-secret-0123456789";

pub fn token_service() -> TokenService {
    TokenService::new(&AuthConfig::new(TEST_SECRET, Duration::hours(1)))
}

/// Registers the shared app data and every RPC route on top of storage backend `db`.
pub fn configure_app<B>(db: B) -> impl FnOnce(&mut ServiceConfig)
where B: UserManagement + ListingManagement + Clone + 'static {
    move |cfg| {
        cfg.app_data(json_config())
            .app_data(web::Data::new(AuthApi::new(db.clone())))
            .app_data(web::Data::new(ListingsApi::new(db)))
            .app_data(web::Data::new(token_service()))
            .app_data(web::Data::new(AuthorizationPolicy::marketplace_default()))
            .app_data(web::Data::new(ServerOptions::default()));
        rpc_services::<B>(cfg);
    }
}

pub struct RpcResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl RpcResponse {
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_str(&self.body).unwrap_or_else(|e| panic!("Unexpected body {}. {e}", self.body))
    }

    /// The stable error code in the error envelope.
    pub fn error_code(&self) -> String {
        self.json::<ErrorEnvelope>().error.code.as_str().to_string()
    }

    pub fn rpc_status(&self) -> Option<&str> {
        self.headers.get(GRPC_STATUS_HEADER).and_then(|v| v.to_str().ok())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Calls `method` with a JSON body. `authorization` is sent verbatim as the `Authorization` header.
pub async fn call_rpc<S, B>(app: &S, method: &str, authorization: Option<&str>, body: Value) -> RpcResponse
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    call_rpc_with_headers(app, method, authorization, &[], body).await
}

pub async fn call_rpc_with_headers<S, B>(
    app: &S,
    method: &str,
    authorization: Option<&str>,
    headers: &[(&str, &str)],
    body: Value,
) -> RpcResponse
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let mut req = TestRequest::post().uri(method).set_json(body);
    if let Some(value) = authorization {
        req = req.insert_header((AUTHORIZATION, value.to_string()));
    }
    for (name, value) in headers {
        req = req.insert_header((name.to_string(), value.to_string()));
    }
    // Errors raised by the outermost stage are rendered by the HTTP dispatcher in a real server, so do the same here
    let (status, headers, body) = match test::try_call_service(app, req.to_request()).await {
        Ok(res) => (res.status(), res.headers().clone(), test::read_body(res).await),
        Err(e) => {
            let res = e.error_response();
            let (status, headers) = (res.status(), res.headers().clone());
            (status, headers, to_bytes(res.into_body()).await.unwrap_or_default())
        },
    };
    let body = String::from_utf8_lossy(&body).into_owned();
    debug!("{method} -> {status}: {body}");
    RpcResponse { status, headers, body }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
