//! Exercises the request pipeline in isolation, with probe handlers that record every call they receive.
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use actix_web::{http::StatusCode, test, web, App, HttpResponse};
use chrono::Duration;
use marketplace_engine::{AppError, UserId};
use mp_common::Secret;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::helpers::*;
use crate::{
    auth::issue_token,
    config::ServerOptions,
    data_objects::HealthCheckResponse,
    middleware::{CallContext, REQUEST_ID_HEADER},
    policy::{AuthRequirement, AuthorizationPolicy, HEALTH_CHECK_METHOD},
    route,
    routes::HealthRoute,
    server::json_config,
    validation::{RpcRequest, Validate},
};

const REQUIRED_METHOD: &str = "/probe.ProbeService/Required";
const OPTIONAL_METHOD: &str = "/probe.ProbeService/Optional";
const EXEMPT_METHOD: &str = "/probe.ProbeService/Exempt";
const UNLISTED_METHOD: &str = "/probe.ProbeService/Unlisted";
const META_METHOD: &str = "/grpc.probe.v1.Probe/Check";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProbeRequest {
    #[serde(default)]
    reject: bool,
}

impl Validate for ProbeRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.reject {
            return Err(AppError::validation("probe asked to be rejected"));
        }
        Ok(())
    }
}

impl RpcRequest for ProbeRequest {
    fn as_validatable(&self) -> Option<&dyn Validate> {
        Some(self)
    }
}

#[derive(Default)]
struct Calls {
    count: AtomicUsize,
    users: Mutex<Vec<Option<UserId>>>,
    request_ids: Mutex<Vec<String>>,
}

impl Calls {
    fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn last_user(&self) -> Option<UserId> {
        self.users.lock().unwrap().last().copied().flatten()
    }

    fn last_request_id(&self) -> String {
        self.request_ids.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

async fn record(ctx: &CallContext, calls: &Calls) -> HttpResponse {
    calls.count.fetch_add(1, Ordering::SeqCst);
    calls.users.lock().unwrap().push(ctx.user_id());
    calls.request_ids.lock().unwrap().push(ctx.request_id().to_string());
    HttpResponse::Ok().json(json!({"user_id": ctx.user_id()}))
}

async fn required_probe(ctx: CallContext, calls: web::Data<Calls>) -> HttpResponse {
    record(&ctx, &calls).await
}

async fn optional_probe(ctx: CallContext, calls: web::Data<Calls>) -> HttpResponse {
    record(&ctx, &calls).await
}

async fn exempt_probe(ctx: CallContext, calls: web::Data<Calls>) -> HttpResponse {
    record(&ctx, &calls).await
}

async fn unlisted_probe(ctx: CallContext, calls: web::Data<Calls>) -> HttpResponse {
    record(&ctx, &calls).await
}

async fn meta_probe(ctx: CallContext, calls: web::Data<Calls>) -> HttpResponse {
    record(&ctx, &calls).await
}

route!(required_probe => REQUIRED_METHOD, ProbeRequest);
route!(optional_probe => OPTIONAL_METHOD, ProbeRequest);
route!(exempt_probe => EXEMPT_METHOD, ProbeRequest);
route!(unlisted_probe => UNLISTED_METHOD, ProbeRequest);
route!(meta_probe => META_METHOD, ProbeRequest);

fn probe_app(calls: web::Data<Calls>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let policy = AuthorizationPolicy::new([
            (REQUIRED_METHOD, AuthRequirement::Required),
            (OPTIONAL_METHOD, AuthRequirement::Optional),
            (EXEMPT_METHOD, AuthRequirement::Exempt),
        ]);
        cfg.app_data(json_config())
            .app_data(calls)
            .app_data(web::Data::new(token_service()))
            .app_data(web::Data::new(policy))
            .app_data(web::Data::new(ServerOptions::default()))
            .service(RequiredProbeRoute::new())
            .service(OptionalProbeRoute::new())
            .service(ExemptProbeRoute::new())
            .service(UnlistedProbeRoute::new())
            .service(MetaProbeRoute::new());
    }
}

fn valid_token(user_id: UserId) -> String {
    bearer(&token_service().issue(user_id).unwrap())
}

#[actix_web::test]
async fn required_without_credential_never_reaches_the_handler() {
    let _ = env_logger::try_init();
    let calls = web::Data::new(Calls::default());
    let app = test::init_service(App::new().configure(probe_app(calls.clone()))).await;
    let res = call_rpc(&app, REQUIRED_METHOD, None, json!({})).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.error_code(), "UNAUTHORIZED");
    assert_eq!(calls.count(), 0);
}

#[actix_web::test]
async fn required_with_garbage_token_is_unauthorized() {
    let _ = env_logger::try_init();
    let calls = web::Data::new(Calls::default());
    let app = test::init_service(App::new().configure(probe_app(calls.clone()))).await;
    let res = call_rpc(&app, REQUIRED_METHOD, Some("Bearer garbage"), json!({})).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.error_code(), "UNAUTHORIZED");
    let expired = issue_token(7, &Secret::from(TEST_SECRET), Duration::seconds(-30)).unwrap();
    let res = call_rpc(&app, REQUIRED_METHOD, Some(&bearer(&expired)), json!({})).await;
    assert_eq!(res.error_code(), "UNAUTHORIZED");
    let foreign = issue_token(7, &Secret::from("another-secret-entirely"), Duration::minutes(5)).unwrap();
    let res = call_rpc(&app, REQUIRED_METHOD, Some(&bearer(&foreign)), json!({})).await;
    assert_eq!(res.error_code(), "UNAUTHORIZED");
    let good = token_service().issue(7).unwrap();
    let res = call_rpc(&app, REQUIRED_METHOD, Some(&format!("Token {good}")), json!({})).await;
    assert_eq!(res.error_code(), "UNAUTHORIZED");
    assert_eq!(calls.count(), 0);
}

#[actix_web::test]
async fn required_with_valid_token_attaches_the_user() {
    let _ = env_logger::try_init();
    let calls = web::Data::new(Calls::default());
    let app = test::init_service(App::new().configure(probe_app(calls.clone()))).await;
    let res = call_rpc(&app, REQUIRED_METHOD, Some(&valid_token(42)), json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(calls.count(), 1);
    assert_eq!(calls.last_user(), Some(42));
}

#[actix_web::test]
async fn optional_with_invalid_credential_runs_anonymously() {
    let _ = env_logger::try_init();
    let calls = web::Data::new(Calls::default());
    let app = test::init_service(App::new().configure(probe_app(calls.clone()))).await;
    let res = call_rpc(&app, OPTIONAL_METHOD, Some("Bearer garbage"), json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(calls.count(), 1);
    assert_eq!(calls.last_user(), None);

    let res = call_rpc(&app, OPTIONAL_METHOD, None, json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(calls.last_user(), None);

    let res = call_rpc(&app, OPTIONAL_METHOD, Some(&valid_token(5)), json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(calls.last_user(), Some(5));
    assert_eq!(calls.count(), 3);
}

#[actix_web::test]
async fn exempt_methods_ignore_credentials() {
    let _ = env_logger::try_init();
    let calls = web::Data::new(Calls::default());
    let app = test::init_service(App::new().configure(probe_app(calls.clone()))).await;
    let res = call_rpc(&app, EXEMPT_METHOD, Some(&valid_token(5)), json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(calls.last_user(), None);
    let res = call_rpc(&app, EXEMPT_METHOD, Some("Bearer garbage"), json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(calls.count(), 2);
}

#[actix_web::test]
async fn unlisted_methods_behave_as_optional() {
    let _ = env_logger::try_init();
    let calls = web::Data::new(Calls::default());
    let app = test::init_service(App::new().configure(probe_app(calls.clone()))).await;
    let res = call_rpc(&app, UNLISTED_METHOD, None, json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(calls.last_user(), None);
    let res = call_rpc(&app, UNLISTED_METHOD, Some(&valid_token(9)), json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(calls.last_user(), Some(9));
}

#[actix_web::test]
async fn validation_runs_before_authorization() {
    let _ = env_logger::try_init();
    let calls = web::Data::new(Calls::default());
    let app = test::init_service(App::new().configure(probe_app(calls.clone()))).await;
    let res = call_rpc(&app, REQUIRED_METHOD, None, json!({"reject": true})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error_code(), "VALIDATION_FAILED");
    assert_eq!(res.rpc_status(), Some("3"));
    let res = call_rpc(&app, OPTIONAL_METHOD, Some(&valid_token(5)), json!({"reject": true})).await;
    assert_eq!(res.error_code(), "VALIDATION_FAILED");
    assert_eq!(calls.count(), 0);
}

#[actix_web::test]
async fn meta_methods_skip_validation() {
    let _ = env_logger::try_init();
    let calls = web::Data::new(Calls::default());
    let app = test::init_service(App::new().configure(probe_app(calls.clone()))).await;
    let res = call_rpc(&app, META_METHOD, None, json!({"reject": true})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(calls.count(), 1);
}

#[actix_web::test]
async fn request_ids_are_propagated_and_echoed() {
    let _ = env_logger::try_init();
    let calls = web::Data::new(Calls::default());
    let app = test::init_service(App::new().configure(probe_app(calls.clone()))).await;
    let res = call_rpc_with_headers(&app, OPTIONAL_METHOD, None, &[(REQUEST_ID_HEADER, "trace-abc-123")], json!({}))
        .await;
    assert_eq!(res.header(REQUEST_ID_HEADER), Some("trace-abc-123"));
    assert_eq!(calls.last_request_id(), "trace-abc-123");

    let res = call_rpc(&app, OPTIONAL_METHOD, None, json!({})).await;
    let generated = res.header(REQUEST_ID_HEADER).unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&generated).is_ok(), "was: {generated}");
    assert_eq!(calls.last_request_id(), generated);

    // Rejections from inside the pipeline still carry the id
    let res = call_rpc_with_headers(&app, REQUIRED_METHOD, None, &[(REQUEST_ID_HEADER, "trace-denied")], json!({}))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.header(REQUEST_ID_HEADER), Some("trace-denied"));
}

#[actix_web::test]
async fn health_check_is_open_and_skips_validation() {
    let _ = env_logger::try_init();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(token_service()))
            .app_data(web::Data::new(AuthorizationPolicy::marketplace_default()))
            .service(HealthRoute::new()),
    )
    .await;
    let res = call_rpc(&app, HEALTH_CHECK_METHOD, Some("Bearer garbage"), json!({"service": 42})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json::<HealthCheckResponse>().status, "SERVING");
    assert!(res.header(REQUEST_ID_HEADER).is_some());
}
