//! Request handler definitions
//!
//! Every RPC method is served as `POST <method-id>` with a JSON body, e.g. `POST /auth.AuthService/Login`. Define each
//! route with the `route!` macro and its handler here. The macro wraps the handler in the request pipeline (see
//! [`middleware`](crate::middleware)), so handlers only ever see calls that were validated, logged and authorized.
//!
//! Handlers that are more than a few lines MUST delegate to the engine APIs. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, database operations, password
//! hashing) is expressed as futures, or moved onto the blocking pool by the engine.
use actix_web::{web, HttpResponse};
use log::*;
use marketplace_engine::{
    db_types::ListingFilter,
    traits::{ListingManagement, UserManagement},
    AppError,
    AuthApi,
    ListingsApi,
};

use crate::{
    auth::TokenService,
    data_objects::{
        CreateListingRequest,
        GetListingRequest,
        GetListingsRequest,
        HealthCheckRequest,
        HealthCheckResponse,
        ListingResponse,
        ListingsResponse,
        LoginRequest,
        LoginResponse,
        RegisterRequest,
        RegisterResponse,
    },
    errors::ServerError,
    middleware::CallContext,
    policy::{
        CREATE_LISTING_METHOD,
        GET_LISTINGS_METHOD,
        GET_LISTING_METHOD,
        HEALTH_CHECK_METHOD,
        LOGIN_METHOD,
        REGISTER_METHOD,
    },
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
//
// `route!(name => METHOD_ID, Payload)` serves the handler `name` at `POST METHOD_ID`, validating bodies as `Payload`.
// `route!(name => METHOD_ID, Payload, impl Bound)` does the same for a handler generic over one storage backend.
#[macro_export]
macro_rules! route {
    ($name:ident => $path:expr, $payload:ty) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
            impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::Post())
                        .to($name)
                        .wrap($crate::middleware::AuthorizationMiddlewareFactory::new())
                        .wrap($crate::middleware::LoggingMiddlewareFactory::new())
                        .wrap($crate::middleware::ValidationMiddlewareFactory::<$payload>::new());
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $path:expr, $payload:ty, impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds+)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::Post())
                    .to($name::<B>)
                    .wrap($crate::middleware::AuthorizationMiddlewareFactory::new())
                    .wrap($crate::middleware::LoggingMiddlewareFactory::new())
                    .wrap($crate::middleware::ValidationMiddlewareFactory::<$payload>::new());
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

/// Registers every marketplace RPC method, served from storage backend `B`.
pub fn rpc_services<B>(cfg: &mut web::ServiceConfig)
where B: UserManagement + ListingManagement + 'static {
    cfg.service(HealthRoute::new())
        .service(RegisterRoute::<B>::new())
        .service(LoginRoute::<B>::new())
        .service(CreateListingRoute::<B>::new())
        .service(GetListingsRoute::<B>::new())
        .service(GetListingRoute::<B>::new());
}

// ----------------------------------------------   Health  ----------------------------------------------------
route!(health => HEALTH_CHECK_METHOD, HealthCheckRequest);
pub async fn health() -> HttpResponse {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().json(HealthCheckResponse { status: "SERVING".into() })
}

//----------------------------------------------   Auth  ----------------------------------------------------
route!(register => REGISTER_METHOD, RegisterRequest, impl UserManagement);
/// Creates a new user account and returns its public view. The username must not be taken.
pub async fn register<B: UserManagement>(
    CallContext(ctx): CallContext,
    body: web::Json<RegisterRequest>,
    api: web::Data<AuthApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let RegisterRequest { username, password } = body.into_inner();
    debug!("💻️ [{}] Register {username}", ctx.request_id());
    let user = api.register(&ctx, &username, &password).await?;
    info!("💻️ [{}] Registered user #{} ({})", ctx.request_id(), user.id, user.username);
    Ok(HttpResponse::Ok().json(RegisterResponse { user: user.into() }))
}

route!(login => LOGIN_METHOD, LoginRequest, impl UserManagement);
/// Checks the username and password and issues an access token.
///
/// The token must be sent as `Authorization: Bearer <token>` on calls that need an authenticated caller. It is valid
/// for the configured token lifetime and does NOT refresh.
pub async fn login<B: UserManagement>(
    CallContext(ctx): CallContext,
    body: web::Json<LoginRequest>,
    api: web::Data<AuthApi<B>>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse, ServerError> {
    let LoginRequest { username, password } = body.into_inner();
    debug!("💻️ [{}] Login attempt for {username}", ctx.request_id());
    let user = api.login(&ctx, &username, &password).await?;
    let token = tokens.issue(user.id)?;
    trace!("💻️ [{}] Issued access token for user #{}", ctx.request_id(), user.id);
    Ok(HttpResponse::Ok().json(LoginResponse { token, user: user.into() }))
}

//----------------------------------------------   Listings  ----------------------------------------------------
route!(create_listing => CREATE_LISTING_METHOD, CreateListingRequest, impl ListingManagement);
pub async fn create_listing<B: ListingManagement>(
    CallContext(ctx): CallContext,
    body: web::Json<CreateListingRequest>,
    api: web::Data<ListingsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let author = ctx.user_id().ok_or(AppError::Unauthorized)?;
    debug!("💻️ [{}] CreateListing for user #{author}", ctx.request_id());
    let listing = api.create_listing(&ctx, author, body.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(ListingResponse::for_caller(listing, Some(author))))
}

route!(get_listings => GET_LISTINGS_METHOD, GetListingsRequest, impl ListingManagement);
/// Pages through listings. Authenticated callers see `is_owner` set on their own listings.
pub async fn get_listings<B: ListingManagement>(
    CallContext(ctx): CallContext,
    body: web::Json<GetListingsRequest>,
    api: web::Data<ListingsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let filter = ListingFilter::from(body.into_inner());
    debug!("💻️ [{}] GetListings page {} ({} per page)", ctx.request_id(), filter.page, filter.per_page);
    let page = api.fetch_listings(&ctx, filter).await?;
    Ok(HttpResponse::Ok().json(ListingsResponse::for_caller(page, ctx.user_id())))
}

route!(get_listing => GET_LISTING_METHOD, GetListingRequest, impl ListingManagement);
pub async fn get_listing<B: ListingManagement>(
    CallContext(ctx): CallContext,
    body: web::Json<GetListingRequest>,
    api: web::Data<ListingsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = body.id;
    debug!("💻️ [{}] GetListing #{id}", ctx.request_id());
    let listing = api.listing_by_id(&ctx, id).await?;
    Ok(HttpResponse::Ok().json(ListingResponse::for_caller(listing, ctx.user_id())))
}
