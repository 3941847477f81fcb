use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, web, App, HttpServer};
use log::*;
use marketplace_engine::{AppError, AuthApi, ListingsApi, SqliteDatabase};

use crate::{
    auth::TokenService,
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    policy::AuthorizationPolicy,
    routes::rpc_services,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.skip_migrations {
        warn!("🗃️ Skipping database migrations. Make sure the schema at {} is up to date.", db.url());
    } else {
        db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Request bodies that are not valid JSON for the route are reported as `VALIDATION_FAILED`, like everything else the
/// validation stage rejects.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        debug!("💻️ Could not deserialize request body. {err}");
        ServerError::from(AppError::validation(format!("Malformed request. {err}"))).into()
    })
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    // Shared by every worker. None of these have interior mutability.
    let tokens = web::Data::new(TokenService::new(&config.auth));
    let policy = web::Data::new(AuthorizationPolicy::marketplace_default());
    let options = web::Data::new(ServerOptions::from_config(&config));
    let srv = HttpServer::new(move || {
        let auth_api = AuthApi::new(db.clone());
        let listings_api = ListingsApi::new(db.clone());
        App::new()
            .app_data(json_config())
            .app_data(web::Data::new(auth_api))
            .app_data(web::Data::new(listings_api))
            .app_data(tokens.clone())
            .app_data(policy.clone())
            .app_data(options.clone())
            .configure(rpc_services::<SqliteDatabase>)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
