//! # Marketplace server
//! This crate hosts the RPC front end of the marketplace. It is responsible for:
//! Running every inbound call through the request pipeline (validation, logging, authorization).
//! Issuing and verifying access tokens.
//! Dispatching calls to the engine APIs and translating their errors into stable client responses.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! Each RPC method is served as `POST <method-id>` with a JSON body:
//! * `/auth.AuthService/Register` and `/auth.AuthService/Login`: account creation and login. No token needed.
//! * `/listings.ListingsService/CreateListing`: create a listing. Requires a token.
//! * `/listings.ListingsService/GetListings` and `/listings.ListingsService/GetListing`: browse listings. A token is
//!   optional and only used to mark the caller's own listings.
//! * `/grpc.health.v1.Health/Check`: health check.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod policy;
pub mod routes;
pub mod server;
pub mod validation;

#[cfg(test)]
mod endpoint_tests;
