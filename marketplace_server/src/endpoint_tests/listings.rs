use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    App,
};
use marketplace_engine::test_utils::prepare_test_db;
use serde_json::{json, Value};

use super::helpers::*;
use crate::{
    data_objects::{ListingResponse, ListingsResponse, LoginResponse},
    policy::{CREATE_LISTING_METHOD, GET_LISTINGS_METHOD, GET_LISTING_METHOD, LOGIN_METHOD, REGISTER_METHOD},
};

async fn sign_up<S, B>(app: &S, username: &str) -> LoginResponse
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let creds = json!({"username": username, "password": "password1"});
    let res = call_rpc(app, REGISTER_METHOD, None, creds.clone()).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    call_rpc(app, LOGIN_METHOD, None, creds).await.json()
}

fn listing(title: &str, price: f64) -> Value {
    json!({"title": title, "description": "As new", "image_url": "https://img.example.com/1.png", "price": price})
}

#[actix_web::test]
async fn create_listing_needs_a_token() {
    let (db, _dir) = prepare_test_db().await;
    let app = test::init_service(App::new().configure(configure_app(db))).await;
    let res = call_rpc(&app, CREATE_LISTING_METHOD, None, listing("Road bike", 450.0)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.error_code(), "UNAUTHORIZED");
    assert_eq!(res.rpc_status(), Some("16"));
    let page: ListingsResponse = call_rpc(&app, GET_LISTINGS_METHOD, None, json!({})).await.json();
    assert_eq!(page.total, 0);
}

#[actix_web::test]
async fn create_listing_validates_before_authorizing() {
    let (db, _dir) = prepare_test_db().await;
    let app = test::init_service(App::new().configure(configure_app(db))).await;
    let res = call_rpc(&app, CREATE_LISTING_METHOD, None, listing("Road bike", -1.0)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error_code(), "VALIDATION_FAILED");
}

#[actix_web::test]
async fn created_listings_belong_to_the_caller() {
    let (db, _dir) = prepare_test_db().await;
    let app = test::init_service(App::new().configure(configure_app(db))).await;
    let alice = sign_up(&app, "alice").await;
    let res = call_rpc(&app, CREATE_LISTING_METHOD, Some(&bearer(&alice.token)), listing("Road bike", 450.0)).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    let created: ListingResponse = res.json();
    assert!(created.is_owner);
    assert_eq!(created.author_username, "alice");
    assert_eq!(created.title, "Road bike");
    assert_eq!(created.price, 450.0);

    let res = call_rpc(&app, GET_LISTING_METHOD, None, json!({"id": created.id})).await;
    assert_eq!(res.status, StatusCode::OK);
    let anonymous: ListingResponse = res.json();
    assert!(!anonymous.is_owner);
    assert_eq!(anonymous.id, created.id);

    let bob = sign_up(&app, "bob").await;
    let as_bob: ListingResponse =
        call_rpc(&app, GET_LISTING_METHOD, Some(&bearer(&bob.token)), json!({"id": created.id})).await.json();
    assert!(!as_bob.is_owner);
    let as_alice: ListingResponse =
        call_rpc(&app, GET_LISTING_METHOD, Some(&bearer(&alice.token)), json!({"id": created.id})).await.json();
    assert!(as_alice.is_owner);
}

#[actix_web::test]
async fn browsing_with_a_bad_token_is_anonymous() {
    let (db, _dir) = prepare_test_db().await;
    let app = test::init_service(App::new().configure(configure_app(db))).await;
    let alice = sign_up(&app, "alice").await;
    call_rpc(&app, CREATE_LISTING_METHOD, Some(&bearer(&alice.token)), listing("Road bike", 450.0)).await;
    let res = call_rpc(&app, GET_LISTINGS_METHOD, Some("Bearer not-a-token"), json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    let page: ListingsResponse = res.json();
    assert_eq!(page.total, 1);
    assert!(!page.listings[0].is_owner);
}

#[actix_web::test]
async fn listings_are_paged_and_sorted() {
    let (db, _dir) = prepare_test_db().await;
    let app = test::init_service(App::new().configure(configure_app(db))).await;
    let alice = sign_up(&app, "alice").await;
    let auth = bearer(&alice.token);
    for (title, price) in [("Lamp", 20.0), ("Sofa", 300.0), ("Desk", 120.0), ("Chair", 45.0), ("Rug", 80.0)] {
        let res = call_rpc(&app, CREATE_LISTING_METHOD, Some(&auth), listing(title, price)).await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    }
    let query = json!({"page": 1, "per_page": 2, "sort_by": "price", "sort_order": "asc"});
    let page: ListingsResponse = call_rpc(&app, GET_LISTINGS_METHOD, Some(&auth), query).await.json();
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.per_page, 2);
    let titles = page.listings.iter().map(|l| l.title.as_str()).collect::<Vec<_>>();
    assert_eq!(titles, ["Lamp", "Chair"]);
    assert!(page.listings.iter().all(|l| l.is_owner));

    let query = json!({"page": 3, "per_page": 2, "sort_by": "price", "sort_order": "asc"});
    let page: ListingsResponse = call_rpc(&app, GET_LISTINGS_METHOD, None, query).await.json();
    assert_eq!(page.listings.len(), 1);
    assert_eq!(page.listings[0].title, "Sofa");

    let query = json!({"sort_by": "price", "min_price": 50, "max_price": 200});
    let page: ListingsResponse = call_rpc(&app, GET_LISTINGS_METHOD, None, query).await.json();
    let titles = page.listings.iter().map(|l| l.title.as_str()).collect::<Vec<_>>();
    assert_eq!(titles, ["Desk", "Rug"]);
}

#[actix_web::test]
async fn inverted_price_range_is_rejected() {
    let (db, _dir) = prepare_test_db().await;
    let app = test::init_service(App::new().configure(configure_app(db))).await;
    let res = call_rpc(&app, GET_LISTINGS_METHOD, None, json!({"min_price": 100, "max_price": 10})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error_code(), "VALIDATION_FAILED");
    let res = call_rpc(&app, GET_LISTINGS_METHOD, None, json!({"per_page": 500})).await;
    assert_eq!(res.error_code(), "VALIDATION_FAILED");
}

#[actix_web::test]
async fn unknown_listing_is_not_found() {
    let (db, _dir) = prepare_test_db().await;
    let app = test::init_service(App::new().configure(configure_app(db))).await;
    let res = call_rpc(&app, GET_LISTING_METHOD, None, json!({"id": 9999})).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.error_code(), "LISTING_NOT_FOUND");
    assert_eq!(res.rpc_status(), Some("5"));
}
