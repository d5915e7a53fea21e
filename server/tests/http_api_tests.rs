// tests/http_api_tests.rs
#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use bazaar::StatusPolicy;
use bazaar_server::config::AppConfig;
use common::*;
use serde_json::{json, Value};
use serial_test::serial;
use uuid::Uuid;

const BUYER: &str = "buyer@bazaar.test";
const SELLER: &str = "seller@bazaar.test";
const ADMIN: &str = "admin@bazaar.test";

#[actix_web::test]
#[serial]
async fn health_reports_ok() {
  let m = seeded_market(AppConfig::default()).await;
  let app = test_app!(m.state);

  let req = test::TestRequest::get().uri("/health").to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body, json!({ "status": "ok" }));
}

#[actix_web::test]
#[serial]
async fn buyer_can_fill_a_cart_and_check_out() {
  let m = seeded_market(AppConfig::default()).await;
  let app = test_app!(m.state);
  let token = login!(app, BUYER);
  let rice = &m.seed.products[0];
  let tea = &m.seed.products[2];

  for (product, quantity) in [(rice.id, 2), (tea.id, 1), (rice.id, 1)] {
    let req = test::TestRequest::post()
      .uri("/cart")
      .insert_header(bearer(&token))
      .set_json(json!({ "product": product, "quantity": quantity }))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": null, "data": null }));
  }

  let req = test::TestRequest::get().uri("/cart").insert_header(bearer(&token)).to_request();
  let cart: Value = test::call_and_read_body_json(&app, req).await;
  let items = cart["data"]["items"].as_array().expect("items");
  assert_eq!(items.len(), 2);
  assert_eq!(items[0]["quantity"], 3);
  assert_eq!(items[0]["product"]["name"], rice.name.as_str());

  let req = test::TestRequest::post().uri("/order").insert_header(bearer(&token)).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let order: Value = test::read_body_json(resp).await;
  assert!(order["error"].is_null());
  assert_eq!(order["data"]["status"], "pending");
  assert_eq!(
    order["data"]["totalAmount"],
    3 * rice.price_cents + tea.price_cents
  );

  let req = test::TestRequest::get().uri("/cart").insert_header(bearer(&token)).to_request();
  let cart: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(cart["data"]["items"], json!([]));

  let req = test::TestRequest::get().uri("/order").insert_header(bearer(&token)).to_request();
  let orders: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(orders["data"].as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
#[serial]
async fn checkout_with_an_empty_cart_is_a_bad_request() {
  let m = seeded_market(AppConfig::default()).await;
  let app = test_app!(m.state);
  let token = login!(app, BUYER);

  let req = test::TestRequest::post().uri("/order").insert_header(bearer(&token)).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body, json!({ "error": "Your cart is empty.", "data": null }));
}

#[actix_web::test]
#[serial]
async fn routes_reject_missing_tokens_and_wrong_roles() {
  let m = seeded_market(AppConfig::default()).await;
  let app = test_app!(m.state);
  let seller = login!(app, SELLER);
  let admin = login!(app, ADMIN);
  let order_id = Uuid::new_v4();

  let buyer_only = [
    ("POST", "/cart".to_string(), Some(json!({ "product": Uuid::new_v4(), "quantity": 1 }))),
    ("GET", "/cart".to_string(), None),
    ("DELETE", "/cart".to_string(), None),
    ("DELETE", format!("/cart/{}", Uuid::new_v4()), None),
    ("POST", "/order".to_string(), None),
    ("GET", "/order".to_string(), None),
    ("PUT", format!("/order/{}/cancel", order_id), None),
  ];

  for (method, uri, body) in &buyer_only {
    for token in [None, Some(seller.as_str()), Some(admin.as_str())] {
      let mut req = match *method {
        "POST" => test::TestRequest::post(),
        "GET" => test::TestRequest::get(),
        "PUT" => test::TestRequest::put(),
        _ => test::TestRequest::delete(),
      }
      .uri(uri);
      if let Some(t) = token {
        req = req.insert_header(bearer(t));
      }
      if let Some(b) = body {
        req = req.set_json(b);
      }
      let resp = test::call_service(&app, req.to_request()).await;
      assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{} {} with {:?}", method, uri, token.is_some());
      let body: Value = test::read_body_json(resp).await;
      assert_eq!(body["error"], "Unauthorized");
      assert!(body["data"].is_null());
    }
  }

  let buyer = login!(app, BUYER);
  let req = test::TestRequest::put()
    .uri(&format!("/order/{}/status", order_id))
    .insert_header(bearer(&buyer))
    .set_json(json!({ "status": "completed" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let req = test::TestRequest::get()
    .uri("/cart")
    .insert_header(("Authorization", "Bearer not-a-real-token"))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
#[serial]
async fn admin_completes_an_order_and_the_buyer_can_no_longer_cancel_it() {
  let m = seeded_market(AppConfig::default()).await;
  let app = test_app!(m.state);
  let buyer = login!(app, BUYER);
  let admin = login!(app, ADMIN);

  let req = test::TestRequest::post()
    .uri("/cart")
    .insert_header(bearer(&buyer))
    .set_json(json!({ "product": m.seed.products[1].id, "quantity": 1 }))
    .to_request();
  test::call_service(&app, req).await;
  let req = test::TestRequest::post().uri("/order").insert_header(bearer(&buyer)).to_request();
  let order: Value = test::call_and_read_body_json(&app, req).await;
  let order_id = order["data"]["id"].as_str().expect("order id").to_string();

  let req = test::TestRequest::put()
    .uri(&format!("/order/{}/status", order_id))
    .insert_header(bearer(&admin))
    .set_json(json!({ "status": "shipped" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Invalid status");

  let req = test::TestRequest::put()
    .uri(&format!("/order/{}/status", order_id))
    .insert_header(bearer(&admin))
    .set_json(json!({ "status": "completed" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let req = test::TestRequest::put()
    .uri(&format!("/order/{}/cancel", order_id))
    .insert_header(bearer(&buyer))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Only pending orders can be cancelled");
}

#[actix_web::test]
#[serial]
async fn terminal_locked_policy_is_applied_over_http() {
  let config = AppConfig {
    status_policy: StatusPolicy::TerminalLocked,
    ..AppConfig::default()
  };
  let m = seeded_market(config).await;
  let app = test_app!(m.state);
  let buyer = login!(app, BUYER);
  let admin = login!(app, ADMIN);

  let req = test::TestRequest::post()
    .uri("/cart")
    .insert_header(bearer(&buyer))
    .set_json(json!({ "product": m.seed.products[0].id, "quantity": 1 }))
    .to_request();
  test::call_service(&app, req).await;
  let req = test::TestRequest::post().uri("/order").insert_header(bearer(&buyer)).to_request();
  let order: Value = test::call_and_read_body_json(&app, req).await;
  let order_id = order["data"]["id"].as_str().expect("order id").to_string();

  let req = test::TestRequest::put()
    .uri(&format!("/order/{}/cancel", order_id))
    .insert_header(bearer(&buyer))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

  let req = test::TestRequest::put()
    .uri(&format!("/order/{}/status", order_id))
    .insert_header(bearer(&admin))
    .set_json(json!({ "status": "pending" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
#[serial]
async fn malformed_input_gets_the_error_envelope() {
  let m = seeded_market(AppConfig::default()).await;
  let app = test_app!(m.state);
  let token = login!(app, BUYER);

  let req = test::TestRequest::post()
    .uri("/cart")
    .insert_header(bearer(&token))
    .set_json(json!({ "product": m.seed.products[0].id, "quantity": 0 }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body, json!({ "error": "Quantity must be at least 1", "data": null }));

  let req = test::TestRequest::post()
    .uri("/cart")
    .insert_header(bearer(&token))
    .set_json(json!({ "product": "not-a-uuid", "quantity": 1 }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["error"].is_string());
  assert!(body["data"].is_null());

  let req = test::TestRequest::delete()
    .uri("/cart/not-a-uuid")
    .insert_header(bearer(&token))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

  let req = test::TestRequest::post()
    .uri("/cart")
    .insert_header(bearer(&token))
    .set_json(json!({ "product": Uuid::new_v4(), "quantity": 1 }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Product not found");
}

#[actix_web::test]
#[serial]
async fn another_buyers_order_looks_missing() {
  let m = seeded_market(AppConfig::default()).await;
  let app = test_app!(m.state);
  let buyer = login!(app, BUYER);

  let req = test::TestRequest::post()
    .uri("/auth/signup")
    .set_json(json!({ "email": "other@bazaar.test", "password": "pw-other", "name": "Other", "role": "buyer" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
  let req = test::TestRequest::post()
    .uri("/auth/login")
    .set_json(json!({ "email": "other@bazaar.test", "password": "pw-other" }))
    .to_request();
  let login: Value = test::call_and_read_body_json(&app, req).await;
  let other = login["data"]["token"].as_str().expect("token").to_string();

  let req = test::TestRequest::post()
    .uri("/cart")
    .insert_header(bearer(&buyer))
    .set_json(json!({ "product": m.seed.products[0].id, "quantity": 1 }))
    .to_request();
  test::call_service(&app, req).await;
  let req = test::TestRequest::post().uri("/order").insert_header(bearer(&buyer)).to_request();
  let order: Value = test::call_and_read_body_json(&app, req).await;
  let order_id = order["data"]["id"].as_str().expect("order id").to_string();

  let req = test::TestRequest::put()
    .uri(&format!("/order/{}/cancel", order_id))
    .insert_header(bearer(&other))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Order not found");
}
