use std::{sync::atomic::Ordering, time::Duration};

use actix_web::{http::StatusCode, test, web, App};
use robux_payment_engine::exchange_rate::CachedRate;
use serde_json::json;

use super::mocks::{MockCardGateway, MockCryptoGateway, MockRateSource};
use crate::{config::ServerOptions, rate_limiter::RateLimiter, routes::CreateOrderRoute};

fn test_options() -> ServerOptions {
    ServerOptions {
        use_x_forwarded_for: false,
        use_forwarded: false,
        default_place_id: Some(123_456),
        default_pay_currency: "ltc".to_string(),
        public_url: "http://localhost:8330".to_string(),
    }
}

async fn post_order(
    body: serde_json::Value,
    crypto: MockCryptoGateway,
    cards: MockCardGateway,
    rate: f64,
    limiter: web::Data<RateLimiter>,
) -> (StatusCode, serde_json::Value) {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(crypto))
            .app_data(web::Data::new(cards))
            .app_data(web::Data::new(CachedRate::new(MockRateSource { rate })))
            .app_data(limiter)
            .app_data(web::Data::new(test_options()))
            .service(
                web::scope("/api")
                    .service(CreateOrderRoute::<MockCryptoGateway, MockCardGateway, MockRateSource>::new()),
            ),
    )
    .await;
    let req = test::TestRequest::post().uri("/api/orders").set_json(&body).to_request();
    let res = test::call_service(&app, req).await;
    let status = res.status();
    let body: serde_json::Value = test::read_body_json(res).await;
    (status, body)
}

fn default_limiter() -> web::Data<RateLimiter> {
    web::Data::new(RateLimiter::new(5, Duration::from_secs(60)))
}

#[actix_web::test]
async fn crypto_order_mints_token_and_opens_invoice() {
    let _ = env_logger::try_init().ok();
    let crypto = MockCryptoGateway::new();
    let body = json!({ "robux_amount": 100, "roblox_username": "alice", "payment_method": "crypto" });
    let (status, res) = post_order(body, crypto.clone(), MockCardGateway::new(), 1400.0, default_limiter()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["order"]["robux_amount_net"], 100);
    assert_eq!(res["order"]["robux_amount_gross"], 143);
    assert_eq!(res["order"]["usd_price"], 0.65);
    assert_eq!(res["order"]["status"], "PENDING");
    assert_eq!(res["order"]["place_id"], 123_456);
    let id = res["order"]["id"].as_str().unwrap();
    assert!(id.starts_with("ORD|alice|143|123456|"), "unexpected token: {id}");
    assert_eq!(res["payment_details"]["currency"], "ltc");
    assert!(res["payment_details"]["address"].is_string());
    assert_eq!(crypto.invoices_created.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn card_order_converts_to_local_currency() {
    let _ = env_logger::try_init().ok();
    let cards = MockCardGateway::new();
    let body = json!({ "robux_amount": 1000, "roblox_username": "bob", "payment_method": "mercadopago" });
    let (status, res) = post_order(body, MockCryptoGateway::new(), cards.clone(), 2.0, default_limiter()).await;
    assert_eq!(status, StatusCode::OK);
    // usd 6.50 at a rate of 2.0
    assert_eq!(res["payment_details"]["amount"], 13.0);
    assert_eq!(res["payment_details"]["currency"], "ARS");
    assert!(res["payment_details"]["redirect_url"].is_string());
    assert!(res["payment_details"].get("address").is_none());
    assert_eq!(cards.preferences_created.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn below_minimum_amount_is_rejected() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "robux_amount": 99, "roblox_username": "alice" });
    let (status, res) =
        post_order(body, MockCryptoGateway::new(), MockCardGateway::new(), 1400.0, default_limiter()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(res["error"].as_str().unwrap().contains("100"));
}

#[actix_web::test]
async fn minimum_amount_is_accepted() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "robux_amount": 100, "roblox_username": "alice" });
    let (status, _) =
        post_order(body, MockCryptoGateway::new(), MockCardGateway::new(), 1400.0, default_limiter()).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn oversized_amount_is_rejected() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "robux_amount": u64::MAX, "roblox_username": "alice" });
    let (status, res) =
        post_order(body, MockCryptoGateway::new(), MockCardGateway::new(), 1400.0, default_limiter()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(res["error"].is_string());
}

#[actix_web::test]
async fn short_username_is_rejected() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "robux_amount": 500, "roblox_username": "ab" });
    let (status, _) =
        post_order(body, MockCryptoGateway::new(), MockCardGateway::new(), 1400.0, default_limiter()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn requests_beyond_the_limit_are_rejected() {
    let _ = env_logger::try_init().ok();
    let limiter = web::Data::new(RateLimiter::new(2, Duration::from_secs(60)));
    let body = json!({ "robux_amount": 100, "roblox_username": "alice" });
    for _ in 0..2 {
        let (status, _) = post_order(
            body.clone(),
            MockCryptoGateway::new(),
            MockCardGateway::new(),
            1400.0,
            limiter.clone(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, res) =
        post_order(body, MockCryptoGateway::new(), MockCardGateway::new(), 1400.0, limiter).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(res["error"].as_str().unwrap().contains("Too many requests"));
}
