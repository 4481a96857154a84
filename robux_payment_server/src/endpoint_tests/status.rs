use actix_web::{http::StatusCode, test, web, App};
use robux_payment_engine::order_id::OrderId;
use rpg_common::Robux;

use super::mocks::MockCryptoGateway;
use crate::routes::OrderStatusRoute;

fn token() -> String {
    OrderId::mint("alice", Robux::from(143u64), Some(123_456), 1_730_000_000_000).as_str().to_string()
}

async fn get_status(order_id: &str, crypto: MockCryptoGateway) -> (StatusCode, serde_json::Value) {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(crypto))
            .service(web::scope("/api").service(OrderStatusRoute::<MockCryptoGateway>::new())),
    )
    .await;
    let uri = format!("/api/orders/status?orderId={}", urlencode(order_id));
    let req = test::TestRequest::get().uri(&uri).to_request();
    let res = test::call_service(&app, req).await;
    let status = res.status();
    let body: serde_json::Value = test::read_body_json(res).await;
    (status, body)
}

fn urlencode(s: &str) -> String {
    s.replace('|', "%7C")
}

#[actix_web::test]
async fn unmatched_order_reports_not_found_not_an_error() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_status(&token(), MockCryptoGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not_found");
    assert_eq!(body["username"], "alice");
    assert_eq!(body["robuxAmount"], 143);
}

#[actix_web::test]
async fn provider_status_is_mapped_to_canonical() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_status(&token(), MockCryptoGateway::with_payment("confirming")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CONFIRMING");
    assert_eq!(body["rawStatus"], "confirming");
    assert_eq!(body["paymentId"], "5077125051");
    assert_eq!(body["currency"], "LTC");
    assert_eq!(body["paidAmount"], 0.05);
}

#[actix_web::test]
async fn finished_payment_reports_processing() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_status(&token(), MockCryptoGateway::with_payment("finished")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PROCESSING");
}

#[actix_web::test]
async fn unknown_provider_code_defaults_to_pending() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_status(&token(), MockCryptoGateway::with_payment("some_new_code")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PENDING");
}

#[actix_web::test]
async fn malformed_token_is_a_client_error() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_status("NOT-AN-ORDER", MockCryptoGateway::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn unconfigured_gateway_reports_pending() {
    let _ = env_logger::try_init().ok();
    let crypto = MockCryptoGateway { configured: false, ..MockCryptoGateway::new() };
    let (status, body) = get_status(&token(), crypto).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PENDING");
}
