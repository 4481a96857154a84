use std::sync::atomic::Ordering;

use actix_web::{guard, http::StatusCode, test, web, App};
use robux_payment_engine::{
    db_types::OrderStatusType,
    order_id::OrderId,
    traits::{InMemoryStatusStore, StatusStore},
    ReconcileApi,
};
use rpg_common::{Robux, Secret};
use serde_json::json;
use vendor_clients::RbxCrateWebhook;

use super::mocks::{MockCardGateway, MockDeliveryVendor};
use crate::{
    config::WebhookSecrets,
    helpers::calculate_hmac,
    middleware::HmacMiddlewareFactory,
    routes::{nowpayments_webhook, MercadopagoWebhookRoute, RbxcrateWebhookRoute},
};

const IPN_SECRET: &str = "super-secret-ipn-key";

fn token() -> String {
    OrderId::mint("alice", Robux::from(143u64), Some(123_456), 1_730_000_000_000).as_str().to_string()
}

type TestReconciler = web::Data<ReconcileApi<InMemoryStatusStore, MockDeliveryVendor>>;

async fn call_np_webhook(body: &serde_json::Value, sig: Option<&str>, reconciler: TestReconciler) -> StatusCode {
    let app = test::init_service(
        App::new().app_data(reconciler).service(
            web::scope("/webhooks").service(
                web::resource("/nowpayments")
                    .guard(guard::Post())
                    .wrap(HmacMiddlewareFactory::new(
                        "x-nowpayments-sig",
                        Secret::new(IPN_SECRET.to_string()),
                        true,
                    ))
                    .to(nowpayments_webhook::<InMemoryStatusStore, MockDeliveryVendor>),
            ),
        ),
    )
    .await;
    let mut req = test::TestRequest::post().uri("/webhooks/nowpayments").set_json(body);
    if let Some(sig) = sig {
        req = req.insert_header(("x-nowpayments-sig", sig));
    }
    match test::try_call_service(&app, req.to_request()).await {
        Ok(res) => res.status(),
        Err(e) => e.error_response().status(),
    }
}

/// Signature over the canonical (sorted-keys) serialization, exactly as the provider computes it.
fn sign(body: &serde_json::Value) -> String {
    calculate_hmac(IPN_SECRET, serde_json::to_string(body).unwrap().as_bytes())
}

#[actix_web::test]
async fn finished_ipn_dispatches_delivery_exactly_once() {
    let _ = env_logger::try_init().ok();
    let store = InMemoryStatusStore::new();
    let vendor = MockDeliveryVendor::delivered();
    let reconciler = web::Data::new(ReconcileApi::new(store.clone(), vendor.clone()));
    let body = json!({ "order_id": token(), "payment_status": "finished", "pay_amount": 0.1 });
    let sig = sign(&body);

    let status = call_np_webhook(&body, Some(&sig), reconciler.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(vendor.dispatches.load(Ordering::SeqCst), 1);
    assert_eq!(store.current(&token()), Some(OrderStatusType::Completed));

    // Redelivery of the same notification must not dispatch again
    let status = call_np_webhook(&body, Some(&sig), reconciler).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(vendor.dispatches.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn invalid_signature_is_rejected_without_state_change() {
    let _ = env_logger::try_init().ok();
    let store = InMemoryStatusStore::new();
    let vendor = MockDeliveryVendor::delivered();
    let reconciler = web::Data::new(ReconcileApi::new(store.clone(), vendor.clone()));
    let body = json!({ "order_id": token(), "payment_status": "finished" });

    let status = call_np_webhook(&body, Some("deadbeef"), reconciler.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let status = call_np_webhook(&body, None, reconciler).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(vendor.dispatches.load(Ordering::SeqCst), 0);
    assert_eq!(store.current(&token()), None);
}

#[actix_web::test]
async fn confirming_ipn_records_without_dispatching() {
    let _ = env_logger::try_init().ok();
    let store = InMemoryStatusStore::new();
    let vendor = MockDeliveryVendor::delivered();
    let reconciler = web::Data::new(ReconcileApi::new(store.clone(), vendor.clone()));
    let body = json!({ "order_id": token(), "payment_status": "confirming" });

    let status = call_np_webhook(&body, Some(&sign(&body)), reconciler).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(vendor.dispatches.load(Ordering::SeqCst), 0);
    assert_eq!(store.current(&token()), Some(OrderStatusType::Confirming));
}

#[actix_web::test]
async fn undecodable_order_is_acknowledged_and_ignored() {
    let _ = env_logger::try_init().ok();
    let store = InMemoryStatusStore::new();
    let vendor = MockDeliveryVendor::delivered();
    let reconciler = web::Data::new(ReconcileApi::new(store.clone(), vendor.clone()));
    let body = json!({ "order_id": "garbage-token", "payment_status": "finished" });

    let status = call_np_webhook(&body, Some(&sign(&body)), reconciler).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(vendor.dispatches.load(Ordering::SeqCst), 0);
}

//----------------------------------------------   Mercado Pago  -----------------------------------------------------

async fn call_mp_webhook(
    body: &serde_json::Value,
    cards: MockCardGateway,
    reconciler: TestReconciler,
) -> (StatusCode, serde_json::Value) {
    let app = test::init_service(
        App::new().app_data(web::Data::new(cards)).app_data(reconciler).service(
            web::scope("/webhooks").service(
                MercadopagoWebhookRoute::<MockCardGateway, InMemoryStatusStore, MockDeliveryVendor>::new(),
            ),
        ),
    )
    .await;
    let req = test::TestRequest::post().uri("/webhooks/mercadopago").set_json(body).to_request();
    let res = test::call_service(&app, req).await;
    let status = res.status();
    let body: serde_json::Value = test::read_body_json(res).await;
    (status, body)
}

#[actix_web::test]
async fn approved_card_payment_is_verified_then_dispatched() {
    let _ = env_logger::try_init().ok();
    let store = InMemoryStatusStore::new();
    let vendor = MockDeliveryVendor::delivered();
    let reconciler = web::Data::new(ReconcileApi::new(store.clone(), vendor.clone()));
    let cards = MockCardGateway::with_payment("approved", Some(&token()));
    let body = json!({ "type": "payment", "action": "payment.updated", "data": { "id": 11111111 } });

    let (status, _) = call_mp_webhook(&body, cards.clone(), reconciler).await;
    assert_eq!(status, StatusCode::OK);
    // The webhook body is never trusted; the authoritative record was fetched first
    assert_eq!(cards.lookups.load(Ordering::SeqCst), 1);
    assert_eq!(vendor.dispatches.load(Ordering::SeqCst), 1);
    assert_eq!(store.current(&token()), Some(OrderStatusType::Completed));
}

#[actix_web::test]
async fn non_payment_events_are_ignored() {
    let _ = env_logger::try_init().ok();
    let store = InMemoryStatusStore::new();
    let vendor = MockDeliveryVendor::delivered();
    let reconciler = web::Data::new(ReconcileApi::new(store, vendor.clone()));
    let cards = MockCardGateway::new();
    let body = json!({ "type": "plan", "data": { "id": 1 } });

    let (status, res) = call_mp_webhook(&body, cards.clone(), reconciler).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["success"], true);
    assert_eq!(cards.lookups.load(Ordering::SeqCst), 0);
    assert_eq!(vendor.dispatches.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn rejected_card_payment_fails_the_order_without_dispatch() {
    let _ = env_logger::try_init().ok();
    let store = InMemoryStatusStore::new();
    let vendor = MockDeliveryVendor::delivered();
    let reconciler = web::Data::new(ReconcileApi::new(store.clone(), vendor.clone()));
    let cards = MockCardGateway::with_payment("rejected", Some(&token()));
    let body = json!({ "type": "payment", "data": { "id": "11111111" } });

    let (status, _) = call_mp_webhook(&body, cards, reconciler).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(vendor.dispatches.load(Ordering::SeqCst), 0);
    assert_eq!(store.current(&token()), Some(OrderStatusType::Failed));
}

#[actix_web::test]
async fn unverifiable_payment_is_acknowledged_with_failure_body() {
    let _ = env_logger::try_init().ok();
    let store = InMemoryStatusStore::new();
    let vendor = MockDeliveryVendor::delivered();
    let reconciler = web::Data::new(ReconcileApi::new(store.clone(), vendor.clone()));
    // No payment behind the id: the authoritative lookup fails
    let cards = MockCardGateway::new();
    let body = json!({ "type": "payment", "data": { "id": 404 } });

    let (status, res) = call_mp_webhook(&body, cards, reconciler).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["success"], false);
    assert_eq!(store.current(&token()), None);
}

//----------------------------------------------   RbxCrate  ---------------------------------------------------------

async fn call_rbxcrate_webhook(
    body: &serde_json::Value,
    store: InMemoryStatusStore,
    key: &str,
) -> (StatusCode, serde_json::Value) {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(store))
            .app_data(web::Data::new(WebhookSecrets { rbxcrate_key: Secret::new(key.to_string()) }))
            .service(web::scope("/webhooks").service(RbxcrateWebhookRoute::<InMemoryStatusStore>::new())),
    )
    .await;
    let req = test::TestRequest::post().uri("/webhooks/rbxcrate").set_json(body).to_request();
    match test::try_call_service(&app, req).await {
        Ok(res) => {
            let status = res.status();
            let body: serde_json::Value = test::read_body_json(res).await;
            (status, body)
        },
        Err(e) => (e.error_response().status(), json!(null)),
    }
}

fn vendor_payload(status: &str) -> serde_json::Value {
    json!({
        "type": "gamepass_order",
        "uuid": "3f6c0a52-8a3e-4a8e-9d6e-000000000000",
        "orderId": token(),
        "price": 1,
        "rate": 7,
        "vendorId": "vendor-1",
        "robuxAmount": 143,
        "status": status,
        "robloxUserId": 12345,
        "robloxUsername": "alice",
        "buyerRobloxId": null,
        "buyerRobloxUsername": null,
        "error": null
    })
}

fn signed(mut payload: serde_json::Value, key: &str) -> serde_json::Value {
    let parsed: RbxCrateWebhook = serde_json::from_value(payload.clone()).unwrap();
    let sig = vendor_clients::rbxcrate_webhook_signature(&parsed, key).unwrap();
    payload["sign"] = json!(sig);
    payload
}

#[actix_web::test]
async fn empty_body_is_the_vendor_connectivity_check() {
    let _ = env_logger::try_init().ok();
    let (status, res) = call_rbxcrate_webhook(&json!({}), InMemoryStatusStore::new(), "vendor-key").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["success"], true);
}

#[actix_web::test]
async fn completed_notification_finalizes_a_dispatched_order() {
    let _ = env_logger::try_init().ok();
    let store = InMemoryStatusStore::new();
    // The vendor only calls back for orders this server already dispatched
    store.record(&token(), OrderStatusType::Processing);
    let body = signed(vendor_payload("Completed"), "vendor-key");

    let (status, res) = call_rbxcrate_webhook(&body, store.clone(), "vendor-key").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(res["received"]["status"], "Completed");
    assert_eq!(store.current(&token()), Some(OrderStatusType::Completed));
}

#[actix_web::test]
async fn error_notification_fails_the_order() {
    let _ = env_logger::try_init().ok();
    let store = InMemoryStatusStore::new();
    store.record(&token(), OrderStatusType::Processing);
    let mut payload = vendor_payload("Error");
    payload["error"] = json!({ "reason": "insufficient_customer_balance", "message": null });
    let body = signed(payload, "vendor-key");

    let (status, _) = call_rbxcrate_webhook(&body, store.clone(), "vendor-key").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.current(&token()), Some(OrderStatusType::Failed));
}

#[actix_web::test]
async fn tampered_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let store = InMemoryStatusStore::new();
    store.record(&token(), OrderStatusType::Processing);
    // Signed under a key the server does not hold
    let body = signed(vendor_payload("Completed"), "some-other-key");

    let (status, _) = call_rbxcrate_webhook(&body, store.clone(), "vendor-key").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(store.current(&token()), Some(OrderStatusType::Processing));
}
