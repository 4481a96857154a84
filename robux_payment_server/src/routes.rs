//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (outbound provider calls, the
//! exchange-rate lookup, delivery dispatch) must be awaited, never blocked on.

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use log::*;
use robux_payment_engine::{
    db_types::{Order, OrderStatusType, PaymentMethod},
    exchange_rate::CachedRate,
    order_id::OrderId,
    pricing::{convert, quote},
    status_map::{CardPaymentStatus, CryptoInvoiceStatus},
    traits::{
        CardGateway,
        CryptoGateway,
        DeliveryVendor,
        InvoiceRequest,
        PreferenceRequest,
        RateSource,
        StatusStore,
    },
    ReconcileApi,
    ReconcileOutcome,
};
use serde_json::json;
use subtle::ConstantTimeEq;
use vendor_clients::{rbxcrate_webhook_signature, RbxCrateWebhook};

use crate::{
    config::{ServerOptions, WebhookSecrets},
    data_objects::{
        CreateOrderResponse,
        JsonResponse,
        MpWebhook,
        NowPaymentsIpn,
        OrderRequest,
        PaymentDetails,
        StatusQuery,
        StatusResponse,
    },
    errors::ServerError,
    helpers::get_remote_ip,
    rate_limiter::RateLimiter,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl CryptoGateway, CardGateway, RateSource);
/// Order creation.
///
/// Mints the order token, quotes the price, and opens a payment intent with the gateway selected by
/// `payment_method`. The response carries everything the client needs to pay: a deposit address for the crypto
/// path, or a hosted-checkout redirect for the card path.
pub async fn create_order<C, M, R>(
    req: HttpRequest,
    body: web::Json<OrderRequest>,
    crypto: web::Data<C>,
    cards: web::Data<M>,
    fx: web::Data<CachedRate<R>>,
    limiter: web::Data<RateLimiter>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    C: CryptoGateway,
    M: CardGateway,
    R: RateSource,
{
    let client =
        get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded).map(|ip| ip.to_string());
    let client = client.as_deref().unwrap_or("unknown");
    if !limiter.check(client) {
        return Err(ServerError::RateLimited);
    }
    let order_req = body.into_inner();
    let username = order_req.roblox_username.trim();
    if username.len() < 3 {
        return Err(ServerError::ValidationError("Roblox username is required (3 characters minimum)".to_string()));
    }
    let quote = quote(order_req.robux_amount)?;
    let place_id = order_req.place_id.or(options.default_place_id);
    let now = Utc::now();
    let order_id = OrderId::mint(username, quote.gross_amount, place_id, now.timestamp_millis());
    debug!("🛍️️ New order {order_id} via {}", order_req.payment_method);
    let crypto_currency = match order_req.payment_method {
        PaymentMethod::Crypto => {
            Some(order_req.crypto_currency.clone().unwrap_or_else(|| options.default_pay_currency.clone()))
        },
        PaymentMethod::Mercadopago => None,
    };
    let order = Order {
        id: order_id.as_str().to_string(),
        roblox_username: username.to_string(),
        robux_amount_net: quote.net_amount,
        robux_amount_gross: quote.gross_amount,
        place_id,
        usd_price: quote.usd_price,
        payment_method: order_req.payment_method,
        crypto_currency: crypto_currency.clone(),
        status: OrderStatusType::Pending,
        created_at: now,
    };
    let intent = match order_req.payment_method {
        PaymentMethod::Crypto => {
            let request = InvoiceRequest {
                order_token: order.id.clone(),
                usd_amount: quote.usd_price,
                pay_currency: crypto_currency.unwrap_or_default(),
                description: format!("{} Robux for {username}", quote.net_amount.value()),
            };
            crypto.create_invoice(&request).await?
        },
        PaymentMethod::Mercadopago => {
            // The aggregator only accepts a local-currency amount, so convert at the cached rate first.
            let rate = fx.get().await;
            let request = PreferenceRequest {
                order_token: order.id.clone(),
                title: format!("{} Robux para {username}", quote.net_amount.value()),
                description: match place_id {
                    Some(p) => format!("Entrega automática en Place ID: {p}"),
                    None => "Entrega automática".to_string(),
                },
                unit_price_local: convert(quote.usd_price, rate),
                roblox_username: username.to_string(),
                robux_amount: quote.net_amount,
                place_id,
                usd_price: quote.usd_price,
                exchange_rate: rate,
            };
            cards.create_preference(&request).await?
        },
    };
    info!("🛍️️ Order {} created. Payment reference: {}", order.id, intent.reference);
    let payment_details = PaymentDetails {
        reference: intent.reference,
        address: intent.pay_address,
        redirect_url: intent.redirect_url,
        amount: intent.pay_amount,
        currency: intent.pay_currency,
    };
    Ok(HttpResponse::Ok().json(CreateOrderResponse { order, payment_details }))
}

route!(order_status => Get "/orders/status" impl CryptoGateway);
/// Polling endpoint for user-initiated status checks against the crypto provider's ledger.
///
/// `not_found` is a successful response here: an unmatched order is a normal user-facing state (expired or never
/// paid), not a server fault.
pub async fn order_status<C>(
    query: web::Query<StatusQuery>,
    crypto: web::Data<C>,
) -> Result<HttpResponse, ServerError>
where
    C: CryptoGateway,
{
    let token = query.into_inner().order_id;
    let decoded = OrderId::decode(&token)?;
    trace!("💻️ Status check for order {token}");
    if !crypto.is_configured() {
        // Mock mode has no provider ledger to poll. Report the order as freshly pending.
        let mut response =
            StatusResponse::bare(&token, &OrderStatusType::Pending.to_string(), "Waiting for payment");
        response.username = Some(decoded.username);
        response.robux_amount = Some(decoded.gross_amount.value());
        return Ok(HttpResponse::Ok().json(response));
    }
    let Some(payment) = crypto.find_payment(&token).await? else {
        debug!("💻️ No payment found for order {token}");
        let mut response = StatusResponse::bare(&token, "not_found", "Order not found or expired");
        response.username = Some(decoded.username);
        response.robux_amount = Some(decoded.gross_amount.value());
        return Ok(HttpResponse::Ok().json(response));
    };
    let raw = CryptoInvoiceStatus::from(payment.status.as_str());
    let mut response = StatusResponse::bare(&token, &raw.canonical().to_string(), raw.user_facing_text());
    response.payment_id = Some(payment.payment_id);
    response.raw_status = Some(raw.to_string());
    response.username = Some(decoded.username);
    response.robux_amount = Some(decoded.gross_amount.value());
    response.paid_amount = Some(payment.actually_paid);
    response.expected_amount = Some(payment.pay_amount);
    response.currency = Some(payment.pay_currency.to_uppercase());
    response.pay_address = Some(payment.pay_address);
    response.created_at = payment.created_at;
    response.updated_at = payment.updated_at;
    Ok(HttpResponse::Ok().json(response))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------

/// Registered manually in `server.rs` so the resource can be wrapped in the HMAC middleware; by the time this
/// handler runs the body signature has been verified (or checks are disabled by configuration).
pub async fn nowpayments_webhook<S, D>(
    body: web::Json<NowPaymentsIpn>,
    reconciler: web::Data<ReconcileApi<S, D>>,
) -> HttpResponse
where
    S: StatusStore + 'static,
    D: DeliveryVendor + 'static,
{
    let ipn = body.into_inner();
    let Some(order_id) = ipn.order_id else {
        warn!("💸️ IPN notification without an order_id. Acknowledging and ignoring.");
        return HttpResponse::Ok().json(JsonResponse::failure("Missing order_id"));
    };
    let raw = ipn.payment_status.unwrap_or_default();
    let status = CryptoInvoiceStatus::from(raw.as_str());
    debug!("💸️ IPN for order {order_id}: {status}");
    let outcome = reconciler.process_payment_event(&order_id, status.canonical()).await;
    // Webhook responses must always be in the 200 range, otherwise the provider will retry
    HttpResponse::Ok().json(acknowledge(outcome))
}

route!(mercadopago_webhook => Post "/mercadopago" impl CardGateway, StatusStore, DeliveryVendor);
/// The card aggregator does not sign its notifications, so the body's status is never trusted. The payment id is
/// extracted and the authoritative status is re-queried from the provider's API before anything is reconciled.
pub async fn mercadopago_webhook<M, S, D>(
    body: web::Json<MpWebhook>,
    cards: web::Data<M>,
    reconciler: web::Data<ReconcileApi<S, D>>,
) -> HttpResponse
where
    M: CardGateway,
    S: StatusStore + 'static,
    D: DeliveryVendor + 'static,
{
    let hook = body.into_inner();
    trace!("💳️ Card webhook: type={:?} action={:?}", hook.event_type, hook.action);
    if hook.event_type.as_deref() != Some("payment") {
        debug!("💳️ Ignoring non-payment event: {:?}", hook.event_type);
        return HttpResponse::Ok().json(JsonResponse::success("Ignored non-payment event"));
    }
    let Some(payment_id) = hook.data.as_ref().and_then(|d| d.id_string()) else {
        warn!("💳️ Payment notification without a payment id. Acknowledging and ignoring.");
        return HttpResponse::Ok().json(JsonResponse::failure("Missing payment id"));
    };
    let payment = match cards.get_payment(&payment_id).await {
        Ok(p) => p,
        Err(e) => {
            warn!("💳️ Could not verify payment {payment_id} against the aggregator. {e}");
            return HttpResponse::Ok().json(JsonResponse::failure("Could not verify payment"));
        },
    };
    let Some(reference) = payment.external_reference else {
        warn!("💳️ Payment {payment_id} carries no external reference. Acknowledging and ignoring.");
        return HttpResponse::Ok().json(JsonResponse::failure("Payment has no order reference"));
    };
    let status = CardPaymentStatus::from(payment.status.as_str());
    debug!("💳️ Verified payment {payment_id} for order {reference}: {status}");
    let outcome = reconciler.process_payment_event(&reference, status.canonical()).await;
    HttpResponse::Ok().json(acknowledge(outcome))
}

#[get("/mercadopago")]
pub async fn mercadopago_webhook_info() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "active",
        "service": "Mercado Pago Webhook Handler",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

route!(rbxcrate_webhook => Post "/rbxcrate" impl StatusStore);
/// Order-state notifications from the delivery vendor. The payload carries its own MD5-over-base64 signature in
/// the `sign` field; it is verified here rather than in middleware because the signature lives inside the body.
pub async fn rbxcrate_webhook<S>(
    body: web::Json<serde_json::Value>,
    store: web::Data<S>,
    secrets: web::Data<WebhookSecrets>,
) -> Result<HttpResponse, ServerError>
where
    S: StatusStore + 'static,
{
    let value = body.into_inner();
    // The vendor panel's "check callback" test sends an empty object.
    if value.as_object().map(|o| o.is_empty()).unwrap_or(false) {
        debug!("🚚️ Test callback received");
        return Ok(HttpResponse::Ok().json(JsonResponse::success("Webhook endpoint active")));
    }
    let payload: RbxCrateWebhook = match serde_json::from_value(value) {
        Ok(p) => p,
        Err(e) => {
            warn!("🚚️ Unparseable delivery webhook. {e}. Acknowledging and ignoring.");
            return Ok(HttpResponse::Ok().json(JsonResponse::failure("Unparseable payload")));
        },
    };
    if let Some(sign) = payload.sign.as_deref() {
        if secrets.rbxcrate_key.is_unset() {
            warn!("🚚️ Delivery webhook is signed but no vendor API key is configured. Skipping verification.");
        } else {
            let expected = rbxcrate_webhook_signature(&payload, secrets.rbxcrate_key.reveal())
                .map_err(|e| ServerError::Unspecified(e.to_string()))?;
            let validated: bool = sign.as_bytes().ct_eq(expected.as_bytes()).into();
            if !validated {
                warn!("🚚️ Invalid signature on delivery webhook for order {}", payload.order_id);
                return Err(ServerError::AuthenticationFailure("Invalid webhook signature".to_string()));
            }
        }
    }
    if let Err(e) = OrderId::decode(&payload.order_id) {
        warn!("🚚️ Delivery webhook for undecodable order '{}'. {e}. Ignoring.", payload.order_id);
        return Ok(HttpResponse::Ok().json(JsonResponse::failure("Unknown order")));
    }
    match payload.status.as_str() {
        "Completed" => {
            info!("🚚️✅️ Vendor completed order {} ({})", payload.order_id, payload.robux_amount);
            store.record(&payload.order_id, OrderStatusType::Completed);
        },
        "Error" => {
            error!("🚚️❌️ Vendor failed order {}: {:?}", payload.order_id, payload.error);
            store.record(&payload.order_id, OrderStatusType::Failed);
        },
        "Cancelled" => {
            warn!("🚚️ Vendor cancelled order {}", payload.order_id);
            store.record(&payload.order_id, OrderStatusType::Failed);
        },
        // Pending/Queued states should not reach the webhook; log and acknowledge.
        other => debug!("🚚️ Unexpected vendor status '{other}' for order {}", payload.order_id),
    }
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "received": { "orderId": payload.order_id, "status": payload.status },
    })))
}

#[get("/rbxcrate")]
pub async fn rbxcrate_webhook_info() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "active",
        "service": "RbxCrate Webhook Handler",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

fn acknowledge(outcome: ReconcileOutcome) -> JsonResponse {
    match outcome {
        ReconcileOutcome::Ignored { reason } => JsonResponse::failure(format!("Ignored: {reason}")),
        ReconcileOutcome::Recorded(status) => JsonResponse::success(format!("Order recorded as {status}")),
        ReconcileOutcome::Delivered { vendor_order_id } => {
            JsonResponse::success(format!("Delivered. Vendor order id: {vendor_order_id}"))
        },
        ReconcileOutcome::AlreadyDispatched => JsonResponse::success("Order already dispatched"),
        ReconcileOutcome::DeliveryFailed { message, .. } => {
            JsonResponse::failure(format!("Delivery failed: {message}"))
        },
    }
}
