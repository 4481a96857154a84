use std::time::Duration;

use actix_web::{guard, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use robux_payment_engine::{exchange_rate::CachedRate, traits::InMemoryStatusStore, ReconcileApi};
use vendor_clients::{DolarApi, MercadoPagoApi, NowPaymentsApi, RbxCrateApi};

use crate::{
    config::{ServerConfig, ServerOptions, WebhookSecrets},
    errors::ServerError,
    middleware::HmacMiddlewareFactory,
    rate_limiter::{RateLimiter, SWEEP_IDLE_THRESHOLD},
    routes::{
        health,
        mercadopago_webhook_info,
        nowpayments_webhook,
        rbxcrate_webhook_info,
        CreateOrderRoute,
        MercadopagoWebhookRoute,
        OrderStatusRoute,
        RbxcrateWebhookRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;
    let srv = create_server_instance(config)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig) -> Result<actix_web::dev::Server, ServerError> {
    let crypto = NowPaymentsApi::new(config.nowpayments.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let cards = MercadoPagoApi::new(config.mercadopago.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let vendor =
        RbxCrateApi::new(config.rbxcrate.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let fx_source =
        DolarApi::new(config.dolarapi.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;

    let store = InMemoryStatusStore::new();
    let fx = web::Data::new(CachedRate::new(fx_source));
    let reconciler = web::Data::new(ReconcileApi::new(store.clone(), vendor.clone()));
    let options = web::Data::new(ServerOptions::from(&config));
    let secrets = web::Data::new(WebhookSecrets { rbxcrate_key: config.rbxcrate.api_key.clone() });
    let limiter = web::Data::new(RateLimiter::new(config.rate_limit, config.rate_limit_window));
    spawn_limiter_sweeper(limiter.clone());

    let ipn_secret = config.ipn_secret.clone();
    let ipn_checks = !ipn_secret.is_unset();
    if !ipn_checks {
        warn!("🚀️ Crypto webhook signature checks are DISABLED. Set RPG_NOWPAYMENTS_IPN_SECRET in production.");
    }
    let srv = HttpServer::new(move || {
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("rpg::access_log"))
            .app_data(web::Data::new(crypto.clone()))
            .app_data(web::Data::new(cards.clone()))
            .app_data(web::Data::new(store.clone()))
            .app_data(fx.clone())
            .app_data(reconciler.clone())
            .app_data(options.clone())
            .app_data(secrets.clone())
            .app_data(limiter.clone());
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<NowPaymentsApi, MercadoPagoApi, DolarApi>::new())
            .service(OrderStatusRoute::<NowPaymentsApi>::new());
        let webhook_scope = web::scope("/webhooks")
            .service(
                web::resource("/nowpayments")
                    .name("nowpayments_webhook")
                    .guard(guard::Post())
                    .wrap(HmacMiddlewareFactory::new("x-nowpayments-sig", ipn_secret.clone(), ipn_checks))
                    .to(nowpayments_webhook::<InMemoryStatusStore, RbxCrateApi>),
            )
            .service(MercadopagoWebhookRoute::<MercadoPagoApi, InMemoryStatusStore, RbxCrateApi>::new())
            .service(mercadopago_webhook_info)
            .service(RbxcrateWebhookRoute::<InMemoryStatusStore>::new())
            .service(rbxcrate_webhook_info);
        app.service(health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Periodically drops idle rate-limiter entries so the per-client map cannot grow without bound.
fn spawn_limiter_sweeper(limiter: web::Data<RateLimiter>) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SWEEP_IDLE_THRESHOLD);
        // The first tick fires immediately; skip it so a fresh map isn't swept at startup.
        tick.tick().await;
        loop {
            tick.tick().await;
            limiter.sweep(SWEEP_IDLE_THRESHOLD);
        }
    });
}
