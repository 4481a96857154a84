use std::{env, time::Duration};

use log::*;
use rpg_common::{parse_boolean_flag, Secret};
use vendor_clients::{DolarApiConfig, MercadoPagoConfig, NowPaymentsConfig, RbxCrateConfig};

use crate::errors::ServerError;

const DEFAULT_RPG_HOST: &str = "127.0.0.1";
const DEFAULT_RPG_PORT: u16 = 8330;
const DEFAULT_RATE_LIMIT: u32 = 5;
const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
const DEFAULT_PAY_CURRENCY: &str = "ltc";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL of this server, used to build provider callback and redirect URLs.
    pub public_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// Place id to bake into order tokens when the order request does not supply one.
    pub default_place_id: Option<u64>,
    /// Crypto currency to settle in when the order request does not supply one.
    pub default_pay_currency: String,
    /// Maximum number of order-creation requests per client per window.
    pub rate_limit: u32,
    pub rate_limit_window: Duration,
    /// Shared secret for verifying crypto-aggregator webhook signatures. Unset means signature checks are
    /// disabled, which is only acceptable in development.
    pub ipn_secret: Secret<String>,
    pub nowpayments: NowPaymentsConfig,
    pub mercadopago: MercadoPagoConfig,
    pub rbxcrate: RbxCrateConfig,
    pub dolarapi: DolarApiConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPG_HOST.to_string(),
            port: DEFAULT_RPG_PORT,
            public_url: format!("http://{DEFAULT_RPG_HOST}:{DEFAULT_RPG_PORT}"),
            use_x_forwarded_for: false,
            use_forwarded: false,
            default_place_id: None,
            default_pay_currency: DEFAULT_PAY_CURRENCY.to_string(),
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_limit_window: DEFAULT_RATE_LIMIT_WINDOW,
            ipn_secret: Secret::new(String::default()),
            nowpayments: NowPaymentsConfig::new_from_env_or_default(),
            mercadopago: MercadoPagoConfig::new_from_env_or_default(),
            rbxcrate: RbxCrateConfig::new_from_env_or_default(),
            dolarapi: DolarApiConfig::new_from_env_or_default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("RPG_HOST").ok().unwrap_or_else(|| DEFAULT_RPG_HOST.into());
        let port = env::var("RPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for RPG_PORT. {e} Using the default, {DEFAULT_RPG_PORT}, instead."
                    );
                    DEFAULT_RPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_RPG_PORT);
        let public_url = env::var("RPG_PUBLIC_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ RPG_PUBLIC_URL is not set. Provider callbacks will point at the local bind address.");
            format!("http://{host}:{port}")
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("RPG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("RPG_USE_FORWARDED").ok(), false);
        let default_place_id = env::var("RPG_DEFAULT_PLACE_ID").ok().and_then(|s| {
            s.parse::<u64>()
                .map_err(|e| {
                    error!("🪛️ {s} is not a valid place id for RPG_DEFAULT_PLACE_ID. {e} Ignoring it.");
                    e
                })
                .ok()
        });
        let default_pay_currency =
            env::var("RPG_DEFAULT_PAY_CURRENCY").ok().unwrap_or_else(|| DEFAULT_PAY_CURRENCY.to_string());
        let rate_limit = env::var("RPG_RATE_LIMIT")
            .map(|s| {
                s.parse::<u32>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid value for RPG_RATE_LIMIT. {e} Using {DEFAULT_RATE_LIMIT}.");
                    DEFAULT_RATE_LIMIT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_RATE_LIMIT);
        let rate_limit_window = env::var("RPG_RATE_LIMIT_WINDOW_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW);
        let ipn_secret = Secret::new(env::var("RPG_NOWPAYMENTS_IPN_SECRET").unwrap_or_else(|_| {
            warn!(
                "🪛️ RPG_NOWPAYMENTS_IPN_SECRET is not set. Crypto webhook signatures will NOT be verified. Do not \
                 run like this in production."
            );
            String::default()
        }));
        Self {
            host,
            port,
            public_url,
            use_x_forwarded_for,
            use_forwarded,
            default_place_id,
            default_pay_currency,
            rate_limit,
            rate_limit_window,
            ipn_secret,
            nowpayments: NowPaymentsConfig::new_from_env_or_default(),
            mercadopago: MercadoPagoConfig::new_from_env_or_default(),
            rbxcrate: RbxCrateConfig::new_from_env_or_default(),
            dolarapi: DolarApiConfig::new_from_env_or_default(),
        }
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        if self.rate_limit == 0 {
            return Err(ServerError::ConfigurationError("RPG_RATE_LIMIT must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// The per-request subset of the configuration that handlers need. Registered as shared app data.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub default_place_id: Option<u64>,
    pub default_pay_currency: String,
    pub public_url: String,
}

impl From<&ServerConfig> for ServerOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            default_place_id: config.default_place_id,
            default_pay_currency: config.default_pay_currency.clone(),
            public_url: config.public_url.clone(),
        }
    }
}

/// Secrets the webhook handlers verify signatures with. Registered as shared app data.
#[derive(Clone, Debug)]
pub struct WebhookSecrets {
    pub rbxcrate_key: Secret<String>,
}
