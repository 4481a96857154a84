//! Hand-rolled counting mocks for the gateway, vendor and rate-source seams.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use robux_payment_engine::traits::{
    CardGateway,
    CardPayment,
    CryptoGateway,
    DeliveryOutcome,
    DeliveryRequest,
    DeliveryVendor,
    GatewayError,
    InvoiceRequest,
    PaymentIntent,
    PaymentRecord,
    PreferenceRequest,
    RateSource,
    RateSourceError,
};

#[derive(Clone)]
pub struct MockCryptoGateway {
    pub configured: bool,
    pub payment: Option<PaymentRecord>,
    pub invoices_created: Arc<AtomicUsize>,
}

impl MockCryptoGateway {
    pub fn new() -> Self {
        Self { configured: true, payment: None, invoices_created: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn with_payment(status: &str) -> Self {
        let payment = PaymentRecord {
            payment_id: "5077125051".to_string(),
            status: status.to_string(),
            pay_address: "ltc1qtestaddress".to_string(),
            pay_amount: 0.1,
            actually_paid: 0.05,
            pay_currency: "ltc".to_string(),
            order_token: String::new(),
            created_at: Some("2024-05-01T10:00:00.000Z".to_string()),
            updated_at: Some("2024-05-01T10:05:00.000Z".to_string()),
        };
        Self { payment: Some(payment), ..Self::new() }
    }
}

impl CryptoGateway for MockCryptoGateway {
    async fn create_invoice(&self, req: &InvoiceRequest) -> Result<PaymentIntent, GatewayError> {
        self.invoices_created.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentIntent {
            reference: "pay_1".to_string(),
            pay_address: Some("ltc1qtestaddress".to_string()),
            redirect_url: None,
            pay_amount: req.usd_amount / 65.0,
            pay_currency: req.pay_currency.clone(),
        })
    }

    async fn find_payment(&self, order_token: &str) -> Result<Option<PaymentRecord>, GatewayError> {
        Ok(self.payment.clone().map(|mut p| {
            p.order_token = order_token.to_string();
            p
        }))
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

#[derive(Clone)]
pub struct MockCardGateway {
    pub payment: Option<CardPayment>,
    pub preferences_created: Arc<AtomicUsize>,
    pub lookups: Arc<AtomicUsize>,
}

impl MockCardGateway {
    pub fn new() -> Self {
        Self {
            payment: None,
            preferences_created: Arc::new(AtomicUsize::new(0)),
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_payment(status: &str, external_reference: Option<&str>) -> Self {
        let payment = CardPayment {
            id: "11111111".to_string(),
            status: status.to_string(),
            external_reference: external_reference.map(|s| s.to_string()),
            transaction_amount: 910.0,
            currency_id: "ARS".to_string(),
        };
        Self { payment: Some(payment), ..Self::new() }
    }
}

impl CardGateway for MockCardGateway {
    async fn create_preference(&self, req: &PreferenceRequest) -> Result<PaymentIntent, GatewayError> {
        self.preferences_created.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentIntent {
            reference: "pref-1".to_string(),
            pay_address: None,
            redirect_url: Some("https://checkout.test/init".to_string()),
            pay_amount: req.unit_price_local,
            pay_currency: "ARS".to_string(),
        })
    }

    async fn get_payment(&self, _payment_id: &str) -> Result<CardPayment, GatewayError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.payment.clone().ok_or_else(|| GatewayError::Unavailable("payment not found".to_string()))
    }
}

#[derive(Clone)]
pub struct MockDeliveryVendor {
    pub dispatches: Arc<AtomicUsize>,
    pub outcome: DeliveryOutcome,
}

impl MockDeliveryVendor {
    pub fn delivered() -> Self {
        Self {
            dispatches: Arc::new(AtomicUsize::new(0)),
            outcome: DeliveryOutcome::Delivered { vendor_order_id: "vendor-1".to_string() },
        }
    }
}

impl DeliveryVendor for MockDeliveryVendor {
    async fn dispatch(&self, _req: &DeliveryRequest) -> DeliveryOutcome {
        self.dispatches.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

#[derive(Clone, Copy)]
pub struct MockRateSource {
    pub rate: f64,
}

impl RateSource for MockRateSource {
    async fn fetch_rate(&self) -> Result<f64, RateSourceError> {
        Ok(self.rate)
    }
}
