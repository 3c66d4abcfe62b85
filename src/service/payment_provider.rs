// service/payment_provider.rs
use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{Config, ProviderConfig},
    models::{bookingmodel::Booking, paymentmodel::PaymentMethod},
    service::error::ServiceError,
};

/// What the client needs to finish paying with the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCharge {
    pub provider: String,
    pub provider_ref: String,
    pub redirect_url: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResult {
    pub provider_ref: String,
    pub status: String,
}

/// An external payment gateway. Implementations only talk HTTP; timeouts are
/// applied by the `PaymentGateway` around every call.
#[async_trait]
pub trait PaymentProvider: Send + Sync + std::fmt::Debug {
    fn code(&self) -> &'static str;

    async fn create(
        &self,
        booking: &Booking,
        amount: &BigDecimal,
        currency: &str,
    ) -> Result<ProviderCharge, ServiceError>;

    async fn capture(&self, provider_ref: &str) -> Result<ProviderResult, ServiceError>;

    async fn refund(&self, provider_ref: &str, amount: &BigDecimal) -> Result<ProviderResult, ServiceError>;
}

fn provider_error(provider: &str, err: impl std::fmt::Display) -> ServiceError {
    ServiceError::Provider(format!("{}: {}", provider, err))
}

async fn read_json(provider: &str, response: reqwest::Response) -> Result<serde_json::Value, ServiceError> {
    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .unwrap_or(serde_json::Value::Null);

    if !status.is_success() {
        let message = body["message"]
            .as_str()
            .or_else(|| body["error"]["message"].as_str())
            .unwrap_or("request failed");
        return Err(provider_error(provider, format!("{} ({})", message, status)));
    }
    Ok(body)
}

#[derive(Debug, Clone)]
pub struct OrangeMoneyProvider {
    client: reqwest::Client,
    config: ProviderConfig,
    notify_url: String,
}

impl OrangeMoneyProvider {
    pub fn new(client: reqwest::Client, config: ProviderConfig, public_base_url: &str) -> Self {
        Self {
            client,
            config,
            notify_url: format!("{}/api/payments/webhook/om", public_base_url),
        }
    }
}

#[async_trait]
impl PaymentProvider for OrangeMoneyProvider {
    fn code(&self) -> &'static str {
        "om"
    }

    async fn create(
        &self,
        booking: &Booking,
        amount: &BigDecimal,
        currency: &str,
    ) -> Result<ProviderCharge, ServiceError> {
        let order_id = format!("OM-{}", booking.id.simple());
        let payload = serde_json::json!({
            "merchant_key": self.config.api_key,
            "currency": currency,
            "order_id": order_id,
            "amount": amount.to_string(),
            "notif_url": self.notify_url,
            "lang": "fr",
            "reference": booking.id.to_string(),
        });

        let response = self
            .client
            .post(format!("{}/webpayment", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| provider_error(self.code(), e))?;
        let body = read_json(self.code(), response).await?;

        let pay_token = body["pay_token"]
            .as_str()
            .ok_or_else(|| provider_error(self.code(), "missing pay_token"))?;

        Ok(ProviderCharge {
            provider: self.code().to_string(),
            provider_ref: pay_token.to_string(),
            redirect_url: body["payment_url"].as_str().map(str::to_string),
            client_secret: None,
        })
    }

    async fn capture(&self, provider_ref: &str) -> Result<ProviderResult, ServiceError> {
        let response = self
            .client
            .get(format!("{}/transactionstatus/{}", self.config.base_url, provider_ref))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| provider_error(self.code(), e))?;
        let body = read_json(self.code(), response).await?;

        let status = match body["status"].as_str().unwrap_or("PENDING") {
            "SUCCESS" => "completed",
            "FAILED" | "EXPIRED" => "failed",
            _ => "pending",
        };
        Ok(ProviderResult {
            provider_ref: provider_ref.to_string(),
            status: status.to_string(),
        })
    }

    async fn refund(&self, provider_ref: &str, amount: &BigDecimal) -> Result<ProviderResult, ServiceError> {
        let response = self
            .client
            .post(format!("{}/refund", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "pay_token": provider_ref,
                "amount": amount.to_string(),
            }))
            .send()
            .await
            .map_err(|e| provider_error(self.code(), e))?;
        read_json(self.code(), response).await?;

        Ok(ProviderResult {
            provider_ref: provider_ref.to_string(),
            status: "refunded".to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MtnMomoProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl MtnMomoProvider {
    pub fn new(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl PaymentProvider for MtnMomoProvider {
    fn code(&self) -> &'static str {
        "mtn"
    }

    /// Request-to-pay is accepted asynchronously; the reference is ours.
    async fn create(
        &self,
        booking: &Booking,
        amount: &BigDecimal,
        currency: &str,
    ) -> Result<ProviderCharge, ServiceError> {
        let reference = Uuid::new_v4().to_string();
        let response = self
            .client
            .post(format!("{}/collection/v1_0/requesttopay", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("X-Reference-Id", &reference)
            .json(&serde_json::json!({
                "amount": amount.to_string(),
                "currency": currency,
                "externalId": booking.id.to_string(),
                "payerMessage": "Tratra booking",
                "payeeNote": format!("Booking {}", booking.id),
            }))
            .send()
            .await
            .map_err(|e| provider_error(self.code(), e))?;

        if !response.status().is_success() {
            return Err(provider_error(self.code(), format!("request rejected ({})", response.status())));
        }

        Ok(ProviderCharge {
            provider: self.code().to_string(),
            provider_ref: reference,
            redirect_url: None,
            client_secret: None,
        })
    }

    async fn capture(&self, provider_ref: &str) -> Result<ProviderResult, ServiceError> {
        let response = self
            .client
            .get(format!("{}/collection/v1_0/requesttopay/{}", self.config.base_url, provider_ref))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| provider_error(self.code(), e))?;
        let body = read_json(self.code(), response).await?;

        let status = match body["status"].as_str().unwrap_or("PENDING") {
            "SUCCESSFUL" => "completed",
            "FAILED" | "REJECTED" | "TIMEOUT" => "failed",
            _ => "pending",
        };
        Ok(ProviderResult {
            provider_ref: provider_ref.to_string(),
            status: status.to_string(),
        })
    }

    async fn refund(&self, provider_ref: &str, amount: &BigDecimal) -> Result<ProviderResult, ServiceError> {
        let response = self
            .client
            .post(format!("{}/disbursement/v1_0/refund", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("X-Reference-Id", Uuid::new_v4().to_string())
            .json(&serde_json::json!({
                "amount": amount.to_string(),
                "referenceIdToRefund": provider_ref,
            }))
            .send()
            .await
            .map_err(|e| provider_error(self.code(), e))?;

        if !response.status().is_success() {
            return Err(provider_error(self.code(), format!("refund rejected ({})", response.status())));
        }
        Ok(ProviderResult {
            provider_ref: provider_ref.to_string(),
            status: "refunded".to_string(),
        })
    }
}

/// Card payments through a payment-intents style API.
#[derive(Debug, Clone)]
pub struct CardProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl CardProvider {
    pub fn new(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl PaymentProvider for CardProvider {
    fn code(&self) -> &'static str {
        "card"
    }

    async fn create(
        &self,
        booking: &Booking,
        amount: &BigDecimal,
        currency: &str,
    ) -> Result<ProviderCharge, ServiceError> {
        let amount = amount.to_string();
        let currency = currency.to_lowercase();
        let booking_id = booking.id.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency.as_str()),
            ("capture_method", "manual"),
            ("metadata[booking_id]", booking_id.as_str()),
        ];

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| provider_error(self.code(), e))?;
        let body = read_json(self.code(), response).await?;

        let intent_id = body["id"]
            .as_str()
            .ok_or_else(|| provider_error(self.code(), "missing payment intent id"))?;

        Ok(ProviderCharge {
            provider: self.code().to_string(),
            provider_ref: intent_id.to_string(),
            redirect_url: None,
            client_secret: body["client_secret"].as_str().map(str::to_string),
        })
    }

    async fn capture(&self, provider_ref: &str) -> Result<ProviderResult, ServiceError> {
        let response = self
            .client
            .post(format!("{}/v1/payment_intents/{}/capture", self.config.base_url, provider_ref))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| provider_error(self.code(), e))?;
        let body = read_json(self.code(), response).await?;

        let status = match body["status"].as_str() {
            Some("succeeded") => "completed",
            Some("canceled") => "failed",
            _ => "pending",
        };
        Ok(ProviderResult {
            provider_ref: provider_ref.to_string(),
            status: status.to_string(),
        })
    }

    async fn refund(&self, provider_ref: &str, amount: &BigDecimal) -> Result<ProviderResult, ServiceError> {
        let amount = amount.to_string();
        let form = [("payment_intent", provider_ref), ("amount", amount.as_str())];
        let response = self
            .client
            .post(format!("{}/v1/refunds", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| provider_error(self.code(), e))?;
        read_json(self.code(), response).await?;

        Ok(ProviderResult {
            provider_ref: provider_ref.to_string(),
            status: "refunded".to_string(),
        })
    }
}

/// Routes payment methods to providers and bounds every provider call.
#[derive(Debug, Clone)]
pub struct PaymentGateway {
    providers: HashMap<PaymentMethod, Arc<dyn PaymentProvider>>,
    timeout: Duration,
}

impl PaymentGateway {
    pub fn new(timeout: Duration) -> Self {
        Self {
            providers: HashMap::new(),
            timeout,
        }
    }

    pub fn with_provider(mut self, method: PaymentMethod, provider: Arc<dyn PaymentProvider>) -> Self {
        self.providers.insert(method, provider);
        self
    }

    pub fn from_config(config: &Config) -> Self {
        let client = reqwest::Client::new();
        let mut gateway = PaymentGateway::new(Duration::from_secs(config.payment_provider_timeout_secs));

        if config.orange_money.is_configured() {
            gateway = gateway.with_provider(
                PaymentMethod::Om,
                Arc::new(OrangeMoneyProvider::new(
                    client.clone(),
                    config.orange_money.clone(),
                    &config.public_base_url,
                )),
            );
        }
        if config.mtn_momo.is_configured() {
            gateway = gateway.with_provider(
                PaymentMethod::Mtn,
                Arc::new(MtnMomoProvider::new(client.clone(), config.mtn_momo.clone())),
            );
        }
        if config.card.is_configured() {
            gateway = gateway.with_provider(
                PaymentMethod::Card,
                Arc::new(CardProvider::new(client, config.card.clone())),
            );
        }

        for (code, provider) in [
            ("om", &config.orange_money),
            ("mtn", &config.mtn_momo),
            ("card", &config.card),
        ] {
            if provider.is_configured() && provider.webhook_secret.is_none() {
                tracing::warn!("⚠️ {} webhooks will be accepted unsigned, set a webhook secret", code);
            }
        }
        gateway
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn provider_for(&self, method: PaymentMethod) -> Option<Arc<dyn PaymentProvider>> {
        self.providers.get(&method).cloned()
    }

    /// Reference used for methods settled off-platform.
    pub fn local_reference(method: PaymentMethod, booking_id: Uuid) -> String {
        format!("{}-{}", method.to_str().to_uppercase(), booking_id)
    }

    /// Creates the charge with the method's provider. Methods without a
    /// provider (cash and the like) get a local reference instead.
    pub async fn create_charge(
        &self,
        method: PaymentMethod,
        booking: &Booking,
        amount: &BigDecimal,
        currency: &str,
    ) -> Result<ProviderCharge, ServiceError> {
        let provider = match self.provider_for(method) {
            Some(provider) => provider,
            None => {
                return Ok(ProviderCharge {
                    provider: method.to_str().to_string(),
                    provider_ref: Self::local_reference(method, booking.id),
                    redirect_url: None,
                    client_secret: None,
                })
            }
        };

        match tokio::time::timeout(self.timeout, provider.create(booking, amount, currency)).await {
            Ok(result) => result,
            Err(_) => Err(provider_error(provider.code(), "timed out")),
        }
    }

    /// Captures held funds or, for providers without a capture step, reads
    /// back the charge status.
    pub async fn capture(&self, method: PaymentMethod, provider_ref: &str) -> Result<ProviderResult, ServiceError> {
        let provider = self.provider_for(method).ok_or_else(|| {
            ServiceError::Validation(format!("No provider configured for {}", method.to_str()))
        })?;

        match tokio::time::timeout(self.timeout, provider.capture(provider_ref)).await {
            Ok(result) => result,
            Err(_) => Err(provider_error(provider.code(), "timed out")),
        }
    }

    pub async fn refund(
        &self,
        method: PaymentMethod,
        provider_ref: &str,
        amount: &BigDecimal,
    ) -> Result<ProviderResult, ServiceError> {
        let provider = self.provider_for(method).ok_or_else(|| {
            ServiceError::Validation(format!("No provider configured for {}", method.to_str()))
        })?;

        match tokio::time::timeout(self.timeout, provider.refund(provider_ref, amount)).await {
            Ok(result) => result,
            Err(_) => Err(provider_error(provider.code(), "timed out")),
        }
    }
}
