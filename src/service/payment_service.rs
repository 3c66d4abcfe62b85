// service/payment_service.rs
use std::sync::Arc;

use bigdecimal::BigDecimal;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{
        bookingdb::BookingExt, db::MarketplaceStore, handymandb::HandymanExt,
        paymentdb::PaymentExt,
    },
    models::{bookingmodel::*, paymentmodel::*, usermodel::AuthUser},
    service::{
        deposit_service::{DepositService, FeeDeduction},
        error::ServiceError,
        fee_service::FeeService,
        notification_service::NotificationService,
        payment_provider::PaymentGateway,
        pricing_service::{PricingService, DEFAULT_CATEGORY_SLUG},
    },
};

#[derive(Debug, Clone)]
pub struct InitiatePayment {
    pub booking_id: Uuid,
    pub method: PaymentMethod,
    pub minutes: i64,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentInitiation {
    pub payment_id: Uuid,
    pub provider: String,
    pub provider_ref: String,
    pub amount: BigDecimal,
    pub platform_fee: BigDecimal,
    pub currency: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl PaymentInitiation {
    fn from_payment(payment: &Payment, provider_ref: String) -> Self {
        PaymentInitiation {
            payment_id: payment.id,
            provider: payment.method.to_str().to_string(),
            provider_ref,
            amount: payment.amount.clone(),
            platform_fee: payment.platform_fee.clone(),
            currency: payment.currency.clone(),
            status: payment.status,
            redirect_url: None,
            client_secret: None,
        }
    }
}

/// Result of a provider status update. `changed` is false for replays.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub payment: Payment,
    pub changed: bool,
}

#[derive(Debug, Clone)]
pub struct PaymentService {
    store: Arc<dyn MarketplaceStore>,
    gateway: PaymentGateway,
    pricing: PricingService,
    fees: FeeService,
    deposits: DepositService,
    notifications: NotificationService,
    currency: String,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        gateway: PaymentGateway,
        pricing: PricingService,
        fees: FeeService,
        deposits: DepositService,
        notifications: NotificationService,
        currency: String,
    ) -> Self {
        Self {
            store,
            gateway,
            pricing,
            fees,
            deposits,
            notifications,
            currency,
        }
    }

    async fn load_booking(&self, booking_id: Uuid) -> Result<Booking, ServiceError> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Booking".to_string()))
    }

    async fn load_payment(&self, booking_id: Uuid) -> Result<Payment, ServiceError> {
        self.store
            .get_payment_by_booking(booking_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Payment".to_string()))
    }

    /// Category used for pricing: the explicit one, else the booked service's.
    async fn pricing_category(
        &self,
        booking: &Booking,
        category_id: Option<Uuid>,
    ) -> Result<(Option<Uuid>, String), ServiceError> {
        let category_id = match category_id {
            Some(id) => Some(id),
            None => match booking.service_id {
                Some(service_id) => self
                    .store
                    .get_service(service_id)
                    .await?
                    .map(|service| service.category_id),
                None => None,
            },
        };

        let slug = match category_id {
            Some(id) => self
                .store
                .get_category(id)
                .await?
                .map(|category| category.slug)
                .unwrap_or_else(|| DEFAULT_CATEGORY_SLUG.to_string()),
            None => DEFAULT_CATEGORY_SLUG.to_string(),
        };
        Ok((category_id, slug))
    }

    /// Travel distance from the artisan's last known position to the job.
    async fn travel_distance_m(&self, booking: &Booking) -> Result<Option<f64>, ServiceError> {
        let destination = match booking.job_location() {
            Some(point) => point,
            None => return Ok(None),
        };
        let origin = self
            .store
            .get_handyman_profile(booking.handyman_id)
            .await?
            .and_then(|profile| profile.location());
        Ok(origin.map(|origin| origin.distance_m(&destination)))
    }

    pub async fn initiate(
        &self,
        actor_id: Uuid,
        input: InitiatePayment,
    ) -> Result<PaymentInitiation, ServiceError> {
        let booking = self.load_booking(input.booking_id).await?;

        if booking.client_id != actor_id {
            return Err(ServiceError::Forbidden(
                "Only the client can pay for a booking".to_string(),
            ));
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(ServiceError::Validation(
                "Cannot pay for a cancelled booking".to_string(),
            ));
        }
        if input.minutes < 1 {
            return Err(ServiceError::Validation("Minutes must be at least 1".to_string()));
        }

        let (category_id, slug) = self.pricing_category(&booking, input.category_id).await?;
        let distance_m = self.travel_distance_m(&booking).await?;
        let estimate = self.pricing.estimate(&slug, input.minutes, distance_m);
        let platform_fee = self.fees.compute_platform_fee(&estimate.amount, category_id).await?;

        let (payment, created) = self
            .store
            .get_or_create_payment(NewPayment {
                booking_id: booking.id,
                amount: estimate.amount,
                platform_fee,
                method: input.method,
                currency: self.currency.clone(),
            })
            .await?;

        if let Some(reference) = &payment.transaction_id {
            tracing::debug!("Payment {} already initiated as {}", payment.id, reference);
            return Ok(PaymentInitiation::from_payment(&payment, reference.clone()));
        }
        if payment.status != PaymentStatus::Pending {
            return Err(ServiceError::invalid_transition(payment.status, PaymentStatus::Pending));
        }
        if created {
            tracing::info!(
                "Payment {} created for booking {}: {} {} (fee {})",
                payment.id,
                booking.id,
                payment.amount,
                payment.currency,
                payment.platform_fee
            );
        }

        // one caller at a time talks to the provider for a payment
        let stale_after = (self.gateway.timeout().as_secs() as i64 * 2).max(30);
        if !self.store.claim_payment_initiation(payment.id, stale_after).await? {
            let current = self.load_payment(booking.id).await?;
            return match current.transaction_id.clone() {
                Some(reference) => Ok(PaymentInitiation::from_payment(&current, reference)),
                None => Err(ServiceError::Conflict(
                    "Payment initiation already in progress".to_string(),
                )),
            };
        }

        let result = self.charge(&booking, &payment).await;
        if result.is_err() {
            if let Err(e) = self.store.release_payment_initiation(payment.id).await {
                tracing::error!("Could not release initiation claim on payment {}: {}", payment.id, e);
            }
        }
        result
    }

    async fn charge(&self, booking: &Booking, payment: &Payment) -> Result<PaymentInitiation, ServiceError> {
        // a retry keeps the method the payment was created with
        let charge = self
            .gateway
            .create_charge(payment.method, booking, &payment.amount, &payment.currency)
            .await
            .map_err(|e| {
                tracing::warn!("Provider charge for payment {} failed: {}", payment.id, e);
                e
            })?;

        if let Some(existing) = self.store.get_payment_by_reference(&charge.provider_ref).await? {
            if existing.id != payment.id {
                return Err(ServiceError::Conflict(
                    "Transaction reference already in use".to_string(),
                ));
            }
        }

        let payment = match self
            .store
            .set_payment_reference(payment.id, &charge.provider_ref)
            .await?
        {
            Some(payment) => payment,
            None => {
                tracing::error!(
                    "Payment {} got a reference concurrently, {} charge {} left unrecorded",
                    payment.id,
                    charge.provider,
                    charge.provider_ref
                );
                return Err(ServiceError::Conflict(
                    "Payment was initiated concurrently".to_string(),
                ));
            }
        };

        tracing::info!(
            "Payment {} sent to {} as {}",
            payment.id,
            charge.provider,
            charge.provider_ref
        );

        Ok(PaymentInitiation {
            provider: charge.provider,
            redirect_url: charge.redirect_url,
            client_secret: charge.client_secret,
            ..PaymentInitiation::from_payment(&payment, charge.provider_ref)
        })
    }

    /// The method whose webhooks `provider` may deliver. Only providers wired
    /// into the gateway qualify; local references settle through `confirm_cash`.
    pub fn webhook_method(&self, provider: &str) -> Option<PaymentMethod> {
        PaymentMethod::from_webhook_provider(provider)
            .filter(|method| self.gateway.provider_for(*method).is_some())
    }

    /// Applies a status reported for a `method` payment. Replays of the
    /// current status are accepted without writing anything.
    pub async fn reconcile(
        &self,
        method: PaymentMethod,
        provider_ref: &str,
        status: PaymentStatus,
    ) -> Result<Reconciliation, ServiceError> {
        let provider = method.to_str();
        let note = format!("prov={}", provider);

        match self
            .store
            .reconcile_payment(provider_ref, method, status, &note)
            .await?
        {
            ReconcileOutcome::NotFound => {
                tracing::warn!("Webhook from {} for an unknown reference", provider);
                Err(ServiceError::NotFound("Payment".to_string()))
            }
            ReconcileOutcome::Unchanged(payment) => {
                tracing::debug!("Webhook replay for payment {} ({})", payment.id, payment.status);
                Ok(Reconciliation {
                    payment,
                    changed: false,
                })
            }
            ReconcileOutcome::Rejected { current } => {
                tracing::warn!(
                    "Rejected {} webhook: payment {} cannot move from {} to {}",
                    provider,
                    provider_ref,
                    current,
                    status
                );
                Err(ServiceError::invalid_transition(current, status))
            }
            ReconcileOutcome::Applied { payment, log } => {
                tracing::info!(
                    "Payment {} {} -> {} ({})",
                    payment.id,
                    log.previous_status,
                    log.new_status,
                    note
                );

                if payment.status == PaymentStatus::Completed {
                    if let Some(booking) = self.store.get_booking(payment.booking_id).await? {
                        self.notifications.notify_payment_received(&booking, &payment);
                    }
                }
                Ok(Reconciliation {
                    payment,
                    changed: true,
                })
            }
        }
    }

    /// The artisan confirms cash was handed over. The platform fee comes out
    /// of the deposit first; without enough deposit the payment stays pending.
    pub async fn confirm_cash(&self, booking_id: Uuid, actor_id: Uuid) -> Result<Payment, ServiceError> {
        let booking = self.load_booking(booking_id).await?;

        if booking.handyman_id != actor_id {
            return Err(ServiceError::Forbidden(
                "Only the handyman can confirm a cash payment".to_string(),
            ));
        }
        if booking.status != BookingStatus::Completed {
            return Err(ServiceError::Validation(
                "Cash can only be confirmed once the job is completed".to_string(),
            ));
        }

        let payment = self.load_payment(booking.id).await?;
        if payment.method != PaymentMethod::Cash {
            return Err(ServiceError::Validation(
                "This booking is not paid in cash".to_string(),
            ));
        }
        if payment.status == PaymentStatus::Completed {
            return Ok(payment);
        }
        if payment.status != PaymentStatus::Pending {
            return Err(ServiceError::invalid_transition(payment.status, PaymentStatus::Completed));
        }
        let reference = payment.transaction_id.clone().ok_or_else(|| {
            ServiceError::Validation("Payment has not been initiated".to_string())
        })?;

        if let FeeDeduction::Refused { balance } = self
            .deposits
            .deduct_fee_amount(booking.handyman_id, &payment.platform_fee)
            .await?
        {
            return Err(ServiceError::InsufficientFunds {
                required: payment.platform_fee.to_string(),
                available: balance.to_string(),
            });
        }

        let reconciled = self
            .reconcile(PaymentMethod::Cash, &reference, PaymentStatus::Completed)
            .await?;
        Ok(reconciled.payment)
    }

    /// Settles a provider payment once the job is done: held card funds are
    /// captured, mobile-money charges are read back from the provider.
    pub async fn capture(&self, booking_id: Uuid, actor_id: Uuid) -> Result<Reconciliation, ServiceError> {
        let booking = self.load_booking(booking_id).await?;

        if booking.client_id != actor_id && booking.handyman_id != actor_id {
            return Err(ServiceError::Forbidden(
                "You are not a party to this booking".to_string(),
            ));
        }
        if booking.status != BookingStatus::Completed {
            return Err(ServiceError::Validation(
                "Payments are captured once the job is completed".to_string(),
            ));
        }

        let payment = self.load_payment(booking.id).await?;
        if payment.method == PaymentMethod::Cash {
            return Err(ServiceError::Validation(
                "Cash payments are confirmed by the handyman".to_string(),
            ));
        }
        if payment.status != PaymentStatus::Pending {
            return Ok(Reconciliation {
                payment,
                changed: false,
            });
        }
        let reference = payment.transaction_id.clone().ok_or_else(|| {
            ServiceError::Validation("Payment has not been initiated".to_string())
        })?;

        let result = self.gateway.capture(payment.method, &reference).await?;
        let status: PaymentStatus = result.status.parse().map_err(|_| {
            ServiceError::Provider(format!(
                "{}: unexpected status '{}'",
                payment.method.to_str(),
                result.status
            ))
        })?;

        if status == PaymentStatus::Pending {
            tracing::debug!("Payment {} still pending at the provider", payment.id);
            return Ok(Reconciliation {
                payment,
                changed: false,
            });
        }
        self.reconcile(payment.method, &reference, status).await
    }

    /// Refunds a completed provider payment. Allowed for the booking's
    /// artisan and for admins.
    pub async fn refund(&self, booking_id: Uuid, actor: &AuthUser) -> Result<Payment, ServiceError> {
        let booking = self.load_booking(booking_id).await?;

        if booking.handyman_id != actor.id && !actor.is_admin() {
            return Err(ServiceError::Forbidden(
                "Only the handyman or an admin can refund a payment".to_string(),
            ));
        }

        let payment = self.load_payment(booking.id).await?;
        if payment.method == PaymentMethod::Cash {
            return Err(ServiceError::Validation(
                "Cash payments are settled outside the platform".to_string(),
            ));
        }
        if payment.status != PaymentStatus::Completed {
            return Err(ServiceError::invalid_transition(payment.status, PaymentStatus::Refunded));
        }
        let reference = payment.transaction_id.clone().ok_or_else(|| {
            ServiceError::Validation("Payment has no provider reference".to_string())
        })?;

        let result = self
            .gateway
            .refund(payment.method, &reference, &payment.amount)
            .await?;
        tracing::info!("Provider accepted refund for payment {} ({})", payment.id, result.status);

        let reconciled = self
            .reconcile(payment.method, &reference, PaymentStatus::Refunded)
            .await?;
        Ok(reconciled.payment)
    }
}
