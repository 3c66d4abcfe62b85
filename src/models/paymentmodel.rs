use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn to_str(&self) -> &str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Completed) | (Pending, Failed) | (Completed, Refunded)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("Unknown payment status '{}'", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Om,
    Mtn,
    Cash,
    Transfer,
    Check,
}

impl PaymentMethod {
    pub fn to_str(&self) -> &str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Om => "om",
            PaymentMethod::Mtn => "mtn",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Check => "check",
        }
    }

    /// Methods settled by an external provider that reports back by webhook.
    /// Cash, transfer and check are confirmed on the platform instead.
    pub fn from_webhook_provider(code: &str) -> Option<Self> {
        match code {
            "om" => Some(PaymentMethod::Om),
            "mtn" => Some(PaymentMethod::Mtn),
            "card" => Some(PaymentMethod::Card),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: BigDecimal,
    pub platform_fee: BigDecimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub is_paid: bool,
    pub currency: String,
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Moves the record to `status`, keeping `is_paid` and the payment date in step.
    pub fn apply_status(&mut self, status: PaymentStatus, now: DateTime<Utc>) {
        self.status = status;
        self.is_paid = status == PaymentStatus::Completed;
        if status == PaymentStatus::Completed && self.payment_date.is_none() {
            self.payment_date = Some(now);
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub booking_id: Uuid,
    pub amount: BigDecimal,
    pub platform_fee: BigDecimal,
    pub method: PaymentMethod,
    pub currency: String,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct PaymentLog {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub previous_status: PaymentStatus,
    pub new_status: PaymentStatus,
    pub changed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Result of applying a provider status to a payment under its row lock.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    NotFound,
    Unchanged(Payment),
    Applied { payment: Payment, log: PaymentLog },
    Rejected { current: PaymentStatus },
}

#[cfg(test)]
mod tests {
    use super::*;
    use PaymentStatus::*;

    #[test]
    fn test_only_provider_methods_take_webhooks() {
        assert_eq!(PaymentMethod::from_webhook_provider("om"), Some(PaymentMethod::Om));
        assert_eq!(PaymentMethod::from_webhook_provider("mtn"), Some(PaymentMethod::Mtn));
        assert_eq!(PaymentMethod::from_webhook_provider("card"), Some(PaymentMethod::Card));
        for code in ["cash", "transfer", "check", "OM", ""] {
            assert_eq!(PaymentMethod::from_webhook_provider(code), None, "{}", code);
        }
    }

    #[test]
    fn test_payment_transitions() {
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Failed));
        assert!(Completed.can_transition_to(Refunded));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Refunded.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Refunded));
    }

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!("COMPLETED".parse::<PaymentStatus>().unwrap(), Completed);
        assert_eq!(" failed ".parse::<PaymentStatus>().unwrap(), Failed);
        assert!("paid".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_apply_status_keeps_is_paid_in_sync() {
        let now = Utc::now();
        let mut payment = Payment {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            amount: BigDecimal::from(6000),
            platform_fee: BigDecimal::from(660),
            method: PaymentMethod::Om,
            status: Pending,
            transaction_id: Some("OM-1".into()),
            is_paid: false,
            currency: "XOF".into(),
            payment_date: None,
            created_at: now,
            updated_at: now,
        };

        for status in [Completed, Refunded, Pending, Failed] {
            payment.apply_status(status, now);
            assert_eq!(payment.is_paid, payment.status == Completed);
        }
        assert_eq!(payment.payment_date, Some(now));
    }
}
