use chrono::{DateTime, Utc};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "deposit_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DepositType {
    Deposit,
    Withdrawal,
    Deduction,
}

impl DepositType {
    pub fn to_str(&self) -> &str {
        match self {
            DepositType::Deposit => "deposit",
            DepositType::Withdrawal => "withdrawal",
            DepositType::Deduction => "deduction",
        }
    }

    pub fn is_debit(&self) -> bool {
        !matches!(self, DepositType::Deposit)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "deposit_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct DepositTransaction {
    pub id: Uuid,
    pub handyman_id: Uuid,
    #[serde(rename = "type")]
    pub kind: DepositType,
    pub amount: BigDecimal,
    pub status: DepositStatus,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDepositTransaction {
    pub handyman_id: Uuid,
    pub kind: DepositType,
    pub amount: BigDecimal,
    pub status: DepositStatus,
    pub reference: Option<String>,
}

impl NewDepositTransaction {
    /// Deposits are strictly positive, debits strictly negative.
    pub fn check_sign(&self) -> Result<(), String> {
        let zero = BigDecimal::zero();
        match self.kind {
            DepositType::Deposit if self.amount <= zero => {
                Err("A deposit must have a positive amount".to_string())
            }
            DepositType::Withdrawal | DepositType::Deduction if self.amount >= zero => Err(format!(
                "A {} must have a negative amount",
                self.kind.to_str()
            )),
            _ => Ok(()),
        }
    }
}

/// Outcome of a gated debit against the completed balance.
#[derive(Debug, Clone)]
pub enum DebitOutcome {
    Applied(DepositTransaction),
    Insufficient { balance: BigDecimal },
}

/// Sum of completed entries; pending and failed rows never count.
pub fn completed_balance<'a>(entries: impl IntoIterator<Item = &'a DepositTransaction>) -> BigDecimal {
    entries
        .into_iter()
        .filter(|t| t.status == DepositStatus::Completed)
        .fold(BigDecimal::zero(), |acc, t| acc + &t.amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: DepositType, amount: i64, status: DepositStatus) -> DepositTransaction {
        DepositTransaction {
            id: Uuid::new_v4(),
            handyman_id: Uuid::nil(),
            kind,
            amount: BigDecimal::from(amount),
            status,
            reference: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sign_rules() {
        let mut tx = NewDepositTransaction {
            handyman_id: Uuid::nil(),
            kind: DepositType::Deposit,
            amount: BigDecimal::from(0),
            status: DepositStatus::Completed,
            reference: None,
        };
        assert!(tx.check_sign().is_err());
        tx.amount = BigDecimal::from(100);
        assert!(tx.check_sign().is_ok());

        tx.kind = DepositType::Deduction;
        assert!(tx.check_sign().is_err());
        tx.amount = BigDecimal::from(-100);
        assert!(tx.check_sign().is_ok());
    }

    #[test]
    fn test_balance_counts_completed_only() {
        let entries = vec![
            entry(DepositType::Deposit, 5000, DepositStatus::Completed),
            entry(DepositType::Deposit, 9000, DepositStatus::Pending),
            entry(DepositType::Deduction, -1100, DepositStatus::Completed),
            entry(DepositType::Withdrawal, -2000, DepositStatus::Failed),
        ];
        assert_eq!(completed_balance(&entries), BigDecimal::from(3900));
    }
}
