use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_positive;
use crate::models::depositmodel::DepositTransaction;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DepositAmountDto {
    #[validate(custom = "validate_positive")]
    pub amount: BigDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositSummaryDto {
    pub balance: BigDecimal,
    pub transactions: Vec<DepositTransaction>,
}
