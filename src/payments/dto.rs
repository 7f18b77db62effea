use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub amount_cents: i32,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub provider: Option<String>,
    pub provider_payment_id: Option<String>,
    pub student_id: Uuid,
    pub lesson_id: Uuid,
}

fn default_currency() -> String {
    "EUR".to_string()
}

impl CreatePaymentRequest {
    /// Amount and currency checks that need no lookups.
    pub fn validate(&self) -> AppResult<()> {
        if self.amount_cents <= 0 {
            return Err(AppError::validation("amount_cents must be positive"));
        }
        let currency = self.currency.trim();
        if currency.is_empty() || currency.len() > 10 {
            return Err(AppError::validation("currency must be 1 to 10 characters"));
        }
        Ok(())
    }

    pub fn currency_code(&self) -> String {
        self.currency.trim().to_uppercase()
    }
}

#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub provider_payment_id: String,
    pub status: PaymentStatus,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub id: Uuid,
    pub status: String,
}
