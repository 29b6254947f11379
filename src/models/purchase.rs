//! Purchase model and payment state machine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::AppError;

/// Payment status of a purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    Pending,
    Paid,
    Cancelled,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "PENDING",
            PurchaseStatus::Paid => "PAID",
            PurchaseStatus::Cancelled => "CANCELLED",
        }
    }

    /// Validate payment of a purchase in this status.
    pub fn mark_paid(self) -> Result<PurchaseStatus, PurchaseStateError> {
        match self {
            PurchaseStatus::Pending => Ok(PurchaseStatus::Paid),
            other => Err(PurchaseStateError {
                status: other,
                action: "paid",
            }),
        }
    }

    /// Validate cancellation of a purchase in this status.
    ///
    /// Cancelling restores the consumed stock; only unpaid purchases
    /// can be cancelled.
    pub fn cancel(self) -> Result<PurchaseStatus, PurchaseStateError> {
        match self {
            PurchaseStatus::Pending => Ok(PurchaseStatus::Cancelled),
            other => Err(PurchaseStateError {
                status: other,
                action: "cancelled",
            }),
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PurchaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PurchaseStatus::Pending),
            "PAID" => Ok(PurchaseStatus::Paid),
            "CANCELLED" => Ok(PurchaseStatus::Cancelled),
            _ => Err(format!("Invalid purchase status: {}", s)),
        }
    }
}

// SQLx conversion for PurchaseStatus (stored as TEXT)
impl sqlx::Type<Postgres> for PurchaseStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for PurchaseStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for PurchaseStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as Encode<Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// A payment transition attempted on a purchase that is no longer pending
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("purchase is {status} and cannot be {action}")]
pub struct PurchaseStateError {
    pub status: PurchaseStatus,
    pub action: &'static str,
}

impl From<PurchaseStateError> for AppError {
    fn from(e: PurchaseStateError) -> Self {
        AppError::InvalidState(e.to_string())
    }
}

/// Purchase model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Purchase {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub quantity: i32,
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    #[schema(value_type = f64)]
    pub total: Decimal,
    pub status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Create purchase request body
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePurchase {
    pub book_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// Purchase list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PurchaseQuery {
    pub status: Option<PurchaseStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_purchase_can_be_paid_once() {
        let paid = PurchaseStatus::Pending.mark_paid().unwrap();
        assert_eq!(paid, PurchaseStatus::Paid);
        assert!(paid.mark_paid().is_err());
        assert!(PurchaseStatus::Cancelled.mark_paid().is_err());
    }

    #[test]
    fn only_pending_purchases_can_be_cancelled() {
        let cancelled = PurchaseStatus::Pending.cancel().unwrap();
        assert_eq!(cancelled, PurchaseStatus::Cancelled);
        assert!(PurchaseStatus::Paid.cancel().is_err());
        assert!(cancelled.cancel().is_err());
    }

    #[test]
    fn state_errors_map_to_invalid_state() {
        let err: AppError = PurchaseStatus::Paid.mark_paid().unwrap_err().into();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            PurchaseStatus::Pending,
            PurchaseStatus::Paid,
            PurchaseStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<PurchaseStatus>(), Ok(status));
        }
        assert!("paid".parse::<PurchaseStatus>().is_err());
    }

    #[test]
    fn create_purchase_requires_positive_quantity() {
        let ok = CreatePurchase {
            book_id: 1,
            quantity: 2,
        };
        assert!(ok.validate().is_ok());

        let zero = CreatePurchase {
            book_id: 1,
            quantity: 0,
        };
        assert!(zero.validate().is_err());
    }
}
