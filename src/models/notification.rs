//! Notification model and kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Notification model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: i32,
    pub user_id: i32,
    /// Machine-readable kind, e.g. `borrow.approved`
    pub kind: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Kinds of notification emitted by the borrow lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    BorrowApproved,
    BorrowRejected,
    BorrowReturned,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BorrowApproved => "borrow.approved",
            NotificationKind::BorrowRejected => "borrow.rejected",
            NotificationKind::BorrowReturned => "borrow.returned",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Notification query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct NotificationQuery {
    /// Only unread notifications when true
    pub unread: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
