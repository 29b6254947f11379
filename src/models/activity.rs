//! Activity log model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// One recorded action, e.g. `borrow.approve` on request 12
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ActivityLog {
    pub id: i32,
    /// Acting user, absent for system actions
    pub user_id: Option<i32>,
    pub action: String,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Activity query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ActivityQuery {
    /// Filter by action prefix, e.g. `borrow.`
    pub action: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
