//! Activity log endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::activity::{ActivityLog, ActivityQuery},
};

use super::AuthenticatedUser;

/// List recorded actions (admin only)
#[utoipa::path(
    get,
    path = "/activity",
    tag = "activity",
    security(("bearer_auth" = [])),
    params(ActivityQuery),
    responses(
        (status = 200, description = "Activity log", body = Vec<ActivityLog>),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn list_activity(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ActivityQuery>,
) -> AppResult<Json<Vec<ActivityLog>>> {
    claims.require_admin()?;

    let entries = state.services.activity.list(&query).await?;
    Ok(Json(entries))
}
