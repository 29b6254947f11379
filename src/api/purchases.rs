//! Purchase endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::purchase::{CreatePurchase, Purchase, PurchaseQuery},
};

use super::AuthenticatedUser;

/// Create a purchase for the authenticated user
#[utoipa::path(
    post,
    path = "/purchases",
    tag = "purchases",
    security(("bearer_auth" = [])),
    request_body = CreatePurchase,
    responses(
        (status = 201, description = "Purchase created", body = Purchase),
        (status = 400, description = "Invalid payload or unpriced book"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Not enough copies available")
    )
)]
pub async fn create_purchase(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payload): Json<CreatePurchase>,
) -> AppResult<(StatusCode, Json<Purchase>)> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let purchase = state
        .services
        .purchases
        .create_purchase(&payload, claims.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

/// List the authenticated user's purchases
#[utoipa::path(
    get,
    path = "/purchases/mine",
    tag = "purchases",
    security(("bearer_auth" = [])),
    params(PurchaseQuery),
    responses(
        (status = 200, description = "Caller's purchases", body = Vec<Purchase>)
    )
)]
pub async fn list_my_purchases(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PurchaseQuery>,
) -> AppResult<Json<Vec<Purchase>>> {
    let purchases = state
        .services
        .purchases
        .list_for_user(claims.user_id, &query)
        .await?;
    Ok(Json(purchases))
}

/// Pay a pending purchase
#[utoipa::path(
    post,
    path = "/purchases/{id}/pay",
    tag = "purchases",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Purchase ID")
    ),
    responses(
        (status = 200, description = "Purchase paid", body = Purchase),
        (status = 400, description = "Purchase is not pending"),
        (status = 404, description = "Purchase not found")
    )
)]
pub async fn pay_purchase(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Purchase>> {
    let purchase = state.services.purchases.pay_purchase(id, &claims).await?;
    Ok(Json(purchase))
}

/// Cancel a pending purchase, restoring stock
#[utoipa::path(
    post,
    path = "/purchases/{id}/cancel",
    tag = "purchases",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Purchase ID")
    ),
    responses(
        (status = 200, description = "Purchase cancelled", body = Purchase),
        (status = 400, description = "Purchase is not pending"),
        (status = 404, description = "Purchase not found")
    )
)]
pub async fn cancel_purchase(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Purchase>> {
    let purchase = state.services.purchases.cancel_purchase(id, &claims).await?;
    Ok(Json(purchase))
}
