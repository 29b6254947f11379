//! Borrow request lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::borrow_request::{
        BorrowRequest, BorrowRequestDetails, CreateBorrowRequest, Decision, RequestQuery,
    },
};

use super::AuthenticatedUser;

/// Paginated request list response
#[derive(Serialize, ToSchema)]
pub struct RequestListResponse {
    pub requests: Vec<BorrowRequestDetails>,
    pub total: i64,
}

/// File a borrow request for the authenticated user
#[utoipa::path(
    post,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRequest,
    responses(
        (status = 201, description = "Request created", body = BorrowRequest),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payload): Json<CreateBorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowRequest>)> {
    let request = state
        .services
        .borrows
        .create_request(payload.book_id, claims.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// List all borrow requests (admin only)
#[utoipa::path(
    get,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(RequestQuery),
    responses(
        (status = 200, description = "Request list", body = RequestListResponse),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn list_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<RequestQuery>,
) -> AppResult<Json<RequestListResponse>> {
    claims.require_admin()?;

    let (requests, total) = state.services.borrows.list(&query).await?;
    Ok(Json(RequestListResponse { requests, total }))
}

/// List the authenticated user's own borrow requests
#[utoipa::path(
    get,
    path = "/borrows/mine",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(RequestQuery),
    responses(
        (status = 200, description = "Caller's requests", body = Vec<BorrowRequestDetails>)
    )
)]
pub async fn list_my_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<RequestQuery>,
) -> AppResult<Json<Vec<BorrowRequestDetails>>> {
    let requests = state
        .services
        .borrows
        .list_for_user(claims.user_id, &query)
        .await?;
    Ok(Json(requests))
}

/// Get a single borrow request with details
#[utoipa::path(
    get,
    path = "/borrows/{id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request details", body = BorrowRequestDetails),
        (status = 404, description = "Request not found")
    )
)]
pub async fn get_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowRequestDetails>> {
    let details = state.services.borrows.get_details(id).await?;
    if let Some(user) = &details.user {
        claims.require_self_or_admin(user.id)?;
    }
    Ok(Json(details))
}

/// Decide a pending request: approve it or reject it with a reason (admin only)
#[utoipa::path(
    post,
    path = "/borrows/{id}/decision",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Request ID")
    ),
    request_body = Decision,
    responses(
        (status = 200, description = "Decision applied", body = BorrowRequest),
        (status = 400, description = "Request already decided or reason missing"),
        (status = 403, description = "Admin privileges required"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "No copies available")
    )
)]
pub async fn decide_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(decision): Json<Decision>,
) -> AppResult<Json<BorrowRequest>> {
    claims.require_admin()?;

    let request = state
        .services
        .borrows
        .decide(id, decision, claims.user_id)
        .await?;
    Ok(Json(request))
}

/// Record the return of a loaned copy
#[utoipa::path(
    post,
    path = "/borrows/{id}/return",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Return recorded", body = BorrowRequest),
        (status = 400, description = "Request is not approved"),
        (status = 403, description = "Not the borrower or an admin"),
        (status = 404, description = "Request not found")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state.services.borrows.return_book(id, &claims).await?;
    Ok(Json(request))
}
