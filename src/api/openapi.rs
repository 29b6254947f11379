//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{activity, books, borrows, health, notifications, purchases, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BookHive API",
        version = "1.0.0",
        description = "Library Management System REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "BookHive Team", email = "contact@bookhive.org")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Borrow requests
        borrows::create_request,
        borrows::list_requests,
        borrows::list_my_requests,
        borrows::get_request,
        borrows::decide_request,
        borrows::return_book,
        // Notifications
        notifications::list_notifications,
        notifications::mark_read,
        // Purchases
        purchases::create_purchase,
        purchases::list_my_purchases,
        purchases::pay_purchase,
        purchases::cancel_purchase,
        // Users
        users::list_users,
        users::get_user,
        // Activity
        activity::list_activity,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::BookShort,
            crate::models::book::StockStatus,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            books::BookListResponse,
            // Borrow requests
            crate::models::borrow_request::BorrowRequest,
            crate::models::borrow_request::BorrowRequestDetails,
            crate::models::borrow_request::RequestStatus,
            crate::models::borrow_request::CreateBorrowRequest,
            crate::models::borrow_request::Decision,
            borrows::RequestListResponse,
            // Notifications
            crate::models::notification::Notification,
            // Purchases
            crate::models::purchase::Purchase,
            crate::models::purchase::PurchaseStatus,
            crate::models::purchase::CreatePurchase,
            // Users
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::Role,
            users::UserListResponse,
            // Activity
            crate::models::activity::ActivityLog,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book catalog management"),
        (name = "borrows", description = "Borrow request lifecycle"),
        (name = "notifications", description = "User notifications"),
        (name = "purchases", description = "Book purchases"),
        (name = "users", description = "User management"),
        (name = "activity", description = "Activity log")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
