//! Borrow requests repository for database operations
//!
//! All lifecycle writes are conditional updates keyed on the current
//! status, so two admins deciding the same request concurrently cannot
//! both win. The copy-count adjustment runs in the same transaction as
//! the status change.

use chrono::Utc;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookShort,
        borrow_request::{BorrowRequest, BorrowRequestDetails, RequestQuery, RequestStatus},
        user::UserShort,
    },
};

use super::books::page_bounds;

#[derive(Clone)]
pub struct BorrowRequestsRepository {
    pool: Pool<Postgres>,
}

impl BorrowRequestsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get request by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))
    }

    /// Get request with book and user details
    pub async fn get_details(&self, id: i32) -> AppResult<BorrowRequestDetails> {
        let row = sqlx::query(
            r#"
            SELECT r.id, r.status, r.rejection_reason, r.requested_at, r.decided_at,
                   r.returned_at,
                   b.id as book_id, b.title, b.author, b.isbn,
                   u.id as user_id, u.name as user_name, u.role as user_role
            FROM borrow_requests r
            JOIN books b ON r.book_id = b.id
            LEFT JOIN users u ON r.user_id = u.id
            WHERE r.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))?;

        Ok(Self::details_from_row(&row))
    }

    /// List requests with optional status filter, newest first
    pub async fn list(&self, query: &RequestQuery) -> AppResult<(Vec<BorrowRequestDetails>, i64)> {
        let (limit, offset) = page_bounds(query.page, query.per_page);

        let rows = sqlx::query(
            r#"
            SELECT r.id, r.status, r.rejection_reason, r.requested_at, r.decided_at,
                   r.returned_at,
                   b.id as book_id, b.title, b.author, b.isbn,
                   u.id as user_id, u.name as user_name, u.role as user_role
            FROM borrow_requests r
            JOIN books b ON r.book_id = b.id
            LEFT JOIN users u ON r.user_id = u.id
            WHERE ($1::text IS NULL OR r.status = $1)
            ORDER BY r.requested_at DESC, r.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(query.status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_requests WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(query.status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.iter().map(Self::details_from_row).collect(), total))
    }

    /// List requests belonging to one user, newest first
    pub async fn list_for_user(
        &self,
        user_id: i32,
        query: &RequestQuery,
    ) -> AppResult<Vec<BorrowRequestDetails>> {
        let (limit, offset) = page_bounds(query.page, query.per_page);

        let rows = sqlx::query(
            r#"
            SELECT r.id, r.status, r.rejection_reason, r.requested_at, r.decided_at,
                   r.returned_at,
                   b.id as book_id, b.title, b.author, b.isbn,
                   u.id as user_id, u.name as user_name, u.role as user_role
            FROM borrow_requests r
            JOIN books b ON r.book_id = b.id
            LEFT JOIN users u ON r.user_id = u.id
            WHERE r.user_id = $1
              AND ($2::text IS NULL OR r.status = $2)
            ORDER BY r.requested_at DESC, r.id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(query.status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::details_from_row).collect())
    }

    /// Create a new pending request
    pub async fn create(&self, book_id: i32, user_id: i32) -> AppResult<BorrowRequest> {
        let request = sqlx::query_as::<_, BorrowRequest>(
            r#"
            INSERT INTO borrow_requests (book_id, user_id, status, requested_at)
            VALUES ($1, $2, 'PENDING', $3)
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(request)
    }

    /// Approve a pending request and reserve one copy, atomically.
    ///
    /// Fails with `OutOfStock` when no copy is available; the status
    /// change rolls back with it.
    pub async fn approve(&self, request_id: i32) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = 'APPROVED', decided_at = $2
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        let request = match request {
            Some(r) => r,
            None => {
                drop(tx);
                return Err(self.transition_conflict(request_id, "decided").await);
            }
        };

        let reserved = sqlx::query(
            r#"
            UPDATE books
            SET available_copies = available_copies - 1,
                stock_status = CASE WHEN available_copies - 1 > 0
                                    THEN 'IN_STOCK' ELSE 'OUT_OF_STOCK' END,
                updated_at = NOW()
            WHERE id = $1 AND available_copies >= 1
            "#,
        )
        .bind(request.book_id)
        .execute(&mut *tx)
        .await?;

        if reserved.rows_affected() == 0 {
            // tx drops here and rolls the status change back
            return Err(AppError::OutOfStock(
                "No copies available for this book".to_string(),
            ));
        }

        tx.commit().await?;
        Ok(request)
    }

    /// Reject a pending request with a reason. No copy effect.
    pub async fn reject(&self, request_id: i32, reason: &str) -> AppResult<BorrowRequest> {
        let request = sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = 'REJECTED', rejection_reason = $2, decided_at = $3
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(reason)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match request {
            Some(r) => Ok(r),
            None => Err(self.transition_conflict(request_id, "decided").await),
        }
    }

    /// Mark an approved request returned and release its copy, atomically.
    ///
    /// The released count is capped at `copies` in case the total was
    /// reduced while the loan was out.
    pub async fn mark_returned(&self, request_id: i32) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = 'RETURNED', returned_at = $2
            WHERE id = $1 AND status = 'APPROVED'
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        let request = match request {
            Some(r) => r,
            None => {
                drop(tx);
                return Err(self.transition_conflict(request_id, "returned").await);
            }
        };

        sqlx::query(
            r#"
            UPDATE books
            SET available_copies = LEAST(available_copies + 1, copies),
                stock_status = CASE WHEN LEAST(available_copies + 1, copies) > 0
                                    THEN 'IN_STOCK' ELSE 'OUT_OF_STOCK' END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(request.book_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(request)
    }

    /// Explain a failed conditional update: the request either does not
    /// exist or sits in a status the transition does not accept.
    async fn transition_conflict(&self, request_id: i32, verb: &str) -> AppError {
        let status: Result<Option<RequestStatus>, sqlx::Error> =
            sqlx::query_scalar("SELECT status FROM borrow_requests WHERE id = $1")
                .bind(request_id)
                .fetch_optional(&self.pool)
                .await;

        match status {
            Ok(Some(status)) => AppError::InvalidState(format!(
                "request is {} and cannot be {}",
                status, verb
            )),
            Ok(None) => {
                AppError::NotFound(format!("Borrow request with id {} not found", request_id))
            }
            Err(e) => e.into(),
        }
    }

    fn details_from_row(row: &sqlx::postgres::PgRow) -> BorrowRequestDetails {
        let user = row
            .get::<Option<i32>, _>("user_id")
            .map(|id| UserShort {
                id,
                name: row.get("user_name"),
                role: row.get("user_role"),
            });

        BorrowRequestDetails {
            id: row.get("id"),
            status: row.get("status"),
            rejection_reason: row.get("rejection_reason"),
            requested_at: row.get("requested_at"),
            decided_at: row.get("decided_at"),
            returned_at: row.get("returned_at"),
            book: BookShort {
                id: row.get("book_id"),
                title: row.get("title"),
                author: row.get("author"),
                isbn: row.get("isbn"),
            },
            user,
        }
    }
}
