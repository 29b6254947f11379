//! Purchases repository for database operations
//!
//! A purchase consumes stock permanently (both `copies` and
//! `available_copies`), unlike a borrow which only reserves an
//! available copy. Stock consumption and the purchase insert run in
//! one transaction.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::purchase::{Purchase, PurchaseQuery},
};

use super::books::page_bounds;

#[derive(Clone)]
pub struct PurchasesRepository {
    pool: Pool<Postgres>,
}

impl PurchasesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get purchase by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Purchase> {
        sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Purchase with id {} not found", id)))
    }

    /// Create a pending purchase, consuming `quantity` copies of stock.
    pub async fn create(&self, user_id: i32, book_id: i32, quantity: i32) -> AppResult<Purchase> {
        let mut tx = self.pool.begin().await?;

        let price: Option<Option<Decimal>> = sqlx::query_scalar(
            r#"
            UPDATE books
            SET copies = copies - $2,
                available_copies = available_copies - $2,
                stock_status = CASE WHEN available_copies - $2 > 0
                                    THEN 'IN_STOCK' ELSE 'OUT_OF_STOCK' END,
                updated_at = NOW()
            WHERE id = $1 AND available_copies >= $2
            RETURNING price
            "#,
        )
        .bind(book_id)
        .bind(quantity)
        .fetch_optional(&mut *tx)
        .await?;

        let price = match price {
            Some(price) => price,
            None => {
                drop(tx);
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
                        .bind(book_id)
                        .fetch_one(&self.pool)
                        .await?;
                return Err(if exists {
                    AppError::OutOfStock(format!(
                        "Not enough copies available to purchase {}",
                        quantity
                    ))
                } else {
                    AppError::NotFound(format!("Book with id {} not found", book_id))
                });
            }
        };

        let unit_price = price.ok_or_else(|| {
            // tx drops and rolls the stock change back
            AppError::Validation("Book has no price and cannot be purchased".to_string())
        })?;

        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            INSERT INTO purchases (user_id, book_id, quantity, unit_price, total, status)
            VALUES ($1, $2, $3, $4, $5, 'PENDING')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(quantity)
        .bind(unit_price)
        .bind(unit_price * Decimal::from(quantity))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(purchase)
    }

    /// Mark a pending purchase paid
    pub async fn mark_paid(&self, id: i32) -> AppResult<Purchase> {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            UPDATE purchases
            SET status = 'PAID', paid_at = $2
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match purchase {
            Some(p) => Ok(p),
            None => Err(self.transition_conflict(id, "paid").await),
        }
    }

    /// Cancel a pending purchase and restore the consumed stock
    pub async fn cancel(&self, id: i32) -> AppResult<Purchase> {
        let mut tx = self.pool.begin().await?;

        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            UPDATE purchases
            SET status = 'CANCELLED'
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let purchase = match purchase {
            Some(p) => p,
            None => {
                drop(tx);
                return Err(self.transition_conflict(id, "cancelled").await);
            }
        };

        sqlx::query(
            r#"
            UPDATE books
            SET copies = copies + $2,
                available_copies = available_copies + $2,
                stock_status = 'IN_STOCK',
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(purchase.book_id)
        .bind(purchase.quantity)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(purchase)
    }

    /// List purchases for a user, newest first
    pub async fn list_for_user(
        &self,
        user_id: i32,
        query: &PurchaseQuery,
    ) -> AppResult<Vec<Purchase>> {
        let (limit, offset) = page_bounds(query.page, query.per_page);

        let purchases = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT * FROM purchases
            WHERE user_id = $1
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(query.status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases)
    }

    async fn transition_conflict(&self, id: i32, verb: &str) -> AppError {
        let status: Result<Option<String>, sqlx::Error> =
            sqlx::query_scalar("SELECT status FROM purchases WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await;

        match status {
            Ok(Some(status)) => {
                AppError::InvalidState(format!("purchase is {} and cannot be {}", status, verb))
            }
            Ok(None) => AppError::NotFound(format!("Purchase with id {} not found", id)),
            Err(e) => e.into(),
        }
    }
}
