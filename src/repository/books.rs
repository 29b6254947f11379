//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
};

const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: i64 = 100;

pub(crate) fn page_bounds(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    let page = page.unwrap_or(1).max(1);
    (per_page, (page - 1) * per_page)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// List books with search and pagination, returning the total count
    pub async fn list(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let (limit, offset) = page_bounds(query.page, query.per_page);
        let search = query.q.as_ref().map(|q| format!("%{}%", q));

        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE ($1::text IS NULL OR title ILIKE $1 OR author ILIKE $1)
              AND ($2::text IS NULL OR category = $2)
            ORDER BY title, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&search)
        .bind(&query.category)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM books
            WHERE ($1::text IS NULL OR title ILIKE $1 OR author ILIKE $1)
              AND ($2::text IS NULL OR category = $2)
            "#,
        )
        .bind(&search)
        .bind(&query.category)
        .fetch_one(&self.pool)
        .await?;

        Ok((books, total))
    }

    /// Create a new book. All copies start available.
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, category, shelf, price, description,
                               cover_image, copies, available_copies, stock_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9,
                    CASE WHEN $9 > 0 THEN 'IN_STOCK' ELSE 'OUT_OF_STOCK' END)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.category)
        .bind(&book.shelf)
        .bind(book.price)
        .bind(&book.description)
        .bind(&book.cover_image)
        .bind(book.copies)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("A book with ISBN {} already exists", book.isbn))
            } else {
                e.into()
            }
        })
    }

    /// Update a book.
    ///
    /// When `copies` changes, the available count shifts by the same delta
    /// and is clamped into `[0, copies]` so outstanding loans never push it
    /// negative. The stock status is recomputed in the same statement.
    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                isbn = COALESCE($4, isbn),
                category = COALESCE($5, category),
                shelf = COALESCE($6, shelf),
                price = COALESCE($7, price),
                description = COALESCE($8, description),
                cover_image = COALESCE($9, cover_image),
                available_copies = GREATEST(0, LEAST(
                    available_copies + (COALESCE($10, copies) - copies),
                    COALESCE($10, copies))),
                copies = COALESCE($10, copies),
                stock_status = CASE
                    WHEN GREATEST(0, LEAST(
                        available_copies + (COALESCE($10, copies) - copies),
                        COALESCE($10, copies))) > 0
                    THEN 'IN_STOCK' ELSE 'OUT_OF_STOCK' END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.author)
        .bind(&update.isbn)
        .bind(&update.category)
        .bind(&update.shelf)
        .bind(update.price)
        .bind(&update.description)
        .bind(&update.cover_image)
        .bind(update.copies)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("A book with this ISBN already exists".to_string())
            } else {
                AppError::from(e)
            }
        })?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Delete a book. Refused while any borrow request or purchase references it.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let referenced: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM borrow_requests WHERE book_id = $1)
                OR EXISTS(SELECT 1 FROM purchases WHERE book_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if referenced {
            return Err(AppError::Conflict(
                "Book has borrow or purchase history and cannot be deleted".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
                    AppError::Conflict(
                        "Book has borrow or purchase history and cannot be deleted".to_string(),
                    )
                }
                _ => AppError::from(e),
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_defaults_and_clamps() {
        assert_eq!(page_bounds(None, None), (20, 0));
        assert_eq!(page_bounds(Some(3), Some(10)), (10, 20));
        assert_eq!(page_bounds(Some(0), Some(500)), (100, 0));
        assert_eq!(page_bounds(Some(-1), Some(0)), (1, 0));
    }
}
