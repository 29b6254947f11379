//! Catalog service for book management

use crate::{
    error::AppResult,
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// List books with search and pagination
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        self.repository.books.list(query).await
    }

    /// Create a new book
    pub async fn create_book(&self, book: &CreateBook, created_by: i32) -> AppResult<Book> {
        let created = self.repository.books.create(book).await?;
        self.record(created_by, "book.create", &format!("book {}", created.id)).await;
        Ok(created)
    }

    /// Update a book
    pub async fn update_book(&self, id: i32, update: &UpdateBook, updated_by: i32) -> AppResult<Book> {
        let updated = self.repository.books.update(id, update).await?;
        self.record(updated_by, "book.update", &format!("book {}", id)).await;
        Ok(updated)
    }

    /// Delete a book
    pub async fn delete_book(&self, id: i32, deleted_by: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        self.record(deleted_by, "book.delete", &format!("book {}", id)).await;
        Ok(())
    }

    async fn record(&self, user_id: i32, action: &str, detail: &str) {
        if let Err(e) = self
            .repository
            .activity
            .insert(Some(user_id), action, Some(detail))
            .await
        {
            tracing::warn!("Failed to record activity {}: {}", action, e);
        }
    }
}
