//! Book (catalog entry) model and related types.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// ISBN-10 or ISBN-13, hyphens and spaces allowed
static ISBN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d[ \-]?){9}[\dXx]$|^(?:\d[ \-]?){13}$").unwrap()
});

/// Stock availability derived from the available-copy count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    InStock,
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "IN_STOCK",
            StockStatus::OutOfStock => "OUT_OF_STOCK",
        }
    }

    /// Status implied by an available-copy count
    pub fn from_available(available_copies: i32) -> Self {
        if available_copies > 0 {
            StockStatus::InStock
        } else {
            StockStatus::OutOfStock
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StockStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_STOCK" => Ok(StockStatus::InStock),
            "OUT_OF_STOCK" => Ok(StockStatus::OutOfStock),
            _ => Err(format!("Invalid stock status: {}", s)),
        }
    }
}

// SQLx conversion for StockStatus (stored as TEXT)
impl sqlx::Type<Postgres> for StockStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for StockStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for StockStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as Encode<Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// Full book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category: Option<String>,
    pub shelf: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    /// Total copies owned by the library
    pub copies: i32,
    /// Copies not currently out on loan
    pub available_copies: i32,
    pub stock_status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Short book representation for embedding in other responses
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookShort {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(regex(path = *ISBN_RE, message = "Invalid ISBN format"))]
    pub isbn: String,
    pub category: Option<String>,
    pub shelf: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    pub description: Option<String>,
    #[validate(url(message = "Cover image must be a valid URL"))]
    pub cover_image: Option<String>,
    #[validate(range(min = 0, message = "Copies cannot be negative"))]
    pub copies: i32,
}

/// Update book request (partial)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author cannot be empty"))]
    pub author: Option<String>,
    #[validate(regex(path = *ISBN_RE, message = "Invalid ISBN format"))]
    pub isbn: Option<String>,
    pub category: Option<String>,
    pub shelf: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    pub description: Option<String>,
    #[validate(url(message = "Cover image must be a valid URL"))]
    pub cover_image: Option<String>,
    #[validate(range(min = 0, message = "Copies cannot be negative"))]
    pub copies: Option<i32>,
}

/// Book query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Search in title and author
    pub q: Option<String>,
    pub category: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_create() -> CreateBook {
        CreateBook {
            title: "The Rust Programming Language".to_string(),
            author: "Steve Klabnik".to_string(),
            isbn: "978-1-59327-828-1".to_string(),
            category: Some("Programming".to_string()),
            shelf: None,
            price: None,
            description: None,
            cover_image: None,
            copies: 3,
        }
    }

    #[test]
    fn stock_status_follows_available_count() {
        assert_eq!(StockStatus::from_available(1), StockStatus::InStock);
        assert_eq!(StockStatus::from_available(0), StockStatus::OutOfStock);
    }

    #[test]
    fn stock_status_round_trips_through_text() {
        for status in [StockStatus::InStock, StockStatus::OutOfStock] {
            assert_eq!(status.as_str().parse::<StockStatus>(), Ok(status));
        }
        assert!("in_stock".parse::<StockStatus>().is_err());
    }

    #[test]
    fn create_book_accepts_valid_payload() {
        assert!(valid_create().validate().is_ok());
    }

    #[test]
    fn create_book_rejects_bad_isbn() {
        let mut book = valid_create();
        book.isbn = "not-an-isbn".to_string();
        assert!(book.validate().is_err());
    }

    #[test]
    fn create_book_accepts_isbn10_with_check_x() {
        let mut book = valid_create();
        book.isbn = "0-306-40615-X".to_string();
        assert!(book.validate().is_ok());
    }

    #[test]
    fn create_book_rejects_empty_title_and_negative_copies() {
        let mut book = valid_create();
        book.title = String::new();
        assert!(book.validate().is_err());

        let mut book = valid_create();
        book.copies = -1;
        assert!(book.validate().is_err());
    }

    #[test]
    fn update_book_allows_sparse_payload() {
        let update = UpdateBook {
            title: None,
            author: None,
            isbn: None,
            category: None,
            shelf: None,
            price: None,
            description: None,
            cover_image: None,
            copies: Some(5),
        };
        assert!(update.validate().is_ok());
    }
}
