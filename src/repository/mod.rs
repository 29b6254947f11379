//! Repository layer for database operations

pub mod activity;
pub mod books;
pub mod borrow_requests;
pub mod notifications;
pub mod purchases;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub borrow_requests: borrow_requests::BorrowRequestsRepository,
    pub users: users::UsersRepository,
    pub notifications: notifications::NotificationsRepository,
    pub activity: activity::ActivityRepository,
    pub purchases: purchases::PurchasesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            borrow_requests: borrow_requests::BorrowRequestsRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            notifications: notifications::NotificationsRepository::new(pool.clone()),
            activity: activity::ActivityRepository::new(pool.clone()),
            purchases: purchases::PurchasesRepository::new(pool.clone()),
            pool,
        }
    }
}
