//! Business logic services

pub mod activity;
pub mod borrows;
pub mod catalog;
pub mod notifier;
pub mod purchases;
pub mod users;

use crate::{config::EmailConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub borrows: borrows::BorrowsService,
    pub users: users::UsersService,
    pub notifier: notifier::NotifierService,
    pub purchases: purchases::PurchasesService,
    pub activity: activity::ActivityService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, email_config: EmailConfig) -> Self {
        let notifier = notifier::NotifierService::new(repository.clone(), email_config);
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            borrows: borrows::BorrowsService::new(repository.clone(), notifier.clone()),
            users: users::UsersService::new(repository.clone()),
            purchases: purchases::PurchasesService::new(repository.clone()),
            activity: activity::ActivityService::new(repository),
            notifier,
        }
    }
}
