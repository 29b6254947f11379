//! Activity log service

use crate::{
    error::AppResult,
    models::activity::{ActivityLog, ActivityQuery},
    repository::Repository,
};

#[derive(Clone)]
pub struct ActivityService {
    repository: Repository,
}

impl ActivityService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List recorded actions, newest first
    pub async fn list(&self, query: &ActivityQuery) -> AppResult<Vec<ActivityLog>> {
        self.repository.activity.list(query).await
    }
}
