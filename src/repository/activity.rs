//! Activity log repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::activity::{ActivityLog, ActivityQuery},
};

use super::books::page_bounds;

#[derive(Clone)]
pub struct ActivityRepository {
    pool: Pool<Postgres>,
}

impl ActivityRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Record one action
    pub async fn insert(
        &self,
        user_id: Option<i32>,
        action: &str,
        detail: Option<&str>,
    ) -> AppResult<ActivityLog> {
        let entry = sqlx::query_as::<_, ActivityLog>(
            r#"
            INSERT INTO activity_logs (user_id, action, detail)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(action)
        .bind(detail)
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    /// List recorded actions, newest first
    pub async fn list(&self, query: &ActivityQuery) -> AppResult<Vec<ActivityLog>> {
        let (limit, offset) = page_bounds(query.page, query.per_page);
        let action = query.action.as_ref().map(|a| format!("{}%", a));

        let entries = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT * FROM activity_logs
            WHERE ($1::text IS NULL OR action LIKE $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&action)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
