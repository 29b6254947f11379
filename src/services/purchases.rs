//! Purchases service

use crate::{
    error::AppResult,
    models::{
        purchase::{CreatePurchase, Purchase, PurchaseQuery},
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct PurchasesService {
    repository: Repository,
}

impl PurchasesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Create a pending purchase, consuming stock
    pub async fn create_purchase(
        &self,
        purchase: &CreatePurchase,
        user_id: i32,
    ) -> AppResult<Purchase> {
        self.repository.users.get_by_id(user_id).await?;

        let created = self
            .repository
            .purchases
            .create(user_id, purchase.book_id, purchase.quantity)
            .await?;

        self.record(
            user_id,
            "purchase.create",
            &format!("purchase {} for book {}", created.id, created.book_id),
        )
        .await;

        Ok(created)
    }

    /// Mark one of the caller's purchases paid.
    ///
    /// The stored status is validated in the model first, so a purchase
    /// that is already paid or cancelled reports its state instead of a
    /// bare update miss.
    pub async fn pay_purchase(&self, id: i32, caller: &UserClaims) -> AppResult<Purchase> {
        let purchase = self.repository.purchases.get_by_id(id).await?;
        caller.require_self_or_admin(purchase.user_id)?;
        purchase.status.mark_paid()?;

        let paid = self.repository.purchases.mark_paid(id).await?;
        self.record(caller.user_id, "purchase.pay", &format!("purchase {}", id)).await;
        Ok(paid)
    }

    /// Cancel one of the caller's pending purchases, restoring stock
    pub async fn cancel_purchase(&self, id: i32, caller: &UserClaims) -> AppResult<Purchase> {
        let purchase = self.repository.purchases.get_by_id(id).await?;
        caller.require_self_or_admin(purchase.user_id)?;
        purchase.status.cancel()?;

        let cancelled = self.repository.purchases.cancel(id).await?;
        self.record(caller.user_id, "purchase.cancel", &format!("purchase {}", id)).await;
        Ok(cancelled)
    }

    /// List the caller's purchases
    pub async fn list_for_user(
        &self,
        user_id: i32,
        query: &PurchaseQuery,
    ) -> AppResult<Vec<Purchase>> {
        self.repository.purchases.list_for_user(user_id, query).await
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
