//! Borrow request lifecycle service.
//!
//! Transitions are validated on [`RequestStatus`] first, then committed
//! through the repository's conditional updates. A race between two
//! admins is therefore caught twice: once against the loaded status and
//! once at commit time against the stored one.

use crate::{
    error::AppResult,
    models::{
        borrow_request::{BorrowRequest, BorrowRequestDetails, Decision, RequestQuery, Transition},
        user::UserClaims,
    },
    repository::Repository,
};

use super::notifier::NotifierService;

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
    notifier: NotifierService,
}

impl BorrowsService {
    pub fn new(repository: Repository, notifier: NotifierService) -> Self {
        Self { repository, notifier }
    }

    /// Create a pending borrow request for a user.
    ///
    /// Availability is not checked here: a request may be filed for a
    /// book with no free copies and sit pending until one comes back.
    pub async fn create_request(&self, book_id: i32, user_id: i32) -> AppResult<BorrowRequest> {
        self.repository.books.get_by_id(book_id).await?;
        self.repository.users.get_by_id(user_id).await?;

        let request = self.repository.borrow_requests.create(book_id, user_id).await?;

        self.record(
            Some(user_id),
            "borrow.request",
            &format!("request {} for book {}", request.id, book_id),
        )
        .await;

        Ok(request)
    }

    /// Get request with book and user details
    pub async fn get_details(&self, id: i32) -> AppResult<BorrowRequestDetails> {
        self.repository.borrow_requests.get_details(id).await
    }

    /// List all requests (admin view)
    pub async fn list(&self, query: &RequestQuery) -> AppResult<(Vec<BorrowRequestDetails>, i64)> {
        self.repository.borrow_requests.list(query).await
    }

    /// List the caller's own requests
    pub async fn list_for_user(
        &self,
        user_id: i32,
        query: &RequestQuery,
    ) -> AppResult<Vec<BorrowRequestDetails>> {
        self.repository.borrow_requests.list_for_user(user_id, query).await
    }

    /// Apply an admin decision to a pending request.
    pub async fn decide(
        &self,
        request_id: i32,
        decision: Decision,
        decided_by: i32,
    ) -> AppResult<BorrowRequest> {
        let request = self.repository.borrow_requests.get_by_id(request_id).await?;
        let transition = request.status.decide(decision)?;

        let action = match &transition {
            Transition::Approve => "borrow.approve",
            _ => "borrow.reject",
        };

        let updated = self.commit(request_id, transition).await?;

        self.record(
            Some(decided_by),
            action,
            &format!("request {} for book {}", updated.id, updated.book_id),
        )
        .await;
        self.spawn_notify(&updated);

        Ok(updated)
    }

    /// Record the return of a loaned copy.
    ///
    /// Allowed for the borrower themselves and for admins.
    pub async fn return_book(
        &self,
        request_id: i32,
        caller: &UserClaims,
    ) -> AppResult<BorrowRequest> {
        let request = self.repository.borrow_requests.get_by_id(request_id).await?;
        caller.require_self_or_admin(request.user_id)?;

        let transition = request.status.mark_returned()?;
        let updated = self.commit(request_id, transition).await?;

        self.record(
            Some(caller.user_id),
            "borrow.return",
            &format!("request {} for book {}", updated.id, updated.book_id),
        )
        .await;
        self.spawn_notify(&updated);

        Ok(updated)
    }

    /// Commit a validated transition through the matching conditional update.
    async fn commit(&self, request_id: i32, transition: Transition) -> AppResult<BorrowRequest> {
        match transition {
            Transition::Approve => self.repository.borrow_requests.approve(request_id).await,
            Transition::Reject { reason } => {
                self.repository.borrow_requests.reject(request_id, &reason).await
            }
            Transition::Return => self.repository.borrow_requests.mark_returned(request_id).await,
        }
    }

    fn spawn_notify(&self, request: &BorrowRequest) {
        let notifier = self.notifier.clone();
        let request = request.clone();
        tokio::spawn(async move {
            notifier.notify_request(&request).await;
        });
    }

    async fn record(&self, user_id: Option<i32>, action: &str, detail: &str) {
        if let Err(e) = self
            .repository
            .activity
            .insert(user_id, action, Some(detail))
            .await
        {
            tracing::warn!("Failed to record activity {}: {}", action, e);
        }
    }
}
