//! Borrow request model and lifecycle state machine.
//!
//! A request moves along `PENDING → APPROVED → RETURNED`, with
//! `PENDING → REJECTED` as the only other edge. Transitions are expressed
//! as methods on [`RequestStatus`] that return a validated [`Transition`];
//! repositories commit the corresponding conditional update so the status
//! write and the copy-count adjustment land atomically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};

use super::book::BookShort;
use super::user::UserShort;
use crate::error::AppError;

/// Lifecycle status of a borrow request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Returned,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Returned => "RETURNED",
        }
    }

    /// No further transition of any kind is permitted from these states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Returned)
    }

    /// Apply an admin decision to a request in this status.
    ///
    /// Only `PENDING` requests can be decided; a rejection must carry a
    /// non-empty reason. No state is touched here: the caller commits the
    /// returned [`Transition`] through the repository.
    pub fn decide(self, decision: Decision) -> Result<Transition, TransitionError> {
        if self != RequestStatus::Pending {
            return Err(TransitionError::NotPending(self));
        }
        match decision {
            Decision::Approve => Ok(Transition::Approve),
            Decision::Reject { reason } => {
                let reason = reason.trim().to_string();
                if reason.is_empty() {
                    return Err(TransitionError::MissingReason);
                }
                Ok(Transition::Reject { reason })
            }
        }
    }

    /// Validate the return of a loaned copy.
    ///
    /// Only `APPROVED` requests hold a reserved copy that can come back.
    pub fn mark_returned(self) -> Result<Transition, TransitionError> {
        match self {
            RequestStatus::Approved => Ok(Transition::Return),
            other => Err(TransitionError::NotApproved(other)),
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RequestStatus::Pending),
            "APPROVED" => Ok(RequestStatus::Approved),
            "REJECTED" => Ok(RequestStatus::Rejected),
            "RETURNED" => Ok(RequestStatus::Returned),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

// SQLx conversion for RequestStatus (stored as TEXT)
impl sqlx::Type<Postgres> for RequestStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for RequestStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for RequestStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as Encode<Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// Admin decision on a pending request
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Decision {
    /// Approve the request, reserving one copy
    Approve,
    /// Reject the request with a mandatory reason
    Reject { reason: String },
}

/// A validated status transition, ready to be committed.
///
/// Each variant fixes both the next status and the copy-count effect, so
/// an approval can never be committed without its reservation and vice
/// versa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// `PENDING → APPROVED`, reserves one copy
    Approve,
    /// `PENDING → REJECTED`, no copy effect
    Reject { reason: String },
    /// `APPROVED → RETURNED`, releases the reserved copy
    Return,
}

impl Transition {
    pub fn next_status(&self) -> RequestStatus {
        match self {
            Transition::Approve => RequestStatus::Approved,
            Transition::Reject { .. } => RequestStatus::Rejected,
            Transition::Return => RequestStatus::Returned,
        }
    }

    pub fn copy_effect(&self) -> CopyEffect {
        match self {
            Transition::Approve => CopyEffect::Reserve,
            Transition::Reject { .. } => CopyEffect::None,
            Transition::Return => CopyEffect::Release,
        }
    }
}

/// Effect of a transition on the book's available-copy count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyEffect {
    None,
    Reserve,
    Release,
}

/// A transition attempt that the state machine refuses
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("request is {0} and can no longer be decided")]
    NotPending(RequestStatus),

    #[error("request is {0} and cannot be returned")]
    NotApproved(RequestStatus),

    #[error("a rejection requires a non-empty reason")]
    MissingReason,
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::MissingReason => AppError::Validation(e.to_string()),
            TransitionError::NotPending(_) | TransitionError::NotApproved(_) => {
                AppError::InvalidState(e.to_string())
            }
        }
    }
}

/// Borrow request model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRequest {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub status: RequestStatus,
    pub rejection_reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
}

/// Borrow request with book and user details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowRequestDetails {
    pub id: i32,
    pub status: RequestStatus,
    pub rejection_reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub book: BookShort,
    pub user: Option<UserShort>,
}

/// Create borrow request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBorrowRequest {
    /// Book to borrow
    pub book_id: i32,
}

/// Borrow request list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct RequestQuery {
    /// Filter by lifecycle status
    pub status: Option<RequestStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reject(reason: &str) -> Decision {
        Decision::Reject {
            reason: reason.to_string(),
        }
    }

    #[test]
    fn pending_approval_reserves_a_copy() {
        let t = RequestStatus::Pending.decide(Decision::Approve).unwrap();
        assert_eq!(t.next_status(), RequestStatus::Approved);
        assert_eq!(t.copy_effect(), CopyEffect::Reserve);
    }

    #[test]
    fn pending_rejection_needs_a_reason() {
        assert_eq!(
            RequestStatus::Pending.decide(reject("")),
            Err(TransitionError::MissingReason)
        );
        assert_eq!(
            RequestStatus::Pending.decide(reject("   ")),
            Err(TransitionError::MissingReason)
        );

        let t = RequestStatus::Pending.decide(reject("damaged copy")).unwrap();
        assert_eq!(t.next_status(), RequestStatus::Rejected);
        assert_eq!(t.copy_effect(), CopyEffect::None);
        assert_eq!(
            t,
            Transition::Reject {
                reason: "damaged copy".to_string()
            }
        );
    }

    #[test]
    fn rejection_reason_is_trimmed() {
        let t = RequestStatus::Pending.decide(reject("  late fees unpaid  ")).unwrap();
        assert_eq!(
            t,
            Transition::Reject {
                reason: "late fees unpaid".to_string()
            }
        );
    }

    #[test]
    fn second_decision_is_refused() {
        for status in [
            RequestStatus::Approved,
            RequestStatus::Rejected,
            RequestStatus::Returned,
        ] {
            assert_eq!(
                status.decide(Decision::Approve),
                Err(TransitionError::NotPending(status))
            );
            assert_eq!(
                status.decide(reject("any reason")),
                Err(TransitionError::NotPending(status))
            );
        }
    }

    #[test]
    fn only_approved_requests_can_be_returned() {
        let t = RequestStatus::Approved.mark_returned().unwrap();
        assert_eq!(t.next_status(), RequestStatus::Returned);
        assert_eq!(t.copy_effect(), CopyEffect::Release);

        for status in [
            RequestStatus::Pending,
            RequestStatus::Rejected,
            RequestStatus::Returned,
        ] {
            assert_eq!(
                status.mark_returned(),
                Err(TransitionError::NotApproved(status))
            );
        }
    }

    #[test]
    fn approve_then_return_walks_the_happy_path() {
        let approve = RequestStatus::Pending.decide(Decision::Approve).unwrap();
        let loaned = approve.next_status();
        assert_eq!(loaned, RequestStatus::Approved);

        let back = loaned.mark_returned().unwrap();
        assert_eq!(back.next_status(), RequestStatus::Returned);
        assert!(back.next_status().is_terminal());
        assert_eq!(
            approve.copy_effect(),
            CopyEffect::Reserve,
            "approval reserves exactly the copy the return releases"
        );
        assert_eq!(back.copy_effect(), CopyEffect::Release);
    }

    #[test]
    fn terminal_states() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(!RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(RequestStatus::Returned.is_terminal());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Approved,
            RequestStatus::Rejected,
            RequestStatus::Returned,
        ] {
            assert_eq!(status.as_str().parse::<RequestStatus>(), Ok(status));
        }
        assert!("pending".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn transition_errors_map_to_typed_app_errors() {
        let err: AppError = TransitionError::MissingReason.into();
        assert!(matches!(err, AppError::Validation(_)));

        let err: AppError = TransitionError::NotPending(RequestStatus::Approved).into();
        assert!(matches!(err, AppError::InvalidState(_)));

        let err: AppError = TransitionError::NotApproved(RequestStatus::Pending).into();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn decision_body_deserializes() {
        let approve: Decision = serde_json::from_str(r#"{"decision":"approve"}"#).unwrap();
        assert!(matches!(approve, Decision::Approve));

        let reject: Decision =
            serde_json::from_str(r#"{"decision":"reject","reason":"lost copy"}"#).unwrap();
        assert!(matches!(reject, Decision::Reject { reason } if reason == "lost copy"));
    }
}
