//! Notification delivery: database records plus optional email.

use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
    models::{
        borrow_request::{BorrowRequest, RequestStatus},
        notification::{Notification, NotificationKind, NotificationQuery},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct NotifierService {
    repository: Repository,
    config: EmailConfig,
}

impl NotifierService {
    pub fn new(repository: Repository, config: EmailConfig) -> Self {
        Self { repository, config }
    }

    /// List notifications for a user
    pub async fn list_for_user(
        &self,
        user_id: i32,
        query: &NotificationQuery,
    ) -> AppResult<Vec<Notification>> {
        self.repository.notifications.list_for_user(user_id, query).await
    }

    /// Mark one of the user's notifications as read
    pub async fn mark_read(&self, id: i32, user_id: i32) -> AppResult<()> {
        self.repository.notifications.mark_read(id, user_id).await
    }

    /// Record and deliver the outcome of a lifecycle transition.
    ///
    /// Delivery failures are logged, never surfaced: the transition has
    /// already committed and must not appear to fail.
    pub async fn notify_request(&self, request: &BorrowRequest) {
        if let Err(e) = self.try_notify(request).await {
            tracing::warn!(
                request_id = request.id,
                "Failed to deliver notification: {}",
                e
            );
        }
    }

    async fn try_notify(&self, request: &BorrowRequest) -> AppResult<()> {
        let book = self.repository.books.get_by_id(request.book_id).await?;
        let user = self.repository.users.get_by_id(request.user_id).await?;

        let (kind, message) = match request.status {
            RequestStatus::Approved => (
                NotificationKind::BorrowApproved,
                format!("Your request to borrow \"{}\" was approved", book.title),
            ),
            RequestStatus::Rejected => (
                NotificationKind::BorrowRejected,
                format!(
                    "Your request to borrow \"{}\" was rejected: {}",
                    book.title,
                    request.rejection_reason.as_deref().unwrap_or("no reason given")
                ),
            ),
            RequestStatus::Returned => (
                NotificationKind::BorrowReturned,
                format!("Your loan of \"{}\" was recorded as returned", book.title),
            ),
            RequestStatus::Pending => return Ok(()),
        };

        self.repository
            .notifications
            .insert(user.id, kind.as_str(), &message)
            .await?;

        if self.config.enabled {
            if let Some(email) = &user.email {
                self.send_email(email, "BookHive notification", &message).await?;
            }
        }

        Ok(())
    }

    /// Generic email sending function
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("BookHive");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><pre>{}</pre></body></html>"#,
                                body.replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        let mailer = mailer_builder.build();

        mailer
            .send(&email)
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}
