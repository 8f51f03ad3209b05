/// Notification dispatcher
///
/// Consumes domain events and fans them out: notification rows first, then
/// a best-effort email per recipient. An email failure is logged and counted
/// but never rolls back the rows or the mutation that emitted the event.
use crate::{
    error::ApiResult,
    mailer::Mailer,
    notifications::{
        DomainEvent, NotificationCategory, NotificationKind, NotificationManager,
        NotificationPayload,
    },
};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Clone)]
pub struct NotificationDispatcher {
    db: SqlitePool,
    notifications: NotificationManager,
    mailer: Arc<Mailer>,
}

impl NotificationDispatcher {
    pub fn new(db: SqlitePool, notifications: NotificationManager, mailer: Arc<Mailer>) -> Self {
        Self {
            db,
            notifications,
            mailer,
        }
    }

    /// Drain the bus until every sender is dropped
    pub async fn run(self, mut rx: UnboundedReceiver<DomainEvent>) {
        tracing::info!("Notification dispatcher started");
        while let Some(event) = rx.recv().await {
            if let Err(e) = self.handle_event(event).await {
                tracing::error!("Failed to dispatch notification: {}", e);
            }
        }
        tracing::info!("Notification dispatcher stopped");
    }

    /// Process one event. Public so tests and callers needing deterministic
    /// delivery can bypass the channel.
    pub async fn handle_event(&self, event: DomainEvent) -> ApiResult<()> {
        match event {
            DomainEvent::CreditDecided {
                credit_id,
                student_user_id,
                activity,
                validated,
            } => {
                let (title, kind) = if validated {
                    ("Credit validated", NotificationKind::Success)
                } else {
                    ("Credit rejected", NotificationKind::Warning)
                };
                let payload = NotificationPayload {
                    title: title.to_string(),
                    message: format!("Your credit \"{}\" was {}", activity, status_word(validated)),
                    kind,
                    category: NotificationCategory::Credit,
                    related_model: Some("Credit".to_string()),
                    related_id: Some(credit_id),
                    send_email: false,
                };
                self.deliver(&[student_user_id], &payload).await
            }

            DomainEvent::AbsencesUpdated {
                student_user_id,
                delta,
                total,
                max_allowed,
            } => {
                // Routine warning only when absences actually increased
                if delta > 0 {
                    let payload = NotificationPayload {
                        title: "New absences recorded".to_string(),
                        message: format!(
                            "{} new absence(s) were recorded. Current total: {}",
                            delta, total
                        ),
                        kind: NotificationKind::Warning,
                        category: NotificationCategory::Absence,
                        related_model: Some("Sanction".to_string()),
                        related_id: None,
                        send_email: false,
                    };
                    self.deliver(std::slice::from_ref(&student_user_id), &payload)
                        .await?;
                }

                // Critical escalation once the total crosses 80% of the limit
                if total as f64 > 0.8 * max_allowed as f64 {
                    let payload = NotificationPayload {
                        title: "Critical absence level".to_string(),
                        message: format!(
                            "Total absences ({}) exceed 80% of the allowed maximum ({})",
                            total, max_allowed
                        ),
                        kind: NotificationKind::Error,
                        category: NotificationCategory::Absence,
                        related_model: Some("Sanction".to_string()),
                        related_id: None,
                        send_email: true,
                    };
                    self.deliver(&[student_user_id], &payload).await?;
                }
                Ok(())
            }

            DomainEvent::RemarksUpdated {
                student_user_id,
                count,
            } => {
                let payload = NotificationPayload {
                    title: "School remarks updated".to_string(),
                    message: format!("Your school remark count is now {}", count),
                    kind: NotificationKind::Info,
                    category: NotificationCategory::Sanction,
                    related_model: Some("Sanction".to_string()),
                    related_id: None,
                    send_email: false,
                };
                self.deliver(&[student_user_id], &payload).await
            }

            DomainEvent::SanctionAdded {
                student_user_id,
                kind,
                reason,
            } => {
                let payload = NotificationPayload {
                    title: "Sanction issued".to_string(),
                    message: format!("A {} sanction was issued: {}", kind, reason),
                    kind: NotificationKind::Error,
                    category: NotificationCategory::Sanction,
                    related_model: Some("Sanction".to_string()),
                    related_id: None,
                    send_email: true,
                };
                self.deliver(&[student_user_id], &payload).await
            }

            DomainEvent::SanctionRemoved {
                student_user_id,
                kind,
            } => {
                let payload = NotificationPayload {
                    title: "Sanction removed".to_string(),
                    message: format!("Your {} sanction was removed", kind),
                    kind: NotificationKind::Success,
                    category: NotificationCategory::Sanction,
                    related_model: Some("Sanction".to_string()),
                    related_id: None,
                    send_email: false,
                };
                self.deliver(&[student_user_id], &payload).await
            }

            DomainEvent::EventCreated {
                event_id,
                title,
                starts_at,
            } => {
                let recipients = self.all_student_user_ids().await?;
                let payload = NotificationPayload {
                    title: "New school event".to_string(),
                    message: format!(
                        "\"{}\" starts on {}",
                        title,
                        starts_at.format("%Y-%m-%d %H:%M")
                    ),
                    kind: NotificationKind::Info,
                    category: NotificationCategory::Event,
                    related_model: Some("Event".to_string()),
                    related_id: Some(event_id),
                    send_email: true,
                };
                self.deliver(&recipients, &payload).await
            }

            DomainEvent::EventRescheduled {
                event_id,
                title,
                new_start,
                participant_user_ids,
            } => {
                let payload = NotificationPayload {
                    title: "Event rescheduled".to_string(),
                    message: format!(
                        "\"{}\" now starts on {}",
                        title,
                        new_start.format("%Y-%m-%d %H:%M")
                    ),
                    kind: NotificationKind::Warning,
                    category: NotificationCategory::Event,
                    related_model: Some("Event".to_string()),
                    related_id: Some(event_id),
                    send_email: true,
                };
                self.deliver(&participant_user_ids, &payload).await
            }

            DomainEvent::EventCancelled {
                title,
                participant_user_ids,
            } => {
                let payload = NotificationPayload {
                    title: "Event cancelled".to_string(),
                    message: format!("\"{}\" was cancelled", title),
                    kind: NotificationKind::Error,
                    category: NotificationCategory::Event,
                    related_model: Some("Event".to_string()),
                    related_id: None,
                    send_email: true,
                };
                self.deliver(&participant_user_ids, &payload).await
            }
        }
    }

    /// Insert rows, then attempt emails. The email leg never propagates.
    async fn deliver(&self, recipients: &[String], payload: &NotificationPayload) -> ApiResult<()> {
        let created = self.notifications.create_bulk(recipients, payload).await?;

        if payload.send_email && self.mailer.is_configured() {
            for notification in &created {
                match self.recipient_email(&notification.recipient_id).await {
                    Ok(email) => {
                        match self
                            .mailer
                            .send_notification_email(&email, &payload.title, &payload.message)
                            .await
                        {
                            Ok(()) => {
                                crate::metrics::EMAILS_SENT.inc();
                                if let Err(e) =
                                    self.notifications.mark_email_sent(&notification.id).await
                                {
                                    tracing::warn!("Failed to flag email sent: {}", e);
                                }
                            }
                            Err(e) => {
                                crate::metrics::EMAILS_FAILED.inc();
                                tracing::warn!(
                                    "Notification email to {} failed: {}",
                                    notification.recipient_id,
                                    e
                                );
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            "No email address for recipient {}: {}",
                            notification.recipient_id,
                            e
                        );
                    }
                }
            }
        }

        Ok(())
    }

    async fn recipient_email(&self, user_id: &str) -> ApiResult<String> {
        let row = sqlx::query("SELECT email FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| {
                crate::error::ApiError::NotFound(format!("User {} not found", user_id))
            })?;
        Ok(row.get("email"))
    }

    async fn all_student_user_ids(&self) -> ApiResult<Vec<String>> {
        let rows = sqlx::query("SELECT id FROM users WHERE role = 'student'")
            .fetch_all(&self.db)
            .await?;
        Ok(rows.iter().map(|r| r.get("id")).collect())
    }
}

fn status_word(validated: bool) -> &'static str {
    if validated {
        "validated"
    } else {
        "rejected"
    }
}
