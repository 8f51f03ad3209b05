/// Domain event bus
///
/// Mutations publish events here instead of calling the notifier inline;
/// a spawned dispatcher drains the channel. Sending never blocks and never
/// fails the publishing mutation: if the receiver is gone the event is
/// dropped with a log line.
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// State transitions that fan out to notifications
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A pending credit was validated or rejected
    CreditDecided {
        credit_id: String,
        student_user_id: String,
        activity: String,
        validated: bool,
    },
    /// Absence counters changed
    AbsencesUpdated {
        student_user_id: String,
        /// total - previous total; the routine warning fires only when positive
        delta: i64,
        total: i64,
        max_allowed: i64,
    },
    /// School remark counter changed
    RemarksUpdated {
        student_user_id: String,
        count: i64,
    },
    SanctionAdded {
        student_user_id: String,
        kind: String,
        reason: String,
    },
    SanctionRemoved {
        student_user_id: String,
        kind: String,
    },
    /// A new event was published; every student is notified
    EventCreated {
        event_id: String,
        title: String,
        starts_at: DateTime<Utc>,
    },
    /// startDate moved; active (registered/confirmed) participants are notified
    EventRescheduled {
        event_id: String,
        title: String,
        new_start: DateTime<Utc>,
        participant_user_ids: Vec<String>,
    },
    /// The event was deleted; active participants are notified
    EventCancelled {
        title: String,
        participant_user_ids: Vec<String>,
    },
}

/// Cheap clonable handle for publishing domain events
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<DomainEvent>,
}

impl EventBus {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DomainEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Publish an event. Failures are logged, never propagated: a dead
    /// dispatcher must not fail the mutation that already committed.
    pub fn emit(&self, event: DomainEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::error!("Domain event dropped, dispatcher gone: {}", e);
        }
    }
}
