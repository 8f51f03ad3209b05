/// Event manager: event CRUD, the participation state machine and the
/// notification fan-outs around both
use crate::{
    db::parse_timestamp,
    error::{ApiError, ApiResult},
    events::{
        CreateEventRequest, Event, EventParticipation, ParticipationStatus, UpdateEventRequest,
    },
    notifications::{DomainEvent, EventBus},
};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Clone)]
pub struct EventManager {
    db: SqlitePool,
    bus: EventBus,
}

impl EventManager {
    pub fn new(db: SqlitePool, bus: EventBus) -> Self {
        Self { db, bus }
    }

    /// Create an event and announce it to every student
    pub async fn create_event(
        &self,
        creator_user_id: &str,
        req: &CreateEventRequest,
    ) -> ApiResult<Event> {
        let title = req.title.trim().to_string();
        if title.is_empty() {
            return Err(ApiError::Validation("Title cannot be empty".to_string()));
        }

        if let Some(end) = req.end_date {
            if end < req.start_date {
                return Err(ApiError::Validation(
                    "Event end date cannot precede its start date".to_string(),
                ));
            }
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO events
                 (id, title, description, starts_at, ends_at, location, organizer,
                  feedback_url, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&id)
        .bind(&title)
        .bind(&req.description)
        .bind(req.start_date.to_rfc3339())
        .bind(req.end_date.map(|d| d.to_rfc3339()))
        .bind(&req.location)
        .bind(&req.organizer)
        .bind(&req.feedback_url)
        .bind(creator_user_id)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        self.bus.emit(DomainEvent::EventCreated {
            event_id: id.clone(),
            title: title.clone(),
            starts_at: req.start_date,
        });

        self.get_event(&id).await
    }

    /// Get one event
    pub async fn get_event(&self, id: &str) -> ApiResult<Event> {
        let row = sqlx::query("SELECT * FROM events WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Event {} not found", id)))?;
        map_event(&row)
    }

    /// List events, soonest first
    pub async fn list_events(&self) -> ApiResult<Vec<Event>> {
        let rows = sqlx::query("SELECT * FROM events ORDER BY starts_at")
            .fetch_all(&self.db)
            .await?;
        rows.iter().map(map_event).collect()
    }

    /// Update an event. A changed start date notifies active participants.
    pub async fn update_event(&self, id: &str, req: &UpdateEventRequest) -> ApiResult<Event> {
        let current = self.get_event(id).await?;

        let title = req
            .title
            .as_deref()
            .map(str::trim)
            .unwrap_or(&current.title)
            .to_string();
        let description = req
            .description
            .clone()
            .or_else(|| current.description.clone());
        let start_date = req.start_date.unwrap_or(current.start_date);
        let end_date = req.end_date.or(current.end_date);
        let location = req.location.clone().or_else(|| current.location.clone());
        let organizer = req.organizer.clone().or_else(|| current.organizer.clone());
        let feedback_url = req
            .feedback_url
            .clone()
            .or_else(|| current.feedback_url.clone());

        if let Some(end) = end_date {
            if end < start_date {
                return Err(ApiError::Validation(
                    "Event end date cannot precede its start date".to_string(),
                ));
            }
        }

        let now = Utc::now();
        sqlx::query(
            "UPDATE events
             SET title = ?1, description = ?2, starts_at = ?3, ends_at = ?4, location = ?5,
                 organizer = ?6, feedback_url = ?7, updated_at = ?8
             WHERE id = ?9",
        )
        .bind(&title)
        .bind(&description)
        .bind(start_date.to_rfc3339())
        .bind(end_date.map(|d| d.to_rfc3339()))
        .bind(&location)
        .bind(&organizer)
        .bind(&feedback_url)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.db)
        .await?;

        if start_date != current.start_date {
            let participants = self.active_participant_user_ids(id).await?;
            if !participants.is_empty() {
                self.bus.emit(DomainEvent::EventRescheduled {
                    event_id: id.to_string(),
                    title: title.clone(),
                    new_start: start_date,
                    participant_user_ids: participants,
                });
            }
        }

        self.get_event(id).await
    }

    /// Delete an event. Active participants are notified, then every
    /// participation row goes with it.
    pub async fn delete_event(&self, id: &str) -> ApiResult<()> {
        let event = self.get_event(id).await?;
        let participants = self.active_participant_user_ids(id).await?;

        sqlx::query("DELETE FROM event_participations WHERE event_id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;
        sqlx::query("DELETE FROM events WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if !participants.is_empty() {
            self.bus.emit(DomainEvent::EventCancelled {
                title: event.title.clone(),
                participant_user_ids: participants,
            });
        }

        Ok(())
    }

    // ----- Participation -----

    /// Register a student for an event. Only before the event starts, and
    /// only once per (event, student) pair; a cancelled row still counts.
    pub async fn participate(&self, event_id: &str, student_id: &str) -> ApiResult<EventParticipation> {
        let event = self.get_event(event_id).await?;

        if Utc::now() >= event.start_date {
            return Err(ApiError::Conflict(
                "Registration closed: the event has already started".to_string(),
            ));
        }

        let existing = sqlx::query(
            "SELECT COUNT(*) as count FROM event_participations
             WHERE event_id = ?1 AND student_id = ?2",
        )
        .bind(event_id)
        .bind(student_id)
        .fetch_one(&self.db)
        .await?;
        let count: i64 = existing.get("count");
        if count > 0 {
            return Err(ApiError::Conflict(
                "Already registered for this event".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO event_participations (id, event_id, student_id, status, registered_at)
             VALUES (?1, ?2, ?3, 'registered', ?4)",
        )
        .bind(&id)
        .bind(event_id)
        .bind(student_id)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        crate::metrics::EVENT_REGISTRATIONS.inc();

        self.get_participation(&id).await
    }

    /// Cancel a registration. Same time window as registering.
    pub async fn cancel_participation(&self, event_id: &str, student_id: &str) -> ApiResult<()> {
        let event = self.get_event(event_id).await?;

        if Utc::now() >= event.start_date {
            return Err(ApiError::Conflict(
                "Cancellation closed: the event has already started".to_string(),
            ));
        }

        let participation = self.get_by_pair(event_id, student_id).await?;
        self.transition(&participation, ParticipationStatus::Cancelled)
            .await?;
        Ok(())
    }

    /// Confirm a registration (the student's own move)
    pub async fn confirm_participation(&self, participation_id: &str) -> ApiResult<EventParticipation> {
        let participation = self.get_participation(participation_id).await?;
        self.transition(&participation, ParticipationStatus::Confirmed)
            .await?;
        self.get_participation(participation_id).await
    }

    /// Mark attendance (staff only, enforced upstream)
    pub async fn mark_attended(&self, participation_id: &str) -> ApiResult<EventParticipation> {
        let participation = self.get_participation(participation_id).await?;
        self.transition(&participation, ParticipationStatus::Attended)
            .await?;
        self.get_participation(participation_id).await
    }

    /// Record participant feedback after the event
    pub async fn submit_feedback(
        &self,
        participation_id: &str,
        feedback: &str,
    ) -> ApiResult<EventParticipation> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(ApiError::Validation("Feedback cannot be empty".to_string()));
        }

        let participation = self.get_participation(participation_id).await?;
        if participation.status == ParticipationStatus::Cancelled {
            return Err(ApiError::Conflict(
                "A cancelled participation cannot leave feedback".to_string(),
            ));
        }

        let now = Utc::now();
        sqlx::query(
            "UPDATE event_participations SET feedback = ?1, feedback_date = ?2 WHERE id = ?3",
        )
        .bind(feedback)
        .bind(now.to_rfc3339())
        .bind(participation_id)
        .execute(&self.db)
        .await?;

        self.get_participation(participation_id).await
    }

    /// Get one participation row
    pub async fn get_participation(&self, id: &str) -> ApiResult<EventParticipation> {
        let row = sqlx::query("SELECT * FROM event_participations WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Participation {} not found", id)))?;
        map_participation(&row)
    }

    /// The (event, student) row, if any
    pub async fn get_by_pair(
        &self,
        event_id: &str,
        student_id: &str,
    ) -> ApiResult<EventParticipation> {
        let row = sqlx::query(
            "SELECT * FROM event_participations WHERE event_id = ?1 AND student_id = ?2",
        )
        .bind(event_id)
        .bind(student_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("No participation for this event and student".to_string())
        })?;
        map_participation(&row)
    }

    /// All participations for an event
    pub async fn list_participations(&self, event_id: &str) -> ApiResult<Vec<EventParticipation>> {
        let rows = sqlx::query(
            "SELECT * FROM event_participations WHERE event_id = ?1 ORDER BY registered_at",
        )
        .bind(event_id)
        .fetch_all(&self.db)
        .await?;
        rows.iter().map(map_participation).collect()
    }

    /// User ids of registered/confirmed participants (not cancelled or
    /// attended), resolved through the student profile
    async fn active_participant_user_ids(&self, event_id: &str) -> ApiResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT sp.user_id as user_id
             FROM event_participations ep
             JOIN student_profiles sp ON sp.id = ep.student_id
             WHERE ep.event_id = ?1 AND ep.status IN ('registered', 'confirmed')",
        )
        .bind(event_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.iter().map(|r| r.get("user_id")).collect())
    }

    /// Apply a forward-only status transition
    async fn transition(
        &self,
        participation: &EventParticipation,
        next: ParticipationStatus,
    ) -> ApiResult<()> {
        if !participation.status.can_transition_to(next) {
            return Err(ApiError::Conflict(format!(
                "Cannot move participation from {} to {}",
                participation.status.as_str(),
                next.as_str()
            )));
        }

        let now = Utc::now().to_rfc3339();
        match next {
            ParticipationStatus::Confirmed => {
                sqlx::query(
                    "UPDATE event_participations SET status = ?1, confirmed_at = ?2 WHERE id = ?3",
                )
                .bind(next.as_str())
                .bind(&now)
                .bind(&participation.id)
                .execute(&self.db)
                .await?;
            }
            ParticipationStatus::Attended => {
                sqlx::query(
                    "UPDATE event_participations SET status = ?1, attended_at = ?2 WHERE id = ?3",
                )
                .bind(next.as_str())
                .bind(&now)
                .bind(&participation.id)
                .execute(&self.db)
                .await?;
            }
            // Cancelled carries no timestamp column
            _ => {
                sqlx::query("UPDATE event_participations SET status = ?1 WHERE id = ?2")
                    .bind(next.as_str())
                    .bind(&participation.id)
                    .execute(&self.db)
                    .await?;
            }
        }

        Ok(())
    }
}

fn map_event(row: &sqlx::sqlite::SqliteRow) -> ApiResult<Event> {
    let end_date = row
        .get::<Option<String>, _>("ends_at")
        .map(|s| parse_timestamp(&s))
        .transpose()?;

    Ok(Event {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        start_date: parse_timestamp(&row.get::<String, _>("starts_at"))?,
        end_date,
        location: row.get("location"),
        organizer: row.get("organizer"),
        feedback_url: row.get("feedback_url"),
        created_by: row.get("created_by"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

fn map_participation(row: &sqlx::sqlite::SqliteRow) -> ApiResult<EventParticipation> {
    let status_str: String = row.get("status");
    let optional = |name: &str| -> ApiResult<Option<DateTime<Utc>>> {
        row.get::<Option<String>, _>(name)
            .map(|s| parse_timestamp(&s))
            .transpose()
    };

    Ok(EventParticipation {
        id: row.get("id"),
        event_id: row.get("event_id"),
        student_id: row.get("student_id"),
        status: ParticipationStatus::from_str(&status_str)?,
        registered_at: parse_timestamp(&row.get::<String, _>("registered_at"))?,
        confirmed_at: optional("confirmed_at")?,
        attended_at: optional("attended_at")?,
        feedback: row.get("feedback"),
        feedback_date: optional("feedback_date")?,
    })
}
