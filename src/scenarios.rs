//! End-to-end scenarios wiring managers, bus and dispatcher together
use crate::{
    account::Role,
    credits::{CreateCreditRequest, CreditManager, CreditStatus, Pillar},
    error::ApiError,
    events::{CreateEventRequest, EventManager},
    mailer::Mailer,
    notifications::{EventBus, NotificationDispatcher, NotificationManager},
    test_support::{seed_staff, seed_student},
};
use chrono::{Duration, Utc};
use sqlx::Row;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

struct World {
    db: sqlx::SqlitePool,
    credits: CreditManager,
    events: EventManager,
    notifications: NotificationManager,
    dispatcher: NotificationDispatcher,
    rx: UnboundedReceiver<crate::notifications::DomainEvent>,
}

impl World {
    async fn new() -> Self {
        let db = crate::db::test_pool().await;
        let (bus, rx) = EventBus::channel();
        let notifications = NotificationManager::new(db.clone());
        let mailer = Arc::new(Mailer::new(None).unwrap());
        let dispatcher =
            NotificationDispatcher::new(db.clone(), notifications.clone(), mailer);
        Self {
            credits: CreditManager::new(db.clone(), bus.clone()),
            events: EventManager::new(db.clone(), bus),
            notifications,
            dispatcher,
            rx,
            db,
        }
    }

    /// Deliver every queued domain event, like the spawned dispatcher would
    async fn drain(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.dispatcher.handle_event(event).await.unwrap();
        }
    }
}

#[tokio::test]
async fn credit_validation_lifecycle() {
    let mut world = World::new().await;
    let student_profile = seed_student(&world.db, "student-a").await;
    seed_staff(&world.db, "teacher-t", "teacher").await;
    seed_staff(&world.db, "admin-x", "admin").await;

    // Student A submits a credit; it starts pending
    let credit = world
        .credits
        .create_credit(
            &student_profile,
            &CreateCreditRequest {
                pillar: Pillar::Thinking,
                activity: "Math Olympiad".to_string(),
                description: Some("Regional round".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(credit.status, CreditStatus::Pending);
    assert_eq!(credit.pillar.as_str(), "Мислене");

    // Teacher T validates it
    let validated = world
        .credits
        .decide_credit(
            &credit.id,
            CreditStatus::Validated,
            "teacher-t",
            Role::Teacher,
            "student-a",
        )
        .await
        .unwrap();
    assert_eq!(validated.status, CreditStatus::Validated);
    assert_eq!(validated.validated_by.as_deref(), Some("teacher-t"));

    // The decision fans out as a success notification for A
    world.drain().await;
    let inbox = world
        .notifications
        .list_for_user("student-a", false, 10)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, "success");
    assert_eq!(inbox[0].category, "credit");

    // Owner delete is refused, admin delete succeeds
    let err = world
        .credits
        .delete_credit(&credit.id, Role::Student)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    world
        .credits
        .delete_credit(&credit.id, Role::Admin)
        .await
        .unwrap();
    assert!(world.credits.get_credit(&credit.id).await.is_err());
}

#[tokio::test]
async fn event_lifecycle_with_cancellation() {
    let mut world = World::new().await;
    let student_profile = seed_student(&world.db, "student-a").await;
    seed_student(&world.db, "student-b").await;
    seed_staff(&world.db, "teacher-t", "teacher").await;

    // Teacher creates an event in the future: every student is notified
    let event = world
        .events
        .create_event(
            "teacher-t",
            &CreateEventRequest {
                title: "Career day".to_string(),
                description: None,
                start_date: Utc::now() + Duration::days(3),
                end_date: None,
                location: Some("Auditorium".to_string()),
                organizer: None,
                feedback_url: None,
            },
        )
        .await
        .unwrap();
    world.drain().await;

    for student in ["student-a", "student-b"] {
        let inbox = world
            .notifications
            .list_for_user(student, false, 10)
            .await
            .unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].category, "event");
    }

    // One student registers, then the teacher deletes the event
    world
        .events
        .participate(&event.id, &student_profile)
        .await
        .unwrap();
    world.events.delete_event(&event.id).await.unwrap();
    world.drain().await;

    // The registered student got a cancellation notice
    let inbox = world
        .notifications
        .list_for_user("student-a", false, 10)
        .await
        .unwrap();
    assert!(inbox.iter().any(|n| n.title == "Event cancelled"));

    // The non-participant did not
    let inbox = world
        .notifications
        .list_for_user("student-b", false, 10)
        .await
        .unwrap();
    assert!(!inbox.iter().any(|n| n.title == "Event cancelled"));

    // The participation row is gone with the event
    let row = sqlx::query("SELECT COUNT(*) as count FROM event_participations")
        .fetch_one(&world.db)
        .await
        .unwrap();
    let count: i64 = row.get("count");
    assert_eq!(count, 0);
}
