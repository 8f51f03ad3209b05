/// Statistics aggregator
///
/// Plain SQL fetches reduced in memory; no aggregation DSL. Every rollup is
/// read-only and staff-gated upstream.
use crate::{
    error::ApiResult,
    reports::{percentage, ReportDocument, ReportSection},
    sanctions::CRITICAL_THRESHOLD,
};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

#[derive(Clone)]
pub struct StatsAggregator {
    db: SqlitePool,
}

/// Credit rollup
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditStats {
    pub total: u64,
    pub by_status: HashMap<String, u64>,
    pub by_pillar: HashMap<String, u64>,
    pub validation_rate: f64,
}

/// Per-student absence summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceReportRow {
    pub student_id: String,
    pub student_name: String,
    pub grade: i64,
    pub excused: i64,
    pub unexcused: i64,
    pub total: i64,
    pub max_allowed: i64,
    pub critical: bool,
}

/// Per-event participation summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventReportRow {
    pub event_id: String,
    pub title: String,
    pub registered: u64,
    pub confirmed: u64,
    pub attended: u64,
    pub cancelled: u64,
    pub attendance_rate: f64,
}

/// Events rollup
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStats {
    pub events: Vec<EventReportRow>,
    /// Students with at least one participation over all students
    pub participation_rate: f64,
}

/// Top-N entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub label: String,
    pub count: u64,
}

impl StatsAggregator {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Credit counts and validation rate
    pub async fn credit_stats(&self) -> ApiResult<CreditStats> {
        let rows = sqlx::query("SELECT pillar, status FROM credits")
            .fetch_all(&self.db)
            .await?;

        let mut by_status: HashMap<String, u64> = HashMap::new();
        let mut by_pillar: HashMap<String, u64> = HashMap::new();
        for row in &rows {
            *by_status.entry(row.get("status")).or_insert(0) += 1;
            *by_pillar.entry(row.get("pillar")).or_insert(0) += 1;
        }

        let total = rows.len() as u64;
        let validated = by_status.get("validated").copied().unwrap_or(0);

        Ok(CreditStats {
            total,
            by_status,
            by_pillar,
            validation_rate: percentage(validated, total),
        })
    }

    /// Absence report across all students with a sanction record
    pub async fn absence_report(&self) -> ApiResult<Vec<AbsenceReportRow>> {
        let rows = sqlx::query(
            "SELECT s.student_id, s.excused, s.unexcused, s.max_allowed,
                    sp.grade, u.first_name, u.last_name
             FROM sanctions s
             JOIN student_profiles sp ON sp.id = s.student_id
             JOIN users u ON u.id = sp.user_id
             ORDER BY (s.excused + s.unexcused) DESC",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let excused: i64 = row.get("excused");
                let unexcused: i64 = row.get("unexcused");
                let max_allowed: i64 = row.get("max_allowed");
                let total = excused + unexcused;
                AbsenceReportRow {
                    student_id: row.get("student_id"),
                    student_name: format!(
                        "{} {}",
                        row.get::<String, _>("first_name"),
                        row.get::<String, _>("last_name")
                    ),
                    grade: row.get("grade"),
                    excused,
                    unexcused,
                    total,
                    max_allowed,
                    critical: total as f64 > CRITICAL_THRESHOLD * max_allowed as f64,
                }
            })
            .collect())
    }

    /// Event participation rollup
    pub async fn event_stats(&self) -> ApiResult<EventStats> {
        let events = sqlx::query("SELECT id, title FROM events ORDER BY starts_at")
            .fetch_all(&self.db)
            .await?;

        let participations =
            sqlx::query("SELECT event_id, student_id, status FROM event_participations")
                .fetch_all(&self.db)
                .await?;

        let mut per_event: HashMap<String, (u64, u64, u64, u64)> = HashMap::new();
        let mut students_with_data: std::collections::HashSet<String> =
            std::collections::HashSet::new();
        for row in &participations {
            let event_id: String = row.get("event_id");
            let status: String = row.get("status");
            let entry = per_event.entry(event_id).or_insert((0, 0, 0, 0));
            match status.as_str() {
                "registered" => entry.0 += 1,
                "confirmed" => entry.1 += 1,
                "attended" => entry.2 += 1,
                "cancelled" => entry.3 += 1,
                _ => {}
            }
            students_with_data.insert(row.get("student_id"));
        }

        let event_rows = events
            .iter()
            .map(|row| {
                let event_id: String = row.get("id");
                let (registered, confirmed, attended, cancelled) = per_event
                    .get(&event_id)
                    .copied()
                    .unwrap_or((0, 0, 0, 0));
                let total = registered + confirmed + attended + cancelled;
                EventReportRow {
                    event_id,
                    title: row.get("title"),
                    registered,
                    confirmed,
                    attended,
                    cancelled,
                    attendance_rate: percentage(attended, total),
                }
            })
            .collect();

        let total_students = sqlx::query("SELECT COUNT(*) as count FROM student_profiles")
            .fetch_one(&self.db)
            .await?;
        let total_students: i64 = total_students.get("count");

        Ok(EventStats {
            events: event_rows,
            participation_rate: percentage(students_with_data.len() as u64, total_students as u64),
        })
    }

    /// Top 5 students by achievement count
    pub async fn top_achievers(&self) -> ApiResult<Vec<RankedEntry>> {
        let rows = sqlx::query(
            "SELECT a.student_id, u.first_name, u.last_name
             FROM achievements a
             JOIN student_profiles sp ON sp.id = a.student_id
             JOIN users u ON u.id = sp.user_id",
        )
        .fetch_all(&self.db)
        .await?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for row in &rows {
            let name = format!(
                "{} {}",
                row.get::<String, _>("first_name"),
                row.get::<String, _>("last_name")
            );
            *counts.entry(name).or_insert(0) += 1;
        }

        Ok(top_n(counts, 5))
    }

    /// Top 10 hobbies across all interest records
    pub async fn top_hobbies(&self) -> ApiResult<Vec<RankedEntry>> {
        let rows = sqlx::query("SELECT hobbies FROM interests")
            .fetch_all(&self.db)
            .await?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for row in &rows {
            let hobbies_json: String = row.get("hobbies");
            if let Ok(hobbies) = serde_json::from_str::<Vec<String>>(&hobbies_json) {
                for hobby in hobbies {
                    *counts.entry(hobby.to_lowercase()).or_insert(0) += 1;
                }
            }
        }

        Ok(top_n(counts, 10))
    }

    /// Grade distribution of student profiles
    pub async fn grade_breakdown(&self) -> ApiResult<HashMap<i64, u64>> {
        let rows = sqlx::query("SELECT grade FROM student_profiles")
            .fetch_all(&self.db)
            .await?;

        let mut counts: HashMap<i64, u64> = HashMap::new();
        for row in &rows {
            *counts.entry(row.get("grade")).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Assemble the per-student export document: profile, credits,
    /// achievements, absence summary.
    pub async fn student_report(&self, student_id: &str) -> ApiResult<ReportDocument> {
        let profile = sqlx::query(
            "SELECT sp.grade, sp.specialization, sp.average_grade, u.first_name, u.last_name,
                    u.email
             FROM student_profiles sp
             JOIN users u ON u.id = sp.user_id
             WHERE sp.id = ?1",
        )
        .bind(student_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            crate::error::ApiError::NotFound(format!("Student {} not found", student_id))
        })?;

        let student_name = format!(
            "{} {}",
            profile.get::<String, _>("first_name"),
            profile.get::<String, _>("last_name")
        );

        let mut document = ReportDocument::new(format!("Student report: {}", student_name));

        document.push_section(ReportSection {
            title: "Profile".to_string(),
            headers: vec!["Field".to_string(), "Value".to_string()],
            rows: vec![
                vec!["Name".to_string(), student_name.clone()],
                vec!["Email".to_string(), profile.get("email")],
                vec!["Grade".to_string(), profile.get::<i64, _>("grade").to_string()],
                vec![
                    "Specialization".to_string(),
                    profile
                        .get::<Option<String>, _>("specialization")
                        .unwrap_or_default(),
                ],
                vec![
                    "Average grade".to_string(),
                    profile
                        .get::<Option<f64>, _>("average_grade")
                        .map(|g| format!("{:.2}", g))
                        .unwrap_or_default(),
                ],
            ],
        });

        let credits = sqlx::query(
            "SELECT pillar, activity, status FROM credits WHERE student_id = ?1
             ORDER BY created_at",
        )
        .bind(student_id)
        .fetch_all(&self.db)
        .await?;
        document.push_section(ReportSection {
            title: "Credits".to_string(),
            headers: vec![
                "Pillar".to_string(),
                "Activity".to_string(),
                "Status".to_string(),
            ],
            rows: credits
                .iter()
                .map(|row| {
                    vec![
                        row.get::<String, _>("pillar"),
                        row.get::<String, _>("activity"),
                        row.get::<String, _>("status"),
                    ]
                })
                .collect(),
        });

        let achievements = sqlx::query(
            "SELECT category, title, achieved_on FROM achievements WHERE student_id = ?1
             ORDER BY achieved_on DESC",
        )
        .bind(student_id)
        .fetch_all(&self.db)
        .await?;
        document.push_section(ReportSection {
            title: "Achievements".to_string(),
            headers: vec![
                "Category".to_string(),
                "Title".to_string(),
                "Date".to_string(),
            ],
            rows: achievements
                .iter()
                .map(|row| {
                    vec![
                        row.get::<String, _>("category"),
                        row.get::<String, _>("title"),
                        row.get::<String, _>("achieved_on"),
                    ]
                })
                .collect(),
        });

        let sanction = sqlx::query(
            "SELECT excused, unexcused, max_allowed, school_remarks FROM sanctions
             WHERE student_id = ?1",
        )
        .bind(student_id)
        .fetch_optional(&self.db)
        .await?;
        let (excused, unexcused, max_allowed, remarks) = match sanction {
            Some(row) => (
                row.get::<i64, _>("excused"),
                row.get::<i64, _>("unexcused"),
                row.get::<i64, _>("max_allowed"),
                row.get::<i64, _>("school_remarks"),
            ),
            None => (0, 0, crate::sanctions::DEFAULT_MAX_ALLOWED, 0),
        };
        document.push_section(ReportSection {
            title: "Absences".to_string(),
            headers: vec!["Field".to_string(), "Value".to_string()],
            rows: vec![
                vec!["Excused".to_string(), excused.to_string()],
                vec!["Unexcused".to_string(), unexcused.to_string()],
                vec!["Total".to_string(), (excused + unexcused).to_string()],
                vec!["Allowed maximum".to_string(), max_allowed.to_string()],
                vec!["School remarks".to_string(), remarks.to_string()],
            ],
        });

        Ok(document)
    }
}

fn top_n(counts: HashMap<String, u64>, n: usize) -> Vec<RankedEntry> {
    let mut entries: Vec<RankedEntry> = counts
        .into_iter()
        .map(|(label, count)| RankedEntry { label, count })
        .collect();
    // Stable order for equal counts so rankings don't jitter between calls
    entries.sort_by(|a, b| b.count.cmp(&a.count).then(a.label.cmp(&b.label)));
    entries.truncate(n);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_staff, seed_student};
    use chrono::Utc;

    async fn seed_credit(db: &SqlitePool, student_id: &str, activity: &str, status: &str) {
        sqlx::query(
            "INSERT INTO credits (id, student_id, pillar, activity, status, created_at)
             VALUES (?1, ?2, 'Мислене', ?3, ?4, ?5)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(student_id)
        .bind(activity)
        .bind(status)
        .bind(Utc::now().to_rfc3339())
        .execute(db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn validation_rate_with_zero_credits_is_zero() {
        let db = crate::db::test_pool().await;
        let stats = StatsAggregator::new(db);

        let report = stats.credit_stats().await.unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.validation_rate, 0.0);
    }

    #[tokio::test]
    async fn validation_rate_three_of_four() {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "u1").await;
        for (i, status) in ["validated", "validated", "validated", "pending"]
            .iter()
            .enumerate()
        {
            seed_credit(&db, &student_id, &format!("activity-{}", i), status).await;
        }

        let stats = StatsAggregator::new(db);
        let report = stats.credit_stats().await.unwrap();
        assert_eq!(report.total, 4);
        assert_eq!(report.validation_rate, 75.0);
        assert_eq!(report.by_pillar.get("Мислене"), Some(&4));
    }

    #[tokio::test]
    async fn absence_report_flags_critical_students() {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "u1").await;
        sqlx::query(
            "INSERT INTO sanctions (id, student_id, excused, unexcused, max_allowed,
                                    school_remarks, updated_at)
             VALUES ('s1', ?1, 121, 0, 150, 0, ?2)",
        )
        .bind(&student_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&db)
        .await
        .unwrap();

        let stats = StatsAggregator::new(db);
        let report = stats.absence_report().await.unwrap();
        assert_eq!(report.len(), 1);
        assert!(report[0].critical);
        assert_eq!(report[0].total, 121);
    }

    #[tokio::test]
    async fn top_hobbies_ranked() {
        let db = crate::db::test_pool().await;
        let s1 = seed_student(&db, "u1").await;
        let s2 = seed_student(&db, "u2").await;
        seed_staff(&db, "t1", "teacher").await;

        for (student, hobbies) in [(&s1, r#"["Chess","Football"]"#), (&s2, r#"["chess"]"#)] {
            sqlx::query(
                "INSERT INTO interests (id, student_id, categories, hobbies, updated_at)
                 VALUES (?1, ?2, '[]', ?3, ?4)",
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(student)
            .bind(hobbies)
            .bind(Utc::now().to_rfc3339())
            .execute(&db)
            .await
            .unwrap();
        }

        let stats = StatsAggregator::new(db);
        let top = stats.top_hobbies().await.unwrap();
        assert_eq!(top[0].label, "chess");
        assert_eq!(top[0].count, 2);
    }

    #[tokio::test]
    async fn student_report_includes_default_absence_shape() {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "u1").await;

        let stats = StatsAggregator::new(db);
        let document = stats.student_report(&student_id).await.unwrap();
        let absences = document
            .sections
            .iter()
            .find(|s| s.title == "Absences")
            .unwrap();
        assert!(absences
            .rows
            .iter()
            .any(|r| r[0] == "Allowed maximum" && r[1] == "150"));
    }
}
