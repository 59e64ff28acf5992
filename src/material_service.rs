use anyhow::Result;
use chrono::{Days, NaiveDate, Utc};
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

use crate::auth;
use crate::database::{Database, NewMaterial};
use crate::models::*;

/// How far back the growth dashboard looks, in days
const ANALYTICS_WINDOW_DAYS: u64 = 30;

/// Service layer over the relational store: accounts, materials and their
/// derived study artifacts, quiz scoring, and the analytics rollups.
#[derive(Clone)]
pub struct MaterialService {
    db: Database,
}

impl MaterialService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // Account operations

    pub async fn register_user(&self, name: &str, email: &str, password: &str) -> Result<User> {
        if self.db.get_user_by_email(email).await?.is_some() {
            return Err(anyhow::anyhow!("Email '{}' already exists", email));
        }

        let password_hash = auth::hash_password(password)?;
        self.db.create_user(name, email, &password_hash).await
    }

    /// Verify credentials; None for unknown email or wrong password
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.db.get_user_by_email(email).await? else {
            return Ok(None);
        };

        if auth::verify_password(password, &user.password_hash) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    // Material operations

    pub async fn store_material(&self, new: NewMaterial) -> Result<Material> {
        self.db.create_material(new).await
    }

    pub async fn get_material(&self, id: Uuid, user_id: Uuid) -> Result<Option<Material>> {
        self.db.get_material(id, user_id).await
    }

    pub async fn list_materials(&self, user_id: Uuid) -> Result<Vec<Material>> {
        self.db.list_materials(user_id).await
    }

    pub async fn update_summary(&self, material_id: Uuid, summary: &str) -> Result<()> {
        self.db.update_material_summary(material_id, summary).await
    }

    /// Remove the stored upload (best effort) and cascade-delete the rows
    pub async fn delete_material(&self, material: &Material) -> Result<()> {
        if let Some(path) = &material.file_path {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!(
                    material_id = %material.id,
                    path = %path,
                    error = %e,
                    "Could not remove uploaded file, deleting rows anyway"
                );
            }
        }

        self.db.delete_material(material.id).await
    }

    // Derived artifacts

    pub async fn replace_flashcards(
        &self,
        material_id: Uuid,
        cards: &[FlashcardContent],
    ) -> Result<Vec<Flashcard>> {
        self.db.replace_flashcards(material_id, cards).await
    }

    pub async fn list_flashcards(&self, material_id: Uuid) -> Result<Vec<Flashcard>> {
        self.db.list_flashcards(material_id).await
    }

    pub async fn replace_quiz_questions(
        &self,
        material_id: Uuid,
        items: &[QuizItem],
    ) -> Result<Vec<QuizQuestion>> {
        self.db.replace_quiz_questions(material_id, items).await
    }

    pub async fn list_quiz_questions(&self, material_id: Uuid) -> Result<Vec<QuizQuestion>> {
        self.db.list_quiz_questions(material_id).await
    }

    pub async fn record_activity(
        &self,
        user_id: Uuid,
        material_id: Option<Uuid>,
        activity_type: &str,
    ) -> Result<()> {
        self.db.log_activity(user_id, material_id, activity_type).await
    }

    // Quiz scoring

    /// Score the submitted answers against the stored question set, persist
    /// the attempt, and log the activity
    pub async fn submit_quiz(
        &self,
        user_id: Uuid,
        material_id: Uuid,
        answers: &HashMap<Uuid, i64>,
    ) -> Result<QuizResult> {
        let questions = self.db.list_quiz_questions(material_id).await?;
        let (score, total) = score_quiz(&questions, answers);

        self.db
            .create_quiz_attempt(user_id, material_id, score, total)
            .await?;
        self.db
            .log_activity(user_id, Some(material_id), "quiz")
            .await?;

        let percentage = if total > 0 {
            round1(score as f64 / total as f64 * 100.0)
        } else {
            0.0
        };

        Ok(QuizResult {
            score,
            total,
            percentage,
        })
    }

    // Analytics

    pub async fn dashboard_stats(&self, user_id: Uuid) -> Result<DashboardStats> {
        let materials_count = self.db.count_materials(user_id).await?;
        let flashcards_count = self.db.count_flashcards(user_id).await?;
        let quiz_count = self.db.count_quiz_attempts(user_id).await?;
        let avg_score = self.db.average_score(user_id).await?.map(round1).unwrap_or(0.0);

        Ok(DashboardStats {
            materials_count,
            flashcards_count,
            quiz_count,
            avg_score,
        })
    }

    pub async fn growth_report(&self, user_id: Uuid) -> Result<GrowthReport> {
        let now = Utc::now();
        let since = now
            .checked_sub_days(Days::new(ANALYTICS_WINDOW_DAYS))
            .unwrap_or(now)
            .to_rfc3339();

        let stats = self.dashboard_stats(user_id).await?;
        let weekly_activity = self.db.daily_activity_counts(user_id, &since).await?;
        let quiz_attempts = self.db.recent_quiz_attempts(user_id, 10).await?;
        let subject_distribution = self.db.subject_distribution(user_id).await?;
        let activity_breakdown = self.db.activity_breakdown(user_id).await?;
        let materials_timeline = self.db.materials_timeline(user_id, &since).await?;

        let activity_dates: Vec<NaiveDate> = self
            .db
            .distinct_activity_dates(user_id, ANALYTICS_WINDOW_DAYS as i64)
            .await?
            .iter()
            .filter_map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .collect();
        let streak = compute_streak(&activity_dates, now.date_naive());

        Ok(GrowthReport {
            stats,
            streak,
            weekly_activity,
            quiz_attempts,
            subject_distribution,
            activity_breakdown,
            materials_timeline,
        })
    }
}

/// Count answers whose chosen index matches the stored correct index.
/// Unanswered or out-of-set question ids simply do not score.
pub fn score_quiz(questions: &[QuizQuestion], answers: &HashMap<Uuid, i64>) -> (i64, i64) {
    let score = questions
        .iter()
        .filter(|q| answers.get(&q.id) == Some(&q.correct_index))
        .count() as i64;

    (score, questions.len() as i64)
}

/// Consecutive days with activity, counting back from `today`. Dates must be
/// distinct and sorted newest first; a day without activity ends the run.
pub fn compute_streak(dates: &[NaiveDate], today: NaiveDate) -> i64 {
    let mut streak: i64 = 0;
    for date in dates {
        let expected = today.checked_sub_days(Days::new(streak as u64));
        if Some(*date) == expected {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

/// Derive a display title from an uploaded filename: drop the extension,
/// underscores become spaces, words get capitalized.
pub fn title_from_filename(filename: &str) -> String {
    let stem = filename
        .strip_suffix(".pdf")
        .or_else(|| filename.strip_suffix(".PDF"))
        .unwrap_or(filename);

    stem.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use chrono::Utc;

    async fn create_test_service() -> MaterialService {
        let db = Database::new("sqlite::memory:").await.unwrap();
        MaterialService::new(db)
    }

    fn sample_material(user_id: Uuid) -> NewMaterial {
        NewMaterial {
            user_id,
            title: "Intro To ML".to_string(),
            subject: "Machine Learning".to_string(),
            file_type: "pdf".to_string(),
            file_path: None,
            text_content: "Supervised learning uses labeled data.".to_string(),
            summary: Some("A short intro.".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let service = create_test_service().await;

        let user = service
            .register_user("Ada", "ada@example.com", "hunter2")
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_ne!(user.password_hash, "hunter2");

        // Duplicate email is rejected
        let duplicate = service.register_user("Ada", "ada@example.com", "other").await;
        assert!(duplicate.is_err());

        let authed = service.authenticate("ada@example.com", "hunter2").await.unwrap();
        assert!(authed.is_some());

        let wrong = service.authenticate("ada@example.com", "wrong").await.unwrap();
        assert!(wrong.is_none());

        let unknown = service.authenticate("nobody@example.com", "hunter2").await.unwrap();
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn test_material_lifecycle() {
        let service = create_test_service().await;
        let user = service
            .register_user("Ada", "ada@example.com", "pw")
            .await
            .unwrap();

        let material = service.store_material(sample_material(user.id)).await.unwrap();

        let fetched = service.get_material(material.id, user.id).await.unwrap();
        assert!(fetched.is_some());

        // A different user cannot see it
        let other = service
            .register_user("Eve", "eve@example.com", "pw")
            .await
            .unwrap();
        let hidden = service.get_material(material.id, other.id).await.unwrap();
        assert!(hidden.is_none());

        let listed = service.list_materials(user.id).await.unwrap();
        assert_eq!(listed.len(), 1);

        service.update_summary(material.id, "Updated summary").await.unwrap();
        let fetched = service.get_material(material.id, user.id).await.unwrap().unwrap();
        assert_eq!(fetched.summary.as_deref(), Some("Updated summary"));

        service.delete_material(&material).await.unwrap();
        assert!(service.get_material(material.id, user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_material_cascades() {
        let service = create_test_service().await;
        let user = service
            .register_user("Ada", "ada@example.com", "pw")
            .await
            .unwrap();
        let material = service.store_material(sample_material(user.id)).await.unwrap();

        service
            .replace_flashcards(
                material.id,
                &[FlashcardContent {
                    question: "Q".to_string(),
                    answer: "A".to_string(),
                }],
            )
            .await
            .unwrap();
        service
            .replace_quiz_questions(
                material.id,
                &[QuizItem {
                    question: "Pick one".to_string(),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct: 0,
                }],
            )
            .await
            .unwrap();
        service
            .submit_quiz(user.id, material.id, &HashMap::new())
            .await
            .unwrap();

        service.delete_material(&material).await.unwrap();

        assert!(service.list_flashcards(material.id).await.unwrap().is_empty());
        assert!(service.list_quiz_questions(material.id).await.unwrap().is_empty());
        let stats = service.dashboard_stats(user.id).await.unwrap();
        assert_eq!(stats.materials_count, 0);
        assert_eq!(stats.flashcards_count, 0);
    }

    #[tokio::test]
    async fn test_replace_flashcards_overwrites() {
        let service = create_test_service().await;
        let user = service
            .register_user("Ada", "ada@example.com", "pw")
            .await
            .unwrap();
        let material = service.store_material(sample_material(user.id)).await.unwrap();

        let first = vec![
            FlashcardContent {
                question: "Old 1".to_string(),
                answer: "A".to_string(),
            },
            FlashcardContent {
                question: "Old 2".to_string(),
                answer: "B".to_string(),
            },
        ];
        service.replace_flashcards(material.id, &first).await.unwrap();

        let second = vec![FlashcardContent {
            question: "New".to_string(),
            answer: "C".to_string(),
        }];
        service.replace_flashcards(material.id, &second).await.unwrap();

        let stored = service.list_flashcards(material.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].question, "New");
    }

    #[tokio::test]
    async fn test_submit_quiz_scores_exact_matches() {
        let service = create_test_service().await;
        let user = service
            .register_user("Ada", "ada@example.com", "pw")
            .await
            .unwrap();
        let material = service.store_material(sample_material(user.id)).await.unwrap();

        let items = vec![
            QuizItem {
                question: "Q1".to_string(),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct: 1,
            },
            QuizItem {
                question: "Q2".to_string(),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct: 2,
            },
            QuizItem {
                question: "Q3".to_string(),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct: 0,
            },
        ];
        let questions = service.replace_quiz_questions(material.id, &items).await.unwrap();

        let mut answers = HashMap::new();
        answers.insert(questions[0].id, 1); // right
        answers.insert(questions[1].id, 3); // wrong
        // third left unanswered

        let result = service.submit_quiz(user.id, material.id, &answers).await.unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.total, 3);
        assert_eq!(result.percentage, 33.3);

        let stats = service.dashboard_stats(user.id).await.unwrap();
        assert_eq!(stats.quiz_count, 1);
        assert_eq!(stats.avg_score, 33.3);
    }

    #[tokio::test]
    async fn test_submit_quiz_with_no_questions() {
        let service = create_test_service().await;
        let user = service
            .register_user("Ada", "ada@example.com", "pw")
            .await
            .unwrap();
        let material = service.store_material(sample_material(user.id)).await.unwrap();

        let result = service
            .submit_quiz(user.id, material.id, &HashMap::new())
            .await
            .unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.total, 0);
        assert_eq!(result.percentage, 0.0);
    }

    #[tokio::test]
    async fn test_growth_report_includes_streak_and_breakdown() {
        let service = create_test_service().await;
        let user = service
            .register_user("Ada", "ada@example.com", "pw")
            .await
            .unwrap();
        let material = service.store_material(sample_material(user.id)).await.unwrap();

        service
            .record_activity(user.id, Some(material.id), "upload")
            .await
            .unwrap();
        service
            .record_activity(user.id, Some(material.id), "view_material")
            .await
            .unwrap();

        let report = service.growth_report(user.id).await.unwrap();
        assert_eq!(report.streak, 1); // activity today only
        assert_eq!(report.stats.materials_count, 1);
        assert_eq!(report.weekly_activity.len(), 1);
        assert_eq!(report.weekly_activity[0].count, 2);
        assert_eq!(report.activity_breakdown.len(), 2);
        assert_eq!(report.subject_distribution[0].subject, "Machine Learning");
        assert_eq!(report.materials_timeline.len(), 1);
    }

    #[test]
    fn test_score_quiz_pure() {
        let material_id = Uuid::new_v4();
        let make_question = |correct: i64| QuizQuestion {
            id: Uuid::new_v4(),
            material_id,
            question: "Q".to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: correct,
            created_at: Utc::now(),
        };

        let questions = vec![make_question(0), make_question(3), make_question(2)];

        let mut answers = HashMap::new();
        answers.insert(questions[0].id, 0);
        answers.insert(questions[1].id, 3);
        answers.insert(questions[2].id, 1);

        assert_eq!(score_quiz(&questions, &answers), (2, 3));
        assert_eq!(score_quiz(&questions, &HashMap::new()), (0, 3));
        assert_eq!(score_quiz(&[], &answers), (0, 0));
    }

    #[test]
    fn test_compute_streak() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let d = |day: u32| NaiveDate::from_ymd_opt(2025, 3, day).unwrap();

        // Three consecutive days ending today
        assert_eq!(compute_streak(&[d(10), d(9), d(8)], today), 3);

        // Gap after two days
        assert_eq!(compute_streak(&[d(10), d(9), d(7)], today), 2);

        // No activity today means no streak
        assert_eq!(compute_streak(&[d(9), d(8)], today), 0);

        // No activity at all
        assert_eq!(compute_streak(&[], today), 0);
    }

    #[test]
    fn test_title_from_filename() {
        assert_eq!(title_from_filename("machine_learning_notes.pdf"), "Machine Learning Notes");
        assert_eq!(title_from_filename("physics.PDF"), "Physics");
        assert_eq!(title_from_filename("already titled.pdf"), "Already Titled");
        assert_eq!(title_from_filename("no_extension"), "No Extension");
    }
}
