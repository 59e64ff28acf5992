use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::*;

/// Fields needed to create a material row; the id and timestamp are assigned
/// here.
#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub user_id: Uuid,
    pub title: String,
    pub subject: String,
    pub file_type: String,
    pub file_path: Option<String>,
    pub text_content: String,
    pub summary: Option<String>,
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;
        let db = Database { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS materials (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                subject TEXT NOT NULL DEFAULT 'General',
                file_type TEXT NOT NULL DEFAULT 'pdf',
                file_path TEXT,
                text_content TEXT NOT NULL,
                summary TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS flashcards (
                id TEXT PRIMARY KEY,
                material_id TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (material_id) REFERENCES materials(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quiz_questions (
                id TEXT PRIMARY KEY,
                material_id TEXT NOT NULL,
                question TEXT NOT NULL,
                options TEXT NOT NULL,
                correct_index INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (material_id) REFERENCES materials(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quiz_attempts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                material_id TEXT NOT NULL,
                score INTEGER NOT NULL,
                total_questions INTEGER NOT NULL,
                completed_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (material_id) REFERENCES materials(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS activity_log (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                material_id TEXT,
                activity_type TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (material_id) REFERENCES materials(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // User operations

    pub async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| self.row_to_user(&row)).transpose()
    }

    pub async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| self.row_to_user(&row)).transpose()
    }

    fn row_to_user(&self, row: &sqlx::sqlite::SqliteRow) -> Result<User> {
        Ok(User {
            id: Uuid::parse_str(&row.get::<String, _>("id"))?,
            name: row.get("name"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            created_at: chrono::DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))?
                .with_timezone(&Utc),
        })
    }

    // Material operations

    pub async fn create_material(&self, new: NewMaterial) -> Result<Material> {
        let material = Material {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            title: new.title,
            subject: new.subject,
            file_type: new.file_type,
            file_path: new.file_path,
            text_content: new.text_content,
            summary: new.summary,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO materials (id, user_id, title, subject, file_type, file_path, text_content, summary, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(material.id.to_string())
        .bind(material.user_id.to_string())
        .bind(&material.title)
        .bind(&material.subject)
        .bind(&material.file_type)
        .bind(&material.file_path)
        .bind(&material.text_content)
        .bind(&material.summary)
        .bind(material.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(material)
    }

    /// Materials are always looked up scoped to their owner
    pub async fn get_material(&self, id: Uuid, user_id: Uuid) -> Result<Option<Material>> {
        let row = sqlx::query("SELECT * FROM materials WHERE id = ?1 AND user_id = ?2")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| self.row_to_material(&row)).transpose()
    }

    pub async fn list_materials(&self, user_id: Uuid) -> Result<Vec<Material>> {
        let rows =
            sqlx::query("SELECT * FROM materials WHERE user_id = ?1 ORDER BY created_at DESC")
                .bind(user_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(|row| self.row_to_material(row)).collect()
    }

    fn row_to_material(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Material> {
        Ok(Material {
            id: Uuid::parse_str(&row.get::<String, _>("id"))?,
            user_id: Uuid::parse_str(&row.get::<String, _>("user_id"))?,
            title: row.get("title"),
            subject: row.get("subject"),
            file_type: row.get("file_type"),
            file_path: row.get("file_path"),
            text_content: row.get("text_content"),
            summary: row.get("summary"),
            created_at: chrono::DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))?
                .with_timezone(&Utc),
        })
    }

    pub async fn update_material_summary(&self, id: Uuid, summary: &str) -> Result<()> {
        sqlx::query("UPDATE materials SET summary = ?1 WHERE id = ?2")
            .bind(summary)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete a material and everything derived from it. The schema has no ON
    /// DELETE CASCADE; dependents are removed explicitly in one transaction.
    pub async fn delete_material(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let id_str = id.to_string();

        sqlx::query("DELETE FROM flashcards WHERE material_id = ?1")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM quiz_questions WHERE material_id = ?1")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM quiz_attempts WHERE material_id = ?1")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM activity_log WHERE material_id = ?1")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM materials WHERE id = ?1")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // Flashcard operations

    /// Replace the flashcard set for a material with a freshly generated one
    pub async fn replace_flashcards(
        &self,
        material_id: Uuid,
        cards: &[FlashcardContent],
    ) -> Result<Vec<Flashcard>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM flashcards WHERE material_id = ?1")
            .bind(material_id.to_string())
            .execute(&mut *tx)
            .await?;

        let mut stored = Vec::with_capacity(cards.len());
        for card in cards {
            let flashcard = Flashcard {
                id: Uuid::new_v4(),
                material_id,
                question: card.question.clone(),
                answer: card.answer.clone(),
                created_at: Utc::now(),
            };

            sqlx::query(
                "INSERT INTO flashcards (id, material_id, question, answer, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(flashcard.id.to_string())
            .bind(flashcard.material_id.to_string())
            .bind(&flashcard.question)
            .bind(&flashcard.answer)
            .bind(flashcard.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;

            stored.push(flashcard);
        }

        tx.commit().await?;
        Ok(stored)
    }

    pub async fn list_flashcards(&self, material_id: Uuid) -> Result<Vec<Flashcard>> {
        let rows = sqlx::query(
            "SELECT * FROM flashcards WHERE material_id = ?1 ORDER BY created_at ASC",
        )
        .bind(material_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut flashcards = Vec::new();
        for row in rows {
            flashcards.push(Flashcard {
                id: Uuid::parse_str(&row.get::<String, _>("id"))?,
                material_id: Uuid::parse_str(&row.get::<String, _>("material_id"))?,
                question: row.get("question"),
                answer: row.get("answer"),
                created_at: chrono::DateTime::parse_from_rfc3339(
                    &row.get::<String, _>("created_at"),
                )?
                .with_timezone(&Utc),
            });
        }

        Ok(flashcards)
    }

    // Quiz question operations

    pub async fn replace_quiz_questions(
        &self,
        material_id: Uuid,
        items: &[QuizItem],
    ) -> Result<Vec<QuizQuestion>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM quiz_questions WHERE material_id = ?1")
            .bind(material_id.to_string())
            .execute(&mut *tx)
            .await?;

        let mut stored = Vec::with_capacity(items.len());
        for item in items {
            let question = QuizQuestion {
                id: Uuid::new_v4(),
                material_id,
                question: item.question.clone(),
                options: item.options.clone(),
                correct_index: item.correct,
                created_at: Utc::now(),
            };

            sqlx::query(
                r#"
                INSERT INTO quiz_questions (id, material_id, question, options, correct_index, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(question.id.to_string())
            .bind(question.material_id.to_string())
            .bind(&question.question)
            .bind(serde_json::to_string(&question.options)?)
            .bind(question.correct_index)
            .bind(question.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;

            stored.push(question);
        }

        tx.commit().await?;
        Ok(stored)
    }

    pub async fn list_quiz_questions(&self, material_id: Uuid) -> Result<Vec<QuizQuestion>> {
        let rows = sqlx::query(
            "SELECT * FROM quiz_questions WHERE material_id = ?1 ORDER BY created_at ASC",
        )
        .bind(material_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut questions = Vec::new();
        for row in rows {
            questions.push(QuizQuestion {
                id: Uuid::parse_str(&row.get::<String, _>("id"))?,
                material_id: Uuid::parse_str(&row.get::<String, _>("material_id"))?,
                question: row.get("question"),
                options: serde_json::from_str(&row.get::<String, _>("options"))?,
                correct_index: row.get("correct_index"),
                created_at: chrono::DateTime::parse_from_rfc3339(
                    &row.get::<String, _>("created_at"),
                )?
                .with_timezone(&Utc),
            });
        }

        Ok(questions)
    }

    // Quiz attempt operations

    pub async fn create_quiz_attempt(
        &self,
        user_id: Uuid,
        material_id: Uuid,
        score: i64,
        total_questions: i64,
    ) -> Result<QuizAttempt> {
        let attempt = QuizAttempt {
            id: Uuid::new_v4(),
            user_id,
            material_id,
            score,
            total_questions,
            completed_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO quiz_attempts (id, user_id, material_id, score, total_questions, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(attempt.id.to_string())
        .bind(attempt.user_id.to_string())
        .bind(attempt.material_id.to_string())
        .bind(attempt.score)
        .bind(attempt.total_questions)
        .bind(attempt.completed_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(attempt)
    }

    // Activity log operations

    pub async fn log_activity(
        &self,
        user_id: Uuid,
        material_id: Option<Uuid>,
        activity_type: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (id, user_id, material_id, activity_type, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(material_id.map(|id| id.to_string()))
        .bind(activity_type)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // Dashboard aggregation queries

    pub async fn count_materials(&self, user_id: Uuid) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM materials WHERE user_id = ?1")
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn count_flashcards(&self, user_id: Uuid) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n FROM flashcards f
            JOIN materials m ON f.material_id = m.id
            WHERE m.user_id = ?1
            "#,
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("n"))
    }

    pub async fn count_quiz_attempts(&self, user_id: Uuid) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM quiz_attempts WHERE user_id = ?1")
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Average quiz percentage across all attempts; None when there are no
    /// attempts
    pub async fn average_score(&self, user_id: Uuid) -> Result<Option<f64>> {
        let row = sqlx::query(
            r#"
            SELECT AVG(CAST(score AS FLOAT) / total_questions * 100) AS avg_score
            FROM quiz_attempts
            WHERE user_id = ?1 AND total_questions > 0
            "#,
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("avg_score"))
    }

    // Growth analytics queries. Timestamps are RFC3339 TEXT, so the calendar
    // date is the first 10 characters and range checks compare lexically.

    pub async fn daily_activity_counts(&self, user_id: Uuid, since: &str) -> Result<Vec<DailyCount>> {
        let rows = sqlx::query(
            r#"
            SELECT substr(created_at, 1, 10) AS date, COUNT(*) AS count
            FROM activity_log
            WHERE user_id = ?1 AND created_at >= ?2
            GROUP BY substr(created_at, 1, 10)
            ORDER BY date
            "#,
        )
        .bind(user_id.to_string())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| DailyCount {
                date: row.get("date"),
                count: row.get("count"),
            })
            .collect())
    }

    pub async fn recent_quiz_attempts(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<QuizAttemptSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT qa.score, qa.total_questions, qa.completed_at, m.title, m.subject
            FROM quiz_attempts qa
            JOIN materials m ON qa.material_id = m.id
            WHERE qa.user_id = ?1
            ORDER BY qa.completed_at DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut attempts = Vec::new();
        for row in rows {
            attempts.push(QuizAttemptSummary {
                score: row.get("score"),
                total_questions: row.get("total_questions"),
                completed_at: chrono::DateTime::parse_from_rfc3339(
                    &row.get::<String, _>("completed_at"),
                )?
                .with_timezone(&Utc),
                title: row.get("title"),
                subject: row.get("subject"),
            });
        }

        Ok(attempts)
    }

    pub async fn subject_distribution(&self, user_id: Uuid) -> Result<Vec<SubjectCount>> {
        let rows = sqlx::query(
            r#"
            SELECT subject, COUNT(*) AS count
            FROM materials
            WHERE user_id = ?1
            GROUP BY subject
            ORDER BY count DESC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| SubjectCount {
                subject: row.get("subject"),
                count: row.get("count"),
            })
            .collect())
    }

    pub async fn activity_breakdown(&self, user_id: Uuid) -> Result<Vec<ActivityTypeCount>> {
        let rows = sqlx::query(
            r#"
            SELECT activity_type, COUNT(*) AS count
            FROM activity_log
            WHERE user_id = ?1
            GROUP BY activity_type
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ActivityTypeCount {
                activity_type: row.get("activity_type"),
                count: row.get("count"),
            })
            .collect())
    }

    pub async fn materials_timeline(
        &self,
        user_id: Uuid,
        since: &str,
    ) -> Result<Vec<MaterialTimelineEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT substr(created_at, 1, 10) AS date, COUNT(*) AS count, subject
            FROM materials
            WHERE user_id = ?1 AND created_at >= ?2
            GROUP BY substr(created_at, 1, 10), subject
            ORDER BY date DESC
            "#,
        )
        .bind(user_id.to_string())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| MaterialTimelineEntry {
                date: row.get("date"),
                count: row.get("count"),
                subject: row.get("subject"),
            })
            .collect())
    }

    /// Most recent distinct calendar dates with any activity, newest first
    pub async fn distinct_activity_dates(&self, user_id: Uuid, limit: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT substr(created_at, 1, 10) AS date
            FROM activity_log
            WHERE user_id = ?1
            ORDER BY date DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("date")).collect())
    }
}
