use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub subject: String,
    pub file_type: String,
    pub file_path: Option<String>,
    #[serde(skip_serializing)]
    pub text_content: String,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: Uuid,
    pub material_id: Uuid,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub material_id: Uuid,
    pub question: String,
    pub options: Vec<String>, // always 4 entries, stored as a JSON array
    pub correct_index: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub material_id: Uuid,
    pub score: i64,
    pub total_questions: i64,
    pub completed_at: DateTime<Utc>,
}

// Parser output records. These carry no ids; the database layer assigns them
// when a generated set is persisted.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardContent {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizItem {
    pub question: String,
    pub options: Vec<String>,
    pub correct: i64,
}

// Request payloads

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateSummaryRequest {
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateFlashcardsRequest {
    pub num_cards: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateQuizRequest {
    pub num_questions: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: HashMap<Uuid, i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub material_id: Option<Uuid>,
}

// Response payloads

#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadedMaterial {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizResult {
    pub score: i64,
    pub total: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub materials_count: i64,
    pub flashcards_count: i64,
    pub quiz_count: i64,
    pub avg_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectCount {
    pub subject: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityTypeCount {
    pub activity_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizAttemptSummary {
    pub score: i64,
    pub total_questions: i64,
    pub completed_at: DateTime<Utc>,
    pub title: String,
    pub subject: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaterialTimelineEntry {
    pub date: String,
    pub count: i64,
    pub subject: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrowthReport {
    pub stats: DashboardStats,
    pub streak: i64,
    pub weekly_activity: Vec<DailyCount>,
    pub quiz_attempts: Vec<QuizAttemptSummary>,
    pub subject_distribution: Vec<SubjectCount>,
    pub activity_breakdown: Vec<ActivityTypeCount>,
    pub materials_timeline: Vec<MaterialTimelineEntry>,
}
