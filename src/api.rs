use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    ai_service::AiService,
    auth::{Session, SessionStore, SESSION_COOKIE},
    config::UploadConfig,
    database::NewMaterial,
    errors::{classify_database_error, ApiError, ErrorContext},
    material_service::{title_from_filename, MaterialService},
    models::*,
    pdf_text,
};

// Import logging macros
use crate::{log_api_start, log_api_success, log_api_warn};

/// Flashcards and quiz questions generated during upload; on-demand
/// regeneration uses the counts from the request instead.
const UPLOAD_FLASHCARD_COUNT: usize = 5;
const UPLOAD_QUIZ_COUNT: usize = 5;
const DEFAULT_REGEN_COUNT: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub material_service: MaterialService,
    pub ai_service: AiService,
    pub sessions: SessionStore,
    pub upload: UploadConfig,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type ErrorResponse = (StatusCode, Json<ApiResponse<()>>);

/// Resolve the session cookie to a live session or produce the 401 response
fn require_session(
    jar: &CookieJar,
    state: &AppState,
    operation: &str,
) -> Result<Session, ErrorResponse> {
    let token = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok());

    match token.and_then(|token| state.sessions.get(token)) {
        Some(session) => Ok(session),
        None => {
            Err(ApiError::Unauthorized.to_response_with_context(ErrorContext::new(operation, "session")))
        }
    }
}

fn session_cookie(token: Uuid) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

fn session_user(session: &Session) -> SessionUser {
    SessionUser {
        id: session.user_id,
        name: session.name.clone(),
        email: session.email.clone(),
    }
}

// Auth endpoints

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<ApiResponse<SessionUser>>), ErrorResponse> {
    log_api_start!("register");

    if request.name.trim().is_empty()
        || request.email.trim().is_empty()
        || request.password.is_empty()
    {
        let error = ApiError::ValidationError("Please fill in all fields".to_string());
        return Err(error.to_response_with_context(ErrorContext::new("register", "user")));
    }

    match state
        .material_service
        .register_user(request.name.trim(), request.email.trim(), &request.password)
        .await
    {
        Ok(user) => {
            let token = state.sessions.create(&user);
            log_api_success!("register", user_id = user.id, "account created");
            Ok((
                jar.add(session_cookie(token)),
                Json(ApiResponse::success(SessionUser {
                    id: user.id,
                    name: user.name,
                    email: user.email,
                })),
            ))
        }
        Err(e) => {
            let classified = classify_database_error(&e);
            let context = ErrorContext::new("register", "user").with_id(request.email.trim());
            Err(classified.to_response_with_context(context))
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<SessionUser>>), ErrorResponse> {
    log_api_start!("login");

    if request.email.trim().is_empty() || request.password.is_empty() {
        let error = ApiError::ValidationError("Please fill in all fields".to_string());
        return Err(error.to_response_with_context(ErrorContext::new("login", "user")));
    }

    match state
        .material_service
        .authenticate(request.email.trim(), &request.password)
        .await
    {
        Ok(Some(user)) => {
            let token = state.sessions.create(&user);
            log_api_success!("login", user_id = user.id, "logged in");
            Ok((
                jar.add(session_cookie(token)),
                Json(ApiResponse::success(SessionUser {
                    id: user.id,
                    name: user.name,
                    email: user.email,
                })),
            ))
        }
        Ok(None) => {
            info!(email = %request.email.trim(), "Rejected login attempt");
            Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Invalid email or password".to_string())),
            ))
        }
        Err(e) => {
            let context = ErrorContext::new("login", "user");
            Err(ApiError::DatabaseError(e).to_response_with_context(context))
        }
    }
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<ApiResponse<bool>>) {
    if let Some(token) = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
    {
        state.sessions.remove(token);
    }

    (
        jar.remove(Cookie::from(SESSION_COOKIE)),
        Json(ApiResponse::success(true)),
    )
}

pub async fn me(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<ApiResponse<SessionUser>>, ErrorResponse> {
    let session = require_session(&jar, &state, "me")?;
    Ok(Json(ApiResponse::success(session_user(&session))))
}

// Dashboard and material endpoints

pub async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<ApiResponse<serde_json::Value>>, ErrorResponse> {
    let session = require_session(&jar, &state, "dashboard")?;

    let stats = state
        .material_service
        .dashboard_stats(session.user_id)
        .await
        .map_err(|e| {
            ApiError::DatabaseError(e)
                .to_response_with_context(ErrorContext::new("dashboard", "stats"))
        })?;

    let materials = state
        .material_service
        .list_materials(session.user_id)
        .await
        .map_err(|e| {
            ApiError::DatabaseError(e)
                .to_response_with_context(ErrorContext::new("dashboard", "material"))
        })?;

    Ok(Json(ApiResponse::success(json!({
        "stats": stats,
        "materials": materials,
    }))))
}

pub async fn list_materials(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<ApiResponse<Vec<Material>>>, ErrorResponse> {
    let session = require_session(&jar, &state, "list_materials")?;

    match state.material_service.list_materials(session.user_id).await {
        Ok(materials) => {
            debug!(count = materials.len(), "Materials listed");
            Ok(Json(ApiResponse::success(materials)))
        }
        Err(e) => {
            let context = ErrorContext::new("list_materials", "material");
            Err(ApiError::DatabaseError(e).to_response_with_context(context))
        }
    }
}

/// Fetch a material scoped to the session user or produce the 404 response
async fn load_material(
    state: &AppState,
    session: &Session,
    material_id: Uuid,
    operation: &str,
) -> Result<Material, ErrorResponse> {
    match state
        .material_service
        .get_material(material_id, session.user_id)
        .await
    {
        Ok(Some(material)) => Ok(material),
        Ok(None) => {
            let error = ApiError::NotFound(format!("Material '{}' not found", material_id));
            let context =
                ErrorContext::new(operation, "material").with_id(&material_id.to_string());
            Err(error.to_response_with_context(context))
        }
        Err(e) => {
            let context =
                ErrorContext::new(operation, "material").with_id(&material_id.to_string());
            Err(ApiError::DatabaseError(e).to_response_with_context(context))
        }
    }
}

pub async fn get_material(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Material>>, ErrorResponse> {
    let session = require_session(&jar, &state, "get_material")?;
    log_api_start!("get_material", material_id = id);

    let material = load_material(&state, &session, id, "get_material").await?;

    if let Err(e) = state
        .material_service
        .record_activity(session.user_id, Some(id), "view_material")
        .await
    {
        warn!(material_id = %id, error = %e, "Failed to record view activity");
    }

    Ok(Json(ApiResponse::success(material)))
}

pub async fn get_flashcards(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ErrorResponse> {
    let session = require_session(&jar, &state, "get_flashcards")?;

    let material = load_material(&state, &session, id, "get_flashcards").await?;

    let flashcards = state.material_service.list_flashcards(id).await.map_err(|e| {
        ApiError::DatabaseError(e).to_response_with_context(
            ErrorContext::new("get_flashcards", "flashcard").with_id(&id.to_string()),
        )
    })?;

    if let Err(e) = state
        .material_service
        .record_activity(session.user_id, Some(id), "flashcards")
        .await
    {
        warn!(material_id = %id, error = %e, "Failed to record flashcard activity");
    }

    Ok(Json(ApiResponse::success(json!({
        "material": material,
        "flashcards": flashcards,
    }))))
}

pub async fn get_quiz(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ErrorResponse> {
    let session = require_session(&jar, &state, "get_quiz")?;

    let material = load_material(&state, &session, id, "get_quiz").await?;

    let questions = state
        .material_service
        .list_quiz_questions(id)
        .await
        .map_err(|e| {
            ApiError::DatabaseError(e).to_response_with_context(
                ErrorContext::new("get_quiz", "quiz").with_id(&id.to_string()),
            )
        })?;

    if let Err(e) = state
        .material_service
        .record_activity(session.user_id, Some(id), "start_quiz")
        .await
    {
        warn!(material_id = %id, error = %e, "Failed to record quiz activity");
    }

    Ok(Json(ApiResponse::success(json!({
        "material": material,
        "questions": questions,
    }))))
}

// Upload pipeline

pub async fn upload_materials(
    State(state): State<AppState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<serde_json::Value>>, ErrorResponse> {
    let session = require_session(&jar, &state, "upload_materials")?;
    log_api_start!("upload_materials", user_id = session.user_id);

    let mut uploaded = Vec::new();
    let mut saw_file = false;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                let error = ApiError::BadRequest(format!("Invalid multipart payload: {}", e));
                return Err(error
                    .to_response_with_context(ErrorContext::new("upload_materials", "material")));
            }
        };

        if field.name() != Some("files") {
            continue;
        }

        let Some(filename) = field.file_name().map(|f| f.to_string()) else {
            continue;
        };
        if filename.is_empty() {
            continue;
        }
        saw_file = true;

        if !filename.to_lowercase().ends_with(".pdf") {
            warn!(filename = %filename, "Skipping non-PDF upload");
            continue;
        }

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(filename = %filename, error = %e, "Failed to read upload, skipping");
                continue;
            }
        };

        match process_upload(&state, &session, &filename, &bytes).await {
            Ok(material) => uploaded.push(material),
            Err(e) => {
                error!(filename = %filename, error = %e, "Error processing uploaded file");
                continue;
            }
        }
    }

    if !saw_file {
        let error = ApiError::BadRequest("No files provided".to_string());
        return Err(
            error.to_response_with_context(ErrorContext::new("upload_materials", "material"))
        );
    }

    if uploaded.is_empty() {
        let error = ApiError::BadRequest("Failed to process files".to_string());
        return Err(
            error.to_response_with_context(ErrorContext::new("upload_materials", "material"))
        );
    }

    log_api_success!(
        "upload_materials",
        count = uploaded.len(),
        "files uploaded and processed"
    );

    Ok(Json(ApiResponse::success(json!({
        "message": format!("{} file(s) uploaded successfully", uploaded.len()),
        "materials": uploaded,
    }))))
}

/// Save the file, extract its text, and build the material with its initial
/// AI-derived artifacts. Generation failures degrade; extraction failure
/// skips the file.
async fn process_upload(
    state: &AppState,
    session: &Session,
    filename: &str,
    bytes: &[u8],
) -> anyhow::Result<UploadedMaterial> {
    let stored_name = format!("{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), filename);
    let file_path = std::path::Path::new(&state.upload.directory)
        .join(&stored_name)
        .to_string_lossy()
        .to_string();
    tokio::fs::write(&file_path, bytes).await?;

    let text_content = pdf_text::extract_text(bytes)?;

    let title = title_from_filename(filename);
    let summary = state
        .ai_service
        .generate_summary(&text_content, "standard")
        .await;
    let subject = state.ai_service.detect_subject(&text_content).await;

    let material = state
        .material_service
        .store_material(NewMaterial {
            user_id: session.user_id,
            title: title.clone(),
            subject: subject.clone(),
            file_type: "pdf".to_string(),
            file_path: Some(file_path),
            text_content: text_content.clone(),
            summary: Some(summary),
        })
        .await?;

    let flashcards = state
        .ai_service
        .generate_flashcards(&text_content, UPLOAD_FLASHCARD_COUNT)
        .await;
    if !flashcards.is_empty() {
        state
            .material_service
            .replace_flashcards(material.id, &flashcards)
            .await?;
    }

    let quiz = state
        .ai_service
        .generate_quiz(&text_content, UPLOAD_QUIZ_COUNT)
        .await;
    if !quiz.is_empty() {
        state
            .material_service
            .replace_quiz_questions(material.id, &quiz)
            .await?;
    }

    state
        .material_service
        .record_activity(session.user_id, Some(material.id), "upload")
        .await?;

    info!(
        material_id = %material.id,
        title = %material.title,
        subject = %material.subject,
        flashcard_count = flashcards.len(),
        quiz_count = quiz.len(),
        "Uploaded material processed"
    );

    Ok(UploadedMaterial {
        id: material.id,
        title: material.title,
        subject: material.subject,
    })
}

// On-demand generation endpoints

pub async fn generate_summary(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(request): Json<GenerateSummaryRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ErrorResponse> {
    let session = require_session(&jar, &state, "generate_summary")?;

    let material = load_material(&state, &session, id, "generate_summary").await?;

    let difficulty = request.difficulty.as_deref().unwrap_or("standard");
    let summary = state
        .ai_service
        .generate_summary(&material.text_content, difficulty)
        .await;

    state
        .material_service
        .update_summary(id, &summary)
        .await
        .map_err(|e| {
            ApiError::DatabaseError(e).to_response_with_context(
                ErrorContext::new("generate_summary", "material").with_id(&id.to_string()),
            )
        })?;

    log_api_success!("generate_summary", material_id = id, "summary regenerated");

    Ok(Json(ApiResponse::success(json!({ "summary": summary }))))
}

pub async fn generate_flashcards(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(request): Json<GenerateFlashcardsRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ErrorResponse> {
    let session = require_session(&jar, &state, "generate_flashcards")?;
    log_api_start!("generate_flashcards", material_id = id);

    let material = load_material(&state, &session, id, "generate_flashcards").await?;

    let requested = request.num_cards.unwrap_or(DEFAULT_REGEN_COUNT);
    let cards = state
        .ai_service
        .generate_flashcards(&material.text_content, requested)
        .await;

    if cards.is_empty() {
        log_api_warn!("generate_flashcards", material_id = id, "generation produced no cards");
        let error = ApiError::InternalError("Failed to generate flashcards".to_string());
        return Err(error.to_response_with_context(
            ErrorContext::new("generate_flashcards", "flashcard").with_id(&id.to_string()),
        ));
    }

    let stored = state
        .material_service
        .replace_flashcards(id, &cards)
        .await
        .map_err(|e| {
            ApiError::DatabaseError(e).to_response_with_context(
                ErrorContext::new("generate_flashcards", "flashcard").with_id(&id.to_string()),
            )
        })?;

    log_api_success!(
        "generate_flashcards",
        count = stored.len(),
        "flashcards regenerated"
    );

    Ok(Json(ApiResponse::success(json!({
        "flashcards": stored,
        "message": format!("{} flashcards generated successfully", stored.len()),
    }))))
}

pub async fn generate_quiz(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(request): Json<GenerateQuizRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ErrorResponse> {
    let session = require_session(&jar, &state, "generate_quiz")?;
    log_api_start!("generate_quiz", material_id = id);

    let material = load_material(&state, &session, id, "generate_quiz").await?;

    let requested = request.num_questions.unwrap_or(DEFAULT_REGEN_COUNT);
    let items = state
        .ai_service
        .generate_quiz(&material.text_content, requested)
        .await;

    if items.is_empty() {
        log_api_warn!("generate_quiz", material_id = id, "generation produced no questions");
        let error = ApiError::InternalError("Failed to generate quiz questions".to_string());
        return Err(error.to_response_with_context(
            ErrorContext::new("generate_quiz", "quiz").with_id(&id.to_string()),
        ));
    }

    let stored = state
        .material_service
        .replace_quiz_questions(id, &items)
        .await
        .map_err(|e| {
            ApiError::DatabaseError(e).to_response_with_context(
                ErrorContext::new("generate_quiz", "quiz").with_id(&id.to_string()),
            )
        })?;

    log_api_success!("generate_quiz", count = stored.len(), "quiz regenerated");

    Ok(Json(ApiResponse::success(json!({
        "quiz": stored,
        "message": format!("{} quiz questions generated successfully", stored.len()),
    }))))
}

// Quiz submission

pub async fn submit_quiz(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitQuizRequest>,
) -> Result<Json<ApiResponse<QuizResult>>, ErrorResponse> {
    let session = require_session(&jar, &state, "submit_quiz")?;
    log_api_start!("submit_quiz", material_id = id);

    load_material(&state, &session, id, "submit_quiz").await?;

    match state
        .material_service
        .submit_quiz(session.user_id, id, &request.answers)
        .await
    {
        Ok(result) => {
            info!(
                material_id = %id,
                score = result.score,
                total = result.total,
                "Quiz attempt recorded"
            );
            Ok(Json(ApiResponse::success(result)))
        }
        Err(e) => {
            let context = ErrorContext::new("submit_quiz", "quiz").with_id(&id.to_string());
            Err(ApiError::DatabaseError(e).to_response_with_context(context))
        }
    }
}

// Chat

pub async fn chat(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ErrorResponse> {
    let session = require_session(&jar, &state, "chat")?;

    if !state.ai_service.is_configured() {
        let error = ApiError::AiError("AI service not available".to_string());
        return Err(error.to_response_with_context(ErrorContext::new("chat", "material")));
    }

    if request.message.trim().is_empty() {
        let error = ApiError::BadRequest("No message provided".to_string());
        return Err(error.to_response_with_context(ErrorContext::new("chat", "material")));
    }

    // Ground the answer in the material text when one is referenced
    let context = match request.material_id {
        Some(material_id) => state
            .material_service
            .get_material(material_id, session.user_id)
            .await
            .ok()
            .flatten()
            .map(|material| material.text_content),
        None => None,
    };

    match state
        .ai_service
        .chat(&request.message, context.as_deref())
        .await
    {
        Ok(response) => Ok(Json(ApiResponse::success(json!({ "response": response })))),
        Err(e) => {
            error!(error = %e, "Chat completion failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to generate response".to_string())),
            ))
        }
    }
}

// Deletion and analytics

pub async fn delete_material(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<bool>>, ErrorResponse> {
    let session = require_session(&jar, &state, "delete_material")?;
    log_api_start!("delete_material", material_id = id);

    let material = load_material(&state, &session, id, "delete_material").await?;

    match state.material_service.delete_material(&material).await {
        Ok(()) => {
            log_api_success!("delete_material", material_id = id, "material deleted");
            Ok(Json(ApiResponse::success(true)))
        }
        Err(e) => {
            let context = ErrorContext::new("delete_material", "material").with_id(&id.to_string());
            Err(ApiError::DatabaseError(e).to_response_with_context(context))
        }
    }
}

pub async fn growth(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<ApiResponse<GrowthReport>>, ErrorResponse> {
    let session = require_session(&jar, &state, "growth")?;

    match state.material_service.growth_report(session.user_id).await {
        Ok(report) => Ok(Json(ApiResponse::success(report))),
        Err(e) => {
            let context = ErrorContext::new("growth", "analytics");
            Err(ApiError::DatabaseError(e).to_response_with_context(context))
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.upload.max_file_bytes;

    Router::new()
        // Auth routes
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        // Dashboard and material routes
        .route("/api/dashboard", get(dashboard))
        .route("/api/materials", get(list_materials))
        .route("/api/materials/:id", get(get_material))
        .route("/api/materials/:id", delete(delete_material))
        .route("/api/materials/:id/flashcards", get(get_flashcards))
        .route("/api/materials/:id/quiz", get(get_quiz))
        // Upload
        .route("/api/upload", post(upload_materials))
        // Generation routes
        .route("/api/materials/:id/summary", post(generate_summary))
        .route("/api/materials/:id/flashcards", post(generate_flashcards))
        .route("/api/materials/:id/quiz", post(generate_quiz))
        // Quiz submission
        .route("/api/materials/:id/quiz/submit", post(submit_quiz))
        // Chat
        .route("/api/chat", post(chat))
        // Analytics
        .route("/api/growth", get(growth))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
