use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{NaiveDateTime, Utc};
use diesel::SqliteConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::AppState;
use crate::app::FlashcardApp;
use crate::error::SessionError;
use crate::model::{Card, NewCard};
use crate::quiz::{QuizQuestion, QuizReport};
use crate::stats::{self, Difficulty};
use crate::store::{self, StoreError};
use crate::study::StudySummary;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Card not found")]
    CardNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Session(e) => (StatusCode::CONFLICT, e.to_string()),
            ApiError::CardNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = json!({
            "error": message,
            "status": status.as_u16()
        });

        (status, axum::Json(body)).into_response()
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

// View types

#[derive(Serialize)]
pub struct CardView {
    pub position: usize,
    pub card_id: i32,
    pub prompt: String,
    pub response: String,
    pub media_ref: Option<String>,
    pub correct_count: i32,
    pub wrong_count: i32,
    pub last_answered_at: Option<NaiveDateTime>,
    pub ease_factor: f32,
    pub interval_days: i32,
    pub next_review_at: Option<NaiveDateTime>,
    pub difficulty: Difficulty,
}

fn card_view(position: usize, card: &Card) -> CardView {
    CardView {
        position,
        card_id: card.card_id,
        prompt: card.prompt.clone(),
        response: card.response.clone(),
        media_ref: card.media_ref.clone(),
        correct_count: card.correct_count,
        wrong_count: card.wrong_count,
        last_answered_at: card.last_answered_at,
        ease_factor: card.ease_factor,
        interval_days: card.interval_days,
        next_review_at: card.next_review_at,
        difficulty: stats::difficulty(card),
    }
}

#[derive(Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Deserialize)]
pub struct AnswerRequest {
    pub correct: bool,
}

#[derive(Deserialize)]
pub struct CreateCardsRequest {
    pub cards: Vec<NewCard>,
}

#[derive(Serialize)]
pub struct CreateCardsResponse {
    pub created: usize,
    pub skipped: usize,
    pub total_cards: usize,
}

#[derive(Deserialize)]
pub struct RateRequest {
    pub quality: i32,
}

#[derive(Serialize)]
pub struct StudyStateResponse {
    pub total_cards: usize,
    pub remaining: usize,
    pub completed: usize,
    pub current_streak: i32,
    pub best_streak: i32,
    pub session_correct: i32,
    pub session_wrong: i32,
    pub card: Option<CardView>,
    pub summary: Option<StudySummary>,
}

#[derive(Serialize)]
pub struct StudyAnswerResponse {
    pub current_streak: i32,
    pub best_streak: i32,
    pub completed: bool,
    pub remaining: usize,
    pub summary: Option<StudySummary>,
}

#[derive(Serialize)]
pub struct ReviewStateResponse {
    pub mistakes_total: usize,
    pub remaining: usize,
    pub nothing_to_review: bool,
    pub card: Option<CardView>,
}

#[derive(Serialize)]
pub struct ReviewAnswerResponse {
    pub completed: bool,
    pub mistakes_left: usize,
}

#[derive(Serialize)]
pub struct QuizStartResponse {
    pub total: usize,
}

#[derive(Serialize)]
pub struct QuizStateResponse {
    pub remaining: usize,
    pub answered: i32,
    pub question: Option<QuizQuestion>,
    pub report: Option<QuizReport>,
}

#[derive(Serialize)]
pub struct QuizAnswerResponse {
    pub completed: bool,
    pub report: Option<QuizReport>,
}

// Library handlers

pub async fn list_cards(State(state): State<AppState>) -> Json<Vec<CardView>> {
    let core = state.core.lock().expect("scheduler lock");
    let views = core
        .cards()
        .iter()
        .enumerate()
        .map(|(position, card)| card_view(position, card))
        .collect();
    Json(views)
}

#[axum::debug_handler]
pub async fn create_cards(
    State(state): State<AppState>,
    Json(payload): Json<CreateCardsRequest>,
) -> Result<Json<CreateCardsResponse>, ApiError> {
    let mut core = state.core.lock().expect("scheduler lock");
    let (created, skipped) = core.add_cards(payload.cards, &mut rand::thread_rng());

    if created > 0 {
        let mut conn = connection(&state)?;
        store::save_cards(&mut conn, core.cards())?;
        store::save_progress(&mut conn, &core.study_progress())?;
        store::save_next_card_id(&mut conn, core.next_card_id())?;
    }

    Ok(Json(CreateCardsResponse {
        created,
        skipped,
        total_cards: core.cards().len(),
    }))
}

pub async fn delete_card(
    State(state): State<AppState>,
    Path(position): Path<usize>,
) -> Result<Json<ApiResponse>, ApiError> {
    let mut core = state.core.lock().expect("scheduler lock");
    core.delete_card(position).ok_or(ApiError::CardNotFound)?;

    let mut conn = connection(&state)?;
    store::save_cards(&mut conn, core.cards())?;
    store::save_mistakes(&mut conn, core.mistakes().positions())?;
    store::save_progress(&mut conn, &core.study_progress())?;

    Ok(Json(ApiResponse {
        success: true,
        message: "Card deleted".to_string(),
    }))
}

pub async fn clear_cards(State(state): State<AppState>) -> Result<Json<ApiResponse>, ApiError> {
    let mut core = state.core.lock().expect("scheduler lock");
    core.clear_all();

    let mut conn = connection(&state)?;
    store::clear_all(&mut conn)?;

    Ok(Json(ApiResponse {
        success: true,
        message: "All cards deleted".to_string(),
    }))
}

pub async fn rate_card(
    State(state): State<AppState>,
    Path(position): Path<usize>,
    Json(payload): Json<RateRequest>,
) -> Result<Json<CardView>, ApiError> {
    let mut core = state.core.lock().expect("scheduler lock");
    core.rate_card(position, payload.quality, now())
        .ok_or(ApiError::CardNotFound)?;

    let mut conn = connection(&state)?;
    store::save_cards(&mut conn, core.cards())?;

    let card = core.card(position).ok_or(ApiError::CardNotFound)?;
    Ok(Json(card_view(position, card)))
}

// Study handlers

pub async fn study_state(State(state): State<AppState>) -> Json<StudyStateResponse> {
    let core = state.core.lock().expect("scheduler lock");
    Json(build_study_state(&core))
}

fn build_study_state(core: &FlashcardApp) -> StudyStateResponse {
    let card = core
        .study()
        .current_position()
        .and_then(|position| core.card(position).map(|card| card_view(position, card)));
    let complete = core.study().is_complete();
    StudyStateResponse {
        total_cards: core.cards().len(),
        remaining: core.study().remaining(),
        completed: core.cards().len().saturating_sub(core.study().remaining()),
        current_streak: core.study().current_streak(),
        best_streak: core.study().best_streak(),
        session_correct: core.study().session_correct(),
        session_wrong: core.study().session_wrong(),
        card,
        summary: complete.then(|| core.study_summary()),
    }
}

#[axum::debug_handler]
pub async fn study_answer(
    State(state): State<AppState>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<StudyAnswerResponse>, ApiError> {
    let mut core = state.core.lock().expect("scheduler lock");
    let outcome = core.study_answer(payload.correct, now())?;

    let mut conn = connection(&state)?;
    store::save_cards(&mut conn, core.cards())?;
    store::save_mistakes(&mut conn, core.mistakes().positions())?;
    store::save_progress(&mut conn, &core.study_progress())?;
    if outcome.new_best {
        store::save_best_streak(&mut conn, outcome.best_streak)?;
    }

    Ok(Json(StudyAnswerResponse {
        current_streak: outcome.current_streak,
        best_streak: outcome.best_streak,
        completed: outcome.completed,
        remaining: core.study().remaining(),
        summary: outcome.completed.then(|| core.study_summary()),
    }))
}

// Review handlers

pub async fn review_state(State(state): State<AppState>) -> Json<ReviewStateResponse> {
    let mut core = state.core.lock().expect("scheduler lock");
    let card = core
        .current_review_position(&mut rand::thread_rng())
        .and_then(|position| core.card(position).map(|card| card_view(position, card)));
    Json(ReviewStateResponse {
        mistakes_total: core.mistakes().len(),
        remaining: core.review_remaining(),
        nothing_to_review: card.is_none(),
        card,
    })
}

pub async fn review_answer(
    State(state): State<AppState>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<ReviewAnswerResponse>, ApiError> {
    let mut core = state.core.lock().expect("scheduler lock");
    let outcome = core.review_answer(payload.correct)?;

    let mut conn = connection(&state)?;
    store::save_mistakes(&mut conn, core.mistakes().positions())?;

    Ok(Json(ReviewAnswerResponse {
        completed: outcome.completed,
        mistakes_left: outcome.mistakes_left,
    }))
}

// Quiz handlers

pub async fn start_quiz(State(state): State<AppState>) -> Json<QuizStartResponse> {
    let mut core = state.core.lock().expect("scheduler lock");
    let total = core.start_quiz(&mut rand::thread_rng());
    Json(QuizStartResponse { total })
}

pub async fn quiz_state(State(state): State<AppState>) -> Json<QuizStateResponse> {
    let core = state.core.lock().expect("scheduler lock");
    let question = core.quiz_question(&mut rand::thread_rng());
    let complete = core.quiz().is_complete();
    Json(QuizStateResponse {
        remaining: core.quiz().remaining(),
        answered: core.quiz().answered(),
        question,
        report: complete.then(|| core.quiz_report()),
    })
}

pub async fn quiz_answer(
    State(state): State<AppState>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<QuizAnswerResponse>, ApiError> {
    let mut core = state.core.lock().expect("scheduler lock");
    let outcome = core.quiz_answer(payload.correct)?;
    Ok(Json(QuizAnswerResponse {
        completed: outcome.completed,
        report: outcome.completed.then(|| core.quiz_report()),
    }))
}

// Statistics and progress handlers

pub async fn overall_stats(State(state): State<AppState>) -> Json<stats::OverallStats> {
    let core = state.core.lock().expect("scheduler lock");
    Json(stats::overall(core.cards()))
}

pub async fn reset_progress(State(state): State<AppState>) -> Result<Json<ApiResponse>, ApiError> {
    let mut core = state.core.lock().expect("scheduler lock");
    core.reset_progress(&mut rand::thread_rng());

    let mut conn = connection(&state)?;
    store::save_cards(&mut conn, core.cards())?;
    store::save_mistakes(&mut conn, core.mistakes().positions())?;
    store::save_progress(&mut conn, &core.study_progress())?;

    Ok(Json(ApiResponse {
        success: true,
        message: "Progress reset".to_string(),
    }))
}

fn connection(
    state: &AppState,
) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>, ApiError>
{
    state.pool.get().map_err(StoreError::from).map_err(Into::into)
}
