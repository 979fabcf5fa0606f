//! services/api/src/web/quiz.rs
//!
//! Quiz endpoints: drawing questions, grading submissions, history, and the
//! admin-only question bank writes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use edugen_core::domain::{
    Answer, Difficulty, GradedAnswer, NewQuestion, Question, QuizResult, QuizSubmission,
};
use edugen_core::ports::PortResult;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{reject, Rejection};
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::users::{MessageResponse, UserResponse};

pub const DEFAULT_QUESTION_LIMIT: usize = 10;
pub const MAX_QUESTION_LIMIT: usize = 50;
pub const HISTORY_SIZE: usize = 20;
pub const DEFAULT_QUESTION_XP: u32 = 10;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct QuestionQuery {
    pub subject: Option<String>,
    pub difficulty: Option<String>,
    pub limit: Option<usize>,
}

/// A question as shown to a quiz taker: no answer, no explanation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: Uuid,
    pub subject: String,
    pub difficulty: String,
    pub question: String,
    pub options: Vec<String>,
    pub xp_reward: u32,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            subject: q.subject,
            difficulty: q.difficulty.as_str().to_string(),
            question: q.prompt,
            options: q.options,
            xp_reward: q.xp_reward,
        }
    }
}

/// The full question, for administrators.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub id: Uuid,
    pub subject: String,
    pub difficulty: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: u8,
    pub explanation: String,
    pub xp_reward: u32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Question> for QuestionResponse {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            subject: q.subject,
            difficulty: q.difficulty.as_str().to_string(),
            question: q.prompt,
            options: q.options,
            correct_answer: q.answer,
            explanation: q.explanation,
            xp_reward: q.xp_reward,
            created_by: q.created_by,
            created_at: q.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    pub subject: String,
    pub difficulty: String,
    pub question: String,
    pub options: Vec<String>,
    #[serde(alias = "answer")]
    pub correct_answer: u8,
    #[serde(default)]
    pub explanation: String,
    pub xp_reward: Option<u32>,
}

impl QuestionRequest {
    pub fn into_new_question(self) -> PortResult<NewQuestion> {
        let question = NewQuestion {
            subject: self.subject.trim().to_string(),
            difficulty: self.difficulty.parse()?,
            prompt: self.question.trim().to_string(),
            options: self.options,
            answer: self.correct_answer,
            explanation: self.explanation,
            xp_reward: self.xp_reward.unwrap_or(DEFAULT_QUESTION_XP),
        };
        question.validate()?;
        Ok(question)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub question_id: Uuid,
    /// Out-of-range values (for example -1 for "skipped") grade as incorrect.
    pub selected_option: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizRequest {
    pub subject: String,
    pub difficulty: String,
    pub answers: Vec<AnswerRequest>,
    /// Seconds spent on the quiz.
    pub time_taken: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradedAnswerResponse {
    pub question_id: Uuid,
    pub selected_option: u8,
    pub is_correct: bool,
    pub correct_answer: Option<u8>,
    pub explanation: String,
}

impl From<&GradedAnswer> for GradedAnswerResponse {
    fn from(a: &GradedAnswer) -> Self {
        Self {
            question_id: a.question_id,
            selected_option: a.selected_option,
            is_correct: a.correct,
            correct_answer: a.correct_option,
            explanation: a.explanation.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizResultResponse {
    pub id: Uuid,
    pub subject: String,
    pub difficulty: String,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub accuracy: u32,
    pub time_taken: u32,
    pub xp_earned: u64,
    pub answers: Vec<GradedAnswerResponse>,
    pub created_at: DateTime<Utc>,
}

impl From<&QuizResult> for QuizResultResponse {
    fn from(r: &QuizResult) -> Self {
        Self {
            id: r.id,
            subject: r.subject.clone(),
            difficulty: r.difficulty.as_str().to_string(),
            total_questions: r.total_questions,
            correct_answers: r.correct_answers,
            accuracy: r.accuracy,
            time_taken: r.time_taken_secs,
            xp_earned: r.xp_earned,
            answers: r.answers.iter().map(GradedAnswerResponse::from).collect(),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizResponse {
    pub result: QuizResultResponse,
    pub correct: u32,
    pub total: u32,
    pub accuracy: u32,
    pub xp_earned: u64,
    pub user: UserResponse,
}

fn parse_difficulty(raw: &str) -> Result<Difficulty, Rejection> {
    raw.parse::<Difficulty>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /quiz/questions - A shuffled set of questions without their answers
///
/// Falls back to the whole bank when the filter matches nothing.
#[utoipa::path(
    get,
    path = "/quiz/questions",
    params(QuestionQuery),
    responses(
        (status = 200, description = "Questions for a quiz", body = [PublicQuestion]),
        (status = 400, description = "Unknown difficulty")
    )
)]
pub async fn get_questions_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QuestionQuery>,
) -> Result<Json<Vec<PublicQuestion>>, Rejection> {
    let difficulty = query.difficulty.as_deref().map(parse_difficulty).transpose()?;
    let subject = query.subject.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let limit = query
        .limit
        .unwrap_or(DEFAULT_QUESTION_LIMIT)
        .clamp(1, MAX_QUESTION_LIMIT);

    let mut questions = state
        .db
        .find_questions(subject, difficulty)
        .await
        .map_err(|e| reject("Load questions", e))?;
    if questions.is_empty() && (subject.is_some() || difficulty.is_some()) {
        debug!(?subject, ?difficulty, "No questions match the filter, using the whole bank");
        questions = state
            .db
            .find_questions(None, None)
            .await
            .map_err(|e| reject("Load questions", e))?;
    }

    questions.shuffle(&mut rand::thread_rng());
    questions.truncate(limit);
    Ok(Json(questions.into_iter().map(PublicQuestion::from).collect()))
}

/// POST /quiz/submit - Grade answers, store the result and credit XP
#[utoipa::path(
    post,
    path = "/quiz/submit",
    request_body = SubmitQuizRequest,
    responses(
        (status = 201, description = "Graded result", body = SubmitQuizResponse),
        (status = 400, description = "No answers or unknown difficulty")
    )
)]
pub async fn submit_quiz_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<(StatusCode, Json<SubmitQuizResponse>), Rejection> {
    let submission = QuizSubmission {
        subject: req.subject.trim().to_string(),
        difficulty: parse_difficulty(&req.difficulty)?,
        answers: req
            .answers
            .iter()
            .map(|a| Answer {
                question_id: a.question_id,
                selected_option: u8::try_from(a.selected_option).unwrap_or(u8::MAX),
            })
            .collect(),
        time_taken_secs: req.time_taken.unwrap_or(0),
    };

    let outcome = state
        .ledger
        .submit_quiz(user.id, submission)
        .await
        .map_err(|e| reject("Submit quiz", e))?;

    let result = &outcome.result;
    Ok((
        StatusCode::CREATED,
        Json(SubmitQuizResponse {
            correct: result.correct_answers,
            total: result.total_questions,
            accuracy: result.accuracy,
            xp_earned: result.xp_earned,
            result: QuizResultResponse::from(result),
            user: UserResponse::from(&outcome.account),
        }),
    ))
}

/// GET /quiz/history - The caller's most recent results
#[utoipa::path(
    get,
    path = "/quiz/history",
    responses((status = 200, description = "Newest results first", body = [QuizResultResponse]))
)]
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<QuizResultResponse>>, Rejection> {
    let results = state
        .db
        .list_quiz_results(user.id, HISTORY_SIZE)
        .await
        .map_err(|e| reject("Load quiz history", e))?;
    Ok(Json(results.iter().map(QuizResultResponse::from).collect()))
}

/// GET /quiz/result/{id} - One of the caller's results
#[utoipa::path(
    get,
    path = "/quiz/result/{id}",
    params(("id" = Uuid, Path, description = "Result id")),
    responses(
        (status = 200, description = "The result", body = QuizResultResponse),
        (status = 404, description = "No such result for this account")
    )
)]
pub async fn result_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(result_id): Path<Uuid>,
) -> Result<Json<QuizResultResponse>, Rejection> {
    let result = state
        .db
        .get_quiz_result(user.id, result_id)
        .await
        .map_err(|e| reject("Load quiz result", e))?;
    Ok(Json(QuizResultResponse::from(&result)))
}

/// POST /quiz/questions - Add a question to the bank (admin)
#[utoipa::path(
    post,
    path = "/quiz/questions",
    request_body = QuestionRequest,
    responses(
        (status = 201, description = "Question created", body = QuestionResponse),
        (status = 400, description = "Invalid question"),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn create_question_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<QuestionRequest>,
) -> Result<(StatusCode, Json<QuestionResponse>), Rejection> {
    let question = req
        .into_new_question()
        .map_err(|e| reject("Create question", e))?;
    let question = state
        .db
        .create_question(question, user.id, state.ledger.now())
        .await
        .map_err(|e| reject("Create question", e))?;

    info!(question_id = %question.id, created_by = %user.id, "Question created");
    Ok((StatusCode::CREATED, Json(QuestionResponse::from(question))))
}

/// DELETE /quiz/questions/{id} - Remove a question from the bank (admin)
#[utoipa::path(
    delete,
    path = "/quiz/questions/{id}",
    params(("id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 200, description = "Question deleted", body = MessageResponse),
        (status = 404, description = "No such question")
    )
)]
pub async fn delete_question_handler(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, Rejection> {
    state
        .db
        .delete_question(question_id)
        .await
        .map_err(|e| reject("Delete question", e))?;
    info!(question_id = %question_id, "Question deleted");
    Ok(Json(MessageResponse::new("Question deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use edugen_core::ports::PortError;

    fn request() -> QuestionRequest {
        QuestionRequest {
            subject: " Physics ".to_string(),
            difficulty: "Hard".to_string(),
            question: "Unit of force?".to_string(),
            options: vec!["Joule".into(), "Newton".into(), "Watt".into(), "Pascal".into()],
            correct_answer: 1,
            explanation: String::new(),
            xp_reward: None,
        }
    }

    #[test]
    fn question_request_defaults_and_trims() {
        let q = request().into_new_question().unwrap();
        assert_eq!(q.subject, "Physics");
        assert_eq!(q.difficulty, Difficulty::Hard);
        assert_eq!(q.xp_reward, DEFAULT_QUESTION_XP);
    }

    #[test]
    fn question_request_rejects_bad_difficulty_and_answer() {
        let mut bad = request();
        bad.difficulty = "Impossible".to_string();
        assert!(matches!(bad.into_new_question(), Err(PortError::Invalid(_))));

        let mut bad = request();
        bad.correct_answer = 4;
        assert!(matches!(bad.into_new_question(), Err(PortError::Invalid(_))));
    }

    #[test]
    fn submission_accepts_camel_case_and_negative_options() {
        let json = serde_json::json!({
            "subject": "Physics",
            "difficulty": "Easy",
            "answers": [{"questionId": Uuid::nil(), "selectedOption": -1}],
            "timeTaken": 42
        });
        let req: SubmitQuizRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.answers[0].selected_option, -1);
        assert_eq!(req.time_taken, Some(42));
    }
}
