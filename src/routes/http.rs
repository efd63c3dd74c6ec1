//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, State},
  http::header,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::booking::IKR_ACCOUNTS;
use crate::calculation::StepKey;
use crate::error::AppError;
use crate::letter::LetterFields;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_post_task(
  State(state): State<Arc<AppState>>,
  Json(req): Json<TaskRequest>,
) -> Result<Json<TaskView>, AppError> {
  let view = new_task(&state, req).await?;
  info!(target: "exercise", ?req, "HTTP task served");
  Ok(Json(view))
}

#[instrument(level = "info", skip(state, body), fields(%id, kind = ?body.kind()))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<AnswerPayload>,
) -> Result<Json<Evaluation>, AppError> {
  let evaluation = evaluate_answer(&state, &id, body).await?;
  Ok(Json(evaluation))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_solution(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SolutionOut>, AppError> {
  Ok(Json(get_solution(&state, &id).await?))
}

#[instrument(level = "info", skip(state), fields(%id, ?key))]
pub async fn http_get_explain(
  State(state): State<Arc<AppState>>,
  Path((id, key)): Path<(String, StepKey)>,
) -> Result<Json<ExplainOut>, AppError> {
  Ok(Json(explain_step(&state, &id, key).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_sketch(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
  let svg = sketch_svg(&state, &id).await?;
  Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

#[instrument(level = "info", skip(state, body), fields(%id, criteria = body.ratings.len()))]
pub async fn http_post_ranking(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<RankingIn>,
) -> Result<impl IntoResponse, AppError> {
  let ranking = rank_offers(&state, &id, &body.ratings).await?;
  Ok(Json(ranking))
}

#[instrument(level = "info", skip(body), fields(subject_len = body.subject.len()))]
pub async fn http_post_letter_check(Json(body): Json<LetterFields>) -> impl IntoResponse {
  let out = check_letter(&body);
  info!(target: "exercise", all_ok = out.report.all_ok, file_name = %out.file_name, "HTTP letter checked");
  Json(out)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_letter_scenarios(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(state.letters.as_ref().clone())
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_random_scenario(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
  let scenario = {
    let mut rng = rand::thread_rng();
    state.letters.random_scenario(&mut rng).cloned()
  };
  let scenario = scenario.ok_or_else(|| AppError::NotFound("letter scenario".into()))?;
  info!(target: "exercise", id = %scenario.id, "HTTP letter scenario served");
  Ok(Json(scenario))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_assignment(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
  let assignment = state
    .letters
    .assignment(&id)
    .cloned()
    .ok_or_else(|| AppError::NotFound(format!("letter assignment {}", id)))?;
  Ok(Json(assignment))
}

#[instrument(level = "info")]
pub async fn http_get_accounts() -> impl IntoResponse {
  Json(IKR_ACCOUNTS)
}

#[instrument(level = "info", skip(state, body), fields(class = %body.student_class))]
pub async fn http_post_exam(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StartExamIn>,
) -> Result<impl IntoResponse, AppError> {
  let view = start_exam(&state, &body.student_name, &body.student_class).await?;
  info!(target: "exam", id = %view.id, total = view.total, "HTTP exam started");
  Ok(Json(view))
}

#[instrument(level = "info", skip(state, body), fields(%id, lines = body.lines.len()))]
pub async fn http_post_exam_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<ExamAnswerIn>,
) -> Result<Json<ExamAnswerOut>, AppError> {
  Ok(Json(answer_exam(&state, &id, body.lines).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_certificate(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
  let certificate = exam_certificate(&state, &id).await?;
  info!(target: "exam", %id, grade = certificate.grade, "HTTP certificate issued");
  Ok(Json(certificate))
}
