//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Generating exercises from a request and storing them
//!   - Evaluating answers per exercise family
//!   - Solutions, step explanations, sketches and the offer decision matrix
//!   - Letter checks and the address exam flow

use rand::Rng;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::address::{check_lines, score_lines, Certificate, Exam, ExamView};
use crate::booking;
use crate::calculation::{explain, generate_task, StepKey};
use crate::domain::{Exercise, ExerciseKind};
use crate::error::AppError;
use crate::geometry::{circle, composite, rectangle, sketch::render_svg, triangle, Topic};
use crate::letter::{export_file_name, validate_letter, LetterFields};
use crate::offer::{self, Ranking, Rating};
use crate::protocol::{
  to_view, AnswerPayload, Evaluation, ExamAnswerOut, ExplainOut, LetterCheckOut, SolutionOut, TaskRequest, TaskView,
};
use crate::config::ToleranceConfig;
use crate::state::AppState;
use crate::util::format_de;
use crate::validation::{FieldFeedback, Verdict};

/// Build an exercise without touching the store. The rng is injected so
/// tests can seed it.
pub fn build_exercise<R: Rng + ?Sized>(state: &AppState, req: TaskRequest, rng: &mut R) -> Result<Exercise, AppError> {
  let ex = match req {
    TaskRequest::Calculation { schema, direction } => {
      Exercise::Calculation(generate_task(rng, schema, direction, &state.calc_ranges)?)
    }
    TaskRequest::Geometry { topic, mode } => Exercise::Geometry(match topic {
      Topic::Rectangle => rectangle::generate(rng, &state.geometry),
      Topic::Triangle => triangle::generate(rng, mode, &state.geometry)?,
      Topic::Circle => circle::generate(rng, &state.geometry),
      Topic::MixedArea => composite::generate(rng, &state.geometry),
    }),
    TaskRequest::Booking => Exercise::Booking(booking::generate(rng)?),
    TaskRequest::Address => {
      let exercise = state
        .address_bank
        .pick(rng)
        .cloned()
        .ok_or_else(|| AppError::NotFound("address exercise".into()))?;
      Exercise::Address { id: Uuid::new_v4().to_string(), exercise }
    }
    TaskRequest::Offer => Exercise::Offer(offer::generate(rng)?),
  };
  Ok(ex)
}

#[instrument(level = "info", skip(state))]
pub async fn new_task(state: &AppState, req: TaskRequest) -> Result<TaskView, AppError> {
  // thread_rng is not Send; keep it out of the await below.
  let ex = {
    let mut rng = rand::thread_rng();
    build_exercise(state, req, &mut rng)?
  };
  let view = to_view(&ex);
  info!(target: "exercise", id = %ex.id(), kind = ?ex.kind(), "Task generated");
  state.insert_task(ex).await;
  Ok(view)
}

async fn load_task(state: &AppState, task_id: &str) -> Result<Exercise, AppError> {
  state
    .get_task(task_id)
    .await
    .ok_or_else(|| AppError::NotFound(format!("task {}", task_id)))
}

fn summary(fields: &[FieldFeedback], required: usize) -> (bool, String) {
  let right = fields.iter().filter(|f| f.verdict.is_correct()).count();
  let correct = required > 0 && right == required && fields.len() == required;
  let message = if correct {
    "Alles richtig!".to_string()
  } else {
    format!("{} von {} Feldern richtig.", right, required)
  };
  (correct, message)
}

/// Check a submission against a stored exercise. Malformed numbers become
/// `unparsable` verdicts, never errors.
pub fn evaluate_exercise(ex: &Exercise, answer: AnswerPayload, tol: &ToleranceConfig) -> Result<Evaluation, AppError> {
  let kind = ex.kind();
  let mismatch = AppError::KindMismatch { expected: kind, actual: answer.kind() };
  let mut booking_check = None;
  let mut note = None;

  let (fields, required) = match (ex, answer) {
    (Exercise::Calculation(t), AnswerPayload::Calculation { inputs }) => {
      let fields: Vec<FieldFeedback> = t
        .check(&inputs, tol.money)
        .into_iter()
        .map(|(key, verdict)| FieldFeedback::new(key.as_str(), verdict))
        .collect();
      (fields, t.open_rows().len())
    }
    (Exercise::Geometry(t), AnswerPayload::Geometry { answers, choice }) => {
      let fields = t.evaluate(&answers, choice.as_deref());
      let required = fields.len();
      (fields, required)
    }
    (Exercise::Booking(t), AnswerPayload::Booking { lines }) => {
      let check = booking::check(t, &lines, tol.booking);
      let verdict = if check.correct { Verdict::Correct } else { Verdict::WrongValue };
      booking_check = Some(check);
      (vec![FieldFeedback::new("entry", verdict)], 1)
    }
    (Exercise::Address { exercise, .. }, AnswerPayload::Address { lines }) => {
      let fields = check_lines(exercise, &lines)
        .into_iter()
        .enumerate()
        .map(|(i, ok)| {
          let verdict = if ok { Verdict::Correct } else { Verdict::WrongValue };
          FieldFeedback::new(format!("line_{}", i + 1), verdict)
        })
        .collect::<Vec<_>>();
      let required = fields.len();
      let points = score_lines(&fields.iter().map(|f| f.verdict.is_correct()).collect::<Vec<_>>());
      note = Some(format!("{} Punkte", format_de(points, 1)));
      (fields, required)
    }
    (Exercise::Offer(t), AnswerPayload::Offer { prices }) => {
      (offer::check_prices(t, &prices, tol.money), t.offers.len())
    }
    _ => return Err(mismatch),
  };

  let (correct, mut message) = summary(&fields, required);
  if let Some(note) = note {
    message = format!("{} {}", message, note);
  }
  if let Some(check) = &booking_check {
    message = check.message.clone();
  }
  Ok(Evaluation { task_id: ex.id().to_string(), kind, correct, fields, message, booking: booking_check })
}

#[instrument(level = "info", skip(state, answer), fields(%task_id))]
pub async fn evaluate_answer(state: &AppState, task_id: &str, answer: AnswerPayload) -> Result<Evaluation, AppError> {
  let ex = load_task(state, task_id).await?;
  let evaluation = evaluate_exercise(&ex, answer, &state.tolerance)?;
  info!(target: "exercise", id = %task_id, kind = ?evaluation.kind, correct = evaluation.correct, "Answer evaluated");
  Ok(evaluation)
}

pub fn solution_of(ex: &Exercise) -> SolutionOut {
  match ex {
    Exercise::Calculation(t) => SolutionOut::Calculation { values: t.values.clone(), rates: t.rates.clone() },
    Exercise::Geometry(t) => SolutionOut::Geometry(t.solution()),
    Exercise::Booking(t) => SolutionOut::Booking { lines: t.solution.clone(), text: booking::render_solution(t) },
    Exercise::Address { exercise, .. } => SolutionOut::Address { lines: exercise.lines.clone() },
    Exercise::Offer(t) => SolutionOut::Offer { offers: offer::solution(t) },
  }
}

#[instrument(level = "info", skip(state), fields(%task_id))]
pub async fn get_solution(state: &AppState, task_id: &str) -> Result<SolutionOut, AppError> {
  let ex = load_task(state, task_id).await?;
  debug!(target: "exercise", id = %task_id, kind = ?ex.kind(), "Solution revealed");
  Ok(solution_of(&ex))
}

#[instrument(level = "info", skip(state), fields(%task_id, ?key))]
pub async fn explain_step(state: &AppState, task_id: &str, key: StepKey) -> Result<ExplainOut, AppError> {
  match load_task(state, task_id).await? {
    Exercise::Calculation(t) => {
      let text = explain::explain(&t, key)
        .ok_or_else(|| AppError::NotFound(format!("explanation for {} in {}", key.as_str(), t.schema.title())))?;
      Ok(ExplainOut { task_id: t.id, key, text })
    }
    other => Err(AppError::KindMismatch { expected: ExerciseKind::Calculation, actual: other.kind() }),
  }
}

#[instrument(level = "info", skip(state), fields(%task_id))]
pub async fn sketch_svg(state: &AppState, task_id: &str) -> Result<String, AppError> {
  match load_task(state, task_id).await? {
    Exercise::Geometry(t) => Ok(render_svg(&t.sketch)),
    other => Err(AppError::KindMismatch { expected: ExerciseKind::Geometry, actual: other.kind() }),
  }
}

#[instrument(level = "info", skip(state, ratings), fields(%task_id, criteria = ratings.len()))]
pub async fn rank_offers(state: &AppState, task_id: &str, ratings: &[Rating]) -> Result<Ranking, AppError> {
  match load_task(state, task_id).await? {
    Exercise::Offer(t) => {
      let ranking = offer::rank(&t, ratings)?;
      info!(target: "exercise", id = %task_id, winners = ?ranking.winners, "Offer ranking computed");
      Ok(ranking)
    }
    other => Err(AppError::KindMismatch { expected: ExerciseKind::Offer, actual: other.kind() }),
  }
}

#[instrument(level = "info", skip(fields), fields(subject_len = fields.subject.len()))]
pub fn check_letter(fields: &LetterFields) -> LetterCheckOut {
  let report = validate_letter(fields);
  debug!(target: "exercise", all_ok = report.all_ok, text_length = report.text_length, "Letter checked");
  LetterCheckOut { report, file_name: export_file_name(&fields.subject) }
}

#[instrument(level = "info", skip(state))]
pub async fn start_exam(state: &AppState, student_name: &str, student_class: &str) -> Result<ExamView, AppError> {
  if student_name.trim().is_empty() {
    return Err(AppError::BadRequest("student name is required".into()));
  }
  let exam = {
    let mut rng = rand::thread_rng();
    Exam::start(&state.address_bank, &mut rng, student_name, student_class)?
  };
  let view = exam.view();
  state.insert_exam(exam).await;
  Ok(view)
}

#[instrument(level = "info", skip(state, lines), fields(%exam_id, lines = lines.len()))]
pub async fn answer_exam(state: &AppState, exam_id: &str, lines: Vec<String>) -> Result<ExamAnswerOut, AppError> {
  let mut exams = state.exams.write().await;
  let exam = exams
    .get_mut(exam_id)
    .ok_or_else(|| AppError::NotFound(format!("exam {}", exam_id)))?;
  let result = exam.submit(lines)?;
  info!(target: "exam", id = %exam_id, task = %result.task_id, score = result.score, "Exam answer scored");
  Ok(ExamAnswerOut { result, exam: exam.view() })
}

#[instrument(level = "info", skip(state), fields(%exam_id))]
pub async fn exam_certificate(state: &AppState, exam_id: &str) -> Result<Certificate, AppError> {
  let exams = state.exams.read().await;
  let exam = exams
    .get(exam_id)
    .ok_or_else(|| AppError::NotFound(format!("exam {}", exam_id)))?;
  Ok(exam.certificate()?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::{BTreeMap, HashMap};

  use rand::{rngs::StdRng, SeedableRng};

  use crate::calculation::{Direction, Schema};
  use crate::config::AppConfig;
  use crate::geometry::FieldAnswer;

  fn state() -> AppState {
    AppState::with_config(AppConfig::default())
  }

  #[test]
  fn calculation_answers_from_solution_are_correct() {
    let st = state();
    let mut rng = StdRng::seed_from_u64(7);
    let req = TaskRequest::Calculation { schema: Schema::Handelskalkulation, direction: Direction::Rueckwaerts };
    let ex = build_exercise(&st, req, &mut rng).unwrap();
    let Exercise::Calculation(task) = &ex else { panic!("wrong kind") };

    let inputs: BTreeMap<StepKey, String> = task
      .open_rows()
      .into_iter()
      .map(|k| (k, task.value(k).unwrap().to_string().replace('.', ",")))
      .collect();
    let eval = evaluate_exercise(&ex, AnswerPayload::Calculation { inputs }, &st.tolerance).unwrap();
    assert!(eval.correct, "{:?}", eval.fields);
    assert_eq!(eval.message, "Alles richtig!");
    assert!(eval.booking.is_none());
  }

  #[test]
  fn partial_calculation_is_not_correct() {
    let st = state();
    let mut rng = StdRng::seed_from_u64(3);
    let req = TaskRequest::Calculation { schema: Schema::Bezugskalkulation, direction: Direction::Vorwaerts };
    let ex = build_exercise(&st, req, &mut rng).unwrap();
    let mut inputs = BTreeMap::new();
    inputs.insert(StepKey::Zep, "abc".to_string());
    let eval = evaluate_exercise(&ex, AnswerPayload::Calculation { inputs }, &st.tolerance).unwrap();
    assert!(!eval.correct);
    assert_eq!(eval.fields.len(), 1);
    assert_eq!(eval.fields[0].key, "zep");
    assert_eq!(eval.fields[0].verdict, Verdict::Unparsable);
  }

  #[test]
  fn differenz_for_bezug_is_rejected() {
    let st = state();
    let mut rng = StdRng::seed_from_u64(1);
    let req = TaskRequest::Calculation { schema: Schema::Bezugskalkulation, direction: Direction::Differenz };
    let err = build_exercise(&st, req, &mut rng).unwrap_err();
    assert_eq!(err.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
  }

  #[test]
  fn rectangle_solution_checks_out() {
    let st = state();
    let mut rng = StdRng::seed_from_u64(11);
    let req = TaskRequest::Geometry { topic: Topic::Rectangle, mode: None };
    let ex = build_exercise(&st, req, &mut rng).unwrap();
    let SolutionOut::Geometry(sol) = solution_of(&ex) else { panic!("wrong kind") };

    let answers: HashMap<String, FieldAnswer> = sol
      .fields
      .iter()
      .map(|f| {
        let answer = FieldAnswer { value: format_de(f.value.unwrap(), 2), unit: Some(f.unit.symbol().to_string()) };
        (f.key.clone(), answer)
      })
      .collect();
    let eval = evaluate_exercise(&ex, AnswerPayload::Geometry { answers, choice: None }, &st.tolerance).unwrap();
    assert!(eval.correct, "{:?}", eval.fields);
  }

  #[test]
  fn answer_kind_must_match_task() {
    let st = state();
    let mut rng = StdRng::seed_from_u64(5);
    let ex = build_exercise(&st, TaskRequest::Booking, &mut rng).unwrap();
    let err = evaluate_exercise(&ex, AnswerPayload::Address { lines: vec![] }, &st.tolerance).unwrap_err();
    assert!(matches!(
      err,
      AppError::KindMismatch { expected: ExerciseKind::Booking, actual: ExerciseKind::Address }
    ));
  }

  #[test]
  fn address_practice_reports_each_line() {
    let st = state();
    let mut rng = StdRng::seed_from_u64(9);
    let ex = build_exercise(&st, TaskRequest::Address, &mut rng).unwrap();
    let SolutionOut::Address { lines } = solution_of(&ex) else { panic!("wrong kind") };
    let typed: Vec<String> = lines.iter().map(|l| format!("  {}  ", l.to_lowercase())).collect();

    let eval = evaluate_exercise(&ex, AnswerPayload::Address { lines: typed }, &st.tolerance).unwrap();
    assert!(eval.correct);
    assert_eq!(eval.fields.len(), 6);
    assert_eq!(eval.fields[5].key, "line_6");
    assert_eq!(eval.message, "Alles richtig! 3,0 Punkte");
  }

  #[test]
  fn offer_prices_use_bezugspreis() {
    let st = state();
    let mut rng = StdRng::seed_from_u64(21);
    let ex = build_exercise(&st, TaskRequest::Offer, &mut rng).unwrap();
    let Exercise::Offer(task) = &ex else { panic!("wrong kind") };
    let prices: HashMap<String, String> = task
      .offers
      .iter()
      .map(|o| (o.id.clone(), o.final_price().unwrap().to_string()))
      .collect();
    let eval = evaluate_exercise(&ex, AnswerPayload::Offer { prices }, &st.tolerance).unwrap();
    assert!(eval.correct);
    assert_eq!(eval.fields.len(), 3);
  }

  #[tokio::test]
  async fn stored_task_flow() {
    let st = state();
    let view = new_task(&st, TaskRequest::Geometry { topic: Topic::Circle, mode: None }).await.unwrap();
    let TaskView::Geometry(task) = view else { panic!("wrong kind") };

    let svg = sketch_svg(&st, &task.id).await.unwrap();
    assert!(svg.starts_with("<svg"));
    let err = explain_step(&st, &task.id, StepKey::Zep).await.unwrap_err();
    assert!(matches!(err, AppError::KindMismatch { .. }));
    assert!(matches!(get_solution(&st, "missing").await, Err(AppError::NotFound(_))));
  }

  #[tokio::test]
  async fn exam_runs_to_certificate() {
    let st = state();
    let view = start_exam(&st, "Erika Muster", "BFW 11").await.unwrap();
    assert_eq!(view.total, 10);
    assert!(matches!(exam_certificate(&st, &view.id).await, Err(AppError::Exam(_))));

    let mut last = None;
    for _ in 0..10 {
      last = Some(answer_exam(&st, &view.id, vec![]).await.unwrap());
    }
    let last = last.unwrap();
    assert!(last.exam.finished);

    let cert = exam_certificate(&st, &view.id).await.unwrap();
    assert_eq!(cert.student_name, "Erika Muster");
    assert_eq!(cert.max_score, 30.0);
    assert!(matches!(answer_exam(&st, &view.id, vec![]).await, Err(AppError::Exam(_))));
  }

  #[tokio::test]
  async fn exam_needs_a_name() {
    let st = state();
    assert!(matches!(start_exam(&st, "  ", "x").await, Err(AppError::BadRequest(_))));
  }
}
