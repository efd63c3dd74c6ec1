//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Task views never carry expected answers; solutions go out only on request.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::address::{Category, Certificate, ExamResult, ExamView, LINES};
use crate::booking::{BookingCheck, BookingLine, BookingTask, EntryLine};
use crate::calculation::{CalcTask, Direction, RateKey, Rates, Row, Schema, StepKey, Values};
use crate::domain::{Exercise, ExerciseKind};
use crate::geometry::triangle::TriangleMode;
use crate::geometry::{FieldAnswer, GeometrySolution, GeometryTask, Topic};
use crate::letter::{LetterFields, LetterReport};
use crate::offer::{OfferSolution, OfferTask, Ranking, Rating};
use crate::validation::FieldFeedback;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    NewTask {
        request: TaskRequest,
    },
    SubmitAnswer {
        #[serde(rename = "taskId")]
        task_id: String,
        answer: AnswerPayload,
    },
    Solution {
        #[serde(rename = "taskId")]
        task_id: String,
    },
    Explain {
        #[serde(rename = "taskId")]
        task_id: String,
        key: StepKey,
    },
    Sketch {
        #[serde(rename = "taskId")]
        task_id: String,
    },
    Rank {
        #[serde(rename = "taskId")]
        task_id: String,
        ratings: Vec<Rating>,
    },
    CheckLetter {
        letter: LetterFields,
    },
    StartExam {
        #[serde(rename = "studentName", default)]
        student_name: String,
        #[serde(rename = "studentClass", default)]
        student_class: String,
    },
    ExamAnswer {
        #[serde(rename = "examId")]
        exam_id: String,
        lines: Vec<String>,
    },
    Certificate {
        #[serde(rename = "examId")]
        exam_id: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Task {
        task: TaskView,
    },
    Evaluation {
        evaluation: Evaluation,
    },
    Solution {
        solution: SolutionOut,
    },
    Explanation {
        explanation: ExplainOut,
    },
    Sketch {
        #[serde(rename = "taskId")]
        task_id: String,
        svg: String,
    },
    Ranking {
        ranking: Ranking,
    },
    LetterCheck {
        result: LetterCheckOut,
    },
    Exam {
        exam: ExamView,
    },
    ExamAnswer {
        answer: ExamAnswerOut,
    },
    Certificate {
        certificate: Certificate,
    },
    Error {
        message: String,
    },
}

/// Which exercise to generate. Shared by `POST /api/v1/tasks` and WS `new_task`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskRequest {
    Calculation {
        schema: Schema,
        direction: Direction,
    },
    Geometry {
        topic: Topic,
        #[serde(default)]
        mode: Option<TriangleMode>,
    },
    Booking,
    Address,
    Offer,
}

/// Student input, tagged with the exercise kind it answers.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerPayload {
    Calculation {
        #[serde(default)]
        inputs: BTreeMap<StepKey, String>,
    },
    Geometry {
        #[serde(default)]
        answers: HashMap<String, FieldAnswer>,
        #[serde(default)]
        choice: Option<String>,
    },
    Booking {
        #[serde(default)]
        lines: Vec<EntryLine>,
    },
    Address {
        #[serde(default)]
        lines: Vec<String>,
    },
    Offer {
        #[serde(default)]
        prices: HashMap<String, String>,
    },
}

impl AnswerPayload {
    pub fn kind(&self) -> ExerciseKind {
        match self {
            AnswerPayload::Calculation { .. } => ExerciseKind::Calculation,
            AnswerPayload::Geometry { .. } => ExerciseKind::Geometry,
            AnswerPayload::Booking { .. } => ExerciseKind::Booking,
            AnswerPayload::Address { .. } => ExerciseKind::Address,
            AnswerPayload::Offer { .. } => ExerciseKind::Offer,
        }
    }
}

/// Public view of a stored exercise.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskView {
    Calculation(CalcTaskView),
    Geometry(GeometryTask),
    Booking(BookingTask),
    Address(AddressTaskView),
    Offer(OfferTask),
}

/// The sheet as the student sees it: every row, the prefilled values and the
/// rates the chain uses. A Differenz task hides the profit rate.
#[derive(Debug, Serialize)]
pub struct CalcTaskView {
    pub id: String,
    pub schema: Schema,
    pub direction: Direction,
    pub title: &'static str,
    pub description: String,
    pub rows: Vec<Row>,
    pub given: BTreeMap<StepKey, Decimal>,
    pub rates: BTreeMap<RateKey, Decimal>,
}

#[derive(Debug, Serialize)]
pub struct AddressTaskView {
    pub id: String,
    pub exercise_id: String,
    pub category: Category,
    pub title: String,
    pub task: String,
    pub hints: Vec<String>,
    pub line_count: usize,
}

fn calc_view(t: &CalcTask) -> CalcTaskView {
    let given = t
        .given
        .iter()
        .filter_map(|k| t.value(*k).map(|v| (*k, v)))
        .collect();
    let rates = t
        .schema
        .transitions()
        .iter()
        .filter_map(|tr| tr.rate)
        .filter(|k| !(t.direction == Direction::Differenz && *k == RateKey::GewinnP))
        .map(|k| (k, t.rates.get(k)))
        .collect();
    CalcTaskView {
        id: t.id.clone(),
        schema: t.schema,
        direction: t.direction,
        title: t.schema.title(),
        description: t.description.clone(),
        rows: t.schema.rows(),
        given,
        rates,
    }
}

/// Convert a stored `Exercise` (internal) to the public DTO.
pub fn to_view(ex: &Exercise) -> TaskView {
    match ex {
        Exercise::Calculation(t) => TaskView::Calculation(calc_view(t)),
        Exercise::Geometry(t) => TaskView::Geometry(t.clone()),
        Exercise::Booking(t) => TaskView::Booking(t.clone()),
        Exercise::Address { id, exercise } => TaskView::Address(AddressTaskView {
            id: id.clone(),
            exercise_id: exercise.id.clone(),
            category: exercise.category,
            title: exercise.title.clone(),
            task: exercise.task.clone(),
            hints: exercise.hints.clone(),
            line_count: LINES,
        }),
        Exercise::Offer(t) => TaskView::Offer(t.clone()),
    }
}

/// Result of checking one answer submission.
#[derive(Debug, Serialize)]
pub struct Evaluation {
    #[serde(rename = "taskId")]
    pub task_id: String,
    pub kind: ExerciseKind,
    pub correct: bool,
    pub fields: Vec<FieldFeedback>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingCheck>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SolutionOut {
    Calculation { values: Values, rates: Rates },
    Geometry(GeometrySolution),
    Booking { lines: Vec<BookingLine>, text: String },
    Address { lines: Vec<String> },
    Offer { offers: Vec<OfferSolution> },
}

#[derive(Debug, Serialize)]
pub struct ExplainOut {
    #[serde(rename = "taskId")]
    pub task_id: String,
    pub key: StepKey,
    pub text: String,
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct RankingIn {
    pub ratings: Vec<Rating>,
}

#[derive(Debug, Deserialize)]
pub struct StartExamIn {
    #[serde(rename = "studentName", default)]
    pub student_name: String,
    #[serde(rename = "studentClass", default)]
    pub student_class: String,
}

#[derive(Debug, Deserialize)]
pub struct ExamAnswerIn {
    pub lines: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ExamAnswerOut {
    pub result: ExamResult,
    pub exam: ExamView,
}

#[derive(Debug, Serialize)]
pub struct LetterCheckOut {
    pub report: LetterReport,
    #[serde(rename = "fileName")]
    pub file_name: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
