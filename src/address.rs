//! Anschriftenfeld: six-line address zone exercises, practice checks and the
//! ten-task exam with its certificate.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

pub const LINES: usize = 6;
pub const EXAM_PRIVATE: usize = 3;
pub const EXAM_BUSINESS: usize = 7;
pub const POINTS_PER_LINE: f64 = 0.5;
pub const MAX_SCORE: f64 = (EXAM_PRIVATE + EXAM_BUSINESS) as f64 * LINES as f64 * POINTS_PER_LINE;

const BUILTIN: &str = include_str!("../data/address_tasks.toml");

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Category {
  Private,
  Business,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddressExercise {
  pub id: String,
  pub category: Category,
  pub title: String,
  pub task: String,
  #[serde(skip_serializing)]
  pub lines: Vec<String>,
  #[serde(default)]
  pub hints: Vec<String>,
}

#[derive(Deserialize)]
struct BankFile {
  #[serde(default)]
  address_tasks: Vec<AddressExercise>,
}

#[derive(Clone, Debug, Default)]
pub struct AddressBank {
  tasks: Vec<AddressExercise>,
}

impl AddressBank {
  pub fn builtin() -> Result<Self, toml::de::Error> {
    let file: BankFile = toml::from_str(BUILTIN)?;
    let mut bank = Self::default();
    bank.extend(file.address_tasks);
    Ok(bank)
  }

  /// Adds exercises, padding short solutions with empty lines. Exercises with
  /// more than six lines or a duplicate id are skipped.
  pub fn extend(&mut self, extra: Vec<AddressExercise>) {
    for mut ex in extra {
      if ex.lines.len() > LINES {
        warn!(target: "exercise", id = %ex.id, lines = ex.lines.len(), "address exercise has too many lines, skipped");
        continue;
      }
      if self.get(&ex.id).is_some() {
        warn!(target: "exercise", id = %ex.id, "duplicate address exercise id, skipped");
        continue;
      }
      ex.lines.resize(LINES, String::new());
      self.tasks.push(ex);
    }
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn get(&self, id: &str) -> Option<&AddressExercise> {
    self.tasks.iter().find(|t| t.id == id)
  }

  fn of(&self, category: Category) -> Vec<&AddressExercise> {
    self.tasks.iter().filter(|t| t.category == category).collect()
  }

  /// 30 % private, 70 % business; falls back to whatever category exists.
  pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&AddressExercise> {
    let wanted = if rng.gen_bool(0.3) { Category::Private } else { Category::Business };
    let pool = self.of(wanted);
    match pool.choose(rng) {
      Some(ex) => Some(*ex),
      None => self.tasks.choose(rng),
    }
  }
}

fn same_line(input: &str, expected: &str) -> bool {
  input.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// Per-line result; missing inputs count as empty lines.
pub fn check_lines(exercise: &AddressExercise, inputs: &[String]) -> Vec<bool> {
  exercise
    .lines
    .iter()
    .enumerate()
    .map(|(i, expected)| same_line(inputs.get(i).map(String::as_str).unwrap_or(""), expected))
    .collect()
}

pub fn score_lines(results: &[bool]) -> f64 {
  results
    .iter()
    .map(|ok| if *ok { POINTS_PER_LINE } else { -POINTS_PER_LINE })
    .sum()
}

pub fn grade(percentage: f64) -> &'static str {
  match percentage {
    p if p >= 92.0 => "Sehr gut",
    p if p >= 81.0 => "Gut",
    p if p >= 67.0 => "Befriedigend",
    p if p >= 50.0 => "Ausreichend",
    p if p >= 30.0 => "Mangelhaft",
    _ => "Ungenügend",
  }
}

#[derive(Debug, Error, PartialEq)]
pub enum ExamError {
  #[error("not enough {category:?} address exercises: need {needed}, have {available}")]
  NotEnoughTasks { category: Category, needed: usize, available: usize },
  #[error("exam is already finished")]
  Finished,
  #[error("exam is not finished yet ({answered} of {total} answered)")]
  NotFinished { answered: usize, total: usize },
}

#[derive(Clone, Debug, Serialize)]
pub struct ExamResult {
  pub task_id: String,
  pub inputs: Vec<String>,
  pub lines: Vec<bool>,
  pub score: f64,
}

#[derive(Clone, Debug)]
pub struct Exam {
  pub id: String,
  pub student_name: String,
  pub student_class: String,
  pub tasks: Vec<AddressExercise>,
  pub results: Vec<ExamResult>,
}

/// What the client sees of a running exam.
#[derive(Clone, Debug, Serialize)]
pub struct ExamView {
  pub id: String,
  pub position: usize,
  pub total: usize,
  pub task: Option<AddressExercise>,
  pub score: f64,
  pub finished: bool,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Certificate {
  pub title: &'static str,
  pub student_name: String,
  pub student_class: String,
  pub score: f64,
  pub max_score: f64,
  pub percentage: f64,
  pub grade: &'static str,
}

impl Exam {
  pub fn start<R: Rng + ?Sized>(
    bank: &AddressBank,
    rng: &mut R,
    student_name: &str,
    student_class: &str,
  ) -> Result<Self, ExamError> {
    let mut tasks = Vec::with_capacity(EXAM_PRIVATE + EXAM_BUSINESS);
    for (category, needed) in [(Category::Private, EXAM_PRIVATE), (Category::Business, EXAM_BUSINESS)] {
      let pool = bank.of(category);
      if pool.len() < needed {
        return Err(ExamError::NotEnoughTasks { category, needed, available: pool.len() });
      }
      tasks.extend(pool.choose_multiple(rng, needed).map(|t| (*t).clone()));
    }
    tasks.shuffle(rng);
    let exam = Self {
      id: Uuid::new_v4().to_string(),
      student_name: student_name.trim().to_string(),
      student_class: student_class.trim().to_string(),
      tasks,
      results: Vec::new(),
    };
    info!(target: "exam", id = %exam.id, "address exam started");
    Ok(exam)
  }

  pub fn current(&self) -> Option<&AddressExercise> {
    self.tasks.get(self.results.len())
  }

  pub fn is_finished(&self) -> bool {
    self.results.len() >= self.tasks.len()
  }

  pub fn total_score(&self) -> f64 {
    self.results.iter().map(|r| r.score).sum()
  }

  pub fn view(&self) -> ExamView {
    ExamView {
      id: self.id.clone(),
      position: self.results.len(),
      total: self.tasks.len(),
      task: self.current().cloned(),
      score: self.total_score(),
      finished: self.is_finished(),
    }
  }

  /// Scores the current task and advances to the next one.
  pub fn submit(&mut self, inputs: Vec<String>) -> Result<ExamResult, ExamError> {
    let task = self.current().ok_or(ExamError::Finished)?;
    let lines = check_lines(task, &inputs);
    let result = ExamResult { task_id: task.id.clone(), score: score_lines(&lines), inputs, lines };
    self.results.push(result.clone());
    if self.is_finished() {
      info!(target: "exam", id = %self.id, score = self.total_score(), "address exam finished");
    }
    Ok(result)
  }

  pub fn certificate(&self) -> Result<Certificate, ExamError> {
    if !self.is_finished() {
      return Err(ExamError::NotFinished { answered: self.results.len(), total: self.tasks.len() });
    }
    let score = self.total_score();
    let percentage = score / MAX_SCORE * 100.0;
    Ok(Certificate {
      title: "Anschriftenfeld-Prüfung",
      student_name: self.student_name.clone(),
      student_class: self.student_class.clone(),
      score,
      max_score: MAX_SCORE,
      percentage,
      grade: grade(percentage),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::{rngs::StdRng, SeedableRng};

  fn bank() -> AddressBank {
    AddressBank::builtin().expect("embedded address bank parses")
  }

  #[test]
  fn builtin_bank_is_complete() {
    let b = bank();
    assert_eq!(b.len(), 50);
    assert_eq!(b.of(Category::Private).len(), 15);
    assert_eq!(b.of(Category::Business).len(), 35);
    assert!(b.tasks.iter().all(|t| t.lines.len() == LINES));
    assert_eq!(b.get("p-01").map(|t| t.lines[1].as_str()), Some("Thomas Müller"));
  }

  #[test]
  fn practice_check_ignores_case_and_padding() {
    let b = bank();
    let ex = b.get("p-01").unwrap();
    let inputs: Vec<String> = ["  herrn", "THOMAS MÜLLER", "Goethestraße 12", "20095 Hamburg "]
      .iter()
      .map(|s| s.to_string())
      .collect();
    assert_eq!(check_lines(ex, &inputs), vec![true; 6]);
    let wrong = vec!["Herr".to_string()];
    let res = check_lines(ex, &wrong);
    assert!(!res[0]);
    assert!(res[4] && res[5]);
    assert_eq!(score_lines(&res), -1.0);
  }

  #[test]
  fn extend_pads_and_rejects() {
    let mut b = bank();
    let extra = AddressExercise {
      id: "x-01".into(),
      category: Category::Business,
      title: "Extra".into(),
      task: "Firma X".into(),
      lines: vec!["Firma X".into()],
      hints: vec![],
    };
    let mut too_long = extra.clone();
    too_long.id = "x-02".into();
    too_long.lines = vec![String::new(); 7];
    b.extend(vec![extra.clone(), extra, too_long]);
    assert_eq!(b.len(), 51);
    assert_eq!(b.get("x-01").unwrap().lines.len(), LINES);
  }

  #[test]
  fn pick_mixes_categories() {
    let b = bank();
    let mut rng = StdRng::seed_from_u64(3);
    let private = (0..1000).filter(|_| b.pick(&mut rng).unwrap().category == Category::Private).count();
    assert!((200..400).contains(&private), "{}", private);
  }

  #[test]
  fn grades() {
    assert_eq!(grade(100.0), "Sehr gut");
    assert_eq!(grade(92.0), "Sehr gut");
    assert_eq!(grade(91.9), "Gut");
    assert_eq!(grade(67.0), "Befriedigend");
    assert_eq!(grade(50.0), "Ausreichend");
    assert_eq!(grade(30.0), "Mangelhaft");
    assert_eq!(grade(-10.0), "Ungenügend");
  }

  #[test]
  fn full_exam() {
    let b = bank();
    let mut rng = StdRng::seed_from_u64(9);
    let mut exam = Exam::start(&b, &mut rng, " Ada ", "BFS 1").unwrap();
    assert_eq!(exam.tasks.len(), 10);
    assert_eq!(exam.tasks.iter().filter(|t| t.category == Category::Private).count(), 3);
    assert!(matches!(exam.certificate(), Err(ExamError::NotFinished { answered: 0, total: 10 })));

    for i in 0..10 {
      let task = exam.current().unwrap().clone();
      // first nine perfect, last one all wrong
      let inputs = if i < 9 { task.lines.clone() } else { vec!["falsch".into(); LINES] };
      exam.submit(inputs).unwrap();
    }
    assert!(exam.is_finished());
    assert!(matches!(exam.submit(vec![]), Err(ExamError::Finished)));

    let cert = exam.certificate().unwrap();
    assert_eq!(cert.student_name, "Ada");
    assert_eq!(cert.score, 27.0 - 3.0);
    assert_eq!(cert.max_score, 30.0);
    assert!((cert.percentage - 80.0).abs() < 1e-9);
    assert_eq!(cert.grade, "Befriedigend");
  }

  #[test]
  fn exam_needs_enough_tasks() {
    let mut rng = StdRng::seed_from_u64(1);
    let err = Exam::start(&AddressBank::default(), &mut rng, "A", "B").unwrap_err();
    assert_eq!(err, ExamError::NotEnoughTasks { category: Category::Private, needed: 3, available: 0 });
  }
}
