//! Request-level error type. Domain errors convert into it with `?`; the
//! HTTP layer turns it into a status code plus `{ "error": ... }`.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::address::ExamError;
use crate::booking::BookingError;
use crate::calculation::CalcError;
use crate::domain::ExerciseKind;
use crate::geometry::GenerationError;
use crate::offer::OfferError;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("{0} not found")]
  NotFound(String),
  #[error("{0}")]
  BadRequest(String),
  #[error("task is a {actual:?} exercise, expected {expected:?}")]
  KindMismatch { expected: ExerciseKind, actual: ExerciseKind },
  #[error(transparent)]
  Calc(#[from] CalcError),
  #[error(transparent)]
  Generation(#[from] GenerationError),
  #[error(transparent)]
  Booking(#[from] BookingError),
  #[error(transparent)]
  Offer(#[from] OfferError),
  #[error(transparent)]
  Exam(#[from] ExamError),
}

impl AppError {
  pub fn status(&self) -> StatusCode {
    match self {
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::BadRequest(_) | AppError::KindMismatch { .. } => StatusCode::BAD_REQUEST,
      AppError::Calc(_)
      | AppError::Generation(_)
      | AppError::Booking(_)
      | AppError::Offer(_)
      | AppError::Exam(_) => {
        StatusCode::UNPROCESSABLE_ENTITY
      }
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status();
    warn!(target: "uebungsfirma_backend", %status, error = %self, "request failed");
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::calculation::{RateKey, StepKey};
  use rust_decimal_macros::dec;

  #[test]
  fn status_mapping() {
    assert_eq!(AppError::NotFound("task x".into()).status(), StatusCode::NOT_FOUND);
    assert_eq!(
      AppError::KindMismatch { expected: ExerciseKind::Booking, actual: ExerciseKind::Offer }.status(),
      StatusCode::BAD_REQUEST
    );
    let calc: AppError = CalcError::InvalidRate { key: RateKey::UstP, value: dec!(100) }.into();
    assert_eq!(calc.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let div: AppError = CalcError::DivisionByZero(StepKey::Sk).into();
    assert!(div.to_string().contains("division by zero"));
    let empty: AppError = BookingError::EmptyTable("companies").into();
    assert_eq!(empty.status(), StatusCode::UNPROCESSABLE_ENTITY);
  }
}
