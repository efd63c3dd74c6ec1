//! Stored exercises. One enum over all families so the task store, the
//! answer endpoint and the WebSocket share a single id space.

use serde::{Deserialize, Serialize};

use crate::address::AddressExercise;
use crate::booking::BookingTask;
use crate::calculation::CalcTask;
use crate::geometry::GeometryTask;
use crate::offer::OfferTask;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
  Calculation,
  Geometry,
  Booking,
  Address,
  Offer,
}

/// Full exercise including the expected answers. Never sent to clients as-is.
#[derive(Clone, Debug)]
pub enum Exercise {
  Calculation(CalcTask),
  Geometry(GeometryTask),
  Booking(BookingTask),
  /// Bank exercises are reused, so the store key is a fresh id, not `ex.id`.
  Address { id: String, exercise: AddressExercise },
  Offer(OfferTask),
}

impl Exercise {
  pub fn id(&self) -> &str {
    match self {
      Exercise::Calculation(t) => &t.id,
      Exercise::Geometry(t) => &t.id,
      Exercise::Booking(t) => &t.id,
      Exercise::Address { id, .. } => id,
      Exercise::Offer(t) => &t.id,
    }
  }

  pub fn kind(&self) -> ExerciseKind {
    match self {
      Exercise::Calculation(_) => ExerciseKind::Calculation,
      Exercise::Geometry(_) => ExerciseKind::Geometry,
      Exercise::Booking(_) => ExerciseKind::Booking,
      Exercise::Address { .. } => ExerciseKind::Address,
      Exercise::Offer(_) => ExerciseKind::Offer,
    }
  }
}
