//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::error::AppError;
use crate::logic::*;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;
use crate::util::trunc_for_log;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "uebungsfirma_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "uebungsfirma_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "uebungsfirma_backend", msg = %trunc_for_log(&txt, 256), "WS received");
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "uebungsfirma_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "uebungsfirma_backend", "WebSocket disconnected");
}

fn reply<T>(result: Result<T, AppError>, wrap: impl FnOnce(T) -> ServerWsMessage) -> ServerWsMessage {
  match result {
    Ok(v) => wrap(v),
    Err(e) => {
      debug!(target: "uebungsfirma_backend", error = %e, "WS request failed");
      ServerWsMessage::Error { message: e.to_string() }
    }
  }
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::NewTask { request } => {
      reply(new_task(state, request).await, |task| ServerWsMessage::Task { task })
    }

    ClientWsMessage::SubmitAnswer { task_id, answer } => {
      reply(evaluate_answer(state, &task_id, answer).await, |evaluation| ServerWsMessage::Evaluation { evaluation })
    }

    ClientWsMessage::Solution { task_id } => {
      reply(get_solution(state, &task_id).await, |solution| ServerWsMessage::Solution { solution })
    }

    ClientWsMessage::Explain { task_id, key } => {
      reply(explain_step(state, &task_id, key).await, |explanation| ServerWsMessage::Explanation { explanation })
    }

    ClientWsMessage::Sketch { task_id } => {
      let result = sketch_svg(state, &task_id).await;
      reply(result, |svg| ServerWsMessage::Sketch { task_id, svg })
    }

    ClientWsMessage::Rank { task_id, ratings } => {
      reply(rank_offers(state, &task_id, &ratings).await, |ranking| ServerWsMessage::Ranking { ranking })
    }

    ClientWsMessage::CheckLetter { letter } => ServerWsMessage::LetterCheck { result: check_letter(&letter) },

    ClientWsMessage::StartExam { student_name, student_class } => {
      reply(start_exam(state, &student_name, &student_class).await, |exam| ServerWsMessage::Exam { exam })
    }

    ClientWsMessage::ExamAnswer { exam_id, lines } => {
      reply(answer_exam(state, &exam_id, lines).await, |answer| ServerWsMessage::ExamAnswer { answer })
    }

    ClientWsMessage::Certificate { exam_id } => {
      reply(exam_certificate(state, &exam_id).await, |certificate| ServerWsMessage::Certificate { certificate })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use serde_json::{json, Value};

  async fn roundtrip(state: &AppState, msg: Value) -> Value {
    let incoming: ClientWsMessage = serde_json::from_value(msg).unwrap();
    let out = handle_client_ws(incoming, state).await;
    serde_json::to_value(&out).unwrap()
  }

  #[tokio::test]
  async fn ws_task_and_answer() {
    let state = AppState::with_config(AppConfig::default());
    assert_eq!(roundtrip(&state, json!({ "type": "ping" })).await, json!({ "type": "pong" }));

    let task = roundtrip(
      &state,
      json!({ "type": "new_task", "request": { "kind": "geometry", "topic": "rectangle" } }),
    )
    .await;
    assert_eq!(task["type"], "task");
    let id = task["task"]["id"].as_str().unwrap().to_string();

    let eval = roundtrip(
      &state,
      json!({ "type": "submit_answer", "taskId": id, "answer": { "kind": "geometry", "answers": {} } }),
    )
    .await;
    assert_eq!(eval["type"], "evaluation");
    assert_eq!(eval["evaluation"]["correct"], false);

    let sketch = roundtrip(&state, json!({ "type": "sketch", "taskId": id })).await;
    assert!(sketch["svg"].as_str().unwrap().contains("<rect"));
  }

  #[tokio::test]
  async fn ws_errors_are_messages() {
    let state = AppState::with_config(AppConfig::default());
    let out = roundtrip(&state, json!({ "type": "solution", "taskId": "missing" })).await;
    assert_eq!(out["type"], "error");
    assert!(out["message"].as_str().unwrap().contains("missing"));
  }
}
