//! The ingestion endpoint.
//!
//! The body is parsed by hand rather than through an extractor so that a
//! malformed payload still produces the wire-contract error JSON. Both
//! outcomes are HTTP 200; clients read the `status` field.

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use pointrake_core::{ingest_batch, parse_batch, IngestError, RecordOutcome};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(ingest))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ResultEntry>>,
}

#[derive(Debug, Serialize)]
pub struct ResultEntry {
    pub status: RecordOutcome,
}

impl IngestResponse {
    fn success(added_count: usize, outcomes: Vec<RecordOutcome>) -> Self {
        Self {
            status: "success",
            message: format!("{added_count} items added."),
            added_count: Some(added_count),
            results: Some(
                outcomes
                    .into_iter()
                    .map(|status| ResultEntry { status })
                    .collect(),
            ),
        }
    }

    fn error(message: String) -> Self {
        Self {
            status: "error",
            message,
            added_count: None,
            results: None,
        }
    }
}

async fn ingest(State(state): State<AppState>, body: String) -> Json<IngestResponse> {
    let payload = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable ingest body");
            return Json(IngestResponse::error(format!("Invalid format: {e}")));
        }
    };

    let batch = match parse_batch(&payload) {
        Ok(batch) => batch,
        Err(e) => {
            tracing::warn!(error = %e, "malformed ingest batch");
            return Json(IngestResponse::error(e.to_string()));
        }
    };

    match ingest_batch(state.store.as_ref(), &batch).await {
        Ok(report) => {
            tracing::info!(
                records = batch.len(),
                added = report.added_count,
                "batch ingested"
            );
            Json(IngestResponse::success(report.added_count, report.outcomes))
        }
        Err(e @ IngestError::Store(_)) => {
            tracing::error!(error = %e, "store failure during ingest");
            Json(IngestResponse::error(e.to_string()))
        }
        Err(e) => {
            tracing::warn!(error = %e, "ingest rejected");
            Json(IngestResponse::error(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn response_json(state: AppState, body: &str) -> Value {
        let app = crate::api::router().with_state(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/ingest")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn repeated_batches_are_idempotent_over_the_wire() {
        let state = AppState::new_in_memory().await.unwrap();
        let body = r#"[{"site":"A","date":"2026/01/01","description":"X","amount":10}]"#;

        let first = response_json(state.clone(), body).await;
        assert_eq!(first["status"], "success");
        assert_eq!(first["addedCount"], 1);
        assert_eq!(first["message"], "1 items added.");
        assert_eq!(first["results"][0]["status"], "added");

        let second = response_json(state, body).await;
        assert_eq!(second["addedCount"], 0);
        assert_eq!(second["results"][0]["status"], "skipped");
    }

    #[tokio::test]
    async fn results_align_with_input_order() {
        let state = AppState::new_in_memory().await.unwrap();
        let body = r#"[
            {"site":"A","date":"2026/01/01","amount":1},
            {"site":"B","date":"2026/01/01","amount":2},
            {"site":"A","date":"2026/01/01","amount":1}
        ]"#;

        let json = response_json(state, body).await;
        assert_eq!(json["addedCount"], 2);
        let statuses: Vec<&str> = json["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["status"].as_str().unwrap())
            .collect();
        assert_eq!(statuses, vec!["added", "added", "skipped"]);
    }

    #[tokio::test]
    async fn malformed_batches_report_an_error_without_results() {
        let state = AppState::new_in_memory().await.unwrap();

        let json = response_json(state.clone(), r#"{"site":"A"}"#).await;
        assert_eq!(json["status"], "error");
        assert!(json.get("addedCount").is_none());
        assert!(json.get("results").is_none());

        let json = response_json(state, "not json at all").await;
        assert_eq!(json["status"], "error");
    }
}
