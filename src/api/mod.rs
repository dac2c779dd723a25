// HTTP surface
// The two server actions (analyze, extract) plus the session history reads.
// Taxonomy failures travel inside the {result, error} envelopes with a 200;
// only malformed requests become 4xx responses.

use crate::models::{
    AnalyzeRequest, AnalyzeResponse, ExtractResponse, HistoryListResponse, VerdictView,
};
use crate::services::analyzer::analyze;
use crate::services::classifier::Classifier;
use crate::services::extractor;
use crate::services::history::SessionStore;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Upload cap enforced here, before the extractor ever sees the bytes.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const FILE_TOO_LARGE_MESSAGE: &str =
    "File is too large. Please upload a file smaller than 10MB.";
const ANALYSIS_IN_PROGRESS_MESSAGE: &str =
    "An analysis is already in progress for this session. Please wait for it to finish.";

pub struct AppState<C> {
    pub classifier: Arc<C>,
    pub sessions: SessionStore,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            classifier: self.classifier.clone(),
            sessions: self.sessions.clone(),
        }
    }
}

/// Request-shape errors; the taxonomy never lands here.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Resource not found")]
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
        };

        let body = Json(json!({
            "error": { "code": code, "message": message }
        }));
        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionQuery {
    session_id: String,
}

pub fn router<C: Classifier>(state: AppState<C>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/analyze", post(analyze_text::<C>))
        .route("/api/v1/extract", post(extract_file::<C>))
        .route("/api/v1/history", get(list_history::<C>))
        .route("/api/v1/history/{id}", get(get_history_entry::<C>))
        .route("/api/v1/health", get(health_check))
        // Above the cap so our own size check answers with the envelope
        // instead of a bare 413.
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `POST /api/v1/analyze` — classify pasted or extracted text.
async fn analyze_text<C: Classifier>(
    State(state): State<AppState<C>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    if req.session_id.trim().is_empty() {
        return Err(ApiError::BadRequest("sessionId is required".to_string()));
    }

    // Hold the session's analysis slot for the duration of the remote call.
    let Some(_guard) = state.sessions.begin(&req.session_id) else {
        return Ok(Json(AnalyzeResponse {
            result: None,
            error: Some(ANALYSIS_IN_PROGRESS_MESSAGE.to_string()),
        }));
    };

    match analyze(state.classifier.as_ref(), &req.text).await {
        Ok(verdict) => {
            let entry = state.sessions.append(&req.session_id, &req.text, verdict.clone());
            info!(
                "[API] analysis complete session={} entry={} label={}",
                req.session_id,
                entry.id,
                verdict.label()
            );
            Ok(Json(AnalyzeResponse {
                result: Some(VerdictView::from(&verdict)),
                error: None,
            }))
        }
        Err(e) => Ok(Json(AnalyzeResponse {
            result: None,
            error: Some(e.to_string()),
        })),
    }
}

/// `POST /api/v1/extract` — raw document bytes in, plain text out.
/// The declared type travels in the Content-Type header.
async fn extract_file<C: Classifier>(
    State(_state): State<AppState<C>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<ExtractResponse> {
    if body.len() > MAX_UPLOAD_BYTES {
        return Json(ExtractResponse {
            text: None,
            error: Some(FILE_TOO_LARGE_MESSAGE.to_string()),
        });
    }

    let declared_mime = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    match extractor::extract(&body, declared_mime) {
        Ok(text) => Json(ExtractResponse {
            text: Some(text),
            error: None,
        }),
        Err(e) => Json(ExtractResponse {
            text: None,
            error: Some(e.to_string()),
        }),
    }
}

/// `GET /api/v1/history?sessionId=` — most-recent-first.
async fn list_history<C: Classifier>(
    State(state): State<AppState<C>>,
    Query(query): Query<SessionQuery>,
) -> Json<HistoryListResponse> {
    Json(HistoryListResponse {
        items: state.sessions.list(&query.session_id),
    })
}

/// `GET /api/v1/history/{id}?sessionId=`
async fn get_history_entry<C: Classifier>(
    State(state): State<AppState<C>>,
    Path(id): Path<String>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<crate::models::HistoryEntry>, ApiError> {
    state
        .sessions
        .get(&query.session_id, &id)
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Verdict;
    use crate::services::classifier::ClassifierError;

    struct MockClassifier {
        verdict: Option<Verdict>,
    }

    impl Classifier for MockClassifier {
        async fn classify(&self, _text: &str) -> Result<Verdict, ClassifierError> {
            self.verdict.clone().ok_or(ClassifierError::MissingContent)
        }
    }

    fn state_with(verdict: Option<Verdict>) -> AppState<MockClassifier> {
        AppState {
            classifier: Arc::new(MockClassifier { verdict }),
            sessions: SessionStore::new(),
        }
    }

    fn human_verdict() -> Verdict {
        Verdict {
            is_ai_generated: false,
            confidence: 0.82,
            explanation: "Conversational rhythm and irregular phrasing.".to_string(),
        }
    }

    fn prose(len: usize) -> String {
        "The narrow road bent twice before the orchard gate. ".repeat(len / 50 + 1)
    }

    #[tokio::test]
    async fn test_analyze_success_appends_history_and_orients_confidence() {
        let state = state_with(Some(human_verdict()));
        let req = AnalyzeRequest {
            text: prose(200),
            session_id: "s1".to_string(),
        };

        let Json(resp) = analyze_text(State(state.clone()), Json(req)).await.unwrap();
        let view = resp.result.expect("result populated");
        assert!(resp.error.is_none());
        assert_eq!(view.label, "Human-Written");
        assert_eq!(view.displayed_confidence, 18);

        let items = state.sessions.list("s1");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].verdict, human_verdict());
    }

    #[tokio::test]
    async fn test_analyze_short_input_returns_envelope_error() {
        let state = state_with(Some(human_verdict()));
        let req = AnalyzeRequest {
            text: "too short".to_string(),
            session_id: "s1".to_string(),
        };

        let Json(resp) = analyze_text(State(state.clone()), Json(req)).await.unwrap();
        assert!(resp.result.is_none());
        assert!(resp.error.unwrap().contains("at least 50 characters"));
        assert!(state.sessions.list("s1").is_empty());
    }

    #[tokio::test]
    async fn test_analyze_classifier_failure_leaves_history_untouched() {
        let state = state_with(None);
        let req = AnalyzeRequest {
            text: prose(200),
            session_id: "s1".to_string(),
        };

        let Json(resp) = analyze_text(State(state.clone()), Json(req)).await.unwrap();
        assert!(resp.result.is_none());
        assert!(resp.error.unwrap().contains("may be busy"));
        assert!(state.sessions.list("s1").is_empty());
    }

    #[tokio::test]
    async fn test_analyze_requires_session_id() {
        let state = state_with(Some(human_verdict()));
        let req = AnalyzeRequest {
            text: prose(200),
            session_id: "  ".to_string(),
        };

        let err = analyze_text(State(state), Json(req)).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_extract_plain_text() {
        let state = state_with(None);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "text/plain".parse().unwrap());

        let Json(resp) =
            extract_file(State(state), headers, Bytes::from_static(b"hello world")).await;
        assert_eq!(resp.text.as_deref(), Some("hello world"));
        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn test_extract_rejects_oversized_body_before_extraction() {
        let state = state_with(None);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "text/plain".parse().unwrap());

        let body = Bytes::from(vec![b'a'; MAX_UPLOAD_BYTES + 1]);
        let Json(resp) = extract_file(State(state), headers, body).await;
        assert!(resp.text.is_none());
        assert!(resp.error.unwrap().contains("too large"));
    }

    #[tokio::test]
    async fn test_extract_unsupported_type() {
        let state = state_with(None);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "image/png".parse().unwrap());

        let Json(resp) = extract_file(State(state), headers, Bytes::from_static(b"\x89PNG")).await;
        assert!(resp.text.is_none());
        assert!(resp.error.unwrap().contains("Unsupported file type"));
    }

    #[tokio::test]
    async fn test_history_entry_lookup() {
        let state = state_with(Some(human_verdict()));
        let entry = state.sessions.append("s1", "alpha", human_verdict());

        let Json(found) = get_history_entry(
            State(state.clone()),
            Path(entry.id.clone()),
            Query(SessionQuery {
                session_id: "s1".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(found.id, entry.id);

        let missing = get_history_entry(
            State(state),
            Path("nope".to_string()),
            Query(SessionQuery {
                session_id: "s1".to_string(),
            }),
        )
        .await;
        assert!(matches!(missing, Err(ApiError::NotFound)));
    }
}
