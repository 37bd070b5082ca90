use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use deal_search_core::llm::error::UpstreamStatusError;
use serde::Serialize;

pub const JSON_UTF8: &str = "application/json; charset=utf-8";

const MSG_BAD_REQUEST: &str = "Query mancante o troppo corta";
const MSG_CONFIG: &str = "GEMINI_API_KEY non configurata su Vercel";
const MSG_UPSTREAM: &str = "Errore Gemini";
const MSG_SERVER: &str = "Errore server";

#[derive(Debug)]
pub enum ApiError {
    BadRequest,
    Config,
    Upstream { status: u16, details: String },
    Server(String),
}

impl ApiError {
    pub fn server(details: impl Into<String>) -> Self {
        Self::Server(details.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(upstream) = err.downcast_ref::<UpstreamStatusError>() {
            tracing::warn!(status = upstream.status, "upstream model call failed");
            return Self::Upstream {
                status: upstream.status,
                details: upstream.details.clone(),
            };
        }

        sentry_anyhow::capture_anyhow(&err);
        let details = format!("{err:#}");
        tracing::error!(error = %details, "deal search failed");
        Self::Server(details)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, body) = match self {
            ApiError::BadRequest => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: MSG_BAD_REQUEST,
                    status: None,
                    details: None,
                },
            ),
            ApiError::Config => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: MSG_CONFIG,
                    status: None,
                    details: None,
                },
            ),
            ApiError::Upstream { status, details } => (
                StatusCode::BAD_GATEWAY,
                ErrorBody {
                    error: MSG_UPSTREAM,
                    status: Some(status),
                    details: Some(details),
                },
            ),
            ApiError::Server(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: MSG_SERVER,
                    status: None,
                    details: Some(details),
                },
            ),
        };

        json_response(code, &body)
    }
}

/// Serializes `body` with an explicit UTF-8 JSON content type.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => (status, [(header::CONTENT_TYPE, JSON_UTF8)], bytes).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize response body");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, JSON_UTF8)],
                format!(r#"{{"error":"{MSG_SERVER}"}}"#),
            )
                .into_response()
        }
    }
}
