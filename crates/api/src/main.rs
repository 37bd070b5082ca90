use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deal_search_core::llm::gemini::GeminiClient;
use deal_search_core::llm::LlmClient;
use deal_search_core::search::{search_deals, validate_query};

mod error;

use error::{json_response, ApiError};

const CACHE_CONTROL: &str = "s-maxage=30, stale-while-revalidate=120";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = deal_search_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let llm: Option<Arc<dyn LlmClient>> = match GeminiClient::from_settings(&settings) {
        Ok(client) => {
            tracing::info!(model = client.model(), "Gemini client ready");
            Some(Arc::new(client) as Arc<dyn LlmClient>)
        }
        Err(e) => {
            tracing::error!(error = %e, "Gemini client unavailable; starting API in degraded mode");
            None
        }
    };

    let app = app(AppState { llm });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Clone)]
struct AppState {
    llm: Option<Arc<dyn LlmClient>>,
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/search", get(search))
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn search(
    State(state): State<AppState>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response, ApiError> {
    // An unparsable query string is treated like a missing `q`.
    let raw = params.ok().and_then(|Query(pairs)| joined_param(&pairs, "q"));
    let query = validate_query(raw.as_deref()).ok_or(ApiError::BadRequest)?;

    let Some(llm) = &state.llm else {
        return Err(ApiError::Config);
    };

    let res = search_deals(llm.as_ref(), &query).await?;

    let mut response = json_response(StatusCode::OK, &res);
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static(CACHE_CONTROL),
    );
    Ok(response)
}

/// All values of a repeated parameter, comma-joined (`?q=a&q=b` is `"a,b"`).
fn joined_param(pairs: &[(String, String)], name: &str) -> Option<String> {
    let values: Vec<&str> = pairs
        .iter()
        .filter(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(values.join(","))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(%details, "request handler panicked");
    ApiError::server(details).into_response()
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &deal_search_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use deal_search_core::llm::error::UpstreamStatusError;
    use deal_search_core::llm::gemini::GenerateContentResponse;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    enum Reply {
        Json(Value),
        Status(u16, String),
        Panic,
    }

    struct FakeLlm {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl FakeLlm {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }

        fn text(text: &str) -> Arc<Self> {
            Self::new(Reply::Json(
                json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}),
            ))
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for FakeLlm {
        fn model(&self) -> &str {
            "gemini-2.5-flash"
        }

        async fn generate_content(&self, _prompt: &str) -> anyhow::Result<GenerateContentResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Json(v) => Ok(serde_json::from_value(v.clone())?),
                Reply::Status(status, body) => Err(UpstreamStatusError::new(*status, body).into()),
                Reply::Panic => panic!("model client exploded"),
            }
        }
    }

    fn state_with(llm: Arc<FakeLlm>) -> AppState {
        AppState {
            llm: Some(llm as Arc<dyn LlmClient>),
        }
    }

    async fn fetch(state: AppState, uri: &str) -> (StatusCode, axum::http::HeaderMap, Value) {
        let res = app(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, headers, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn rejects_missing_or_short_queries() {
        let llm = FakeLlm::text("{}");
        for uri in ["/api/search", "/api/search?q=", "/api/search?q=%20x%20", "/api/search?q=a"] {
            let (status, headers, body) = fetch(state_with(llm.clone()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(headers[header::CONTENT_TYPE], error::JSON_UTF8);
            assert_eq!(body, json!({"error": "Query mancante o troppo corta"}));
        }
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_credential_is_a_config_error() {
        let (status, _, body) = fetch(AppState { llm: None }, "/api/search?q=tv").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "GEMINI_API_KEY non configurata su Vercel"}));
    }

    #[tokio::test]
    async fn short_query_is_rejected_before_config_check() {
        let (status, _, _) = fetch(AppState { llm: None }, "/api/search?q=a").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn returns_normalized_deals_with_cache_header() {
        let deals: Vec<_> = (0..15)
            .map(|i| json!({"title": format!("Offerta {i}"), "price": "gratis", "discount": 10}))
            .collect();
        let chunks: Vec<_> = (0..14)
            .map(|i| json!({"web": {"uri": format!("https://s{i}.it"), "title": format!("s{i}")}}))
            .collect();
        let text = format!(
            "Risultati trovati:\n```json\n{}\n```",
            json!({"deals": deals, "notes": "ok"})
        );
        let llm = FakeLlm::new(Reply::Json(json!({
            "candidates": [{
                "content": {"parts": [{"text": text}]},
                "groundingMetadata": {"webSearchQueries": ["smartphone offerte"], "groundingChunks": chunks}
            }]
        })));

        let (status, headers, body) = fetch(state_with(llm.clone()), "/api/search?q=%20smartphone%20").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CACHE_CONTROL], CACHE_CONTROL);
        assert_eq!(headers[header::CONTENT_TYPE], error::JSON_UTF8);
        assert_eq!(body["query"], json!("smartphone"));
        assert_eq!(body["deals"].as_array().unwrap().len(), 12);
        assert_eq!(body["deals"][0]["price"], json!(null));
        assert_eq!(body["deals"][0]["discount"], json!(10));
        assert_eq!(body["deals"][0]["time"], json!("Adesso"));
        assert_eq!(body["deals"][0]["category"], json!("generated"));
        assert_eq!(body["sources"].as_array().unwrap().len(), 10);
        assert_eq!(
            body["meta"],
            json!({"model": "gemini-2.5-flash", "grounded": true, "webSearchQueries": ["smartphone offerte"]})
        );
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unparsable_model_output_is_still_ok() {
        let llm = FakeLlm::text("Nessuna offerta trovata, riprova più tardi.");
        let (status, _, body) = fetch(state_with(llm), "/api/search?q=tv").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deals"], json!([]));
        assert_eq!(body["sources"], json!([]));
        assert_eq!(body["meta"], json!({"model": "gemini-2.5-flash", "grounded": false}));
    }

    #[tokio::test]
    async fn upstream_failure_is_bad_gateway_with_truncated_details() {
        let llm = FakeLlm::new(Reply::Status(503, "e".repeat(5000)));
        let (status, headers, body) = fetch(state_with(llm), "/api/search?q=tv").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(headers.get(header::CACHE_CONTROL).is_none());
        assert_eq!(body["error"], json!("Errore Gemini"));
        assert_eq!(body["status"], json!(503));
        assert_eq!(body["details"].as_str().unwrap().chars().count(), 2000);
    }

    #[tokio::test]
    async fn panics_become_server_errors() {
        let llm = FakeLlm::new(Reply::Panic);
        let (status, headers, body) = fetch(state_with(llm), "/api/search?q=tv").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(headers[header::CONTENT_TYPE], error::JSON_UTF8);
        assert_eq!(
            body,
            json!({"error": "Errore server", "details": "model client exploded"})
        );
    }

    #[tokio::test]
    async fn repeated_query_parameter_is_comma_joined() {
        let llm = FakeLlm::text(r#"{"deals": []}"#);
        let (status, _, body) = fetch(state_with(llm), "/api/search?q=tv&q=oled&lang=it").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], json!("tv,oled"));
    }

    #[test]
    fn joined_param_collects_every_value() {
        let pairs = vec![
            ("q".to_string(), "".to_string()),
            ("x".to_string(), "1".to_string()),
            ("q".to_string(), "".to_string()),
        ];
        assert_eq!(joined_param(&pairs, "q").as_deref(), Some(","));
        assert_eq!(joined_param(&pairs, "missing"), None);
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let res = app(AppState { llm: None })
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
