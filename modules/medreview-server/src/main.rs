use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use medreview_browser::BrowserSession;
use medreview_common::{Config, Platform};
use medreview_extract::{ReviewFetcher, ScreenshotStore};
use sentiment_client::{ReviewText, SentimentClient, SentimentError};

// --- App State ---

struct AppState {
    fetcher: ReviewFetcher,
    sentiment: Option<SentimentClient>,
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("medreview=info".parse()?))
        .init();

    let config = Config::from_env();

    let session = Arc::new(
        BrowserSession::launch(&config.user_data_dir, config.headless).await?,
    );
    session.warm_up().await;

    let mut fetcher = ReviewFetcher::new(session);
    if config.save_screenshot {
        fetcher = fetcher.with_screenshots(ScreenshotStore::new(&config.screenshot_dir));
    }

    let sentiment = config
        .ai
        .as_ref()
        .map(|ai| SentimentClient::new(&ai.api_url, &ai.api_key, &ai.model));
    if sentiment.is_none() {
        info!("AI_API_URL/AI_API_KEY/AI_MODEL not set, sentiment classification disabled");
    }

    let state = Arc::new(AppState { fetcher, sentiment });

    let app = Router::new()
        .route("/", get(index))
        .route("/favicon.ico", get(favicon))
        .route("/api/v1/getReviews", get(get_reviews))
        .route("/api/v1/checkSentiment", post(check_sentiment))
        .with_state(state)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.host, config.port);
    info!("medreview server starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Static pages ---

async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

// --- GET /api/v1/getReviews ---

#[derive(Debug, Deserialize)]
struct GetReviewsParams {
    url: Option<String>,
    platform: Option<Platform>,
    #[serde(default)]
    all_reviews: bool,
}

async fn get_reviews(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GetReviewsParams>,
) -> Json<serde_json::Value> {
    let Some(url) = params.url else {
        return Json(json!({
            "error": "URL parameter missing",
            "details": "Provide url in query parameters, e.g.: ?url=https://docdoc.ru/doctor/SomeDoctor"
        }));
    };
    let Some(platform) = params.platform else {
        return Json(json!({
            "error": "Platform missing",
            "details": "Provide platform in query parameters: platform=sberzdorovie or platform=prodoctorov"
        }));
    };

    match state.fetcher.fetch(&url, platform, params.all_reviews).await {
        Ok(result) => Json(json!(result)),
        Err(e) => {
            error!(error = %e, %url, "Fetch failed");
            Json(json!({ "error": e.kind(), "details": e.details() }))
        }
    }
}

// --- POST /api/v1/checkSentiment ---

/// Two accepted request shapes: a batch (`reviews`) and the legacy single
/// review (`review`). Batch takes precedence when both are present.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SentimentRequest {
    Batch { reviews: Vec<ReviewText> },
    Single { review: String },
}

async fn check_sentiment(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let request: SentimentRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid request body",
                    "details": format!("expected {{\"review\": ...}} or {{\"reviews\": [...]}}: {e}")
                })),
            );
        }
    };

    let Some(client) = &state.sentiment else {
        return (
            StatusCode::OK,
            Json(json!({
                "error": "Sentiment classification is not configured",
                "details": "AI_API_URL, AI_API_KEY and AI_MODEL must be set"
            })),
        );
    };

    match request {
        SentimentRequest::Batch { reviews } => match client.classify_batch(&reviews).await {
            Ok(results) => (StatusCode::OK, Json(json!({ "results": results }))),
            Err(e) => sentiment_error(e),
        },
        SentimentRequest::Single { review } => match client.classify_one(&review).await {
            Ok(sentiment) => (StatusCode::OK, Json(json!({ "sentiment": sentiment }))),
            Err(e) => sentiment_error(e),
        },
    }
}

fn sentiment_error(e: SentimentError) -> (StatusCode, Json<serde_json::Value>) {
    error!(error = %e, "Sentiment classification failed");
    let (status, kind) = match &e {
        SentimentError::RateLimit(_) => (
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded. Please try again later.",
        ),
        SentimentError::Api { .. } => (StatusCode::BAD_GATEWAY, "AI API returned error"),
        SentimentError::InvalidResponse { .. } => {
            (StatusCode::BAD_GATEWAY, "AI response was not valid JSON")
        }
        SentimentError::Network(_) => (StatusCode::BAD_GATEWAY, "AI API unreachable"),
    };
    let details = match e {
        SentimentError::RateLimit(message) => message,
        SentimentError::Api { message, .. } => message,
        SentimentError::InvalidResponse { raw } => raw,
        SentimentError::Network(message) => message,
    };
    (status, Json(json!({ "error": kind, "details": details })))
}
