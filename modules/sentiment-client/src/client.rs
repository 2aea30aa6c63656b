use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use crate::error::{Result, SentimentError};
use crate::types::{
    ChatRequest, ChatResponse, ResponseFormat, ReviewText, Sentiment, SentimentResult,
    WireMessage,
};

/// Max attempts per classification call. Only transient failures (network,
/// rate limit, 5xx) are retried; the last error is surfaced as-is.
const MAX_ATTEMPTS: u32 = 3;
/// Base backoff between attempts. Actual delay is base * attempt.
const RETRY_BASE: Duration = Duration::from_secs(1);
/// Whole-request timeout for one endpoint call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const SYSTEM_PROMPT: &str =
    "You are a sentiment analysis assistant. You respond ONLY with valid JSON.";

// --- Transport seam ---

/// One chat-completions exchange. Split out from the client so tests can
/// substitute a counting mock for the remote endpoint.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

/// Real HTTP transport against an OpenAI-compatible endpoint.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(api_url: &str, api_key: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: normalize_base_url(api_url),
            api_key: api_key.to_string(),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| SentimentError::Network(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

/// Accept both an API root and a full `/chat/completions` URL in config.
fn normalize_base_url(api_url: &str) -> String {
    api_url
        .trim_end_matches('/')
        .trim_end_matches("/chat/completions")
        .trim_end_matches('/')
        .to_string()
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %request.model, "Sentiment chat request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            let message = response.text().await.unwrap_or_default();
            return Err(SentimentError::RateLimit(message));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SentimentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

// --- Client ---

/// Classifies review sentiment in batches: one prompt per batch, one
/// endpoint call, results reconciled back to input ids.
pub struct SentimentClient {
    transport: Arc<dyn ChatTransport>,
    model: String,
}

impl SentimentClient {
    pub fn new(api_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            transport: Arc::new(HttpTransport::new(api_url, api_key)),
            model: model.to_string(),
        }
    }

    pub fn with_transport(transport: Arc<dyn ChatTransport>, model: &str) -> Self {
        Self {
            transport,
            model: model.to_string(),
        }
    }

    /// Classify a whole batch with a single endpoint call.
    ///
    /// The empty batch short-circuits without touching the endpoint. Output
    /// follows input order; ids the model did not cover come back as
    /// `unknown`.
    pub async fn classify_batch(&self, reviews: &[ReviewText]) -> Result<Vec<SentimentResult>> {
        if reviews.is_empty() {
            return Ok(Vec::new());
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                WireMessage::system(SYSTEM_PROMPT),
                WireMessage::user(build_prompt(reviews)),
            ],
            response_format: ResponseFormat::json_object(),
        };

        let response = self.chat_with_retry(&request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| SentimentError::InvalidResponse {
                raw: String::new(),
            })?;

        debug!(response = %content, "Sentiment batch response");

        let map = parse_sentiment_map(&content)?;

        Ok(reviews
            .iter()
            .map(|review| {
                let sentiment = map
                    .get(&review.id)
                    .and_then(|v| v.as_str())
                    .map(Sentiment::from_label)
                    .unwrap_or(Sentiment::Unknown);
                SentimentResult {
                    id: review.id.clone(),
                    sentiment,
                }
            })
            .collect())
    }

    /// Thin single-review path: a batch of one under the synthetic id
    /// `"single"`. A batch that legitimately used that id would collide
    /// with this wrapper; kept as a known quirk of the contract.
    pub async fn classify_one(&self, text: &str) -> Result<Sentiment> {
        let batch = [ReviewText {
            id: "single".to_string(),
            text: text.to_string(),
        }];
        let mut results = self.classify_batch(&batch).await?;
        Ok(results
            .pop()
            .map(|r| r.sentiment)
            .unwrap_or(Sentiment::Unknown))
    }

    async fn chat_with_retry(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.chat(request).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < MAX_ATTEMPTS && is_transient(&e) => {
                    let backoff = RETRY_BASE * attempt;
                    warn!(error = %e, attempt, backoff_secs = backoff.as_secs(),
                        "Transient sentiment endpoint failure, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_transient(err: &SentimentError) -> bool {
    match err {
        SentimentError::Network(_) | SentimentError::RateLimit(_) => true,
        SentimentError::Api { status, .. } => *status >= 500,
        SentimentError::InvalidResponse { .. } => false,
    }
}

/// Embed the batch as an id/text array inside the prompt. Quotes and
/// newlines in review text are flattened so the payload cannot break the
/// prompt's own structure.
fn build_prompt(reviews: &[ReviewText]) -> String {
    let items: Vec<String> = reviews
        .iter()
        .map(|r| {
            let text = r.text.replace('\n', " ").replace('"', "'");
            format!("{{\"id\": \"{}\", \"text\": \"{}\"}}", r.id, text)
        })
        .collect();
    let reviews_json = format!("[\n{}\n]", items.join(",\n"));

    format!(
        r#"
Analyze the sentiment of the reviews provided below.
For each review, determine if it is 'positive', 'negative', or 'neutral'.

Input Data:
{reviews_json}

Output Format:
Return a JSON object where keys are the review IDs and values are the sentiment strings.
Example:
{{
  "1": "positive",
  "2": "negative"
}}

Do not add any markdown formatting (like ```json). Just the raw JSON string.
"#
    )
}

/// Strip optional markdown fences, then parse the id -> label object.
fn parse_sentiment_map(content: &str) -> Result<serde_json::Map<String, serde_json::Value>> {
    let stripped = strip_code_fences(content);
    match serde_json::from_str::<serde_json::Value>(stripped) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        _ => Err(SentimentError::InvalidResponse {
            raw: content.to_string(),
        }),
    }
}

/// Models sometimes wrap the reply in ```json fences despite instructions.
fn strip_code_fences(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::types::{Choice, ResponseMessage};

    /// Canned-reply transport that counts calls.
    struct MockChat {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    impl MockChat {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatTransport for MockChat {
        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatResponse {
                choices: vec![Choice {
                    message: ResponseMessage {
                        content: self.reply.clone(),
                    },
                }],
            })
        }
    }

    fn review(id: &str, text: &str) -> ReviewText {
        ReviewText {
            id: id.to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn empty_batch_makes_no_endpoint_call() {
        let mock = MockChat::replying("{}");
        let client = SentimentClient::with_transport(mock.clone(), "test-model");

        let results = client.classify_batch(&[]).await.unwrap();

        assert!(results.is_empty());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn batch_reconciles_in_input_order_with_unknown_fallback() {
        let mock = MockChat::replying(r#"{"2": "negative", "1": "positive"}"#);
        let client = SentimentClient::with_transport(mock.clone(), "test-model");

        let batch = [review("1", "great"), review("2", "awful"), review("3", "meh")];
        let results = client.classify_batch(&batch).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "1");
        assert_eq!(results[0].sentiment, Sentiment::Positive);
        assert_eq!(results[1].id, "2");
        assert_eq!(results[1].sentiment, Sentiment::Negative);
        assert_eq!(results[2].id, "3");
        assert_eq!(results[2].sentiment, Sentiment::Unknown);
        assert_eq!(mock.call_count(), 1);
    }

    /// Fails with a transient error until `failures` is exhausted, then
    /// replies.
    struct FlakyChat {
        failures: AtomicUsize,
        reply: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatTransport for FlakyChat {
        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(SentimentError::Network("connection reset".to_string()));
            }
            Ok(ChatResponse {
                choices: vec![Choice {
                    message: ResponseMessage {
                        content: Some(self.reply.clone()),
                    },
                }],
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_then_succeed() {
        let flaky = Arc::new(FlakyChat {
            failures: AtomicUsize::new(2),
            reply: r#"{"1": "positive"}"#.to_string(),
            calls: AtomicUsize::new(0),
        });
        let client = SentimentClient::with_transport(flaky.clone(), "test-model");

        let results = client.classify_batch(&[review("1", "ok")]).await.unwrap();

        assert_eq!(results[0].sentiment, Sentiment::Positive);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_failure_surfaces_after_max_attempts() {
        let flaky = Arc::new(FlakyChat {
            failures: AtomicUsize::new(10),
            reply: "{}".to_string(),
            calls: AtomicUsize::new(0),
        });
        let client = SentimentClient::with_transport(flaky.clone(), "test-model");

        let err = client
            .classify_batch(&[review("1", "ok")])
            .await
            .unwrap_err();

        assert!(matches!(err, SentimentError::Network(_)));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn single_review_classification() {
        let mock = MockChat::replying(r#"{"single": "positive"}"#);
        let client = SentimentClient::with_transport(mock, "test-model");

        let sentiment = client.classify_one("Great doctor").await.unwrap();

        assert_eq!(sentiment, Sentiment::Positive);
    }

    #[tokio::test]
    async fn fenced_json_reply_is_accepted() {
        let mock = MockChat::replying("```json\n{\"1\": \"neutral\"}\n```");
        let client = SentimentClient::with_transport(mock, "test-model");

        let results = client.classify_batch(&[review("1", "ok")]).await.unwrap();

        assert_eq!(results[0].sentiment, Sentiment::Neutral);
    }

    #[tokio::test]
    async fn malformed_reply_surfaces_invalid_response_with_raw_text() {
        let mock = MockChat::replying("sorry, I cannot do that");
        let client = SentimentClient::with_transport(mock, "test-model");

        let err = client
            .classify_batch(&[review("1", "ok")])
            .await
            .unwrap_err();

        match err {
            SentimentError::InvalidResponse { raw } => {
                assert!(raw.contains("sorry"));
            }
            other => panic!("expected InvalidResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn off_vocabulary_label_maps_to_unknown() {
        let mock = MockChat::replying(r#"{"1": "ecstatic"}"#);
        let client = SentimentClient::with_transport(mock, "test-model");

        let results = client.classify_batch(&[review("1", "!!")]).await.unwrap();

        assert_eq!(results[0].sentiment, Sentiment::Unknown);
    }

    #[test]
    fn prompt_escapes_quotes_and_newlines() {
        let prompt = build_prompt(&[review("7", "line one\nsaid \"wow\"")]);
        assert!(prompt.contains(r#"{"id": "7", "text": "line one said 'wow'"}"#));
    }

    #[test]
    fn base_url_accepts_full_completions_url() {
        assert_eq!(
            normalize_base_url("https://openrouter.ai/api/v1/chat/completions"),
            "https://openrouter.ai/api/v1"
        );
        assert_eq!(
            normalize_base_url("https://openrouter.ai/api/v1/"),
            "https://openrouter.ai/api/v1"
        );
    }
}
