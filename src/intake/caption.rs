/// Caption generation
///
/// The caption service is an external text-generation API consumed through
/// the `CaptionService` trait. Jobs built here never fail: interpretation
/// errors and timeouts become a fixed fallback caption, expansion errors
/// become "nothing to append". Every outcome carries the memory id it
/// belongs to, so results may land in any order.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use futures_util::stream::{FuturesUnordered, StreamExt};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::files::{self, IncomingImage};
use crate::error::{Error, Result};
use crate::state::settings::Settings;

/// Caption used when the service fails or times out
pub const FALLBACK_DESCRIPTION: &str = "A blurred memory, just out of reach.";

const INTERPRET_PROMPT: &str = "Look at this photo and write a short, evocative caption for it as if \
     it were a personal memory. One or two sentences, no hashtags, no quotation marks.";

#[async_trait]
pub trait CaptionService: Send + Sync {
    /// Describe an image
    async fn interpret(&self, image: &[u8], mime: &str) -> Result<String>;

    /// Continue an existing caption following the user's prompt
    async fn expand(&self, image: &[u8], mime: &str, current: &str, prompt: &str) -> Result<String>;
}

/// Caption request for a freshly uploaded memory
#[derive(Debug, Clone)]
pub struct CaptionJob {
    pub id: String,
    pub image: IncomingImage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionOutcome {
    pub id: String,
    pub description: String,
    /// True if the fallback caption was used
    pub fell_back: bool,
}

/// Expansion request for an existing memory
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandJob {
    pub id: String,
    /// Image source to re-read
    pub path: PathBuf,
    pub current: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpandOutcome {
    pub id: String,
    /// Text to append; None leaves the description unchanged
    pub continuation: Option<String>,
}

async fn bounded<T>(timeout: Duration, request: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(timeout, request)
        .await
        .map_err(|_| Error::Timeout(timeout))?
}

/// Caption one upload. Always resolves.
pub async fn interpret_memory(service: Arc<dyn CaptionService>, job: CaptionJob, timeout: Duration) -> CaptionOutcome {
    let result = bounded(timeout, service.interpret(&job.image.bytes, &job.image.mime)).await;
    match result.and_then(non_empty) {
        Ok(description) => {
            info!("📝 Caption ready for {}", job.id);
            CaptionOutcome {
                id: job.id,
                description,
                fell_back: false,
            }
        }
        Err(e) => {
            warn!("Caption for {} failed, using fallback: {}", job.id, e);
            CaptionOutcome {
                id: job.id,
                description: FALLBACK_DESCRIPTION.to_string(),
                fell_back: true,
            }
        }
    }
}

/// Ask for a continuation of a memory's caption. Always resolves.
pub async fn expand_memory(service: Arc<dyn CaptionService>, job: ExpandJob, timeout: Duration) -> ExpandOutcome {
    match request_expansion(service.as_ref(), &job, timeout).await {
        Ok(continuation) => ExpandOutcome {
            id: job.id,
            continuation: Some(continuation),
        },
        Err(e) => {
            warn!("Expanding {} failed, description unchanged: {}", job.id, e);
            ExpandOutcome {
                id: job.id,
                continuation: None,
            }
        }
    }
}

async fn request_expansion(service: &dyn CaptionService, job: &ExpandJob, timeout: Duration) -> Result<String> {
    let path = job.path.clone();
    let image = tokio::task::spawn_blocking(move || files::read_image(&path))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))??
        .ok_or_else(|| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, "not an image")))?;

    let text = bounded(
        timeout,
        service.expand(&image.bytes, &image.mime, &job.current, &job.prompt),
    )
    .await?;
    non_empty(text)
}

/// Caption a batch concurrently, reporting each outcome as soon as it
/// resolves. One slow or failing job never holds up the others.
pub async fn caption_all<F>(service: Arc<dyn CaptionService>, jobs: Vec<CaptionJob>, timeout: Duration, mut on_resolved: F)
where
    F: FnMut(CaptionOutcome),
{
    let mut pending: FuturesUnordered<_> = jobs
        .into_iter()
        .map(|job| interpret_memory(Arc::clone(&service), job, timeout))
        .collect();

    while let Some(outcome) = pending.next().await {
        on_resolved(outcome);
    }
}

fn non_empty(text: String) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(Error::EmptyResponse)
    } else {
        Ok(trimmed.to_string())
    }
}

// ========== HTTP implementation ==========

/// Client for a generateContent-style multimodal endpoint
pub struct GeminiCaptionService {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl GeminiCaptionService {
    /// Build from settings; the API key comes from the environment
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .map_err(|_| Error::MissingApiKey(settings.api_key_env.clone()))?;
        let client = reqwest::Client::builder()
            .timeout(settings.caption_timeout())
            .build()?;

        Ok(Self {
            client,
            url: format!(
                "{}/models/{}:generateContent",
                settings.caption_endpoint.trim_end_matches('/'),
                settings.caption_model
            ),
            api_key,
        })
    }

    async fn generate(&self, prompt: &str, image: &[u8], mime: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: mime,
                            data: base64::engine::general_purpose::STANDARD.encode(image),
                        },
                    },
                    Part::Text { text: prompt },
                ],
            }],
        };

        let response: GenerateResponse = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.text()
    }
}

#[async_trait]
impl CaptionService for GeminiCaptionService {
    async fn interpret(&self, image: &[u8], mime: &str) -> Result<String> {
        self.generate(INTERPRET_PROMPT, image, mime).await
    }

    async fn expand(&self, image: &[u8], mime: &str, current: &str, prompt: &str) -> Result<String> {
        let prompt = expand_prompt(current, prompt);
        self.generate(&prompt, image, mime).await
    }
}

/// Stand-in used when no API key is configured; every call fails, so
/// uploads get the fallback caption and expansions append nothing.
pub struct OfflineCaptionService {
    reason: String,
}

impl OfflineCaptionService {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl CaptionService for OfflineCaptionService {
    async fn interpret(&self, _image: &[u8], _mime: &str) -> Result<String> {
        Err(Error::MissingApiKey(self.reason.clone()))
    }

    async fn expand(&self, _image: &[u8], _mime: &str, _current: &str, _prompt: &str) -> Result<String> {
        Err(Error::MissingApiKey(self.reason.clone()))
    }
}

fn expand_prompt(current: &str, prompt: &str) -> String {
    format!(
        "This photo already has the caption: \"{current}\"\n\
         The viewer asks: \"{prompt}\"\n\
         Continue the caption with one or two sentences that answer them. \
         Do not repeat the existing caption. Write in the same language as the caption."
    )
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Inline { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize, Debug, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> Result<String> {
        let text: String = self
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default();
        non_empty(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use crate::intake::placement::PLACEHOLDER_DESCRIPTION;
    use crate::state::data::{Memory, MemoryPatch};
    use crate::state::library::MemoryStore;

    /// Behaviour keyed by the image bytes
    struct ScriptedService;

    #[async_trait]
    impl CaptionService for ScriptedService {
        async fn interpret(&self, image: &[u8], _mime: &str) -> Result<String> {
            match image {
                b"slow" => {
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    Ok("a slow sunrise".to_string())
                }
                b"fast" => {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    Ok("  a quick glance  ".to_string())
                }
                b"hang" => std::future::pending().await,
                b"blank" => Ok("   ".to_string()),
                _ => Err(Error::EmptyResponse),
            }
        }

        async fn expand(&self, _image: &[u8], _mime: &str, current: &str, prompt: &str) -> Result<String> {
            Ok(format!("({current} / {prompt})"))
        }
    }

    fn job(id: &str, bytes: &[u8]) -> CaptionJob {
        CaptionJob {
            id: id.to_string(),
            image: IncomingImage {
                path: PathBuf::from(format!("/photos/{id}.jpg")),
                bytes: Arc::new(bytes.to_vec()),
                mime: "image/jpeg".to_string(),
            },
        }
    }

    fn placeholder(id: &str) -> Memory {
        Memory {
            id: id.to_string(),
            url: String::new(),
            description: PLACEHOLDER_DESCRIPTION.to_string(),
            timestamp: 0,
            theta: 0.0,
            phi: 1.0,
            scale: 1.0,
            rotation: 0.0,
            drift_speed: 1.0,
            is_analyzing: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_resolution_patches_by_id() {
        let store = Mutex::new(MemoryStore::new());
        store.lock().unwrap().append_batch(vec![placeholder("first"), placeholder("second")]);

        let mut order = Vec::new();
        caption_all(
            Arc::new(ScriptedService),
            vec![job("first", b"slow"), job("second", b"fast")],
            Duration::from_secs(20),
            |outcome| {
                let mut store = store.lock().unwrap();
                if outcome.id == "second" {
                    // The first upload is untouched by the second's caption.
                    let first = store.get("first").unwrap();
                    assert!(first.is_analyzing);
                    assert_eq!(first.description, PLACEHOLDER_DESCRIPTION);
                }
                order.push(outcome.id.clone());
                store.patch(&outcome.id, MemoryPatch::caption(outcome.description)).unwrap();
            },
        )
        .await;

        assert_eq!(order, vec!["second".to_string(), "first".to_string()]);
        let store = store.lock().unwrap();
        assert_eq!(store.get("first").unwrap().description, "a slow sunrise");
        assert_eq!(store.get("second").unwrap().description, "a quick glance");
        assert!(store.memories().iter().all(|m| !m.is_analyzing));
    }

    #[tokio::test]
    async fn test_failure_uses_fallback() {
        let outcome = interpret_memory(Arc::new(ScriptedService), job("x", b"broken"), Duration::from_secs(5)).await;
        assert_eq!(
            outcome,
            CaptionOutcome {
                id: "x".to_string(),
                description: FALLBACK_DESCRIPTION.to_string(),
                fell_back: true,
            }
        );

        let blank = interpret_memory(Arc::new(ScriptedService), job("y", b"blank"), Duration::from_secs(5)).await;
        assert!(blank.fell_back);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_request_times_out() {
        let outcome = interpret_memory(Arc::new(ScriptedService), job("h", b"hang"), Duration::from_secs(20)).await;
        assert!(outcome.fell_back);
        assert_eq!(outcome.id, "h");
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_failure_does_not_block_batch() {
        let mut outcomes = Vec::new();
        caption_all(
            Arc::new(ScriptedService),
            vec![job("a", b"hang"), job("b", b"broken"), job("c", b"fast")],
            Duration::from_secs(10),
            |outcome| outcomes.push(outcome),
        )
        .await;

        let ids: Vec<&str> = outcomes.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert!(!outcomes[1].fell_back);
    }

    #[tokio::test]
    async fn test_offline_service_falls_back() {
        let service: Arc<dyn CaptionService> = Arc::new(OfflineCaptionService::new("MEMORY_ORBS_API_KEY"));
        let outcome = interpret_memory(service, job("o", b"fast"), Duration::from_secs(1)).await;
        assert!(outcome.fell_back);
    }

    #[tokio::test]
    async fn test_expand_unreadable_source_appends_nothing() {
        let outcome = expand_memory(
            Arc::new(ScriptedService),
            ExpandJob {
                id: "e".to_string(),
                path: PathBuf::from("/nonexistent/photo.jpg"),
                current: "A beach.".to_string(),
                prompt: "who was there?".to_string(),
            },
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(outcome.continuation, None);
    }

    #[tokio::test]
    async fn test_expand_returns_continuation() {
        use image::{DynamicImage, ImageFormat, RgbImage};

        let dir = std::env::temp_dir().join(format!("memory-orbs-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("beach.png");
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let outcome = expand_memory(
            Arc::new(ScriptedService),
            ExpandJob {
                id: "e".to_string(),
                path,
                current: "A beach.".to_string(),
                prompt: "who was there?".to_string(),
            },
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(outcome.continuation.as_deref(), Some("(A beach. / who was there?)"));
    }

    #[test]
    fn test_response_text_is_extracted() {
        let json = r#"{
            "candidates": [
                { "content": { "parts": [ { "text": "Sun on " }, { "text": "wet sand." } ] } }
            ]
        }"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text().unwrap(), "Sun on wet sand.");

        let empty: GenerateResponse = serde_json::from_str(r#"{ "candidates": [] }"#).unwrap();
        assert!(matches!(empty.text(), Err(Error::EmptyResponse)));
    }

    #[test]
    fn test_request_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: "AAAA".to_string(),
                        },
                    },
                    Part::Text { text: "describe" },
                ],
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["inline_data"]["mime_type"], "image/png");
        assert_eq!(value["contents"][0]["parts"][1]["text"], "describe");
    }
}
