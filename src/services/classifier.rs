//! Verdict classification with a vision model.
//!
//! The photo is sent to Gemini together with a fixed instruction asking for a
//! single word. Only an exact "yes" selects the `yes` frame; callers collapse
//! any error to `no` via [`classify_or_default`].

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::Verdict;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const ANALYSIS_PROMPT: &str = r#"Analyze this image and check for anything that's wrong.
If there's something wrong, analyze if the thing that's broken is a software related issue or something else.
If it's a software related issue, return "yes", otherwise return "no".
Only return "yes" or "no", no other text"#;

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Gemini returned no text")]
    EmptyReply,
}

/// Outcome of a successful classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub verdict: Verdict,
    /// Model reply, trimmed and lowercased
    pub reply: String,
}

impl Classification {
    pub fn from_reply(raw: &str) -> Self {
        Self {
            verdict: Verdict::from_reply(raw),
            reply: raw.trim().to_lowercase(),
        }
    }

    /// What a failed classification is treated as
    pub fn fallback() -> Self {
        Self {
            verdict: Verdict::No,
            reply: Verdict::No.as_str().to_string(),
        }
    }
}

#[async_trait]
pub trait VerdictClassifier: Send + Sync {
    async fn classify(&self, image: &[u8], mime_type: &str)
    -> Result<Classification, ClassifyError>;
}

/// MIME type of an encoded image, sniffed from its leading bytes.
/// Unrecognised data is labelled `image/jpeg`.
pub fn mime_type_of(image: &[u8]) -> &'static str {
    image::guess_format(image)
        .map(|format| format.to_mime_type())
        .unwrap_or("image/jpeg")
}

/// Classify once, logging and defaulting to `no` on any error.
pub async fn classify_or_default(
    classifier: &dyn VerdictClassifier,
    image: &[u8],
    mime_type: &str,
) -> Classification {
    match classifier.classify(image, mime_type).await {
        Ok(classification) => classification,
        Err(e) => {
            tracing::warn!(error = %e, "Error analyzing image with Gemini, defaulting to no");
            Classification::fallback()
        }
    }
}

#[derive(Clone)]
pub struct GeminiClassifier {
    api_key: String,
    model: String,
    base_url: String,
    http: Client,
}

impl GeminiClassifier {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_base_url(api_key, model, GEMINI_API_BASE)
    }

    pub fn with_base_url(api_key: &str, model: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl VerdictClassifier for GeminiClassifier {
    async fn classify(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<Classification, ClassifyError> {
        let body = GenerateContentRequest::for_image(ANALYSIS_PROMPT, image, mime_type);

        tracing::info!(model = %self.model, "Sending image to Gemini API for analysis");

        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await?;
            return Err(ClassifyError::Api { status, body });
        }

        let parsed: GenerateContentResponse = resp.json().await?;
        let text = parsed.text().ok_or(ClassifyError::EmptyReply)?;
        tracing::info!("Gemini API response: '{}'", text.trim());

        Ok(Classification::from_reply(&text))
    }
}

// Wire types for models.generateContent

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

impl GenerateContentRequest {
    fn for_image(prompt: &str, image: &[u8], mime_type: &str) -> Self {
        let data = base64::engine::general_purpose::STANDARD.encode(image);
        Self {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data,
                        },
                    },
                ],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }
}
