//! Gemini image generation client.

use crate::error::{sanitize_error_message, ImagistError, Result};
use crate::types::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat,
};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Trait for image generation clients.
///
/// The session controller is generic over this trait so tests can inject
/// a fake client in place of the real API.
#[async_trait]
pub trait ImageClient: Send + Sync {
    /// Issues one generation request.
    ///
    /// Returns `Ok(None)` when the API answered successfully but produced
    /// no image payload; errors are reserved for credential, transport,
    /// and API failures.
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<GeneratedImage>>;
}

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Gemini 2.5 Flash Image (fast, supports editing with a reference).
    #[default]
    FlashImage,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlashImage => "gemini-2.5-flash-image",
        }
    }
}

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Builder for [`GeminiClient`].
#[derive(Debug, Clone, Default)]
pub struct GeminiClientBuilder {
    api_key: Option<String>,
    model: GeminiModel,
}

impl GeminiClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GEMINI_API_KEY`, then
    /// `GOOGLE_API_KEY`, from the environment.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Builds the client, resolving the API key.
    ///
    /// A missing key is fatal for any generation attempt, so it fails
    /// here rather than on first use.
    pub fn build(self) -> Result<GeminiClient> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .ok_or_else(|| {
                ImagistError::Auth("GEMINI_API_KEY not set and no API key provided".into())
            })?;

        Ok(GeminiClient {
            client: reqwest::Client::new(),
            api_key,
            model: self.model,
        })
    }
}

/// Client for Google's Gemini multimodal image API.
///
/// One fire-and-forget request per call: no retries, no streaming.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: GeminiModel,
}

impl GeminiClient {
    /// Creates a new `GeminiClientBuilder`.
    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::new()
    }

    async fn generate_impl(&self, request: &GenerationRequest) -> Result<Option<GeneratedImage>> {
        let start = Instant::now();

        let url = format!("{}/{}:generateContent", API_BASE, self.model.as_str());
        let body = GeminiRequest::from_generation_request(request);

        tracing::debug!(
            model = self.model.as_str(),
            aspect_ratio = %request.aspect_ratio,
            edit = request.is_edit(),
            "dispatching generation request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let gemini_response: GeminiResponse = response.json().await?;

        // The first inline payload across the candidate's parts wins;
        // a response with none means "no image produced", not a failure.
        let Some(inline_data) = gemini_response.into_first_inline_data() else {
            tracing::debug!("response carried no inline image payload");
            return Ok(None);
        };

        let data = base64::engine::general_purpose::STANDARD
            .decode(&inline_data.data)
            .map_err(|e| ImagistError::Decode(e.to_string()))?;

        let format = ImageFormat::from_mime_type(&inline_data.mime_type).unwrap_or_default();
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(bytes = data.len(), duration_ms, "generation complete");

        Ok(Some(GeneratedImage::new(
            data,
            format,
            GenerationMetadata {
                model: Some(self.model.as_str().to_string()),
                duration_ms: Some(duration_ms),
            },
        )))
    }

    fn parse_error(&self, status: u16, text: &str) -> ImagistError {
        let text = sanitize_error_message(text);
        if status == 401 || status == 403 {
            return ImagistError::Auth(text);
        }
        if status == 404 {
            return ImagistError::Api {
                status,
                message: "Model not found. Verify the model name is correct.".into(),
            };
        }
        ImagistError::Api {
            status,
            message: text,
        }
    }
}

#[async_trait]
impl ImageClient for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<GeneratedImage>> {
        self.generate_impl(request).await
    }
}

// Request/Response wire types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - inline image data or text.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    InlineData { inline_data: GeminiInlineData },
    Text { text: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    image_config: GeminiImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: String,
}

impl GeminiRequest {
    fn from_generation_request(req: &GenerationRequest) -> Self {
        let mut parts = Vec::new();

        // The reference image goes first so the model treats the text
        // prompt as an instruction over it.
        if let Some(ref reference) = req.reference_image {
            parts.push(GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: reference.mime_type.clone(),
                    data: reference.data.clone(),
                },
            });
        }

        parts.push(GeminiRequestPart::Text {
            text: req.prompt.clone(),
        });

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                image_config: GeminiImageConfig {
                    aspect_ratio: req.aspect_ratio.as_str().to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

impl GeminiResponse {
    fn into_first_inline_data(self) -> Option<InlineData> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| content.parts.into_iter().find_map(|p| p.inline_data))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}
