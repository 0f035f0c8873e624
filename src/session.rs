//! Session state machine driving the image client.

use crate::client::ImageClient;
use crate::types::{AspectRatio, GeneratedImage, GenerationRequest};
use crate::upload::UploadedImage;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Message shown when the API answers without producing an image.
pub const NO_IMAGE_MESSAGE: &str = "Unable to generate an image. Please try again.";

/// Message shown on transport or API failure.
pub const CONNECTION_MESSAGE: &str =
    "There was a problem reaching the service. Please try again.";

/// Message shown when no API credential is configured.
pub const CREDENTIAL_MESSAGE: &str =
    "API key not found. Please check your environment configuration.";

/// Display state of a session.
///
/// A tagged union instead of independent loading/error/result fields, so
/// exactly one display state holds at a time.
#[derive(Debug, Clone)]
pub enum SessionState {
    /// Nothing submitted yet, or ready for the next submission.
    Idle,
    /// A generation request is in flight.
    Loading,
    /// The last submission produced an image.
    Success(GeneratedImage),
    /// The last submission failed with a user-visible message.
    Failure(String),
}

/// Interaction state for one user session.
///
/// Holds the prompt, the chosen aspect ratio, an optional validated
/// upload, and the display state, and drives the injected client on
/// submit. One request in flight at most: submitting while loading is
/// a no-op.
pub struct Session<C: ImageClient> {
    client: C,
    prompt: String,
    aspect_ratio: AspectRatio,
    reference: Option<UploadedImage>,
    state: SessionState,
}

impl<C: ImageClient> Session<C> {
    /// Creates an idle session around the given client.
    pub fn new(client: C) -> Self {
        Self {
            client,
            prompt: String::new(),
            aspect_ratio: AspectRatio::default(),
            reference: None,
            state: SessionState::Idle,
        }
    }

    /// Replaces the prompt text.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Current prompt text.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Selects the aspect ratio for the next submission.
    pub fn set_aspect_ratio(&mut self, ratio: AspectRatio) {
        self.aspect_ratio = ratio;
    }

    /// Currently selected aspect ratio.
    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    /// Attaches a validated upload as the reference image.
    pub fn attach_reference(&mut self, upload: UploadedImage) {
        self.reference = Some(upload);
    }

    /// Clears the reference image. The slot is fully reset, so the
    /// identical file can be re-attached afterwards.
    pub fn clear_reference(&mut self) {
        self.reference = None;
    }

    /// Currently attached reference, if any.
    pub fn reference(&self) -> Option<&UploadedImage> {
        self.reference.as_ref()
    }

    /// Current display state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// True while a request is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self.state, SessionState::Loading)
    }

    /// The generated image, when the last submission succeeded.
    pub fn image(&self) -> Option<&GeneratedImage> {
        match &self.state {
            SessionState::Success(image) => Some(image),
            _ => None,
        }
    }

    /// The failure message, when the last submission failed.
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failure(message) => Some(message),
            _ => None,
        }
    }

    /// Submits the current prompt, ratio, and reference for generation.
    ///
    /// A no-op when the prompt is blank or a request is already in
    /// flight. Otherwise clears any prior error or result by entering
    /// `Loading`, calls the client exactly once, and settles on
    /// `Success` or `Failure`; the session never stays in `Loading`.
    pub async fn submit(&mut self) {
        if self.prompt.trim().is_empty() || self.is_loading() {
            return;
        }

        self.state = SessionState::Loading;

        let mut request = GenerationRequest::new(self.prompt.clone())
            .with_aspect_ratio(self.aspect_ratio);
        if let Some(ref upload) = self.reference {
            request = request.with_reference_image(upload.to_reference());
        }

        self.state = match self.client.generate(&request).await {
            Ok(Some(image)) => SessionState::Success(image),
            Ok(None) => SessionState::Failure(NO_IMAGE_MESSAGE.to_string()),
            Err(e) if e.is_credential() => {
                tracing::warn!("generation rejected: {e}");
                SessionState::Failure(CREDENTIAL_MESSAGE.to_string())
            }
            Err(e) => {
                tracing::warn!("generation failed: {e}");
                SessionState::Failure(CONNECTION_MESSAGE.to_string())
            }
        };
    }

    /// Writes the current result into `dir` as
    /// `ai-image-<unix_timestamp_ms>.png`.
    ///
    /// Returns the written path, or `None` when there is no result.
    pub fn download_to(&self, dir: impl AsRef<Path>) -> crate::Result<Option<PathBuf>> {
        let Some(image) = self.image() else {
            return Ok(None);
        };

        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let path = dir
            .as_ref()
            .join(format!("ai-image-{timestamp_ms}.png"));
        image.save(&path)?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImagistError;
    use crate::types::{GenerationMetadata, ImageFormat};
    use crate::upload::validate_upload;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum FakeOutcome {
        Image,
        Empty,
        Error(fn() -> ImagistError),
    }

    struct FakeClient {
        outcome: FakeOutcome,
        calls: AtomicUsize,
        last_request: Mutex<Option<GenerationRequest>>,
    }

    impl FakeClient {
        fn new(outcome: FakeOutcome) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }

        fn call_count(session: &Session<Self>) -> usize {
            session.client.calls.load(Ordering::SeqCst)
        }

        fn last_request(session: &Session<Self>) -> Option<GenerationRequest> {
            session.client.last_request.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageClient for FakeClient {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> crate::Result<Option<GeneratedImage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            match &self.outcome {
                FakeOutcome::Image => Ok(Some(GeneratedImage::new(
                    vec![1, 2, 3],
                    ImageFormat::Png,
                    GenerationMetadata::default(),
                ))),
                FakeOutcome::Empty => Ok(None),
                FakeOutcome::Error(make) => Err(make()),
            }
        }
    }

    fn png_upload() -> UploadedImage {
        let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0, 0, 0, 13, b'I', b'H', b'D', b'R']);
        validate_upload(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_submit_calls_client_once_with_prompt_and_ratio() {
        let mut session = Session::new(FakeClient::new(FakeOutcome::Image));
        session.set_prompt("a red bicycle");
        session.set_aspect_ratio(AspectRatio::Landscape);
        session.submit().await;

        assert_eq!(FakeClient::call_count(&session), 1);
        let request = FakeClient::last_request(&session).unwrap();
        assert_eq!(request.prompt, "a red bicycle");
        assert_eq!(request.aspect_ratio, AspectRatio::Landscape);
        assert!(request.reference_image.is_none());
        assert!(session.image().is_some());
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_blank_prompt_is_a_no_op() {
        let mut session = Session::new(FakeClient::new(FakeOutcome::Image));
        session.set_prompt("   \t  ");
        session.submit().await;

        assert_eq!(FakeClient::call_count(&session), 0);
        assert!(matches!(session.state(), SessionState::Idle));
    }

    #[tokio::test]
    async fn test_empty_result_sets_no_image_failure() {
        let mut session = Session::new(FakeClient::new(FakeOutcome::Empty));
        session.set_prompt("a ghost");
        session.submit().await;

        assert_eq!(session.error(), Some(NO_IMAGE_MESSAGE));
        assert!(session.image().is_none());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_transport_failure_sets_connection_message() {
        let mut session = Session::new(FakeClient::new(FakeOutcome::Error(|| {
            ImagistError::Api {
                status: 500,
                message: "internal".into(),
            }
        })));
        session.set_prompt("a storm");
        session.submit().await;

        assert_eq!(session.error(), Some(CONNECTION_MESSAGE));
        assert!(session.image().is_none());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_credential_failure_sets_credential_message() {
        let mut session = Session::new(FakeClient::new(FakeOutcome::Error(|| {
            ImagistError::Auth("no key".into())
        })));
        session.set_prompt("a castle");
        session.submit().await;

        assert_eq!(session.error(), Some(CREDENTIAL_MESSAGE));
    }

    #[tokio::test]
    async fn test_resubmission_clears_prior_failure() {
        let mut session = Session::new(FakeClient::new(FakeOutcome::Image));
        session.set_prompt("a boat");
        session.state = SessionState::Failure("stale".into());
        session.submit().await;

        assert!(session.error().is_none());
        assert!(session.image().is_some());
    }

    #[tokio::test]
    async fn test_reference_is_forwarded_to_client() {
        let mut session = Session::new(FakeClient::new(FakeOutcome::Image));
        session.set_prompt("make it a cartoon");
        session.attach_reference(png_upload());
        session.submit().await;

        let request = FakeClient::last_request(&session).unwrap();
        let reference = request.reference_image.unwrap();
        assert_eq!(reference.mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_clear_reference_allows_reattaching_same_file() {
        let mut session = Session::new(FakeClient::new(FakeOutcome::Image));
        let upload = png_upload();
        session.attach_reference(upload.clone());
        session.clear_reference();
        assert!(session.reference().is_none());

        session.attach_reference(upload.clone());
        assert_eq!(session.reference(), Some(&upload));
    }

    #[tokio::test]
    async fn test_download_writes_timestamped_png() {
        let mut session = Session::new(FakeClient::new(FakeOutcome::Image));
        session.set_prompt("a lighthouse");
        session.submit().await;

        let dir = tempfile::tempdir().unwrap();
        let path = session.download_to(dir.path()).unwrap().unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("ai-image-"));
        assert!(name.ends_with(".png"));
        let stamp = &name["ai-image-".len()..name.len() - ".png".len()];
        assert!(stamp.parse::<u128>().is_ok());
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_download_without_result_is_a_no_op() {
        let session = Session::new(FakeClient::new(FakeOutcome::Image));
        let dir = tempfile::tempdir().unwrap();
        assert!(session.download_to(dir.path()).unwrap().is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
