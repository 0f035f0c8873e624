#![warn(missing_docs)]
//! Imagist - prompt-to-image generation via Google's Gemini image API.
//!
//! Turns a text prompt, an aspect ratio, and an optional reference image
//! into one generated image. A [`Session`] holds the interaction state
//! and drives any [`ImageClient`] implementation, so tests can swap the
//! real API for a fake.
//!
//! # Quick Start
//!
//! ```no_run
//! use imagist::{AspectRatio, GeminiClient, Session};
//!
//! #[tokio::main]
//! async fn main() -> imagist::Result<()> {
//!     let client = GeminiClient::builder().build()?;
//!     let mut session = Session::new(client);
//!
//!     session.set_prompt("A lighthouse in a storm");
//!     session.set_aspect_ratio(AspectRatio::Landscape);
//!     session.submit().await;
//!
//!     if let Some(path) = session.download_to(".")? {
//!         println!("saved {}", path.display());
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod session;
mod types;
mod upload;

pub use client::{GeminiClient, GeminiClientBuilder, GeminiModel, ImageClient};
pub use error::{ImagistError, Result};
pub use session::{
    Session, SessionState, CONNECTION_MESSAGE, CREDENTIAL_MESSAGE, NO_IMAGE_MESSAGE,
};
pub use types::{
    AspectRatio, GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat,
    ReferenceImage,
};
pub use upload::{read_reference, validate_upload, UploadedImage, MAX_REFERENCE_BYTES};
