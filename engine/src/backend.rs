use std::pin::Pin;

use thiserror::Error;

use crate::request::GenerationRequest;

pub mod openai;
pub use openai::OpenAiImages;

/// Errors returned while dispatching a request to an image backend
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("image request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("image API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response carried neither inline image data nor a fetchable URL.
    #[error("no image payload in response")]
    NoImagePayload,

    #[error("invalid base64 image data: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// A remote image generator: given a fully resolved request, produces the
/// raw image bytes. Injected as a capability so the batch logic can run
/// against a scripted fake in tests.
pub trait ImageBackend {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, GenerateError>> + Send + 'a>>;
}
