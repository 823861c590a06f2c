//! Client for the OpenAI Images API.

use std::pin::Pin;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{GenerateError, ImageBackend};
use crate::request::GenerationRequest;

const GENERATIONS_URL: &str = "https://api.openai.com/v1/images/generations";

#[derive(Clone)]
pub struct OpenAiImages {
    api_key: String,
    client: Client,
}

impl OpenAiImages {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }
}

impl ImageBackend for OpenAiImages {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, GenerateError>> + Send + 'a>> {
        Box::pin(async move {
            let item = submit(request, &self.api_key, &self.client).await?;
            image_bytes(item, &self.client).await
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ImagesResponse {
    pub data: Vec<ImageItem>,
}

/// One generated image. The API returns the data inline as `b64_json` or
/// as a `url` to fetch; some models may return either.
#[derive(Debug, Default, Deserialize)]
pub struct ImageItem {
    pub b64_json: Option<String>,
    pub url: Option<String>,
}

pub fn build_payload(request: &GenerationRequest) -> Value {
    let mut payload = serde_json::json!({
        "model": request.model,
        "prompt": request.prompt,
        "n": 1,
        "size": request.size,
        "quality": request.quality,
    });
    // background is only sent when a preference was resolved; otherwise the
    // API picks its own default.
    if let Some(background) = &request.background {
        payload["background"] = Value::String(background.clone());
    }
    payload
}

/// Submits a generation request and returns the first image item.
pub async fn submit(
    request: &GenerationRequest,
    api_key: &str,
    client: &Client,
) -> Result<ImageItem, GenerateError> {
    debug!("Submitting image request for model {}", request.model);

    let resp = client
        .post(GENERATIONS_URL)
        .bearer_auth(api_key)
        .json(&build_payload(request))
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await?;
        return Err(GenerateError::Api { status, body });
    }

    let mut response: ImagesResponse = resp.json().await?;
    if response.data.is_empty() {
        return Err(GenerateError::NoImagePayload);
    }
    Ok(response.data.swap_remove(0))
}

/// Extracts the raw bytes from an image item: inline base64 data first,
/// then a follow-up GET on the returned URL.
pub async fn image_bytes(item: ImageItem, client: &Client) -> Result<Vec<u8>, GenerateError> {
    if let Some(b64) = item.b64_json {
        return Ok(BASE64.decode(b64)?);
    }

    if let Some(url) = item.url {
        debug!("Fetching generated image from {url}");
        let resp = client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await?;
            return Err(GenerateError::Api { status, body });
        }
        return Ok(resp.bytes().await?.to_vec());
    }

    Err(GenerateError::NoImagePayload)
}
