use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// Image-model boundary: turns an illustration prompt into a displayable
/// image reference (a `data:` URL). "No image in the response" is a failure,
/// distinct from success, so callers can take the fallback path.
#[async_trait]
pub trait ImageClient: Send + Sync + Debug {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

pub fn create_image_client(config: &Config) -> Result<Arc<dyn ImageClient>> {
    match config.image.provider.as_str() {
        "gemini" => {
            let image_cfg = config.image.gemini.clone().unwrap_or_default();
            // The image section may omit its own key and reuse the text model's.
            let api_key = image_cfg
                .api_key
                .or_else(|| config.llm.gemini.as_ref().map(|g| g.api_key.clone()))
                .context("No Gemini API key configured for image generation")?;
            Ok(Arc::new(GeminiImageClient::new(&api_key, &image_cfg.model)))
        }
        other => Err(anyhow!("Unknown image provider: {}", other)),
    }
}

#[derive(Debug)]
struct GeminiImageClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiImageClient {
    fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct ImageRequest {
    contents: Vec<ImageRequestContent>,
}

#[derive(Serialize)]
struct ImageRequestContent {
    parts: Vec<ImageRequestPart>,
}

#[derive(Serialize)]
struct ImageRequestPart {
    text: String,
}

#[derive(Deserialize)]
struct ImageResponse {
    candidates: Option<Vec<ImageCandidate>>,
    error: Option<ImageApiError>,
}

#[derive(Deserialize)]
struct ImageCandidate {
    content: Option<ImageContent>,
}

#[derive(Deserialize)]
struct ImageContent {
    #[serde(default)]
    parts: Vec<ImagePart>,
}

#[derive(Deserialize)]
struct ImagePart {
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineData>,
    #[allow(dead_code)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

/// The model interleaves text and image parts; the first inline-data part
/// wins. A text-only reply ("I cannot generate...") yields an error.
fn data_url_from_response(response: ImageResponse) -> Result<String> {
    if let Some(err) = response.error {
        return Err(anyhow!("Gemini image API returned error: {}", err.message));
    }

    let parts = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    for part in parts {
        if let Some(inline) = part.inline_data {
            return Ok(format!("data:{};base64,{}", inline.mime_type, inline.data));
        }
    }

    Err(anyhow!("No inline image data found in response parts"))
}

#[derive(Deserialize, Debug)]
struct ImageApiError {
    message: String,
}

#[async_trait]
impl ImageClient for GeminiImageClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let request_body = ImageRequest {
            contents: vec![ImageRequestContent {
                parts: vec![ImageRequestPart { text: prompt.to_string() }],
            }],
        };

        let resp = self.client.post(&url).json(&request_body).send().await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await?;
            return Err(anyhow!("Gemini image API error: {}", error_text));
        }

        let body = resp.text().await?;
        let parsed: ImageResponse = serde_json::from_str(&body)
            .map_err(|e| anyhow!("Failed to parse image response: {}. Body: {}", e, body))?;

        data_url_from_response(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_data_becomes_data_url() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Here is your illustration." },
                        { "inlineData": { "mimeType": "image/png", "data": "QUJD" } }
                    ]
                }
            }]
        }"#;

        let parsed: ImageResponse = serde_json::from_str(json).unwrap();
        let url = data_url_from_response(parsed).unwrap();
        assert_eq!(url, "data:image/png;base64,QUJD");
    }

    #[test]
    fn text_only_reply_is_an_error() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [ { "text": "I cannot generate that image." } ]
                }
            }]
        }"#;

        let parsed: ImageResponse = serde_json::from_str(json).unwrap();
        assert!(data_url_from_response(parsed).is_err());
    }

    #[test]
    fn missing_candidates_is_an_error() {
        let parsed: ImageResponse = serde_json::from_str("{}").unwrap();
        assert!(data_url_from_response(parsed).is_err());
    }

    #[test]
    fn api_error_is_surfaced() {
        let json = r#"{ "error": { "message": "model overloaded" } }"#;
        let parsed: ImageResponse = serde_json::from_str(json).unwrap();
        let err = data_url_from_response(parsed).unwrap_err();
        assert!(err.to_string().contains("model overloaded"));
    }
}
