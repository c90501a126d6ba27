//! Gemini vision client via the Generative Language API
//!
//! Sends the instruction and the diagram (PNG, base64 inline data) in one
//! `generateContent` call.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::time::Duration;

use crate::config::VisionConfig;
use crate::error::{Error, Result};

use super::{VisionError, VisionModel};

/// Gemini vision client
pub struct GeminiVision {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Inline { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiVision {
    pub fn new(config: &VisionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            tracing::warn!("No vision API key configured; diagrams will get sentinel descriptions");
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

/// Encode an image as base64 PNG
pub fn encode_png_base64(image: &DynamicImage) -> std::result::Result<String, VisionError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| VisionError::Request(format!("Failed to encode image: {}", e)))?;
    Ok(STANDARD.encode(buffer.into_inner()))
}

#[async_trait]
impl VisionModel for GeminiVision {
    async fn describe(
        &self,
        image: &DynamicImage,
        instruction: &str,
    ) -> std::result::Result<String, VisionError> {
        let api_key = self.api_key.as_deref().ok_or(VisionError::Unavailable)?;

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text {
                        text: instruction.to_string(),
                    },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: encode_png_base64(image)?,
                        },
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| VisionError::Request(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(VisionError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::Request(format!(
                "Gemini vision failed ({}): {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| VisionError::Request(format!("Failed to parse Gemini response: {}", e)))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(VisionError::EmptyResponse);
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_encoding_round_trips_dimensions() {
        let encoded = encode_png_base64(&DynamicImage::new_rgb8(3, 2)).unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable() {
        let vision = GeminiVision::new(&VisionConfig::default()).unwrap();
        let err = vision
            .describe(&DynamicImage::new_rgb8(1, 1), "describe")
            .await
            .unwrap_err();
        assert!(matches!(err, VisionError::Unavailable));
    }

    #[test]
    fn test_request_wire_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text { text: "describe".into() },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: "AAAA".into(),
                        },
                    },
                ],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "describe");
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["mime_type"], "image/png");
    }
}
