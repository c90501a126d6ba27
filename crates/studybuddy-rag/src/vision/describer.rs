//! Rate-limited describer that never fails

use async_trait::async_trait;
use image::DynamicImage;
use std::sync::Arc;

use super::retry::RetryPolicy;
use super::{ImageDescriber, VisionError, VisionModel, SENTINEL_DESCRIPTION};

/// Outcome of describing one diagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub text: String,
    /// `true` when `text` is the sentinel rather than a model answer
    pub is_sentinel: bool,
}

impl Description {
    pub fn described(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_sentinel: false,
        }
    }

    pub fn sentinel() -> Self {
        Self {
            text: SENTINEL_DESCRIPTION.to_string(),
            is_sentinel: true,
        }
    }
}

/// Wraps a `VisionModel` with pacing, a rate-limit retry, and sentinel fallback
pub struct RateLimitedDescriber {
    model: Arc<dyn VisionModel>,
    policy: RetryPolicy,
}

impl RateLimitedDescriber {
    pub fn new(model: Arc<dyn VisionModel>, policy: RetryPolicy) -> Self {
        Self { model, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl ImageDescriber for RateLimitedDescriber {
    async fn describe(&self, image: &DynamicImage, instruction: &str) -> Description {
        let outcome = self
            .policy
            .run(
                || async {
                    let text = self.model.describe(image, instruction).await?;
                    if text.trim().is_empty() {
                        return Err(VisionError::EmptyResponse);
                    }
                    Ok(text)
                },
                VisionError::is_rate_limited,
            )
            .await;

        match outcome {
            Ok(text) => Description::described(text),
            Err(e) => {
                tracing::warn!("{} could not describe diagram: {}", self.model.name(), e);
                Description::sentinel()
            }
        }
    }
}
