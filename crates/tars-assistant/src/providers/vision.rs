//! Vision provider trait for describing images

use async_trait::async_trait;

use crate::error::Result;

/// Image description backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Describe a base64-encoded image of `media_type` following `instruction`
    async fn describe(&self, image_base64: &str, media_type: &str, instruction: &str)
        -> Result<String>;
}
