use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BackendSettings;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {0}")]
    Status(StatusCode),
    #[error("capture rejected: {0}")]
    Capture(#[from] crate::services::vision::CaptureError),
}

/// The remote chat, vision and speech synthesis service.
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    async fn chat(&self, message: &str, system_prompt: &str) -> Result<String, BackendError>;
    /// `image` is a JPEG frame.
    async fn vision(&self, image: Vec<u8>) -> Result<String, BackendError>;
    /// Returns a WAV payload.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, BackendError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    system_prompt: &'a str,
}

#[derive(Deserialize)]
struct TextResponse {
    text: String,
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn text_reply(response: reqwest::Response) -> Result<String, BackendError> {
        if !response.status().is_success() {
            return Err(BackendError::Status(response.status()));
        }
        let body: TextResponse = response.json().await?;
        Ok(body.text.trim().to_string())
    }
}

#[async_trait]
impl ConversationBackend for HttpBackend {
    async fn chat(&self, message: &str, system_prompt: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&ChatRequest {
                message,
                system_prompt,
            })
            .send()
            .await?;
        Self::text_reply(response).await
    }

    async fn vision(&self, image: Vec<u8>) -> Result<String, BackendError> {
        let part = Part::bytes(image)
            .file_name("capture.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/api/vision"))
            .multipart(form)
            .send()
            .await?;
        Self::text_reply(response).await
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, BackendError> {
        let response = self
            .client
            .get(self.url("/api/tts"))
            .query(&[("text", text)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}
