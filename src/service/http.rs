/// REST photo store client.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;

use super::{PhotoInfo, PhotoService, PhotoSummary};
use crate::error::{EditorError, EditorResult};

/// Page size of the photo list request
const LIST_LIMIT: u32 = 50;

/// Longest response body kept in an error message
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Deserialize)]
struct PhotoEnvelope {
    photo: PhotoInfo,
}

#[derive(Debug, Deserialize)]
struct PhotoListEnvelope {
    #[serde(default)]
    photos: Vec<PhotoSummary>,
}

/// Photo store behind the `/photos` REST API
#[derive(Debug, Clone)]
pub struct HttpPhotoService {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpPhotoService {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            token,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }
}

/// Turn a non-2xx response into an error carrying status and body
async fn check_status(response: Response) -> EditorResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(EditorError::upload(format!(
        "{} {}",
        status,
        truncate(&body, MAX_ERROR_BODY)
    )))
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl PhotoService for HttpPhotoService {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn list_photos(&self) -> EditorResult<Vec<PhotoSummary>> {
        let request = self
            .client
            .get(self.endpoint("photos"))
            .query(&[("page", 1), ("limit", LIST_LIMIT)]);
        let response = check_status(self.authorized(request).send().await?)
            .await
            .map_err(EditorError::into_load)?;
        let envelope: PhotoListEnvelope = response.json().await?;
        tracing::debug!(count = envelope.photos.len(), "listed photos");
        Ok(envelope.photos)
    }

    async fn get_photo(&self, id: &str) -> EditorResult<PhotoInfo> {
        let request = self.client.get(self.endpoint(&format!("photos/{}", id)));
        let response = check_status(self.authorized(request).send().await?)
            .await
            .map_err(EditorError::into_load)?;
        let envelope: PhotoEnvelope = response.json().await?;
        Ok(envelope.photo)
    }

    async fn fetch_bytes(&self, url: &str) -> EditorResult<Vec<u8>> {
        let response = check_status(self.client.get(url).send().await?)
            .await
            .map_err(EditorError::into_load)?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> EditorResult<()> {
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("image/jpeg")?;
        let form = Form::new().part("photos", part);

        let request = self.client.post(self.endpoint("photos/upload")).multipart(form);
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| EditorError::upload(e.to_string()))?;
        check_status(response).await?;

        tracing::info!(filename, size, "uploaded edited photo");
        Ok(())
    }
}
