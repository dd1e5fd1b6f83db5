use crate::openstack::resources::{Image, ImageMetadata};
use crate::openstack::types::{ensure_success, parse_json, ApiError, OpenStackError};
use std::path::Path;

/// HTTP client for the image service (Glance v2)
#[derive(Debug, Clone)]
pub struct GlanceClient {
    /// Image endpoint, e.g. `http://host:9292/v2`
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl GlanceClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::debug!("Creating GlanceClient with base URL: {}", base_url);

        Self {
            base_url,
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register image metadata; the image is left in the `queued` state
    pub async fn queue_image(&self, metadata: &ImageMetadata) -> Result<Image, OpenStackError> {
        let url = format!("{}/images", self.base_url);

        tracing::info!("Registering image: name={}", metadata.name);
        tracing::debug!("Sending image registration to: {}", url);

        let response = self
            .client
            .post(&url)
            .header("X-Auth-Token", &self.token)
            .json(metadata)
            .send()
            .await
            .map_err(ApiError::from)?;

        let response = ensure_success(response, "Register image").await?;
        let image: Image = parse_json(response, "image registration").await?;

        tracing::info!(
            "Image registered: id={}, status={:?}",
            image.id,
            image.status
        );

        Ok(image)
    }

    /// Stream the file at `path` as the data of image `image_id`
    pub async fn upload_image_data(
        &self,
        image_id: &str,
        path: &Path,
    ) -> Result<(), OpenStackError> {
        let url = format!("{}/images/{}/file", self.base_url, image_id);

        let file = tokio::fs::File::open(path).await.map_err(|e| {
            tracing::error!("Failed to open image file {}: {}", path.display(), e);
            OpenStackError::Io(e)
        })?;
        let size = file.metadata().await?.len();

        tracing::info!(
            "Uploading image data: image_id={}, file={}, bytes={}",
            image_id,
            path.display(),
            size
        );

        let response = self
            .client
            .put(&url)
            .header("X-Auth-Token", &self.token)
            .header("Content-Type", "application/octet-stream")
            .body(reqwest::Body::from(file))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to stream image data: {}", e);
                ApiError::from(e)
            })?;

        ensure_success(response, "Upload image data").await?;

        tracing::info!("Image data uploaded: image_id={}", image_id);

        Ok(())
    }

    pub async fn get_image(&self, image_id: &str) -> Result<Image, OpenStackError> {
        let url = format!("{}/images/{}", self.base_url, image_id);

        tracing::debug!("Getting image {} from: {}", image_id, url);

        let response = self
            .client
            .get(&url)
            .header("X-Auth-Token", &self.token)
            .send()
            .await
            .map_err(ApiError::from)?;

        let response = ensure_success(response, "Get image").await?;
        parse_json(response, "image").await
    }
}
