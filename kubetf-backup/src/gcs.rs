use crate::blob::{BlobError, BlobStore, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;
use url::Url;

/// Google Cloud Storage over the JSON API
///
/// Works against `storage.googleapis.com` with an OAuth access token, or
/// against an emulator endpoint without one.
pub struct GcsBlobStore {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl GcsBlobStore {
    pub const DEFAULT_ENDPOINT: &'static str = "https://storage.googleapis.com";

    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| BlobError::InvalidName(format!("{endpoint}: {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(BlobError::InvalidName(endpoint.to_string()));
        }

        Ok(Self {
            client: Client::builder().build()?,
            endpoint,
            token,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn unexpected(response: Response) -> BlobError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    BlobError::Unexpected { status, body }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    fn name(&self) -> &'static str {
        "gcs"
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let url = self.url(&["storage", "v1", "b", bucket]);
        let response = self.authorize(self.client.get(url)).send().await?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(unexpected(response).await),
        }
    }

    async fn read_object(&self, bucket: &str, object: &str) -> Result<Vec<u8>> {
        let mut url = self.url(&["storage", "v1", "b", bucket, "o", object]);
        url.query_pairs_mut().append_pair("alt", "media");

        let response = self.authorize(self.client.get(url)).send().await?;
        match response.status() {
            s if s.is_success() => Ok(response.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND => Err(BlobError::ObjectNotFound {
                bucket: bucket.to_string(),
                object: object.to_string(),
            }),
            _ => Err(unexpected(response).await),
        }
    }

    async fn write_object(&self, bucket: &str, object: &str, data: Vec<u8>) -> Result<()> {
        let mut url = self.url(&["upload", "storage", "v1", "b", bucket, "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", object);

        let size = data.len();
        let request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/yaml")
            .body(data);
        let response = self.authorize(request).send().await?;

        match response.status() {
            s if s.is_success() => {
                debug!(bucket, object, bytes = size, "Uploaded backup object");
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(BlobError::BucketNotFound(bucket.to_string())),
            _ => Err(unexpected(response).await),
        }
    }
}
