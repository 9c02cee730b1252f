use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::time::Duration;

use super::ObjectStore;
use crate::core::{DocumentError, DocumentResult};

fn storage_error(context: &str, key: &str, err: impl std::error::Error) -> DocumentError {
    DocumentError::Storage(format!("{} {}: {}", context, key, DisplayErrorContext(err)))
}

/// Blob store backed by S3 or an S3-compatible service (R2, MinIO).
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        S3ObjectStore {
            client,
            bucket: bucket.into(),
        }
    }

    /// Credentials and region from the environment; `endpoint` switches to
    /// path-style addressing for S3-compatible stores.
    pub async fn from_env(bucket: impl Into<String>, endpoint: Option<&str>) -> Self {
        let region_provider = RegionProviderChain::default_provider().or_else("us-east-1");
        let shared = aws_config::from_env().region(region_provider).load().await;

        let mut config = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = endpoint {
            config = config.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(Client::from_conf(config.build()), bucket)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> DocumentResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| storage_error("put", key, e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> DocumentResult<Vec<u8>> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let service = e.into_service_error();
                if service.is_no_such_key() {
                    return Err(DocumentError::DocumentNotFound(key.to_string()));
                }
                return Err(storage_error("get", key, service));
            }
        };

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| storage_error("read", key, e))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn presign(&self, key: &str, ttl: Duration) -> DocumentResult<String> {
        let presigning_config = PresigningConfig::builder()
            .expires_in(ttl)
            .build()
            .map_err(|e| storage_error("presign", key, e))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| storage_error("presign", key, e))?;

        Ok(presigned.uri().to_string())
    }

    async fn delete(&self, key: &str) -> DocumentResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| storage_error("delete", key, e))?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> DocumentResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .max_keys(1000)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| storage_error("list", prefix, e))?;

            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key())
                    .map(str::to_string),
            );

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(keys)
    }
}
