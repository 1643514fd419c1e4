//! `aws-sdk-s3` binding for any S3-compatible endpoint.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use crate::config::ObjectStoreConfig;

use super::object_store::{ObjectBody, ObjectStore, StoreError};

/// Object store backed by an S3-compatible service (AWS, MinIO, R2, ...).
///
/// Uses path-style addressing and static credentials so it works against
/// self-hosted endpoints out of the box. ETags are kept verbatim as the
/// server reports them (quotes included) and fed back into `If-Match`
/// unchanged; they are opaque to everything above this module.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    path_prefix: String,
}

impl S3ObjectStore {
    /// Builds a client for the configured endpoint.
    #[must_use]
    pub fn new(config: &ObjectStoreConfig) -> Self {
        let scheme = if config.use_ssl { "https" } else { "http" };
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "s3kv-static",
        );
        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            // S3-compatible endpoints ignore the region but the SDK requires one.
            .region(Region::new("us-east-1"))
            .endpoint_url(format!("{scheme}://{}", config.endpoint))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();
        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket.clone(),
            path_prefix: config.path_prefix.clone(),
        }
    }

    /// Applies the configured key prefix to an object path.
    fn object_key(&self, path: &str) -> String {
        if self.path_prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}/{path}", self.path_prefix.trim_end_matches('/'))
        }
    }
}

/// Whether an SDK error carries an HTTP 412 Precondition Failed.
fn is_precondition_failed<E>(err: &SdkError<E>) -> bool {
    match err {
        SdkError::ServiceError(context) => context.raw().status().as_u16() == 412,
        SdkError::ResponseError(context) => context.raw().status().as_u16() == 412,
        _ => false,
    }
}

/// Wraps a client error as a transport failure for `path`.
fn transport(path: &str, source: impl std::error::Error + Send + Sync + 'static) -> StoreError {
    StoreError::Transport {
        path: path.to_string(),
        source: Box::new(source),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_etag(&self, path: &str) -> Result<String, StoreError> {
        let key = self.object_key(path);
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(head) => Ok(head.e_tag().unwrap_or_default().to_string()),
            Err(err) => {
                let service = err.into_service_error();
                if service.is_not_found() {
                    Ok(String::new())
                } else {
                    Err(transport(path, service))
                }
            }
        }
    }

    async fn get(&self, path: &str, etag: &str) -> Result<ObjectBody, StoreError> {
        let key = self.object_key(path);
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .if_match(etag)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                if is_precondition_failed(&err) {
                    return Err(StoreError::Precondition {
                        path: path.to_string(),
                    });
                }
                return Err(transport(path, err.into_service_error()));
            }
        };

        let path = path.to_string();
        let stream = futures_util::stream::try_unfold(output.body, move |mut body| {
            let path = path.clone();
            async move {
                match body.try_next().await {
                    Ok(Some(chunk)) => Ok(Some((chunk, body))),
                    Ok(None) => Ok(None),
                    Err(err) => Err(StoreError::Transport {
                        path,
                        source: Box::new(err),
                    }),
                }
            }
        });
        Ok(Box::pin(stream))
    }

    async fn compare_and_swap(
        &self,
        path: &str,
        source: &Path,
        len: u64,
        expected_etag: &str,
    ) -> Result<String, StoreError> {
        let latest = self.get_etag(path).await?;
        if latest != expected_etag {
            return Err(StoreError::EtagMismatch {
                path: path.to_string(),
                latest,
                expected: expected_etag.to_string(),
            });
        }

        let key = self.object_key(path);
        let body = ByteStream::from_path(source)
            .await
            .map_err(|err| transport(path, err))?;
        // Uploads are bounded by partition file size, far below i64::MAX.
        #[allow(clippy::cast_possible_wrap)]
        let content_length = len as i64;
        let put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .content_length(content_length)
            .send()
            .await
            .map_err(|err| transport(path, err.into_service_error()))?;
        let new_etag = put.e_tag().unwrap_or_default().to_string();
        debug!(path, etag = %new_etag, "compare-and-swap upload accepted");
        Ok(new_etag)
    }

    async fn get_object(&self, path: &str) -> Result<Option<Bytes>, StoreError> {
        let key = self.object_key(path);
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(output) => {
                let data = output
                    .body
                    .collect()
                    .await
                    .map_err(|err| transport(path, err))?;
                Ok(Some(data.into_bytes()))
            }
            Err(err) => {
                let service = err.into_service_error();
                if service.is_no_such_key() {
                    Ok(None)
                } else {
                    Err(transport(path, service))
                }
            }
        }
    }

    async fn put_object(&self, path: &str, body: Bytes) -> Result<(), StoreError> {
        let key = self.object_key(path);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| transport(path, err.into_service_error()))?;
        Ok(())
    }
}
