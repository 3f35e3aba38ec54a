use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region, SharedHttpClient};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::retry::RetryConfig;
use aws_smithy_types::timeout::TimeoutConfig;
use bytes::Bytes;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::Profile;
use crate::storage::{ObjectStore, StorageError, StoreConnector, StoredObject};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds S3 clients for profiles, sharing one HTTP connection pool.
#[derive(Clone)]
pub struct S3Connector {
    http_client: SharedHttpClient,
}

impl S3Connector {
    pub fn new(workers: usize) -> Self {
        // Every worker may hold one connection per side
        let mut hyper_builder = hyper::Client::builder();
        hyper_builder.pool_max_idle_per_host(workers);
        hyper_builder.http2_only(false);
        hyper_builder.pool_idle_timeout(Duration::from_secs(90));

        let http_client = HyperClientBuilder::new()
            .hyper_builder(hyper_builder)
            .build_https();

        Self { http_client }
    }

    #[cfg(test)]
    fn with_http_client(http_client: SharedHttpClient) -> Self {
        Self { http_client }
    }

    /// Client configuration for one profile, taken from the profile alone.
    ///
    /// Nothing is read from the environment or `~/.aws`, so `AWS_ENDPOINT_URL`
    /// and friends cannot redirect a profile that leaves its endpoint empty.
    fn client_config(&self, profile: &Profile) -> Result<aws_sdk_s3::Config, StorageError> {
        if profile.region.is_empty() {
            return Err(StorageError::InvalidProfile("missing region".to_string()));
        }
        let endpoint = if profile.endpoint.is_empty() {
            None
        } else {
            Some(normalize_endpoint(&profile.endpoint)?)
        };

        let credentials = Credentials::new(
            profile.access_key.clone(),
            profile.secret_key.clone(),
            None,
            None,
            "s3_migrate-profile",
        );

        // Retries are left to whoever re-runs the migration
        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .http_client(self.http_client.clone())
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .connect_timeout(CONNECT_TIMEOUT)
                    .build(),
            )
            .region(Region::new(profile.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = endpoint {
            builder = builder
                .endpoint_url(endpoint)
                .force_path_style(profile.force_path_style);
        }

        Ok(builder.build())
    }
}

#[async_trait]
impl StoreConnector for S3Connector {
    async fn connect(&self, profile: &Profile) -> Result<Arc<dyn ObjectStore>, StorageError> {
        let config = self.client_config(profile)?;
        Ok(Arc::new(S3Store {
            client: Client::from_conf(config),
        }))
    }
}

/// Accept bare hosts like `s3.eu-west-1.amazonaws.com` by assuming HTTPS.
pub fn normalize_endpoint(endpoint: &str) -> Result<String, StorageError> {
    let candidate = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    };

    let url = Url::parse(&candidate).map_err(|e| {
        StorageError::InvalidProfile(format!("invalid endpoint '{}': {}", endpoint, e))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(candidate),
        other => Err(StorageError::InvalidProfile(format!(
            "unsupported endpoint scheme '{}' in '{}'",
            other, endpoint
        ))),
    }
}

fn request_error<E, R>(err: SdkError<E, R>) -> StorageError
where
    E: std::error::Error + 'static,
    R: Debug + 'static,
{
    StorageError::Request(DisplayErrorContext(&err).to_string())
}

struct S3Store {
    client: Client,
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn head(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    return Ok(false);
                }
                Err(request_error(e))
            }
        }
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StorageError> {
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    return Err(StorageError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    });
                }
                return Err(request_error(e));
            }
        };

        let content_type = output.content_type;
        let e_tag = output.e_tag;
        let body = output.body.collect().await.map_err(|e| {
            StorageError::Request(format!(
                "failed to read object body: {}",
                DisplayErrorContext(&e)
            ))
        })?;

        Ok(StoredObject {
            body: body.into_bytes(),
            content_type,
            e_tag,
        })
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<String>,
    ) -> Result<Option<String>, StorageError> {
        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .set_content_type(content_type)
            .send()
            .await
            .map_err(request_error)?;

        Ok(output.e_tag)
    }
}
