use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::{Client, primitives::ByteStream};
use tracing::debug;

use crate::storage::ObjectStore;

/// Static access key pair for the upload bucket.
#[derive(Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish()
    }
}

/// Client settings. Anything left unset falls back to the AWS default
/// provider chain.
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    pub credentials: Option<S3Credentials>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

impl S3Settings {
    /// Settings from `AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY`,
    /// `S3_REGION`/`AWS_REGION`/`AWS_DEFAULT_REGION`, `AWS_ENDPOINT_URL` and
    /// `AWS_S3_FORCE_PATH_STYLE`.
    pub fn from_env() -> Self {
        let credentials = match (
            std::env::var("AWS_ACCESS_KEY_ID"),
            std::env::var("AWS_SECRET_ACCESS_KEY"),
        ) {
            (Ok(access_key_id), Ok(secret_access_key)) => Some(S3Credentials {
                access_key_id,
                secret_access_key,
            }),
            _ => None,
        };
        Self {
            credentials,
            region: std::env::var("S3_REGION")
                .or_else(|_| std::env::var("AWS_REGION"))
                .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
                .ok(),
            endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
            force_path_style: parse_bool_env("AWS_S3_FORCE_PATH_STYLE").unwrap_or(false),
        }
    }
}

/// `1`/`true`/`yes`/`on` and `0`/`false`/`no`/`off`, case-insensitive.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_bool_env(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|value| parse_bool(&value))
}

/// Object store backed by S3 (or an S3-compatible endpoint).
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub async fn connect(settings: &S3Settings) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(credentials) = &settings.credentials {
            loader = loader.credentials_provider(Credentials::new(
                credentials.access_key_id.clone(),
                credentials.secret_access_key.clone(),
                None,
                None,
                "ryze-uploader",
            ));
        }

        let base_config = loader.load().await;
        let mut s3_builder = aws_sdk_s3::config::Builder::from(&base_config);
        s3_builder = s3_builder.force_path_style(settings.force_path_style);
        if let Some(endpoint) = &settings.endpoint_url {
            s3_builder = s3_builder.endpoint_url(endpoint.clone());
        }
        Ok(Self {
            client: Client::from_conf(s3_builder.build()),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let response = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{}", DisplayErrorContext(e)))?;

        debug!(bucket = %bucket, key = %key, etag = ?response.e_tag(), "Object stored");
        Ok(())
    }
}
