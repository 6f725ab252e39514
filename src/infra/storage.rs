use anyhow::{anyhow, Result};
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use std::time::Duration;
use url::Url;

use crate::config::AppConfig;

/// Blob storage for post images, addressed by storage key.
#[axum::async_trait]
pub trait AssetStore: Send + Sync {
    /// Presigned URL a client can PUT the asset bytes to.
    async fn upload_url(&self, key: &str, expires_in: Duration) -> Result<String>;

    /// Public URL of a stored asset, or `None` when nothing is stored under `key`.
    async fn public_url(&self, key: &str) -> Result<Option<String>>;

    async fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct ObjectStorage {
    client: Client,
    bucket: String,
    public_endpoint: Url,
}

impl ObjectStorage {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let region_provider = RegionProviderChain::first_try(Region::new(config.s3_region.clone()));
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config)
            .region(shared_config.region().cloned())
            .endpoint_url(config.s3_endpoint.clone())
            .force_path_style(true);
        if let Some(provider) = shared_config.credentials_provider() {
            s3_builder = s3_builder.credentials_provider(provider);
        }
        let s3_config = s3_builder.build();

        let public_endpoint = config
            .s3_public_endpoint
            .as_deref()
            .unwrap_or(&config.s3_endpoint);
        let public_endpoint = Url::parse(public_endpoint)
            .map_err(|err| anyhow!("invalid S3 public endpoint: {}", err))?;

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.s3_bucket.clone(),
            public_endpoint,
        })
    }

    fn object_url(&self, key: &str) -> Result<String> {
        let mut url = self.public_endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("S3 public endpoint cannot be a base URL"))?
            .pop_if_empty()
            .push(&self.bucket)
            .extend(key.split('/'));
        Ok(url.to_string())
    }
}

#[axum::async_trait]
impl AssetStore for ObjectStorage {
    async fn upload_url(&self, key: &str, expires_in: Duration) -> Result<String> {
        let presign_config = PresigningConfig::expires_in(expires_in)?;
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await?;
        Ok(presigned.uri().to_string())
    }

    async fn public_url(&self, key: &str) -> Result<Option<String>> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(Some(self.object_url(key)?)),
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .map(|service_err| service_err.is_not_found())
                    .unwrap_or(false);
                if missing {
                    Ok(None)
                } else {
                    Err(anyhow!(err))
                }
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }
}
