use crate::errors::Error;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, ObjectOwnership,
    PublicAccessBlockConfiguration,
};
use aws_sdk_s3::Client as S3Client;
use mockall::automock;
use std::path::PathBuf;
use tracing::info;

/// The four S3 public-access block flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicAccessBlock {
    pub block_public_acls: bool,
    pub ignore_public_acls: bool,
    pub block_public_policy: bool,
    pub restrict_public_buckets: bool,
}

impl PublicAccessBlock {
    pub fn disabled() -> Self {
        Self {
            block_public_acls: false,
            ignore_public_acls: false,
            block_public_policy: false,
            restrict_public_buckets: false,
        }
    }
}

#[automock]
#[async_trait]
pub trait Storage: Send + Sync {
    async fn create_bucket(&self, bucket: String, region: Option<String>) -> Result<(), Error>;
    async fn put_public_access_block(
        &self,
        bucket: String,
        block: PublicAccessBlock,
    ) -> Result<(), Error>;
    async fn put_bucket_policy(&self, bucket: String, policy: String) -> Result<(), Error>;
    async fn upload_file(&self, bucket: String, path: PathBuf, key: String) -> Result<(), Error>;
}

pub struct S3Storage {
    s3_client: S3Client,
}

impl S3Storage {
    pub fn new(s3_client: S3Client) -> Self {
        S3Storage { s3_client }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn create_bucket(&self, bucket: String, region: Option<String>) -> Result<(), Error> {
        let configuration = region.map(|region| {
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region.as_str()))
                .build()
        });

        let output = self
            .s3_client
            .create_bucket()
            .bucket(&bucket)
            .object_ownership(ObjectOwnership::BucketOwnerEnforced)
            .set_create_bucket_configuration(configuration)
            .send()
            .await
            .map_err(aws_sdk_s3::Error::from)?;

        info!(
            "Created bucket {} at {}",
            bucket,
            output.location().unwrap_or_default()
        );

        Ok(())
    }

    async fn put_public_access_block(
        &self,
        bucket: String,
        block: PublicAccessBlock,
    ) -> Result<(), Error> {
        let configuration = PublicAccessBlockConfiguration::builder()
            .block_public_acls(block.block_public_acls)
            .ignore_public_acls(block.ignore_public_acls)
            .block_public_policy(block.block_public_policy)
            .restrict_public_buckets(block.restrict_public_buckets)
            .build();

        self.s3_client
            .put_public_access_block()
            .bucket(&bucket)
            .public_access_block_configuration(configuration)
            .send()
            .await
            .map_err(aws_sdk_s3::Error::from)?;

        info!("Updated public access block on bucket {}", bucket);

        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: String, policy: String) -> Result<(), Error> {
        self.s3_client
            .put_bucket_policy()
            .bucket(&bucket)
            .policy(policy)
            .send()
            .await
            .map_err(aws_sdk_s3::Error::from)?;

        info!("Attached policy to bucket {}", bucket);

        Ok(())
    }

    async fn upload_file(&self, bucket: String, path: PathBuf, key: String) -> Result<(), Error> {
        let body = ByteStream::from_path(&path).await?;

        self.s3_client
            .put_object()
            .bucket(&bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .map_err(aws_sdk_s3::Error::from)?;

        info!("Uploaded {} to s3://{}/{}", path.display(), bucket, key);

        Ok(())
    }
}
