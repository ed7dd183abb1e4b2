//! S3-compatible blob storage client with one container per batch.
//!
//! A batch's container is the bucket named `{batch-id}-container`. Containers
//! are provisioned with anonymous blob-level read access so file links in the
//! batch details response resolve without credentials.
//!
//! Uses rust-s3 for object operations; bucket policies are applied with a
//! hand-signed AWS Signature v4 request because rust-s3 does not expose
//! `PUT ?policy`.

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::core::config::StorageConfig;
use crate::core::error::AppError;
use crate::shared::constants::CONTAINER_SUFFIX;

type HmacSha256 = Hmac<Sha256>;

pub struct BlobStorageClient {
    credentials: Credentials,
    endpoint: String,
    public_endpoint: String,
    access_key: String,
    secret_key: String,
    region_name: String,
    /// HTTP client for bucket policy operations
    http_client: Client,
}

impl BlobStorageClient {
    pub fn new(config: StorageConfig) -> Result<Self, AppError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Storage(format!("Failed to create storage credentials: {}", e)))?;

        let http_client = Client::builder()
            .build()
            .map_err(|e| AppError::Storage(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            endpoint: config.endpoint,
            public_endpoint: config.public_endpoint,
            access_key: config.access_key,
            secret_key: config.secret_key,
            region_name: config.region,
            http_client,
        })
    }

    /// Bucket name for a container: `{name}-container`.
    pub fn container_name(name: &str) -> String {
        format!("{}{}", name, CONTAINER_SUFFIX)
    }

    fn region(&self) -> Region {
        Region::Custom {
            region: self.region_name.clone(),
            endpoint: self.endpoint.clone(),
        }
    }

    /// Handle to a container's bucket, path-style for MinIO compatibility.
    fn container_bucket(&self, container: &str) -> Result<Box<Bucket>, AppError> {
        let mut bucket = Bucket::new(container, self.region(), self.credentials.clone())
            .map_err(|e| AppError::Storage(format!("Failed to open bucket '{}': {}", container, e)))?;
        bucket.set_path_style();
        Ok(bucket)
    }

    /// Create the container for `name` if it does not already exist and apply
    /// the public blob-read policy. Creating an existing container succeeds.
    pub async fn create_container(&self, name: &str) -> Result<(), AppError> {
        let container = Self::container_name(name);

        match Bucket::create_with_path_style(
            &container,
            self.region(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await
        {
            Ok(_) => {
                info!("Container '{}' created", container);
            }
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Container '{}' already exists", container);
                } else {
                    return Err(AppError::Storage(format!(
                        "Failed to create container '{}': {}",
                        container, e
                    )));
                }
            }
        }

        self.set_public_read_policy(&container).await
    }

    /// Check whether a blob with this name exists in the batch's container.
    pub async fn blob_exists(&self, batch_id: &str, blob_name: &str) -> Result<bool, AppError> {
        let container = Self::container_name(batch_id);
        let bucket = self.container_bucket(&container)?;

        match bucket.head_object(blob_name).await {
            Ok(_) => Ok(true),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("404")
                    || error_str.contains("NoSuchKey")
                    || error_str.contains("NoSuchBucket")
                {
                    Ok(false)
                } else {
                    Err(AppError::Storage(format!(
                        "Failed to check blob '{}' in container '{}': {}",
                        blob_name, container, e
                    )))
                }
            }
        }
    }

    /// Upload a blob into the batch's container.
    pub async fn upload_blob(
        &self,
        batch_id: &str,
        blob_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<(), AppError> {
        let container = Self::container_name(batch_id);
        let bucket = self.container_bucket(&container)?;

        bucket
            .put_object_with_content_type(blob_name, data, content_type)
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to upload blob '{}' to container '{}': {}",
                    blob_name, container, e
                ))
            })?;

        debug!("Uploaded blob '{}' to container '{}'", blob_name, container);
        Ok(())
    }

    /// Public URL of a blob, used as the `links` field in the details response.
    pub fn blob_url(&self, batch_id: &str, blob_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_endpoint,
            Self::container_name(batch_id),
            blob_name
        )
    }

    /// Apply anonymous read access for all blobs in the container.
    ///
    /// A policy failure is logged but not fatal: the container is usable for
    /// uploads either way, and the policy can be applied manually.
    async fn set_public_read_policy(&self, container: &str) -> Result<(), AppError> {
        let policy = json!({
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Effect": "Allow",
                    "Principal": {"AWS": "*"},
                    "Action": ["s3:GetObject"],
                    "Resource": [format!("arn:aws:s3:::{container}/*")]
                }
            ]
        });

        match self
            .put_bucket_policy_with_sigv4(container, &policy.to_string())
            .await
        {
            Ok(_) => {
                debug!("Set public read policy for {}/*", container);
                Ok(())
            }
            Err(e) => {
                warn!(
                    "Failed to set bucket policy for '{}': {}. \
                    You may need to set it manually using: \
                    mc anonymous set download minio/{}",
                    container, e, container
                );
                Ok(())
            }
        }
    }

    /// Put bucket policy using AWS Signature v4
    async fn put_bucket_policy_with_sigv4(
        &self,
        bucket_name: &str,
        policy: &str,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        // Parse endpoint to get host
        let endpoint_url = Url::parse(&self.endpoint)
            .map_err(|e| AppError::Storage(format!("Invalid endpoint URL: {}", e)))?;
        let host = endpoint_url
            .host_str()
            .ok_or_else(|| AppError::Storage("Endpoint URL has no host".to_string()))?;
        let host_header = match endpoint_url.port() {
            Some(p) => format!("{}:{}", host, p),
            None => host.to_string(),
        };

        let url = format!("{}/{}?policy", self.endpoint, bucket_name);

        let payload_hash = hex::encode(Sha256::digest(policy.as_bytes()));

        // Canonical request
        let canonical_uri = format!("/{}", bucket_name);
        let canonical_querystring = "policy=";
        let canonical_headers = format!(
            "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
            host_header, payload_hash, amz_date
        );
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";

        let canonical_request = format!(
            "PUT\n{}\n{}\n{}\n{}\n{}",
            canonical_uri, canonical_querystring, canonical_headers, signed_headers, payload_hash
        );

        // String to sign
        let algorithm = "AWS4-HMAC-SHA256";
        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.region_name);
        let canonical_request_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            algorithm, amz_date, credential_scope, canonical_request_hash
        );

        let signature = self.calculate_signature(&date_stamp, &string_to_sign)?;

        let authorization_header = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            algorithm, self.access_key, credential_scope, signed_headers, signature
        );

        let response = self
            .http_client
            .put(&url)
            .header("Host", &host_header)
            .header("x-amz-date", &amz_date)
            .header("x-amz-content-sha256", &payload_hash)
            .header("Authorization", &authorization_header)
            .header("Content-Type", "application/json")
            .body(policy.to_string())
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to send policy request: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(AppError::Storage(format!(
                "Failed to set bucket policy: {} - {}",
                status, body
            )))
        }
    }

    /// Calculate AWS Signature v4 signature
    fn calculate_signature(
        &self,
        date_stamp: &str,
        string_to_sign: &str,
    ) -> Result<String, AppError> {
        let k_date = Self::hmac_sha256(
            format!("AWS4{}", self.secret_key).as_bytes(),
            date_stamp.as_bytes(),
        )?;
        let k_region = Self::hmac_sha256(&k_date, self.region_name.as_bytes())?;
        let k_service = Self::hmac_sha256(&k_region, b"s3")?;
        let k_signing = Self::hmac_sha256(&k_service, b"aws4_request")?;

        let signature = Self::hmac_sha256(&k_signing, string_to_sign.as_bytes())?;
        Ok(hex::encode(signature))
    }

    fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, AppError> {
        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|e| AppError::Storage(format!("HMAC key error: {}", e)))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_name() {
        assert_eq!(
            BlobStorageClient::container_name("27af1e01-ad1d-48df-946e-ec2b2332a4f1"),
            "27af1e01-ad1d-48df-946e-ec2b2332a4f1-container"
        );
    }

    #[test]
    fn test_blob_url_uses_public_endpoint() {
        let client = BlobStorageClient::new(StorageConfig {
            endpoint: "http://minio:9000".to_string(),
            public_endpoint: "https://files.example.com".to_string(),
            access_key: "test".to_string(),
            secret_key: "test".to_string(),
            region: "us-east-1".to_string(),
        })
        .unwrap();

        assert_eq!(
            client.blob_url("abc", "report.pdf"),
            "https://files.example.com/abc-container/report.pdf"
        );
    }
}
