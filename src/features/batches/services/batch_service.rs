use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::batches::dtos::{AttributeDto, BatchDetailsDto, BatchFileDto, CreateBatchDto};
use crate::features::batches::models::{Attribute, Batch, BatchFile, BusinessUnit};
use crate::modules::storage::BlobStorageClient;

/// Outcome of a batch-id lookup, driving HTTP status selection upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchIdStatus {
    /// Batch exists and has not expired
    Ok,
    /// No batch with that id
    NotFound,
    /// Batch exists but its expiry has passed
    Gone,
}

/// Business operations on batches and their files.
///
/// Handlers depend on this trait rather than the concrete service so the
/// endpoint layer can be exercised against a fake in tests.
#[async_trait]
pub trait BatchApi: Send + Sync {
    /// True iff a business unit with exactly this name exists.
    async fn validate_business_unit(&self, business_unit: &str) -> Result<bool>;

    /// Create a batch with its initial attributes in one transaction and
    /// return the generated id. ACL names that resolve to no user/group
    /// record are silently dropped.
    async fn create_batch(&self, request: &CreateBatchDto) -> Result<Uuid>;

    /// Three-way existence/expiry check, to be called before any read or
    /// file add.
    async fn validate_batch_id(&self, batch_id: Uuid) -> Result<BatchIdStatus>;

    /// Assemble full batch details. Assumes `validate_batch_id` already
    /// confirmed existence; a missing row surfaces as a database error.
    async fn get_batch_details(&self, batch_id: Uuid) -> Result<BatchDetailsDto>;

    /// Record file metadata against the batch. The stored hash is a random
    /// opaque token, not a content digest.
    async fn add_file_details(
        &self,
        batch_id: Uuid,
        file_name: &str,
        mime_type: &str,
        file_size: i64,
    ) -> Result<bool>;

    /// Provision the `{name}-container` storage container if absent.
    async fn create_storage_container(&self, name: &str) -> Result<()>;

    /// Upload file content into the batch's container. Returns false, and
    /// uploads nothing, if a blob with that name already exists.
    async fn upload_file_to_container(
        &self,
        batch_id: Uuid,
        file_name: &str,
        content_type: &str,
        content: &[u8],
    ) -> Result<bool>;
}

/// Service for batch operations backed by PostgreSQL and blob storage.
pub struct BatchService {
    pool: PgPool,
    storage: Arc<BlobStorageClient>,
}

impl BatchService {
    pub fn new(pool: PgPool, storage: Arc<BlobStorageClient>) -> Self {
        Self { pool, storage }
    }

    /// Response status derived at read time: a persisted status is
    /// overridden by `Expired` once the expiry has passed.
    fn derive_status(stored: &str, expiry_date: DateTime<Utc>) -> String {
        if expiry_date < Utc::now() {
            "Expired".to_string()
        } else {
            stored.to_string()
        }
    }
}

#[async_trait]
impl BatchApi for BatchService {
    async fn validate_business_unit(&self, business_unit: &str) -> Result<bool> {
        // Exact match only; no case folding
        let unit = sqlx::query_as::<_, BusinessUnit>(
            r#"
            SELECT business_unit_id, business_unit_name
            FROM business_units
            WHERE business_unit_name = $1
            "#,
        )
        .bind(business_unit)
        .fetch_optional(&self.pool)
        .await?;

        if unit.is_none() {
            debug!("No business unit found with name '{}'", business_unit);
        }
        Ok(unit.is_some())
    }

    async fn create_batch(&self, request: &CreateBatchDto) -> Result<Uuid> {
        let business_unit = sqlx::query_as::<_, BusinessUnit>(
            r#"
            SELECT business_unit_id, business_unit_name
            FROM business_units
            WHERE business_unit_name = $1
            "#,
        )
        .bind(&request.business_unit)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            // Callers validate the business unit first; reaching this is a bug
            AppError::Internal(format!(
                "business unit '{}' not found",
                request.business_unit
            ))
        })?;

        let (read_user_names, read_group_names) = match &request.acl {
            Some(acl) => (acl.read_users.clone(), acl.read_groups.clone()),
            None => (Vec::new(), Vec::new()),
        };

        // Names with no matching record are dropped without error
        let user_ids = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT user_id FROM users WHERE user_name = ANY($1)
            "#,
        )
        .bind(&read_user_names)
        .fetch_all(&self.pool)
        .await?;

        let group_ids = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT group_id FROM groups WHERE group_name = ANY($1)
            "#,
        )
        .bind(&read_group_names)
        .fetch_all(&self.pool)
        .await?;

        if user_ids.len() < read_user_names.len() || group_ids.len() < read_group_names.len() {
            warn!(
                "ACL names dropped: {} of {} users, {} of {} groups resolved",
                user_ids.len(),
                read_user_names.len(),
                group_ids.len(),
                read_group_names.len()
            );
        }

        let batch_id = Uuid::new_v4();
        let read_users = user_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let read_groups = group_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        // Batch and its initial attributes land in one unit of work
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO batches
                (batch_id, status, business_unit_id, batch_published_date,
                 expiry_date, read_users, read_groups)
            VALUES ($1, 'Incomplete', $2, $3, $4, $5, $6)
            "#,
        )
        .bind(batch_id)
        .bind(business_unit.business_unit_id)
        .bind(Utc::now())
        .bind(request.expiry_date)
        .bind(&read_users)
        .bind(&read_groups)
        .execute(&mut *tx)
        .await?;

        if let Some(attributes) = &request.attributes {
            for attribute in attributes {
                sqlx::query(
                    r#"
                    INSERT INTO attributes (key, value, batch_id)
                    VALUES ($1, $2, $3)
                    "#,
                )
                .bind(&attribute.key)
                .bind(&attribute.value)
                .bind(batch_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        info!("Batch created: id={}", batch_id);
        Ok(batch_id)
    }

    async fn validate_batch_id(&self, batch_id: Uuid) -> Result<BatchIdStatus> {
        let expiry_date = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            SELECT expiry_date FROM batches WHERE batch_id = $1
            "#,
        )
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await?;

        match expiry_date {
            None => Ok(BatchIdStatus::NotFound),
            Some(expiry) if expiry < Utc::now() => {
                warn!(
                    "Batch {} expired at {}",
                    batch_id,
                    expiry.to_rfc3339()
                );
                Ok(BatchIdStatus::Gone)
            }
            Some(_) => Ok(BatchIdStatus::Ok),
        }
    }

    async fn get_batch_details(&self, batch_id: Uuid) -> Result<BatchDetailsDto> {
        // fetch_one: a missing batch here means the caller skipped
        // validate_batch_id, surfaced as a database error
        let batch = sqlx::query_as::<_, Batch>(
            r#"
            SELECT batch_id, status, business_unit_id, batch_published_date, expiry_date
            FROM batches
            WHERE batch_id = $1
            "#,
        )
        .bind(batch_id)
        .fetch_one(&self.pool)
        .await?;

        let business_unit = sqlx::query_as::<_, BusinessUnit>(
            r#"
            SELECT business_unit_id, business_unit_name
            FROM business_units
            WHERE business_unit_id = $1
            "#,
        )
        .bind(batch.business_unit_id)
        .fetch_one(&self.pool)
        .await?;

        let batch_attributes = sqlx::query_as::<_, Attribute>(
            r#"
            SELECT key, value, file_id
            FROM attributes
            WHERE batch_id = $1
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        let files = sqlx::query_as::<_, BatchFile>(
            r#"
            SELECT file_id, file_name, file_size, mime_type, hash, links
            FROM files
            WHERE batch_id = $1
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        let file_ids: Vec<i32> = files.iter().map(|f| f.file_id).collect();
        let file_attributes = sqlx::query_as::<_, Attribute>(
            r#"
            SELECT key, value, file_id
            FROM attributes
            WHERE file_id = ANY($1)
            "#,
        )
        .bind(&file_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut attrs_by_file: HashMap<i32, Vec<AttributeDto>> = HashMap::new();
        for attribute in file_attributes {
            if let Some(file_id) = attribute.file_id {
                attrs_by_file.entry(file_id).or_default().push(AttributeDto {
                    key: attribute.key,
                    value: attribute.value,
                });
            }
        }

        Ok(BatchDetailsDto {
            batch_id: batch.batch_id,
            status: Self::derive_status(&batch.status, batch.expiry_date),
            attributes: batch_attributes
                .into_iter()
                .map(|a| AttributeDto {
                    key: a.key,
                    value: a.value,
                })
                .collect(),
            business_unit: business_unit.business_unit_name,
            batch_published_date: batch.batch_published_date,
            expiry_date: batch.expiry_date,
            files: files
                .into_iter()
                .map(|f| BatchFileDto {
                    attributes: attrs_by_file.remove(&f.file_id).unwrap_or_default(),
                    file_name: f.file_name,
                    file_size: f.file_size,
                    mime_type: f.mime_type,
                    hash: f.hash,
                    links: f.links,
                })
                .collect(),
        })
    }

    async fn add_file_details(
        &self,
        batch_id: Uuid,
        file_name: &str,
        mime_type: &str,
        file_size: i64,
    ) -> Result<bool> {
        // Opaque random token; content hashing is not part of the contract
        let hash = Uuid::new_v4().simple().to_string();
        let links = self.storage.blob_url(&batch_id.to_string(), file_name);

        sqlx::query(
            r#"
            INSERT INTO files (batch_id, file_name, file_size, mime_type, hash, links)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(batch_id)
        .bind(file_name)
        .bind(file_size)
        .bind(mime_type)
        .bind(&hash)
        .bind(&links)
        .execute(&self.pool)
        .await?;

        info!(
            "File registered: batch={}, name={}, size={}, mime={}",
            batch_id, file_name, file_size, mime_type
        );
        Ok(true)
    }

    async fn create_storage_container(&self, name: &str) -> Result<()> {
        self.storage.create_container(name).await
    }

    async fn upload_file_to_container(
        &self,
        batch_id: Uuid,
        file_name: &str,
        content_type: &str,
        content: &[u8],
    ) -> Result<bool> {
        let batch_key = batch_id.to_string();

        if self.storage.blob_exists(&batch_key, file_name).await? {
            debug!(
                "Blob '{}' already exists in batch {} container",
                file_name, batch_id
            );
            return Ok(false);
        }

        self.storage
            .upload_blob(&batch_key, file_name, content_type, content)
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_derive_status_keeps_stored_status_before_expiry() {
        let expiry = Utc::now() + Duration::days(10);
        assert_eq!(BatchService::derive_status("Incomplete", expiry), "Incomplete");
        assert_eq!(BatchService::derive_status("Active", expiry), "Active");
    }

    #[test]
    fn test_derive_status_overrides_after_expiry() {
        let expiry = Utc::now() - Duration::seconds(1);
        assert_eq!(BatchService::derive_status("Incomplete", expiry), "Expired");
    }
}
