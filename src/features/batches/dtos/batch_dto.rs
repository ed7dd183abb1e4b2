use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::shared::constants::EMPTY_BUSINESS_UNIT;

// Wire names are fixed by the existing API contract, including the
// misspelled "attritube(s)" and the batchID/batchId mismatch between the
// create and details responses. Do not correct them here.

/// Request body for creating a batch.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBatchDto {
    /// Owning business unit, referenced by name
    #[serde(rename = "businessUnit", default)]
    #[validate(length(min = 1, message = "Business Unit should not be null or empty"))]
    #[schema(example = "IT")]
    pub business_unit: String,

    /// Reader access-control lists
    #[serde(default)]
    pub acl: Option<AclDto>,

    /// Batch attributes; may be omitted entirely, but must be non-empty
    /// and fully keyed/valued when present
    #[serde(rename = "attritubes", default)]
    pub attributes: Option<Vec<AttributeDto>>,

    /// Expiry timestamp; immutable once the batch is created
    #[serde(rename = "expiryDate")]
    pub expiry_date: DateTime<Utc>,
}

/// Reader user and group names supplied at batch creation.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct AclDto {
    #[serde(rename = "readUsers", default)]
    pub read_users: Vec<String>,
    #[serde(rename = "readGroups", default)]
    pub read_groups: Vec<String>,
}

/// Key/value annotation on a batch or a file. Shared between the request
/// (`attritubes`) and response (`attritube`) payloads.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AttributeDto {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Response body for a created batch.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchCreatedDto {
    #[serde(rename = "batchID")]
    pub batch_id: Uuid,
}

/// Full batch details including per-file metadata.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchDetailsDto {
    #[serde(rename = "batchId")]
    pub batch_id: Uuid,
    pub status: String,
    /// Batch-scoped attributes (not tied to any file)
    #[serde(rename = "attritube")]
    pub attributes: Vec<AttributeDto>,
    #[serde(rename = "businessUnit")]
    pub business_unit: String,
    #[serde(rename = "batchPublishedDate")]
    pub batch_published_date: DateTime<Utc>,
    #[serde(rename = "expiryDate")]
    pub expiry_date: DateTime<Utc>,
    pub files: Vec<BatchFileDto>,
}

/// Per-file entry in the batch details response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchFileDto {
    #[serde(rename = "filename")]
    pub file_name: String,
    #[serde(rename = "fileSize")]
    pub file_size: i64,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Opaque token assigned when the file was registered
    pub hash: String,
    /// File-scoped attributes
    #[serde(rename = "attritube")]
    pub attributes: Vec<AttributeDto>,
    /// Public blob URL for the uploaded content
    pub links: String,
}

impl CreateBatchDto {
    /// Schema-level validation, folded into the contract's single message
    /// for a missing or empty business unit.
    pub fn validate_schema(&self) -> Result<(), &'static str> {
        Validate::validate(self).map_err(|_| EMPTY_BUSINESS_UNIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_field_names() {
        let dto: CreateBatchDto = serde_json::from_value(serde_json::json!({
            "businessUnit": "IT",
            "acl": {
                "readUsers": ["User1"],
                "readGroups": ["Group 1"]
            },
            "attritubes": [{"key": "k", "value": "v"}],
            "expiryDate": "2030-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(dto.business_unit, "IT");
        assert_eq!(dto.acl.as_ref().unwrap().read_users, ["User1"]);
        assert_eq!(dto.attributes.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_business_unit_fails_schema_validation() {
        let dto: CreateBatchDto = serde_json::from_value(serde_json::json!({
            "expiryDate": "2030-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(dto.business_unit, "");
        assert!(dto.validate_schema().is_err());
    }

    #[test]
    fn test_created_response_uses_batch_id_casing() {
        let body = serde_json::to_value(BatchCreatedDto {
            batch_id: Uuid::nil(),
        })
        .unwrap();

        assert!(body.get("batchID").is_some());
    }

    #[test]
    fn test_details_response_field_names() {
        let details = BatchDetailsDto {
            batch_id: Uuid::nil(),
            status: "Incomplete".to_string(),
            attributes: vec![],
            business_unit: "IT".to_string(),
            batch_published_date: Utc::now(),
            expiry_date: Utc::now(),
            files: vec![BatchFileDto {
                file_name: "a.pdf".to_string(),
                file_size: 10,
                mime_type: "application/pdf".to_string(),
                hash: "h".to_string(),
                attributes: vec![],
                links: "http://example/a.pdf".to_string(),
            }],
        };

        let body = serde_json::to_value(details).unwrap();
        assert!(body.get("batchId").is_some());
        assert!(body.get("attritube").is_some());
        assert!(body.get("batchPublishedDate").is_some());
        let file = &body["files"][0];
        assert!(file.get("filename").is_some());
        assert!(file.get("fileSize").is_some());
        assert!(file.get("attritube").is_some());
    }
}
