use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::batches::dtos::{BatchCreatedDto, BatchDetailsDto, CreateBatchDto};
use crate::features::batches::services::{BatchApi, BatchIdStatus};
use crate::shared::constants::{
    APPLICATION_OCTET_STREAM, ATTRIBUTE_VALIDATION, ATTRIBUTE_VALIDATION_KEY_VALUE,
    BUSINESS_UNIT_INVALID, CONTENT_SIZE_REQUIRED, EXPIRY_DATE_IN_PAST, FILE_ALREADY_EXIST,
    HEADER_CONTENT_SIZE, HEADER_MIME_TYPE, INVALID_FILE_NAME,
};
use crate::shared::types::ErrorResponse;
use crate::shared::validation::is_valid_filename;

/// Create a new batch to upload files into
///
/// Validates the request shape and business unit, persists the batch with
/// its initial attributes, and provisions the batch's storage container.
#[utoipa::path(
    post,
    path = "/batch",
    tag = "batch",
    request_body = CreateBatchDto,
    responses(
        (status = 201, description = "Batch created", body = BatchCreatedDto),
        (status = 400, description = "Validation failure", body = ErrorResponse)
    )
)]
pub async fn create_batch(
    State(service): State<Arc<dyn BatchApi>>,
    AppJson(request): AppJson<CreateBatchDto>,
) -> Result<(StatusCode, Json<BatchCreatedDto>)> {
    if let Err(description) = request.validate_schema() {
        return Err(AppError::validation("createBatch", description));
    }

    if !service.validate_business_unit(&request.business_unit).await? {
        return Err(AppError::validation("createBatch", BUSINESS_UNIT_INVALID));
    }

    // An omitted attribute list is fine; a present one must be non-empty
    // and fully keyed/valued
    if let Some(attributes) = &request.attributes {
        if attributes.is_empty() {
            return Err(AppError::validation("createBatch", ATTRIBUTE_VALIDATION));
        }
        if attributes
            .iter()
            .any(|a| a.key.trim().is_empty() || a.value.trim().is_empty())
        {
            return Err(AppError::validation(
                "createBatch",
                ATTRIBUTE_VALIDATION_KEY_VALUE,
            ));
        }
    }

    let batch_id = service.create_batch(&request).await?;
    service
        .create_storage_container(&batch_id.to_string())
        .await?;

    Ok((StatusCode::CREATED, Json(BatchCreatedDto { batch_id })))
}

/// Get details of the batch including links to all the files in the batch
#[utoipa::path(
    get,
    path = "/batch/{batchId}",
    tag = "batch",
    params(
        ("batchId" = Uuid, Path, description = "Batch ID")
    ),
    responses(
        (status = 200, description = "Batch details", body = BatchDetailsDto),
        (status = 404, description = "No batch with that id"),
        (status = 410, description = "Batch has expired")
    )
)]
pub async fn get_batch(
    State(service): State<Arc<dyn BatchApi>>,
    Path(batch_id): Path<Uuid>,
) -> Result<Json<BatchDetailsDto>> {
    match service.validate_batch_id(batch_id).await? {
        BatchIdStatus::NotFound => return Err(AppError::NotFound),
        BatchIdStatus::Gone => return Err(AppError::Gone),
        BatchIdStatus::Ok => {}
    }

    let details = service.get_batch_details(batch_id).await?;

    // Sanity guard: the batch can expire between the id check and the read
    if details.expiry_date < chrono::Utc::now() {
        return Err(AppError::validation("getBatch", EXPIRY_DATE_IN_PAST));
    }

    Ok(Json(details))
}

/// Upload a file into the batch
///
/// The request body is the file content. `X-MIME-Type` is optional
/// (defaults to application/octet-stream); `X-Content-Size` is required
/// and numeric.
#[utoipa::path(
    post,
    path = "/batch/{batchId}/{filename}",
    tag = "batch",
    params(
        ("batchId" = Uuid, Path, description = "Batch ID"),
        ("filename" = String, Path, description = "Name of the file"),
        ("X-MIME-Type" = Option<String>, Header, description = "MIME type of the file"),
        ("X-Content-Size" = i64, Header, description = "Size of the file in bytes")
    ),
    request_body(
        content = String,
        content_type = "application/octet-stream",
        description = "Raw file content"
    ),
    responses(
        (status = 201, description = "File uploaded and recorded"),
        (status = 400, description = "Validation failure", body = ErrorResponse),
        (status = 404, description = "No batch with that id"),
        (status = 410, description = "Batch has expired")
    )
)]
pub async fn upload_file(
    State(service): State<Arc<dyn BatchApi>>,
    Path((batch_id, file_name)): Path<(Uuid, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    // Filename legality comes first, before any batch lookup
    if file_name.trim().is_empty() || !is_valid_filename(&file_name) {
        return Err(AppError::validation("uploadFile", INVALID_FILE_NAME));
    }

    let mime_type = headers
        .get(HEADER_MIME_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(APPLICATION_OCTET_STREAM)
        .to_string();

    let file_size = headers
        .get(HEADER_CONTENT_SIZE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or_else(|| AppError::validation("uploadFile", CONTENT_SIZE_REQUIRED))?;

    match service.validate_batch_id(batch_id).await? {
        BatchIdStatus::NotFound => return Err(AppError::NotFound),
        BatchIdStatus::Gone => return Err(AppError::Gone),
        BatchIdStatus::Ok => {}
    }

    let uploaded = service
        .upload_file_to_container(batch_id, &file_name, &mime_type, &body)
        .await?;
    if !uploaded {
        return Err(AppError::validation("uploadFile", FILE_ALREADY_EXIST));
    }

    service
        .add_file_details(batch_id, &file_name, &mime_type, file_size)
        .await?;

    Ok(StatusCode::CREATED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::batches::dtos::AttributeDto;
    use crate::features::batches::routes;
    use async_trait::async_trait;
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::TestServer;
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fake service with canned outcomes, standing in for the concrete
    /// service the way the original controller tests fake the interface.
    struct FakeBatchService {
        business_unit_valid: bool,
        batch_status: BatchIdStatus,
        blob_accepted: bool,
        details_expiry: chrono::DateTime<Utc>,
        created: Mutex<Vec<CreateBatchDto>>,
        containers: Mutex<Vec<String>>,
        files: Mutex<Vec<(Uuid, String, String, i64)>>,
        batch_id_checks: AtomicUsize,
    }

    impl Default for FakeBatchService {
        fn default() -> Self {
            Self {
                business_unit_valid: true,
                batch_status: BatchIdStatus::Ok,
                blob_accepted: true,
                details_expiry: Utc::now() + Duration::days(10),
                created: Mutex::new(Vec::new()),
                containers: Mutex::new(Vec::new()),
                files: Mutex::new(Vec::new()),
                batch_id_checks: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BatchApi for FakeBatchService {
        async fn validate_business_unit(&self, _business_unit: &str) -> Result<bool> {
            Ok(self.business_unit_valid)
        }

        async fn create_batch(&self, request: &CreateBatchDto) -> Result<Uuid> {
            self.created.lock().unwrap().push(request.clone());
            Ok(Uuid::new_v4())
        }

        async fn validate_batch_id(&self, _batch_id: Uuid) -> Result<BatchIdStatus> {
            self.batch_id_checks.fetch_add(1, Ordering::SeqCst);
            Ok(self.batch_status)
        }

        async fn get_batch_details(&self, batch_id: Uuid) -> Result<BatchDetailsDto> {
            Ok(BatchDetailsDto {
                batch_id,
                status: "Incomplete".to_string(),
                attributes: vec![AttributeDto {
                    key: "key1".to_string(),
                    value: "value1".to_string(),
                }],
                business_unit: "IT".to_string(),
                batch_published_date: Utc::now() - Duration::hours(1),
                expiry_date: self.details_expiry,
                files: vec![],
            })
        }

        async fn add_file_details(
            &self,
            batch_id: Uuid,
            file_name: &str,
            mime_type: &str,
            file_size: i64,
        ) -> Result<bool> {
            self.files.lock().unwrap().push((
                batch_id,
                file_name.to_string(),
                mime_type.to_string(),
                file_size,
            ));
            Ok(true)
        }

        async fn create_storage_container(&self, name: &str) -> Result<()> {
            self.containers.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn upload_file_to_container(
            &self,
            _batch_id: Uuid,
            _file_name: &str,
            _content_type: &str,
            _content: &[u8],
        ) -> Result<bool> {
            Ok(self.blob_accepted)
        }
    }

    fn server_with(service: Arc<FakeBatchService>) -> TestServer {
        TestServer::new(routes::routes(service)).unwrap()
    }

    fn valid_request() -> Value {
        json!({
            "businessUnit": "IT",
            "acl": {
                "readUsers": ["User1", "User 2"],
                "readGroups": ["Group 1", "Group 2"]
            },
            "attritubes": [
                {"key": "key1", "value": "value1"},
                {"key": "key2", "value": "value2"}
            ],
            "expiryDate": (Utc::now() + Duration::days(10)).to_rfc3339()
        })
    }

    fn first_error_description(body: &Value) -> &str {
        body["errors"][0]["description"].as_str().unwrap()
    }

    #[tokio::test]
    async fn test_create_batch_returns_id_and_provisions_container() {
        let service = Arc::new(FakeBatchService::default());
        let server = server_with(Arc::clone(&service));

        let response = server.post("/batch").json(&valid_request()).await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        let batch_id = Uuid::parse_str(body["batchID"].as_str().unwrap()).unwrap();
        assert_eq!(service.created.lock().unwrap().len(), 1);
        assert_eq!(
            service.containers.lock().unwrap().as_slice(),
            &[batch_id.to_string()]
        );
    }

    #[tokio::test]
    async fn test_create_batch_rejects_unknown_business_unit() {
        let service = Arc::new(FakeBatchService {
            business_unit_valid: false,
            ..Default::default()
        });
        let server = server_with(Arc::clone(&service));

        let response = server.post("/batch").json(&valid_request()).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(first_error_description(&body), BUSINESS_UNIT_INVALID);
        assert_eq!(body["errors"][0]["source"], "createBatch");
        assert!(body["correlationId"].as_str().is_some());
        assert!(service.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_batch_rejects_empty_business_unit() {
        let service = Arc::new(FakeBatchService::default());
        let server = server_with(Arc::clone(&service));

        let mut request = valid_request();
        request["businessUnit"] = json!("");
        let response = server.post("/batch").json(&request).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(
            first_error_description(&body),
            "Business Unit should not be null or empty"
        );
    }

    #[tokio::test]
    async fn test_create_batch_rejects_empty_attribute_array() {
        let service = Arc::new(FakeBatchService::default());
        let server = server_with(Arc::clone(&service));

        let mut request = valid_request();
        request["attritubes"] = json!([]);
        let response = server.post("/batch").json(&request).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(first_error_description(&body), ATTRIBUTE_VALIDATION);
        assert!(service.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_batch_rejects_attribute_with_empty_key() {
        let service = Arc::new(FakeBatchService::default());
        let server = server_with(Arc::clone(&service));

        let mut request = valid_request();
        request["attritubes"] = json!([
            {"key": "key1", "value": "value1"},
            {"key": "", "value": "value2"}
        ]);
        let response = server.post("/batch").json(&request).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(
            first_error_description(&body),
            ATTRIBUTE_VALIDATION_KEY_VALUE
        );
    }

    #[tokio::test]
    async fn test_create_batch_rejects_attribute_with_empty_value() {
        let service = Arc::new(FakeBatchService::default());
        let server = server_with(Arc::clone(&service));

        let mut request = valid_request();
        request["attritubes"] = json!([{"key": "key1", "value": ""}]);
        let response = server.post("/batch").json(&request).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(
            first_error_description(&body),
            ATTRIBUTE_VALIDATION_KEY_VALUE
        );
    }

    #[tokio::test]
    async fn test_create_batch_accepts_omitted_attributes() {
        let service = Arc::new(FakeBatchService::default());
        let server = server_with(Arc::clone(&service));

        let mut request = valid_request();
        request.as_object_mut().unwrap().remove("attritubes");
        let response = server.post("/batch").json(&request).await;

        response.assert_status(StatusCode::CREATED);
        assert_eq!(service.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_batch_returns_404_when_unknown() {
        let service = Arc::new(FakeBatchService {
            batch_status: BatchIdStatus::NotFound,
            ..Default::default()
        });
        let server = server_with(service);

        let response = server.get(&format!("/batch/{}", Uuid::new_v4())).await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert!(response.text().is_empty());
    }

    #[tokio::test]
    async fn test_get_batch_returns_410_when_expired() {
        let service = Arc::new(FakeBatchService {
            batch_status: BatchIdStatus::Gone,
            ..Default::default()
        });
        let server = server_with(service);

        let response = server.get(&format!("/batch/{}", Uuid::new_v4())).await;

        response.assert_status(StatusCode::GONE);
        assert!(response.text().is_empty());
    }

    #[tokio::test]
    async fn test_get_batch_returns_details() {
        let service = Arc::new(FakeBatchService::default());
        let server = server_with(service);
        let batch_id = Uuid::new_v4();

        let response = server.get(&format!("/batch/{}", batch_id)).await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["batchId"].as_str().unwrap(), batch_id.to_string());
        assert_eq!(body["businessUnit"], "IT");
        assert_eq!(body["attritube"][0]["key"], "key1");
    }

    #[tokio::test]
    async fn test_get_batch_guards_against_expiry_race() {
        // validate_batch_id said Ok but the assembled response is already
        // expired; the read must fail rather than serve a stale batch
        let service = Arc::new(FakeBatchService {
            details_expiry: Utc::now() - Duration::seconds(5),
            ..Default::default()
        });
        let server = server_with(service);

        let response = server.get(&format!("/batch/{}", Uuid::new_v4())).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(first_error_description(&body), EXPIRY_DATE_IN_PAST);
    }

    #[tokio::test]
    async fn test_upload_rejects_illegal_filename_without_batch_lookup() {
        let service = Arc::new(FakeBatchService::default());
        let server = server_with(Arc::clone(&service));

        let response = server
            .post(&format!("/batch/{}/Test%2Fas@File.pdf", Uuid::new_v4()))
            .add_header(
                HeaderName::from_static(HEADER_CONTENT_SIZE),
                HeaderValue::from_static("100"),
            )
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(first_error_description(&body), INVALID_FILE_NAME);
        assert_eq!(service.batch_id_checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_requires_numeric_content_size() {
        let service = Arc::new(FakeBatchService::default());
        let server = server_with(Arc::clone(&service));
        let url = format!("/batch/{}/TestFile.pdf", Uuid::new_v4());

        let missing = server.post(&url).await;
        missing.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = missing.json();
        assert_eq!(first_error_description(&body), CONTENT_SIZE_REQUIRED);

        let garbled = server
            .post(&url)
            .add_header(
                HeaderName::from_static(HEADER_CONTENT_SIZE),
                HeaderValue::from_static("ten"),
            )
            .await;
        garbled.assert_status(StatusCode::BAD_REQUEST);
        assert!(service.files.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_returns_404_and_410_from_batch_check() {
        for (status, expected) in [
            (BatchIdStatus::NotFound, StatusCode::NOT_FOUND),
            (BatchIdStatus::Gone, StatusCode::GONE),
        ] {
            let service = Arc::new(FakeBatchService {
                batch_status: status,
                ..Default::default()
            });
            let server = server_with(service);

            let response = server
                .post(&format!("/batch/{}/TestFile.pdf", Uuid::new_v4()))
                .add_header(
                    HeaderName::from_static(HEADER_CONTENT_SIZE),
                    HeaderValue::from_static("100"),
                )
                .await;

            response.assert_status(expected);
        }
    }

    #[tokio::test]
    async fn test_upload_rejects_duplicate_blob() {
        let service = Arc::new(FakeBatchService {
            blob_accepted: false,
            ..Default::default()
        });
        let server = server_with(Arc::clone(&service));

        let response = server
            .post(&format!("/batch/{}/TestFile.pdf", Uuid::new_v4()))
            .add_header(
                HeaderName::from_static(HEADER_CONTENT_SIZE),
                HeaderValue::from_static("100"),
            )
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(first_error_description(&body), FILE_ALREADY_EXIST);
        assert!(service.files.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_records_metadata_with_default_mime() {
        let service = Arc::new(FakeBatchService::default());
        let server = server_with(Arc::clone(&service));
        let batch_id = Uuid::new_v4();

        let response = server
            .post(&format!("/batch/{}/TestFile.pdf", batch_id))
            .add_header(
                HeaderName::from_static(HEADER_CONTENT_SIZE),
                HeaderValue::from_static("2048"),
            )
            .bytes(Bytes::from_static(b"%PDF-1.7 sample"))
            .await;

        response.assert_status(StatusCode::CREATED);
        let files = service.files.lock().unwrap();
        assert_eq!(
            files.as_slice(),
            &[(
                batch_id,
                "TestFile.pdf".to_string(),
                APPLICATION_OCTET_STREAM.to_string(),
                2048
            )]
        );
    }

    #[tokio::test]
    async fn test_upload_honours_mime_type_header() {
        let service = Arc::new(FakeBatchService::default());
        let server = server_with(Arc::clone(&service));

        let response = server
            .post(&format!("/batch/{}/TestFile.pdf", Uuid::new_v4()))
            .add_header(
                HeaderName::from_static(HEADER_MIME_TYPE),
                HeaderValue::from_static("application/pdf"),
            )
            .add_header(
                HeaderName::from_static(HEADER_CONTENT_SIZE),
                HeaderValue::from_static("2048"),
            )
            .await;

        response.assert_status(StatusCode::CREATED);
        assert_eq!(service.files.lock().unwrap()[0].2, "application/pdf");
    }
}
