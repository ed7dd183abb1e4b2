use utoipa::{Modify, OpenApi};

use crate::features::batches::{dtos as batch_dtos, handlers as batch_handlers};
use crate::shared::types::{ErrorDetail, ErrorResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        batch_handlers::batch_handler::create_batch,
        batch_handlers::batch_handler::get_batch,
        batch_handlers::batch_handler::upload_file,
    ),
    components(
        schemas(
            batch_dtos::CreateBatchDto,
            batch_dtos::AclDto,
            batch_dtos::AttributeDto,
            batch_dtos::BatchCreatedDto,
            batch_dtos::BatchDetailsDto,
            batch_dtos::BatchFileDto,
            ErrorResponse,
            ErrorDetail,
        )
    ),
    tags(
        (name = "batch", description = "Batch creation, details, and file upload")
    ),
    info(
        title = "Batch Upload API",
        version = "0.1.0",
        description = "Create batches, upload files into them, and read batch details",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
