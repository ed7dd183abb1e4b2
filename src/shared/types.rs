use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Structured error body returned with 400 responses.
///
/// The correlation id is generated at the moment the warning is logged and
/// lets operators find the matching log entry; it is not a per-request id.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Operation that rejected the request.
    pub source: String,
    /// Stable, client-asserted description of the rule that failed.
    pub description: String,
}

impl ErrorResponse {
    pub fn single(correlation_id: String, source: String, description: String) -> Self {
        Self {
            correlation_id,
            errors: vec![ErrorDetail {
                source,
                description,
            }],
        }
    }
}
