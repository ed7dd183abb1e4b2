use sqlx::FromRow;

/// Database model for files registered in a batch.
#[derive(Debug, FromRow)]
pub struct BatchFile {
    pub file_id: i32,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    /// Opaque random token, not a content digest.
    pub hash: String,
    /// Public blob URL for the uploaded content.
    pub links: String,
}
