use sqlx::FromRow;

/// Database model for key/value attributes.
///
/// An attribute annotates either a batch or a file, never both (enforced by
/// a table check constraint). `file_id` is NULL for batch-scoped rows.
#[derive(Debug, FromRow)]
pub struct Attribute {
    pub key: String,
    pub value: String,
    pub file_id: Option<i32>,
}
