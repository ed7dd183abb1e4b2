use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for batches.
///
/// The ACL columns (`read_users`, `read_groups`) are written at creation
/// time and never read back by the API, so they are not mapped here.
#[derive(Debug, FromRow)]
pub struct Batch {
    pub batch_id: Uuid,
    pub status: String,
    pub business_unit_id: i32,
    pub batch_published_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
}
