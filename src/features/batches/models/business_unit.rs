use sqlx::FromRow;

/// Database model for the business unit lookup table.
#[derive(Debug, FromRow)]
pub struct BusinessUnit {
    pub business_unit_id: i32,
    pub business_unit_name: String,
}
