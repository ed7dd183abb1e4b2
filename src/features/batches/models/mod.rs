mod attribute;
mod batch;
mod batch_file;
mod business_unit;

pub use attribute::Attribute;
pub use batch::Batch;
pub use batch_file::BatchFile;
pub use business_unit::BusinessUnit;
