pub mod batch_handler;

pub use batch_handler::{create_batch, get_batch, upload_file};
