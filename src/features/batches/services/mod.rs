mod batch_service;

pub use batch_service::{BatchApi, BatchIdStatus, BatchService};
