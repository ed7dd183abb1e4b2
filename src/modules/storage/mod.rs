//! Blob storage module.
//!
//! Provides the S3-compatible client that backs per-batch storage
//! containers and file blob uploads.

mod blob_client;

pub use blob_client::BlobStorageClient;
