pub mod blob_store;
pub mod keys;
pub mod memory_blob_store;
pub mod s3_blob_store;

pub use blob_store::{BlobStore, StorageError};
pub use keys::{Artifact, DocumentKey};
pub use memory_blob_store::InMemoryBlobStore;
pub use s3_blob_store::S3BlobStore;
