#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
    #[error("Unsupported storage backend: {0}. Expected one of: azure, local, memory")]
    UnsupportedBackend(String),
    #[error("Initialization error: {0}")]
    InitializationError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StorageError {
    /// Whether the blob or prefix addressed by the failed call does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::ObjectStoreError(object_store::Error::NotFound { .. })
        )
    }
}
