use openpedal_errors::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum DebounceError {
    #[error("Unknown debounced action: {0}")]
    UnknownAction(String),

    #[error("Debounced action {action} failed: {source}")]
    Failed { action: String, source: StorageError },
}
