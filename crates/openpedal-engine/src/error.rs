#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine already started")]
    AlreadyStarted,

    #[error("Failed to spawn {thread} thread: {source}")]
    Spawn {
        thread: &'static str,
        source: std::io::Error,
    },

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}
