use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    /// Setup fault: fatal to the owning board, never to siblings.
    #[error("list '{list}' not found on board {board}")]
    ListNotFound { board: String, list: String },

    /// Launch fault: the reservation is rolled back and the card retried
    /// on the next cycle.
    #[error("failed to spawn process for card '{card}': {source}")]
    SpawnFailed {
        card: String,
        #[source]
        source: std::io::Error,
    },

    /// Integrity fault: an Ongoing card without usable tracking comments.
    /// Reported and skipped; the card stays in Ongoing until fixed by hand.
    #[error("card '{card}' has no usable {field} comment")]
    MissingTracking { card: String, field: &'static str },

    #[error("board service error: {0}")]
    Client(String),

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TaskError>;
