use std::time::Duration;

use thiserror::Error;

use crate::worker::message::WorkerError;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to spawn worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Worker I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker sent an `error` message and then exited with code 1
    #[error("{name}: {message}")]
    WorkerReported {
        name: String,
        message: String,
        stack: String,
    },

    #[error("Worker failed without reporting a cause")]
    UnexplainedFailure,

    #[error("Worker was terminated by a signal")]
    Terminated,

    #[error("Worker did not finish within {0:?}")]
    TimedOut(Duration),
}

impl From<WorkerError> for ExtractionError {
    fn from(error: WorkerError) -> Self {
        ExtractionError::WorkerReported {
            name: error.name,
            message: error.message,
            stack: error.stack,
        }
    }
}
