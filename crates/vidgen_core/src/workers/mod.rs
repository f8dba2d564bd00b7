//! Stage workers and the task execution contract.
//!
//! Each pipeline stage is a worker implementing [`StageWorker`]: a
//! transform from a typed input payload to a typed output payload. The
//! execution contract ([`contract::execute_task`]) wraps every
//! invocation in a uniform lifecycle so the workflow engine only ever
//! sees the two terminal task states.

mod assemble;
mod audio;
mod contract;
mod image;
mod runtime;
mod script;

use std::io;

use thiserror::Error;

pub use assemble::{AssembleOutput, AssembleWorker, ProjectScene, VideoProject};
pub use audio::{AudioOutput, AudioWorker};
pub use contract::{decode_input, execute_task, StageWorker, TaskExecution, TaskResult};
pub use image::{ImageWorker, ImagesOutput};
pub use runtime::WorkerRuntime;
pub use script::{ScriptOutput, ScriptWorker};

/// Errors raised inside a stage transform.
///
/// These never escape the execution contract: [`execute_task`] converts
/// them into a FAILED task result with a structured error payload.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The task input did not match the stage's declared schema.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An external content service call failed past its retry budget.
    #[error(transparent)]
    Service(#[from] crate::services::ServiceError),

    /// File I/O while persisting stage output failed.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Failed to encode the stage's output payload.
    #[error("Failed to encode output: {0}")]
    Output(String),
}

impl WorkerError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for stage transforms.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Reduce text to alphanumerics plus basic punctuation and cap its
/// length, as required by the image and speech service URLs.
pub(crate) fn sanitize_prompt(text: &str, max_chars: usize) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || " -,.!?".contains(*c))
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    trimmed
        .chars()
        .take(max_chars)
        .collect::<String>()
        .trim_end()
        .to_string()
}
