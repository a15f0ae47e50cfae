use thiserror::Error;

// Errors shared by the study, review and quiz schedulers
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("No card is currently queued")]
    EmptyQueue,
}
