use thiserror::Error;

/// 起動時や実行後の検証で起こりうるエラー
///
/// 箸の二重解放のような契約違反はここには含めず、panic させる
#[derive(Error, Debug)]
pub enum DiningError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("startup handoff for seat {seat} failed: {reason}")]
    Handoff { seat: usize, reason: String },

    #[error("startup coordinator went away before handing out a seat")]
    Abandoned,

    #[error("philosopher task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("semaphore closed: {0}")]
    Closed(#[from] tokio::sync::AcquireError),

    #[error("failed to write the result: {0}")]
    Output(#[source] std::io::Error),

    #[error("trace verification failed: {0}")]
    Verification(String),
}

pub type Result<T> = std::result::Result<T, DiningError>;
