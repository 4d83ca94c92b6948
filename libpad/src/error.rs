use tokio::sync::oneshot;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to message playground task - {0}")]
    FailedToMessagePlayground(String),

    #[error("Failed to receive response from playground task - {0}")]
    FailedToReceiveResponse(#[from] oneshot::error::RecvError),
}
