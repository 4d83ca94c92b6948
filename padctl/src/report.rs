//! Structured summary of a run
use pad::{RunStatus, Session};
use serde::Serialize;

/// What `padctl run --json` prints
#[derive(Debug, Serialize)]
pub(crate) struct ExecutionReport {
    pub(crate) status: RunStatus,
    pub(crate) status_text: String,
    /// Markup of the output sink
    pub(crate) output: String,
    /// Message of the failure indicator, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

impl ExecutionReport {
    pub(crate) fn of(session: &Session) -> Self {
        let status = session.status();
        let error = session
            .output_node()
            .select_all(".error")
            .first()
            .map(|n| n.text());
        Self {
            status,
            status_text: status.to_string(),
            output: session.output(),
            error,
        }
    }
}
