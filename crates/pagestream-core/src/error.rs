//! Pipeline error type

use crate::client::FetchError;

/// Fatal error from a pipeline invocation.
///
/// Retrieval failures are deliberately NOT here: a request the service
/// cannot answer is logged and treated as zero results. What remains fatal
/// is malformed input, a failing output channel, and client release errors
/// (reported only after the unit's output has been emitted).
#[derive(Debug)]
pub enum PipelineError {
    /// Structured tuple input lacks a required field
    MissingField { field: &'static str },
    /// An output channel write failed
    Output(std::io::Error),
    /// Client release failed after the unit's output was emitted
    Release(FetchError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { field } => {
                write!(f, "missing {field} from input tuples")
            }
            Self::Output(e) => write!(f, "output channel: {e}"),
            Self::Release(e) => write!(f, "client release: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {}
