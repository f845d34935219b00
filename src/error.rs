use thiserror::Error;

use crate::feed::{FetchError, ParseError};

/// Fatal, caller-visible failures of a pipeline run.
///
/// Per-item problems never surface here: they are resolved inside the gather
/// pass by keeping or dropping the item.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The feed itself could not be downloaded.
    #[error("Error downloading feed: {0}")]
    Fetch(#[from] FetchError),

    /// The downloaded document is not a feed and no custom rules were given.
    #[error("Link provided is not a valid feed: {0}")]
    Parse(ParseError),

    /// A custom rule or the parsing mode could not be understood.
    #[error("Invalid custom rules: {0}")]
    InvalidRules(ParseError),

    /// The JSONP callback name is not `[A-Za-z0-9.]+`.
    #[error("Invalid callback name: {0:?}")]
    InvalidCallback(String),

    /// A serializer failed while writing the output.
    #[error("Failed to render output: {0}")]
    Render(String),
}


impl From<ParseError> for PipelineError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::NotAFeed(_) => PipelineError::Parse(err),
            ParseError::InvalidRule { .. } | ParseError::UnsupportedMode(_) => {
                PipelineError::InvalidRules(err)
            }
        }
    }
}
