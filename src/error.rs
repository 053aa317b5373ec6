use thiserror::Error;

#[derive(Error, Debug)]
pub enum VizError {
    #[error("Transport error: HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body failed part way through.
    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Text cannot be empty")]
    EmptyInput,

    #[error("Text exceeds maximum length of {max} characters")]
    InputTooLong { len: usize, max: usize },

    #[error("Not enough data to visualize: {0}")]
    NotEnoughData(String),

    #[error("Invalid attention matrix: {0}")]
    InvalidMatrix(String),

    #[error("Layout error: {0}")]
    Layout(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The consumer of a request went away before the stream finished.
    #[error("Request cancelled")]
    Cancelled,
}

impl VizError {
    /// Message shown to the user in the status line.
    ///
    /// Backend errors are surfaced verbatim; everything else uses the
    /// display form.
    pub fn user_message(&self) -> String {
        match self {
            VizError::Backend(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type VizResult<T> = Result<T, VizError>;
