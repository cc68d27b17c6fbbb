use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// An upstream data-preparation contract does not hold.
    #[error("malformed input: {invariant} ({detail})")]
    MalformedInput {
        invariant: &'static str,
        detail: String,
    },
    #[error("parse error at line {line}: {msg}")]
    Parse { line: usize, msg: String },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
