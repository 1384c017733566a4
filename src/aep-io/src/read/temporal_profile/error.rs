use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemporalProfileError {
    #[error("temporal profile line {line_no} is malformed: {line}")]
    MalformedLine { line_no: usize, line: String },

    #[error("temporal profile line {line_no}'s {dimension} factors sum to {sum}, not 1.0")]
    NotNormalized { line_no: usize, dimension: &'static str, sum: f64 },

    #[error("no temporal profile for code {0}")]
    UnknownCode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
