use thiserror::Error;

#[derive(Error, Debug)]
pub enum CemError {
    #[error("malformed CEM line {line_no}: '{line}'")]
    MalformedLine { line_no: usize, line: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
