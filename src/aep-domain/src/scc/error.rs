use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SccError {
    #[error("SCC '{raw}' has unsupported length {len} (expected one of 10,8,7,6,5,4,3,2,0)")]
    InvalidLength { raw: String, len: usize },
}
