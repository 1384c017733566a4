use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FipsError {
    #[error("FIPS code '{raw}' has unsupported length {len} (expected 5 or 6)")]
    InvalidLength { raw: String, len: usize },
}
