use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GridError {
    #[error("grid '{0}' has no cells")]
    Empty(String),
}
