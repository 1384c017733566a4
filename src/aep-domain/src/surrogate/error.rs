use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SurrogateError {
    #[error("cannot rescale a surrogate with no allocated weight")]
    EmptyFootprint,
}
