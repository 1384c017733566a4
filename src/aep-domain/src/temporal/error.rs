use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemporalError {
    #[error("temporal profile's {dimension} factors sum to {sum}, not 1.0")]
    NotNormalized { dimension: &'static str, sum: f64 },
}
