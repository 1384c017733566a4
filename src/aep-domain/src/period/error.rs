use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UnitError {
    #[error("unknown input unit '{0}' (expected one of ton, tonne, kg, g, lb)")]
    Unknown(String),
}
