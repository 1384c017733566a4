use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PlumeError {
    #[error("stack height exceeds the top of the emissions layer file (kStak={k_stak}, Kemit={kemit})")]
    StackAboveEmissionsTop { k_stak: usize, kemit: usize },

    #[error("plume rise computed a non-finite delta-H")]
    NonFiniteDeltaH,

    #[error("met profile must carry at least two layer heights")]
    InsufficientLayers,
}
