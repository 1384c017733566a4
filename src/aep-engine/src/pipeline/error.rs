use thiserror::Error;

use crate::{speciation::SpeciationError, spatial::SpatialError, temporal::TemporalError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("speciation failed: {0}")]
    Speciation(#[from] SpeciationError),

    #[error("spatial allocation failed: {0}")]
    Spatial(#[from] SpatialError),

    #[error("temporal code resolution failed: {0}")]
    Temporal(#[from] TemporalError),

    #[error("output sink failed: {0}")]
    Output(#[source] anyhow::Error),
}
