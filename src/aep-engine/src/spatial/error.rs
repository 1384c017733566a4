use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SpatialError {
    #[error("no gridding-reference surrogate id for scc={scc} fips={fips}")]
    NoSurrogateId { scc: String, fips: String },

    #[error("no area geometry available for fips={fips}")]
    MissingGeometry { fips: String },

    #[error("area geometry for fips={fips} has zero bounding-rect area")]
    EmptyAreaGeometry { fips: String },
}
