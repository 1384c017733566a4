use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemporalError {
    #[error("tref lookup failed for scc={scc} fips={fips}: {source}")]
    Tref { scc: String, fips: String, #[source] source: aep_io::read::reference::ReferenceError },

    #[error("temporal profile resolution failed: {0}")]
    Profile(#[from] aep_io::read::TemporalProfileError),
}
