use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpeciationError {
    #[error("gsref lookup failed for scc={scc} kind={kind:?}: {source}")]
    Gsref {
        scc: String,
        kind: aep_io::read::SpecKind,
        #[source]
        source: aep_io::read::reference::ReferenceError,
    },

    #[error("profile {code} resolved to COMBO but no per-FIPS combo entry exists for pollutant={pollutant} fips={fips} period={period_idx}")]
    MissingComboEntry { code: String, pollutant: String, fips: String, period_idx: u8 },

    #[error("no species rows for profile code {code}")]
    EmptyProfile { code: String },

    #[error("unknown species {0}")]
    UnknownSpecies(#[from] aep_io::read::species_db::SpeciesDbError),

    #[error("explicit SpecNames override named an empty species list")]
    EmptySpecNames,
}
