use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("malformed gsref line {line_no}: '{line}'")]
    MalformedGsref { line_no: usize, line: String },

    #[error("malformed tref line {line_no}: '{line}'")]
    MalformedTref { line_no: usize, line: String },

    #[error("malformed combo line {line_no}: '{line}'")]
    MalformedCombo { line_no: usize, line: String },

    #[error("unknown speciation kind '{0}', expected one of VOC, NOX, PM2.5")]
    UnknownSpecKind(String),

    #[error("no default: no gsref match for SCC {0}, even after full generalization")]
    NoGsrefMatch(String),

    #[error("no default: no tref match for SCC {scc} / FIPS {fips}, even after full generalization")]
    NoTrefMatch { scc: String, fips: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
