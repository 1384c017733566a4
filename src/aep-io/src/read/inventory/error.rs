use thiserror::Error;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("inventory file has no header (no lines starting with '#')")]
    MissingHeader,

    #[error("header declares no dialect keyword (expected one of #ORL, #IDA, #FF10)")]
    MissingDialect,

    #[error("#POLID/#DATA lists {0} pollutants, which is ambiguous for IDA length detection (must be < 10)")]
    AmbiguousPollutantCount(usize),

    #[error("IDA data line length {len} doesn't match point (249+52P), area (15+47P) or mobile (25+20P) for P={pollutants}")]
    UnrecognizedIdaLength { len: usize, pollutants: usize },

    #[error("record line {line_no} is too short to hold its declared fields: '{line}'")]
    LineTooShort { line_no: usize, line: String },

    #[error("unparseable numeric field on line {line_no}: '{field}'")]
    BadNumericField { line_no: usize, field: String },

    #[error(transparent)]
    Fips(#[from] aep_domain::fips::FipsError),

    #[error(transparent)]
    Scc(#[from] aep_domain::scc::SccError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
