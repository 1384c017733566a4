use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeciesDbError {
    #[error("malformed {table} line {line_no}: '{line}'")]
    MalformedLine { table: &'static str, line_no: usize, line: String },

    #[error("species properties table has no header row")]
    MissingHeader,

    #[error("no properties found for species id '{0}'")]
    UnknownSpecies(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
