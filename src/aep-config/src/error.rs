use thiserror::Error;

#[derive(Debug, Clone, Copy)]
pub enum FileEntity {
    File,
    Directory,
}

impl std::fmt::Display for FileEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "File"),
            Self::Directory => write!(f, "Directory"),
        }
    }
}

impl FileEntity {
    pub(crate) fn validate(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let valid = match self {
            Self::File => path.is_file(),
            Self::Directory => path.is_dir(),
        };
        if valid {
            Ok(())
        } else {
            Err(ConfigError::InvalidFileEntity(*self, path.display().to_string()))
        }
    }
}

/// Every way a run configuration can be invalid. `RunConfig::validate`
/// collects every error it finds into a catalogue rather than stopping at
/// the first one, so a user sees every bad path or field in a single pass.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} {1} does not exist")]
    MissingFileEntity(FileEntity, String),

    #[error("{1} is not a {0}")]
    InvalidFileEntity(FileEntity, String),

    #[error("unknown input unit '{0}', expected one of ton, tonne, kg, g, lb")]
    UnknownUnit(String),

    #[error("unknown inventory frequency '{0}', expected one of annual, monthly, cem")]
    UnknownFrequency(String),

    #[error("cannot parse date '{0}', expected YYYY/MM/DD")]
    BadDate(String),

    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: String, end: String },

    #[error("sector list is empty")]
    NoSectors,

    #[error("{0} already exists. Use --overwrite to force.")]
    CannotOverwrite(String),
}
