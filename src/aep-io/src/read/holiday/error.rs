use thiserror::Error;

#[derive(Error, Debug)]
pub enum HolidayError {
    #[error("holiday line {0} is shorter than 19 characters")]
    LineTooShort(usize),

    #[error("holiday line {line_no} has an unparseable date: '{date}'")]
    BadDate { line_no: usize, date: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
