#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The p-field selects a format that is valid but not decodable without outside context.
    #[error("Unsupported time code format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid time code id {id} in p-field {pfield:#04x}")]
    InvalidTimeCode { pfield: u16, id: u8 },

    #[error("Time field has {actual} bytes; p-field declares {expected}")]
    FieldLengthMismatch { expected: usize, actual: usize },

    /// A calendar segmented field is out of range, e.g., month 13.
    #[error("Invalid calendar value: {0}")]
    InvalidCalendar(String),
}

pub type Result<T> = std::result::Result<T, Error>;
