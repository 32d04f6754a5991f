#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Structural problem with a skeleton text file.
    #[error("Invalid skeleton file at line {line} in {section} section: {reason}")]
    InvalidFile {
        line: usize,
        section: String,
        reason: String,
    },

    #[error("Missing sheet {0:?}")]
    MissingSheet(String),
    #[error("Sheet {sheet:?} is missing column {column:?}")]
    MissingColumn { sheet: String, column: String },
    #[error("Sheet {0:?} has no data rows")]
    EmptySheet(String),
    /// Cell content could not be converted. `row` is the 1-based data row.
    #[error("Invalid value in sheet {sheet:?} row {row} column {column:?}: {reason}")]
    InvalidCell {
        sheet: String,
        row: usize,
        column: String,
        reason: String,
    },

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),
    #[error("Invalid descriptor for zVariable {variable:?}: {reason}")]
    InvalidDescriptor { variable: String, reason: String },

    #[error("Attribute {0:?} already exists")]
    DuplicateAttribute(String),
    #[error("zVariable {0:?} already exists")]
    DuplicateVariable(String),
    #[error("Unknown attribute {0:?}")]
    UnknownAttribute(String),
    #[error("Unknown zVariable {0:?}")]
    UnknownVariable(String),
    #[error("Attribute {attribute:?} has no entry {entry}")]
    UnknownEntry { attribute: String, entry: u32 },
    #[error("Unknown CDF data type {0:?}")]
    UnknownDataType(String),

    #[error("Failed to render skeleton: {0}")]
    Render(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
