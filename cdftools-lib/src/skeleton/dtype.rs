//! CDF data types.
use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::Error;

/// CDF data types supported in skeleton tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "CDF_BYTE")]
    Byte,
    #[serde(rename = "CDF_CHAR")]
    Char,
    #[serde(rename = "CDF_UCHAR")]
    UChar,
    #[serde(rename = "CDF_INT1")]
    Int1,
    #[serde(rename = "CDF_UINT1")]
    UInt1,
    #[serde(rename = "CDF_INT2")]
    Int2,
    #[serde(rename = "CDF_UINT2")]
    UInt2,
    #[serde(rename = "CDF_INT4")]
    Int4,
    #[serde(rename = "CDF_UINT4")]
    UInt4,
    #[serde(rename = "CDF_INT8")]
    Int8,
    #[serde(rename = "CDF_FLOAT")]
    Float,
    #[serde(rename = "CDF_REAL4")]
    Real4,
    #[serde(rename = "CDF_DOUBLE")]
    Double,
    #[serde(rename = "CDF_REAL8")]
    Real8,
    #[serde(rename = "CDF_EPOCH")]
    Epoch,
    #[serde(rename = "CDF_EPOCH16")]
    Epoch16,
    #[serde(rename = "CDF_TIME_TT2000")]
    TimeTt2000,
}

impl DataType {
    pub const ALL: [DataType; 17] = [
        DataType::Byte,
        DataType::Char,
        DataType::UChar,
        DataType::Int1,
        DataType::UInt1,
        DataType::Int2,
        DataType::UInt2,
        DataType::Int4,
        DataType::UInt4,
        DataType::Int8,
        DataType::Float,
        DataType::Real4,
        DataType::Double,
        DataType::Real8,
        DataType::Epoch,
        DataType::Epoch16,
        DataType::TimeTt2000,
    ];

    /// Skeleton table name, e.g., `CDF_INT4`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Byte => "CDF_BYTE",
            DataType::Char => "CDF_CHAR",
            DataType::UChar => "CDF_UCHAR",
            DataType::Int1 => "CDF_INT1",
            DataType::UInt1 => "CDF_UINT1",
            DataType::Int2 => "CDF_INT2",
            DataType::UInt2 => "CDF_UINT2",
            DataType::Int4 => "CDF_INT4",
            DataType::UInt4 => "CDF_UINT4",
            DataType::Int8 => "CDF_INT8",
            DataType::Float => "CDF_FLOAT",
            DataType::Real4 => "CDF_REAL4",
            DataType::Double => "CDF_DOUBLE",
            DataType::Real8 => "CDF_REAL8",
            DataType::Epoch => "CDF_EPOCH",
            DataType::Epoch16 => "CDF_EPOCH16",
            DataType::TimeTt2000 => "CDF_TIME_TT2000",
        }
    }

    #[must_use]
    pub fn category(&self) -> Category {
        Category::of(self.name())
    }

    /// True for the character types whose values are quoted strings.
    #[must_use]
    pub fn is_char(&self) -> bool {
        self.category() == Category::Char
    }

    /// Number of bytes of one element.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            DataType::Byte
            | DataType::Char
            | DataType::UChar
            | DataType::Int1
            | DataType::UInt1 => 1,
            DataType::Int2 | DataType::UInt2 => 2,
            DataType::Int4 | DataType::UInt4 | DataType::Float | DataType::Real4 => 4,
            DataType::Int8
            | DataType::Double
            | DataType::Real8
            | DataType::Epoch
            | DataType::TimeTt2000 => 8,
            DataType::Epoch16 => 16,
        }
    }

    /// Default pad value for this type. See [auto_pad].
    #[must_use]
    pub fn auto_pad(&self) -> Option<&'static str> {
        auto_pad(self.name())
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = Error;

    /// Parse a data type name, case-insensitive, with or without the `CDF_` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        let name = if upper.starts_with("CDF_") {
            upper
        } else {
            format!("CDF_{upper}")
        };
        DataType::ALL
            .iter()
            .find(|dt| dt.name() == name)
            .copied()
            .ok_or_else(|| Error::UnknownDataType(s.to_string()))
    }
}

/// Broad classification of a data type name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Category {
    Epoch,
    Tt2000,
    Integer,
    Float,
    Char,
    Unknown,
}

impl Category {
    /// Classify a free-form data type name by case-insensitive substring, checked in order
    /// EPOCH, TT2000, INT/BYTE, FLOAT/REAL/DOUBLE, CHAR.
    #[must_use]
    pub fn of(dtype: &str) -> Category {
        let upper = dtype.to_uppercase();
        if upper.contains("EPOCH") {
            Category::Epoch
        } else if upper.contains("TT2000") {
            Category::Tt2000
        } else if upper.contains("INT") || upper.contains("BYTE") {
            Category::Integer
        } else if ["FLOAT", "REAL", "DOUBLE"].iter().any(|s| upper.contains(s)) {
            Category::Float
        } else if upper.contains("CHAR") {
            Category::Char
        } else {
            Category::Unknown
        }
    }
}

/// Default pad value for a data type name, or `None` if there is no rule for the type.
///
/// ```
/// use cdftools::skeleton::auto_pad;
///
/// assert_eq!(auto_pad("CDF_INT4"), Some("0"));
/// assert_eq!(auto_pad("cdf_uchar"), Some("\" \""));
/// assert_eq!(auto_pad("CDF_UNKNOWN"), None);
/// ```
#[must_use]
pub fn auto_pad(dtype: &str) -> Option<&'static str> {
    match Category::of(dtype) {
        Category::Epoch => Some("01-Jan-0000 00:00:00.000"),
        Category::Tt2000 => Some("0000-01-01T00:00:00.000000000"),
        Category::Integer => Some("0"),
        Category::Float => Some("0.0"),
        Category::Char => Some("\" \""),
        Category::Unknown => None,
    }
}
