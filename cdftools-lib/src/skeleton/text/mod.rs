//! CDF skeleton table text format.
//!
//! The format is the one produced by the CDF toolkit `skeletontable` program and consumed by
//! `skeletoncdf`. It is line oriented and split into sections introduced by a marker line:
//!
//! ```text
//! #header
//!                        CDF NAME: example
//!                   DATA ENCODING: NETWORK
//!                        MAJORITY: ROW
//!                          FORMAT: SINGLE
//!
//! ! Variables  G.Attributes  V.Attributes  Records  Dims  Sizes
//! ! ---------  ------------  ------------  -------  ----  -----
//!   0/1          1             1             0/z      0
//!
//! #GLOBALattributes
//!   "Project"             1:    CDF_CHAR        { "ISTP>International" }
//!                         2:    CDF_CHAR        { "RPW" } .
//!
//! #VARIABLEattributes
//!   "CATDESC"
//!
//! #zVariables
//! ! Variable          Data            Number      Record   Dimension
//!   "Epoch"           CDF_TIME_TT2000 1     0            T
//! ! Attribute         Data
//!   "CATDESC"         CDF_CHAR        { "Time tags" } .
//! ! RV values were not requested.
//!
//! #end
//! ```
//!
//! Lines starting with `!` are comments, though some carry options such as
//! `! VAR_PADVALUE: 0.0`. Character values longer than the wrap width are split into quoted
//! chunks joined by ` -` at the end of a line.
mod reader;
mod writer;

use typed_builder::TypedBuilder;

pub use reader::TextReader;
pub use writer::TextWriter;

pub(crate) const HEADER: &str = "#header";
pub(crate) const GLOBAL_ATTRIBUTES: &str = "#GLOBALattributes";
pub(crate) const VARIABLE_ATTRIBUTES: &str = "#VARIABLEattributes";
pub(crate) const VARIABLES: &str = "#variables";
pub(crate) const ZVARIABLES: &str = "#zVariables";
pub(crate) const END: &str = "#end";

/// Options for rendering text skeletons.
#[derive(Clone, Debug, TypedBuilder)]
pub struct TextOptions {
    /// Maximum characters of a global attribute character value per line.
    #[builder(default = 48)]
    pub global_wrap: usize,
    /// Maximum characters of a variable attribute character value per line.
    #[builder(default = 60)]
    pub variable_wrap: usize,
    /// Written in the leading comment of the file.
    #[builder(default = format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")), setter(into))]
    pub generator: String,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Split `value` into chunks of at most `width` characters.
pub(crate) fn wrap(value: &str, width: usize) -> Vec<&str> {
    if width == 0 || value.chars().count() <= width {
        return vec![value];
    }
    let mut chunks = Vec::default();
    let mut start = 0;
    for (count, (idx, _)) in value.char_indices().enumerate() {
        if count > 0 && count % width == 0 {
            chunks.push(&value[start..idx]);
            start = idx;
        }
    }
    chunks.push(&value[start..]);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::{
        dtype::DataType,
        model::{AttributeValue, Header, NrvEntry, Skeleton, ZVariable},
    };

    #[test]
    fn wrap_on_char_boundaries() {
        assert_eq!(wrap("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap("abcd", 4), vec!["abcd"]);
        assert_eq!(wrap("ééééé", 2), vec!["éé", "éé", "é"]);
        assert_eq!(wrap("", 4), vec![""]);
    }

    fn skeleton() -> Skeleton {
        let mut skt = Skeleton::new(Header {
            cdf_name: "solo_L2_rpw-tds".to_string(),
            compression: "GZIP.6".to_string(),
            checksum: "MD5".to_string(),
            ..Header::default()
        });
        skt.add_global_attribute(
            "Project",
            vec![
                AttributeValue::new(DataType::Char, "ISTP>International Solar-Terrestrial Physics"),
                AttributeValue::new(DataType::Char, "RPW"),
            ],
        )
        .unwrap();
        skt.add_global_attribute(
            "TEXT",
            vec![AttributeValue::new(
                DataType::Char,
                "This is a long description that will not fit on a single skeleton line, \
                 so it has to be split into several quoted chunks",
            )],
        )
        .unwrap();
        skt.add_global_attribute(
            "Version",
            vec![AttributeValue::new(DataType::Int4, "1, 2, 3")],
        )
        .unwrap();

        skt.add_zvariable("Epoch", ZVariable::scalar(DataType::TimeTt2000))
            .unwrap();
        let mut b = ZVariable::array(DataType::Float, &[3]);
        b.options.compression = Some("GZIP.6".to_string());
        b.options.sparse_records = Some("sRecords.PAD".to_string());
        b.options.pad_value = Some("-1.0e31".to_string());
        skt.add_zvariable("B", b).unwrap();
        let mut label = ZVariable::array(DataType::Char, &[3]);
        label.num_elements = 2;
        label.record_variance = false;
        label.options.pad_value = Some("\" \"".to_string());
        label.nrv = vec![
            NrvEntry::new(vec![1], "Bx"),
            NrvEntry::new(vec![2], "By"),
            NrvEntry::new(vec![3], "Bz"),
        ];
        skt.add_zvariable("LABEL", label).unwrap();

        let chr = |v: &str| AttributeValue::new(DataType::Char, v);
        skt.add_variable_attribute("CATDESC", chr("Time tags"), Some(&["Epoch"]))
            .unwrap();
        skt.add_variable_attribute(
            "CATDESC",
            chr("Magnetic field vector in the RTN frame, measured by the fluxgate magnetometer"),
            Some(&["B"]),
        )
        .unwrap();
        skt.add_variable_attribute(
            "FILLVAL",
            AttributeValue::new(DataType::Float, "-1.0e31"),
            Some(&["B"]),
        )
        .unwrap();
        skt.declare_variable_attribute("UNITS").unwrap();
        skt
    }

    #[test]
    fn round_trip() {
        let skt = skeleton();
        let text = TextWriter::default().write(&skt).unwrap();
        let decoded = TextReader::new().read(&text).unwrap();

        assert_eq!(decoded, skt);
    }

    #[test]
    fn long_values_are_wrapped() {
        let text = TextWriter::default().write(&skeleton()).unwrap();

        assert!(text.lines().any(|l| l.trim_end().ends_with("\" -")));
        let again = TextWriter::default()
            .write(&TextReader::new().read(&text).unwrap())
            .unwrap();
        assert_eq!(again, text);
    }

    #[test]
    fn narrow_wrap_round_trips() {
        let skt = skeleton();
        let options = TextOptions::builder()
            .global_wrap(5)
            .variable_wrap(7)
            .generator("test")
            .build();
        let text = TextWriter::new(options).write(&skt).unwrap();

        assert!(text.starts_with("! Skeleton table for the \"solo_L2_rpw-tds\" CDF."));
        assert!(text.contains("test"));
        assert_eq!(TextReader::new().read(&text).unwrap(), skt);
    }
}
