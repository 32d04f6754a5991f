//! CDF skeleton model and its tabular and text representations.
//!
//! A [Skeleton] describes the structure of a CDF file: header, global attributes, variable
//! attributes and zVariables. It can be read from and written to
//!  * a [Workbook] of six sheets, see [tabular], persisted as JSON
//!  * the skeleton table text format used by the CDF toolkit, see [text]
//!
//! # Examples
//! ```
//! use cdftools::skeleton::{AttributeValue, DataType, Skeleton, ZVariable};
//!
//! let mut skt = Skeleton::default();
//! skt.add_global_attribute("Project", vec![AttributeValue::new(DataType::Char, "ISTP")])
//!     .unwrap();
//! skt.add_zvariable("Epoch", ZVariable::scalar(DataType::TimeTt2000)).unwrap();
//!
//! let text = skt.to_text().unwrap();
//! assert_eq!(Skeleton::from_text(&text).unwrap(), skt);
//! ```
mod dtype;
mod error;
mod model;
pub mod tabular;
pub mod text;

use std::{fs, path::Path};

use tracing::debug;

pub use dtype::{auto_pad, Category, DataType};
pub use error::{Error, Result};
pub use model::{
    AttributeValue, EntryUpdate, GlobalEntry, Header, NrvEntry, Skeleton, VariableOptions,
    ZVariable,
};
pub use tabular::{Sheet, SheetSource, TabularOptions, TabularReader, TabularWriter, Workbook};
pub use text::{TextOptions, TextReader, TextWriter};

impl Skeleton {
    /// Read a skeleton from the sheets of `source`.
    ///
    /// # Errors
    /// See [TabularReader::read].
    pub fn from_tabular<S: SheetSource + ?Sized>(source: &S, options: TabularOptions) -> Result<Self> {
        TabularReader::new(options).read(source)
    }

    /// Read a skeleton from a JSON workbook file.
    ///
    /// # Errors
    /// If the file cannot be read or is not a valid tabular skeleton.
    pub fn from_tabular_file<P: AsRef<Path>>(path: P, options: TabularOptions) -> Result<Self> {
        let path = path.as_ref();
        debug!(?path, "reading tabular skeleton");
        Self::from_tabular(&Workbook::from_file(path)?, options)
    }

    /// Read a skeleton from skeleton table text.
    ///
    /// # Errors
    /// See [TextReader::read].
    pub fn from_text(text: &str) -> Result<Self> {
        TextReader::new().read(text)
    }

    /// # Errors
    /// If the file cannot be read or is not a valid skeleton table.
    pub fn from_text_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(?path, "reading text skeleton");
        Self::from_text(&fs::read_to_string(path)?)
    }

    /// Render as a new [Workbook].
    #[must_use]
    pub fn to_tabular(&self) -> Workbook {
        TabularWriter::new().write(self)
    }

    /// Replace the skeleton sheets of an existing workbook.
    pub fn update_tabular(&self, workbook: &mut Workbook) {
        TabularWriter::new().update(self, workbook);
    }

    /// Write to a JSON workbook file. When the file exists its non-skeleton sheets are kept.
    ///
    /// # Errors
    /// If the existing file is not a workbook or writing fails.
    pub fn write_tabular_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut workbook = if path.exists() {
            Workbook::from_file(path)?
        } else {
            Workbook::new()
        };
        self.update_tabular(&mut workbook);
        debug!(?path, "writing tabular skeleton");
        workbook.to_file(path)
    }

    /// Render as skeleton table text with default [TextOptions].
    ///
    /// # Errors
    /// [Error::Render]
    pub fn to_text(&self) -> Result<String> {
        self.to_text_with(TextOptions::default())
    }

    /// # Errors
    /// [Error::Render]
    pub fn to_text_with(&self, options: TextOptions) -> Result<String> {
        TextWriter::new(options).write(self)
    }

    /// # Errors
    /// If rendering or writing fails.
    pub fn write_text_file<P: AsRef<Path>>(&self, path: P, options: TextOptions) -> Result<()> {
        let path = path.as_ref();
        debug!(?path, "writing text skeleton");
        fs::write(path, self.to_text_with(options)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skeleton() -> Skeleton {
        let mut skt = Skeleton::new(Header {
            cdf_name: "facade".to_string(),
            ..Header::default()
        });
        skt.add_global_attribute(
            "Mission_group",
            vec![AttributeValue::new(DataType::Char, "Solar Orbiter")],
        )
        .unwrap();
        skt.add_zvariable("Epoch", ZVariable::scalar(DataType::TimeTt2000))
            .unwrap();
        skt.add_variable_attribute(
            "VALIDMIN",
            AttributeValue::new(DataType::TimeTt2000, "2020-01-01T00:00:00.000000000"),
            Some(&["Epoch"]),
        )
        .unwrap();
        skt
    }

    #[test]
    fn text_to_tabular() {
        let skt = skeleton();
        let from_text = Skeleton::from_text(&skt.to_text().unwrap()).unwrap();
        let from_tabular =
            Skeleton::from_tabular(&from_text.to_tabular(), TabularOptions::default()).unwrap();

        assert_eq!(from_tabular, skt);
    }

    #[test]
    fn blank_char_values_survive_conversion() {
        let mut skt = skeleton();
        skt.add_global_attribute("Note", vec![AttributeValue::new(DataType::Char, "  x ")])
            .unwrap();
        skt.add_zvariable("LABEL", ZVariable::array(DataType::Char, &[3]))
            .unwrap();
        skt.add_variable_attribute(
            "FILLVAL",
            AttributeValue::new(DataType::Char, " "),
            Some(&["LABEL"]),
        )
        .unwrap();
        let text = skt.to_text().unwrap();

        let from_text = Skeleton::from_text(&text).unwrap();
        let from_tabular =
            Skeleton::from_tabular(&from_text.to_tabular(), TabularOptions::default()).unwrap();

        assert_eq!(from_tabular.global_attribute("Note").unwrap()[0].value, "  x ");
        assert_eq!(from_tabular.variable_attribute("LABEL", "FILLVAL").unwrap().value, " ");
        assert_eq!(from_tabular.to_text().unwrap(), text);
    }

    #[test]
    fn tabular_file_keeps_other_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skeleton.json");
        let mut wb = Workbook::new();
        let mut notes = Sheet::new(&["Note"]);
        notes.push(&["hello"]);
        wb.insert_sheet("Notes", notes);
        wb.to_file(&path).unwrap();

        skeleton().write_tabular_file(&path).unwrap();

        let wb = Workbook::from_file(&path).unwrap();
        assert!(wb.sheet("Notes").is_some());
        assert_eq!(
            Skeleton::from_tabular_file(&path, TabularOptions::default()).unwrap(),
            skeleton()
        );
    }

    #[test]
    fn text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skeleton.skt");

        skeleton()
            .write_text_file(&path, TextOptions::default())
            .unwrap();

        assert_eq!(Skeleton::from_text_file(&path).unwrap(), skeleton());
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Skeleton::from_text_file("/does/not/exist.skt"),
            Err(Error::Io(_))
        ));
    }
}
