//! Spreadsheet-like skeleton representation.
//!
//! A tabular skeleton is six named sheets, each a list of rows where the first row holds the
//! column names:
//!
//! |Sheet|Columns|
//! |---|---|
//! |`header`|`CDF NAME`, `DATA ENCODING`, `MAJORITY`, `FORMAT`|
//! |`GLOBALattributes`|`Attribute Name`, `Entry Number`, `Data Type`, `Value`|
//! |`VARIABLEattributes`|`Variable Name`, `Attribute Name`, `Data Type`, `Value`|
//! |`zVariables`|`Variable Name`, `Data Type`, `Number Elements`, `Dims`, `Sizes`, `Record Variance`, `Dimension Variances`|
//! |`Options`|`CDF_COMPRESSION`, `CDF_CHECKSUM`, `Variable Name`, `VAR_COMPRESSION`, `VAR_SPARSERECORDS`, `VAR_PADVALUE`|
//! |`NRV`|`Variable Name`, `Index`, `Value`|
//!
//! Sheets may have additional columns, which are ignored.
mod reader;
mod writer;

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::error::{Error, Result};

pub use reader::TabularReader;
pub use writer::TabularWriter;

pub const HEADER_SHEET: &str = "header";
pub const GLOBAL_ATTRIBUTES_SHEET: &str = "GLOBALattributes";
pub const VARIABLE_ATTRIBUTES_SHEET: &str = "VARIABLEattributes";
pub const ZVARIABLES_SHEET: &str = "zVariables";
pub const OPTIONS_SHEET: &str = "Options";
pub const NRV_SHEET: &str = "NRV";

pub const CDF_NAME: &str = "CDF NAME";
pub const DATA_ENCODING: &str = "DATA ENCODING";
pub const MAJORITY: &str = "MAJORITY";
pub const FORMAT: &str = "FORMAT";
pub const ATTRIBUTE_NAME: &str = "Attribute Name";
pub const ENTRY_NUMBER: &str = "Entry Number";
pub const DATA_TYPE: &str = "Data Type";
pub const VALUE: &str = "Value";
pub const VARIABLE_NAME: &str = "Variable Name";
pub const NUMBER_ELEMENTS: &str = "Number Elements";
pub const DIMS: &str = "Dims";
pub const SIZES: &str = "Sizes";
pub const RECORD_VARIANCE: &str = "Record Variance";
pub const DIMENSION_VARIANCES: &str = "Dimension Variances";
pub const CDF_COMPRESSION: &str = "CDF_COMPRESSION";
pub const CDF_CHECKSUM: &str = "CDF_CHECKSUM";
pub const VAR_COMPRESSION: &str = "VAR_COMPRESSION";
pub const VAR_SPARSERECORDS: &str = "VAR_SPARSERECORDS";
pub const VAR_PADVALUE: &str = "VAR_PADVALUE";
pub const INDEX: &str = "Index";

/// Sheet names with their mandatory columns, in workbook order.
pub const SHEETS: [(&str, &[&str]); 6] = [
    (HEADER_SHEET, &[CDF_NAME, DATA_ENCODING, MAJORITY, FORMAT]),
    (
        GLOBAL_ATTRIBUTES_SHEET,
        &[ATTRIBUTE_NAME, ENTRY_NUMBER, DATA_TYPE, VALUE],
    ),
    (
        VARIABLE_ATTRIBUTES_SHEET,
        &[VARIABLE_NAME, ATTRIBUTE_NAME, DATA_TYPE, VALUE],
    ),
    (
        ZVARIABLES_SHEET,
        &[
            VARIABLE_NAME,
            DATA_TYPE,
            NUMBER_ELEMENTS,
            DIMS,
            SIZES,
            RECORD_VARIANCE,
            DIMENSION_VARIANCES,
        ],
    ),
    (
        OPTIONS_SHEET,
        &[
            CDF_COMPRESSION,
            CDF_CHECKSUM,
            VARIABLE_NAME,
            VAR_COMPRESSION,
            VAR_SPARSERECORDS,
            VAR_PADVALUE,
        ],
    ),
    (NRV_SHEET, &[VARIABLE_NAME, INDEX, VALUE]),
];

/// A sheet row. Empty cells are `None`.
pub type Row = Vec<Option<String>>;

/// Source of sheets for [TabularReader].
///
/// Implement this for any spreadsheet backend. [Workbook] is the in-memory implementation.
pub trait SheetSource {
    /// Rows of sheet `name`, the first being the column names, or `None` if there is no such
    /// sheet.
    fn rows(&self, name: &str) -> Option<Vec<Row>>;
}

/// Options for reading tabular skeletons.
#[derive(Clone, Debug, TypedBuilder)]
pub struct TabularOptions {
    /// Set `VAR_PADVALUE` from the variable data type rather than the options sheet.
    /// See [auto_pad](crate::skeleton::auto_pad).
    #[builder(default)]
    pub auto_pad: bool,
}

impl Default for TabularOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// One sheet of a [Workbook].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sheet {
    pub rows: Vec<Row>,
}

impl Sheet {
    /// Create a sheet with a header row of `columns`.
    #[must_use]
    pub fn new(columns: &[&str]) -> Self {
        Self {
            rows: vec![columns.iter().map(|c| Some((*c).to_string())).collect()],
        }
    }

    /// Append a data row, with empty strings stored as empty cells.
    pub fn push<S: AsRef<str>>(&mut self, row: &[S]) {
        self.rows.push(
            row.iter()
                .map(|c| {
                    let c = c.as_ref();
                    if c.is_empty() {
                        None
                    } else {
                        Some(c.to_string())
                    }
                })
                .collect(),
        );
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory collection of named sheets, persisted as JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workbook {
    sheets: IndexMap<String, Sheet>,
}

impl Workbook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.get_mut(name)
    }

    /// Insert or replace sheet `name`.
    pub fn insert_sheet(&mut self, name: &str, sheet: Sheet) {
        self.sheets.insert(name.to_string(), sheet);
    }

    pub fn remove_sheet(&mut self, name: &str) -> Option<Sheet> {
        self.sheets.shift_remove(name)
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    /// # Errors
    /// If the JSON cannot be read or is not a workbook.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// # Errors
    /// If writing fails.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// # Errors
    /// If the file cannot be opened or is not a workbook.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// # Errors
    /// If the file cannot be created or written.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl SheetSource for Workbook {
    fn rows(&self, name: &str) -> Option<Vec<Row>> {
        self.sheets.get(name).map(|s| s.rows.clone())
    }
}

/// Column-major view of a sheet.
///
/// Empty cells are normalized to "". Fully blank rows are dropped. Column names are trimmed, cells
/// are available both trimmed and verbatim.
#[derive(Debug)]
pub(crate) struct Columns {
    sheet: String,
    columns: IndexMap<String, Vec<String>>,
    len: usize,
}

impl Columns {
    /// Transpose sheet `name` of `source`, checking for the `mandatory` columns.
    pub(crate) fn read<S: SheetSource + ?Sized>(
        source: &S,
        name: &str,
        mandatory: &[&str],
    ) -> Result<Self> {
        let rows = source
            .rows(name)
            .ok_or_else(|| Error::MissingSheet(name.to_string()))?;
        let mut rows = rows.into_iter();
        let names: Vec<String> = rows
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.unwrap_or_default().trim().to_string())
            .collect();
        for column in mandatory {
            if !names.iter().any(|n| n == column) {
                return Err(Error::MissingColumn {
                    sheet: name.to_string(),
                    column: (*column).to_string(),
                });
            }
        }

        let mut columns: IndexMap<String, Vec<String>> = names
            .iter()
            .filter(|n| !n.is_empty())
            .map(|n| (n.clone(), Vec::default()))
            .collect();
        let mut len = 0;
        for row in rows {
            let cells: Vec<String> = row.into_iter().map(Option::unwrap_or_default).collect();
            if cells.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            for (idx, column) in names.iter().enumerate() {
                if let Some(values) = columns.get_mut(column) {
                    values.push(cells.get(idx).cloned().unwrap_or_default());
                }
            }
            len += 1;
        }

        Ok(Self {
            sheet: name.to_string(),
            columns,
            len,
        })
    }

    pub(crate) fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Number of data rows.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Trimmed value of `column` at 0-based data row `row`, or "" if either does not exist.
    pub(crate) fn get(&self, column: &str, row: usize) -> &str {
        self.raw(column, row).trim()
    }

    /// Untrimmed value of `column` at 0-based data row `row`.
    pub(crate) fn raw(&self, column: &str, row: usize) -> &str {
        self.columns
            .get(column)
            .and_then(|values| values.get(row))
            .map_or("", String::as_str)
    }

    /// Indexes of rows where `column` equals `value`.
    pub(crate) fn rows_matching<'a>(
        &'a self,
        column: &'a str,
        value: &'a str,
    ) -> impl Iterator<Item = usize> + 'a {
        (0..self.len).filter(move |row| self.get(column, *row) == value)
    }

    /// Distinct non-empty values of `column` in first-seen order.
    pub(crate) fn unique(&self, column: &str) -> Vec<String> {
        let mut seen: Vec<String> = Vec::default();
        for row in 0..self.len {
            let value = self.get(column, row);
            if !value.is_empty() && !seen.iter().any(|s| s == value) {
                seen.push(value.to_string());
            }
        }
        seen
    }

    pub(crate) fn invalid(&self, row: usize, column: &str, reason: String) -> Error {
        Error::InvalidCell {
            sheet: self.sheet.clone(),
            row: row + 1,
            column: column.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook() -> Workbook {
        let mut sheet = Sheet::new(&["Attribute Name", "Value", ""]);
        sheet.push(&["A", " 1 ", "ignored"]);
        sheet.rows.push(vec![None, None]);
        sheet.push(&["B", "2", ""]);
        sheet.push(&["A", "", ""]);
        let mut wb = Workbook::new();
        wb.insert_sheet("s", sheet);
        wb
    }

    #[test]
    fn columns_transpose() {
        let cols = Columns::read(&workbook(), "s", &["Attribute Name"]).unwrap();

        assert_eq!(cols.len(), 3);
        assert_eq!(cols.get("Value", 0), "1");
        assert_eq!(cols.raw("Value", 0), " 1 ");
        assert_eq!(cols.get("Value", 2), "");
        assert_eq!(cols.get("Nope", 0), "");
        assert_eq!(cols.unique("Attribute Name"), vec!["A", "B"]);
        assert_eq!(
            cols.rows_matching("Attribute Name", "A").collect::<Vec<_>>(),
            vec![0, 2]
        );
    }

    #[test]
    fn missing_sheet() {
        assert!(matches!(
            Columns::read(&workbook(), "x", &[]),
            Err(Error::MissingSheet(name)) if name == "x"
        ));
    }

    #[test]
    fn missing_column() {
        assert!(matches!(
            Columns::read(&workbook(), "s", &["Value", "Data Type"]),
            Err(Error::MissingColumn { column, .. }) if column == "Data Type"
        ));
    }

    #[test]
    fn workbook_json() {
        let wb = workbook();
        let mut buf = Vec::default();
        wb.to_writer(&mut buf).unwrap();

        let decoded = Workbook::from_reader(&buf[..]).unwrap();
        assert_eq!(decoded, wb);
        assert_eq!(decoded.sheet_names().collect::<Vec<_>>(), vec!["s"]);
    }
}
