use tracing::debug;

use super::*;
use crate::skeleton::{
    dtype::DataType,
    model::{AttributeValue, Header, NrvEntry, Skeleton, VariableOptions, ZVariable},
};

/// Builds a [Skeleton] from a [SheetSource].
#[derive(Clone, Debug, Default)]
pub struct TabularReader {
    options: TabularOptions,
}

/// Column-major views of every skeleton sheet.
struct Tables {
    header: Columns,
    gattrs: Columns,
    vattrs: Columns,
    zvars: Columns,
    options: Columns,
    nrv: Columns,
}

impl TabularReader {
    #[must_use]
    pub fn new(options: TabularOptions) -> Self {
        Self { options }
    }

    /// Read a skeleton from `source`.
    ///
    /// # Errors
    /// [Error::MissingSheet] or [Error::MissingColumn] if the source does not have the
    /// expected layout, [Error::InvalidCell] for cells that cannot be converted, or any
    /// error raised by the [Skeleton] mutation used to add an entity.
    pub fn read<S: SheetSource + ?Sized>(&self, source: &S) -> Result<Skeleton> {
        let read = |idx: usize| {
            let (name, mandatory) = SHEETS[idx];
            Columns::read(source, name, mandatory)
        };
        let tables = Tables {
            header: read(0)?,
            gattrs: read(1)?,
            vattrs: read(2)?,
            zvars: read(3)?,
            options: read(4)?,
            nrv: read(5)?,
        };

        let mut skeleton = Skeleton::new(read_header(&tables)?);
        read_global_attributes(&tables.gattrs, &mut skeleton)?;
        for name in tables.vattrs.unique(ATTRIBUTE_NAME) {
            skeleton.declare_variable_attribute(&name)?;
        }
        for row in 0..tables.zvars.len() {
            let name = tables.zvars.get(VARIABLE_NAME, row);
            if name.is_empty() {
                continue;
            }
            let descriptor = self.read_zvariable(&tables, row)?;
            skeleton.add_zvariable(name, descriptor)?;
            read_variable_attributes(&tables.vattrs, name, &mut skeleton)?;
        }
        check_references(&tables, &skeleton)?;

        debug!(
            nzvar = skeleton.nzvar(),
            ngattr = skeleton.ngattr(),
            nvattr = skeleton.nvattr(),
            "read tabular skeleton"
        );
        Ok(skeleton)
    }

    fn read_zvariable(&self, tables: &Tables, row: usize) -> Result<ZVariable> {
        let zvars = &tables.zvars;
        let name = zvars.get(VARIABLE_NAME, row);
        let data_type = parse_data_type(zvars, row)?;
        let num_elements = parse_number(zvars, NUMBER_ELEMENTS, row)?;
        let dims = parse_number(zvars, DIMS, row)? as usize;
        let sizes = parse_sizes(zvars, row)?;
        let record_variance = match parse_flags(zvars, RECORD_VARIANCE, row)?.as_slice() {
            [flag] => *flag,
            _ => {
                return Err(zvars.invalid(
                    row,
                    RECORD_VARIANCE,
                    "expected a single T or F".to_string(),
                ))
            }
        };
        let dim_variances = parse_flags(zvars, DIMENSION_VARIANCES, row)?;

        let mut options = VariableOptions::default();
        if let Some(opt_row) = tables.options.rows_matching(VARIABLE_NAME, name).next() {
            options.compression = optional(tables.options.get(VAR_COMPRESSION, opt_row));
            options.sparse_records = optional(tables.options.get(VAR_SPARSERECORDS, opt_row));
            options.pad_value = pad_value(tables.options.get(VAR_PADVALUE, opt_row));
        }
        if self.options.auto_pad {
            options.pad_value = data_type.auto_pad().map(str::to_string);
        }

        let mut nrv = Vec::default();
        for nrv_row in tables.nrv.rows_matching(VARIABLE_NAME, name) {
            let index = tables
                .nrv
                .get(INDEX, nrv_row)
                .split(',')
                .map(|s| s.trim().parse::<u32>())
                .collect::<std::result::Result<Vec<u32>, _>>()
                .map_err(|err| tables.nrv.invalid(nrv_row, INDEX, err.to_string()))?;
            nrv.push(NrvEntry::new(index, value_cell(&tables.nrv, data_type, nrv_row)));
        }

        Ok(ZVariable {
            data_type,
            num_elements,
            dims,
            sizes,
            record_variance,
            dim_variances,
            options,
            nrv,
        })
    }
}

fn read_header(tables: &Tables) -> Result<Header> {
    let header = &tables.header;
    if header.len() == 0 {
        return Err(Error::EmptySheet(header.sheet().to_string()));
    }
    let defaults = Header::default();
    let option = |column: &str, default: String| {
        if tables.options.len() == 0 {
            return default;
        }
        optional(tables.options.get(column, 0)).unwrap_or(default)
    };
    Ok(Header {
        cdf_name: header.get(CDF_NAME, 0).to_string(),
        data_encoding: optional(header.get(DATA_ENCODING, 0)).unwrap_or(defaults.data_encoding),
        majority: optional(header.get(MAJORITY, 0)).unwrap_or(defaults.majority),
        format: optional(header.get(FORMAT, 0)).unwrap_or(defaults.format),
        compression: option(CDF_COMPRESSION, defaults.compression),
        checksum: option(CDF_CHECKSUM, defaults.checksum),
    })
}

fn read_global_attributes(gattrs: &Columns, skeleton: &mut Skeleton) -> Result<()> {
    for name in gattrs.unique(ATTRIBUTE_NAME) {
        let mut entries = Vec::default();
        for (idx, row) in gattrs.rows_matching(ATTRIBUTE_NAME, &name).enumerate() {
            let number = gattrs.get(ENTRY_NUMBER, row);
            if !number.is_empty() && number.parse::<usize>().ok() != Some(idx + 1) {
                return Err(gattrs.invalid(
                    row,
                    ENTRY_NUMBER,
                    format!("expected entry {} of {name:?}, got {number:?}", idx + 1),
                ));
            }
            let data_type = parse_data_type(gattrs, row)?;
            entries.push(AttributeValue::new(
                data_type,
                value_cell(gattrs, data_type, row),
            ));
        }
        skeleton.add_global_attribute(&name, entries)?;
    }
    Ok(())
}

fn read_variable_attributes(vattrs: &Columns, variable: &str, skeleton: &mut Skeleton) -> Result<()> {
    for row in vattrs.rows_matching(VARIABLE_NAME, variable) {
        let name = vattrs.get(ATTRIBUTE_NAME, row);
        if name.is_empty() {
            return Err(vattrs.invalid(row, ATTRIBUTE_NAME, "missing attribute name".to_string()));
        }
        let data_type = parse_data_type(vattrs, row)?;
        let value = AttributeValue::new(data_type, value_cell(vattrs, data_type, row));
        skeleton.add_variable_attribute(name, value, Some(&[variable]))?;
    }
    Ok(())
}

/// Rows referring to variables that are not in the zVariables sheet would otherwise be
/// dropped.
fn check_references(tables: &Tables, skeleton: &Skeleton) -> Result<()> {
    for table in [&tables.vattrs, &tables.options, &tables.nrv] {
        for row in 0..table.len() {
            let name = table.get(VARIABLE_NAME, row);
            if !name.is_empty() && skeleton.zvariable(name).is_none() {
                return Err(table.invalid(
                    row,
                    VARIABLE_NAME,
                    format!("unknown zVariable {name:?}"),
                ));
            }
        }
    }
    Ok(())
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// "None" is the legacy marker for a pad value with no rule.
fn pad_value(value: &str) -> Option<String> {
    optional(value).filter(|v| v != "None")
}

/// Character values are kept verbatim, blanks included.
fn value_cell(cols: &Columns, data_type: DataType, row: usize) -> &str {
    if data_type.is_char() {
        cols.raw(VALUE, row)
    } else {
        cols.get(VALUE, row)
    }
}

fn parse_data_type(cols: &Columns, row: usize) -> Result<DataType> {
    cols.get(DATA_TYPE, row)
        .parse()
        .map_err(|err: Error| cols.invalid(row, DATA_TYPE, err.to_string()))
}

fn parse_number(cols: &Columns, column: &str, row: usize) -> Result<u32> {
    let value = cols.get(column, row);
    value
        .parse::<u32>()
        .map_err(|err| cols.invalid(row, column, format!("{value:?}: {err}")))
}

/// Dimension sizes separated by whitespace or commas, optionally in brackets.
fn parse_sizes(cols: &Columns, row: usize) -> Result<Vec<u32>> {
    cols.get(SIZES, row)
        .trim_matches(|c| c == '[' || c == ']')
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|err| cols.invalid(row, SIZES, format!("{s:?}: {err}")))
        })
        .collect()
}

/// T/F flags, either separated or run together, e.g., "T T", "T,F" or "TF".
fn parse_flags(cols: &Columns, column: &str, row: usize) -> Result<Vec<bool>> {
    cols.get(column, row)
        .chars()
        .filter(|c| !(c.is_whitespace() || *c == ','))
        .map(|c| match c.to_ascii_uppercase() {
            'T' => Ok(true),
            'F' => Ok(false),
            other => Err(cols.invalid(row, column, format!("invalid flag {other:?}"))),
        })
        .collect()
}
