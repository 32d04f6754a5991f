use tracing::debug;

use super::*;
use crate::skeleton::model::Skeleton;

/// Renders a [Skeleton] as the sheets of a [Workbook].
#[derive(Clone, Debug, Default)]
pub struct TabularWriter;

fn flag(value: bool) -> &'static str {
    if value {
        "T"
    } else {
        "F"
    }
}

fn join<T: ToString>(values: &[T], sep: &str) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}

impl TabularWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Create a workbook holding only the skeleton sheets.
    #[must_use]
    pub fn write(&self, skeleton: &Skeleton) -> Workbook {
        let mut workbook = Workbook::new();
        self.update(skeleton, &mut workbook);
        workbook
    }

    /// Replace the skeleton sheets of `workbook`, leaving any other sheet alone.
    pub fn update(&self, skeleton: &Skeleton, workbook: &mut Workbook) {
        let mut sheets: Vec<Sheet> = SHEETS.iter().map(|(_, cols)| Sheet::new(cols)).collect();

        let header = &skeleton.header;
        sheets[0].push(&[
            header.cdf_name.as_str(),
            header.data_encoding.as_str(),
            header.majority.as_str(),
            header.format.as_str(),
        ]);

        for entries in skeleton.global_attributes().values() {
            for entry in entries {
                sheets[1].push(&[
                    entry.attribute.as_str(),
                    entry.number.to_string().as_str(),
                    entry.data_type.name(),
                    entry.value.as_str(),
                ]);
            }
        }

        // Declarations come first so the reader sees the names in declaration order
        for attr in skeleton.variable_attribute_names() {
            sheets[2].push(&["", attr.as_str(), "", ""]);
        }
        for name in skeleton.zvariables().keys() {
            let Some(attrs) = skeleton.variable_attributes(name) else {
                continue;
            };
            for (attr, value) in attrs {
                sheets[2].push(&[
                    name.as_str(),
                    attr.as_str(),
                    value.data_type.name(),
                    value.value.as_str(),
                ]);
            }
        }

        for (idx, (name, var)) in skeleton.zvariables().iter().enumerate() {
            let dim_variances: Vec<&str> = var.dim_variances.iter().map(|v| flag(*v)).collect();
            sheets[3].push(&[
                name.as_str(),
                var.data_type.name(),
                var.num_elements.to_string().as_str(),
                var.dims.to_string().as_str(),
                join(&var.sizes, " ").as_str(),
                flag(var.record_variance),
                dim_variances.join(" ").as_str(),
            ]);

            let (compression, checksum) = if idx == 0 {
                (header.compression.as_str(), header.checksum.as_str())
            } else {
                ("", "")
            };
            let opts = &var.options;
            sheets[4].push(&[
                compression,
                checksum,
                name.as_str(),
                opts.compression.as_deref().unwrap_or_default(),
                opts.sparse_records.as_deref().unwrap_or_default(),
                opts.pad_value.as_deref().unwrap_or_default(),
            ]);

            for entry in &var.nrv {
                sheets[5].push(&[
                    name.as_str(),
                    join(&entry.index, ",").as_str(),
                    entry.value.as_str(),
                ]);
            }
        }
        if skeleton.nzvar() == 0 {
            sheets[4].push(&[
                header.compression.as_str(),
                header.checksum.as_str(),
                "",
                "",
                "",
                "",
            ]);
        }

        for ((name, _), sheet) in SHEETS.iter().zip(sheets) {
            workbook.insert_sheet(name, sheet);
        }
        debug!(sheets = SHEETS.len(), "wrote tabular skeleton");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::{
        dtype::DataType,
        model::{AttributeValue, Header, NrvEntry, ZVariable},
        tabular::TabularReader,
    };

    fn skeleton() -> Skeleton {
        let mut skt = Skeleton::new(Header {
            cdf_name: "roundtrip".to_string(),
            compression: "GZIP.6".to_string(),
            ..Header::default()
        });
        skt.add_global_attribute(
            "Project",
            vec![
                AttributeValue::new(DataType::Char, "ISTP>International"),
                AttributeValue::new(DataType::Char, "RPW"),
            ],
        )
        .unwrap();
        skt.add_zvariable("Epoch", ZVariable::scalar(DataType::TimeTt2000))
            .unwrap();
        let mut label = ZVariable::array(DataType::Char, &[3]);
        label.num_elements = 2;
        label.record_variance = false;
        label.nrv = vec![
            NrvEntry::new(vec![1], "Bx"),
            NrvEntry::new(vec![2], "By"),
            NrvEntry::new(vec![3], "Bz"),
        ];
        label.options.pad_value = Some("\" \"".to_string());
        skt.add_zvariable("LABEL", label).unwrap();
        skt.add_variable_attribute(
            "CATDESC",
            AttributeValue::new(DataType::Char, "Time tags"),
            Some(&["Epoch"]),
        )
        .unwrap();
        skt.declare_variable_attribute("UNITS").unwrap();
        skt
    }

    #[test]
    fn write() {
        let wb = TabularWriter::new().write(&skeleton());

        let names: Vec<&str> = wb.sheet_names().collect();
        assert_eq!(names, SHEETS.iter().map(|(n, _)| *n).collect::<Vec<_>>());
        assert_eq!(wb.sheet(GLOBAL_ATTRIBUTES_SHEET).unwrap().len(), 2);
        assert_eq!(wb.sheet(NRV_SHEET).unwrap().len(), 3);

        let vattrs = wb.sheet(VARIABLE_ATTRIBUTES_SHEET).unwrap();
        assert_eq!(vattrs.rows[1], vec![None, Some("CATDESC".to_string()), None, None]);
        assert_eq!(vattrs.rows[2], vec![None, Some("UNITS".to_string()), None, None]);
        assert_eq!(vattrs.rows[3][0].as_deref(), Some("Epoch"));

        let options = wb.sheet(OPTIONS_SHEET).unwrap();
        assert_eq!(options.rows[1][0].as_deref(), Some("GZIP.6"));
        assert_eq!(options.rows[2][0], None);
    }

    #[test]
    fn round_trip() {
        let skt = skeleton();
        let wb = TabularWriter::new().write(&skt);
        let decoded = TabularReader::default().read(&wb).unwrap();

        assert_eq!(decoded, skt);
    }

    #[test]
    fn declaration_order_survives() {
        let mut skt = Skeleton::default();
        skt.add_zvariable("Epoch", ZVariable::scalar(DataType::TimeTt2000))
            .unwrap();
        skt.declare_variable_attribute("UNITS").unwrap();
        skt.add_variable_attribute(
            "CATDESC",
            AttributeValue::new(DataType::Char, "Time tags"),
            Some(&["Epoch"]),
        )
        .unwrap();

        let decoded = TabularReader::default()
            .read(&TabularWriter::new().write(&skt))
            .unwrap();

        let names: Vec<&String> = decoded.variable_attribute_names().iter().collect();
        assert_eq!(names, vec!["UNITS", "CATDESC"]);
        assert_eq!(decoded.to_text().unwrap(), skt.to_text().unwrap());
    }

    #[test]
    fn update_keeps_other_sheets() {
        let mut wb = Workbook::new();
        let mut notes = Sheet::new(&["Note"]);
        notes.push(&["keep me"]);
        wb.insert_sheet("Notes", notes.clone());
        wb.insert_sheet(NRV_SHEET, Sheet::new(&["stale"]));

        TabularWriter::new().update(&skeleton(), &mut wb);

        assert_eq!(wb.sheet("Notes"), Some(&notes));
        assert_eq!(wb.sheet(NRV_SHEET).unwrap().rows[0][0].as_deref(), Some(VARIABLE_NAME));
        assert_eq!(wb.sheet_names().count(), 7);
    }

    #[test]
    fn empty_skeleton_keeps_cdf_options() {
        let skt = Skeleton::new(Header::default());
        let wb = TabularWriter::new().write(&skt);
        let decoded = TabularReader::default().read(&wb).unwrap();
        assert_eq!(decoded.header, skt.header);
    }
}
