use handlebars::{no_escape, Handlebars};
use serde::Serialize;
use tracing::debug;

use super::{wrap, TextOptions};
use crate::skeleton::{
    dtype::DataType,
    error::{Error, Result},
    model::{Skeleton, ZVariable},
};

const TEMPLATE: &str = r#"! Skeleton table for the "{{ cdf_name }}" CDF.
! Generated by {{ generator }}

#header

                       CDF NAME: {{ cdf_name }}
                  DATA ENCODING: {{ data_encoding }}
                       MAJORITY: {{ majority }}
                         FORMAT: {{ format }}

! Variables  G.Attributes  V.Attributes  Records  Dims  Sizes
! ---------  ------------  ------------  -------  ----  -----
  0/{{ nzvar }}          {{ ngattr }}             {{ nvattr }}             0/z      0

! CDF_COMPRESSION: {{ compression }}
! (Valid operands: None, RLE.0, HUFF.0, AHUFF.0, GZIP.1-9)

! CDF_CHECKSUM: {{ checksum }}
! (Valid operands: None, MD5)

#GLOBALattributes

! Attribute           Entry       Data
! Name                Number      Type            Value
! ---------           ------      ----            -----
{{ global_attributes }}
#VARIABLEattributes

{{ variable_attributes }}
#variables

! No rVariables.

#zVariables
{{ zvariables }}
#end
"#;

const VARIABLE_COMMENT: &str = "\
! Variable           Data             Number     Dims   Sizes   Record     Dimension
! Name               Type             Elements                  Variance   Variances
! --------           ----             --------   ----   -----   --------   ---------
";

const ATTRIBUTE_COMMENT: &str = "\
! Attribute          Data
! Name               Type             Value
! --------           ----             -----
";

#[derive(Serialize)]
struct Document<'a> {
    generator: &'a str,
    cdf_name: &'a str,
    data_encoding: &'a str,
    majority: &'a str,
    format: &'a str,
    compression: &'a str,
    checksum: &'a str,
    nzvar: usize,
    ngattr: usize,
    nvattr: usize,
    global_attributes: String,
    variable_attributes: String,
    zvariables: String,
}

/// Renders a [Skeleton] as skeleton table text.
#[derive(Clone, Debug, Default)]
pub struct TextWriter {
    options: TextOptions,
}

/// Render the `{ ... }` block of a value. Character values are quoted and split into chunks of
/// `width` characters on lines indented by `indent`.
fn value_block(data_type: DataType, value: &str, width: usize, indent: usize) -> String {
    if !data_type.is_char() {
        return format!("{{ {value} }}");
    }
    let sep = format!(" -\n{}", " ".repeat(indent + 2));
    let chunks: Vec<String> = wrap(value, width)
        .into_iter()
        .map(|chunk| format!("\"{chunk}\""))
        .collect();
    format!("{{ {} }}", chunks.join(&sep))
}

fn flag(value: bool) -> &'static str {
    if value {
        "T"
    } else {
        "F"
    }
}

impl TextWriter {
    #[must_use]
    pub fn new(options: TextOptions) -> Self {
        Self { options }
    }

    /// Render `skeleton` as skeleton table text.
    ///
    /// # Errors
    /// [Error::Render] if the document template fails to render.
    pub fn write(&self, skeleton: &Skeleton) -> Result<String> {
        let header = &skeleton.header;
        let doc = Document {
            generator: &self.options.generator,
            cdf_name: &header.cdf_name,
            data_encoding: &header.data_encoding,
            majority: &header.majority,
            format: &header.format,
            compression: &header.compression,
            checksum: &header.checksum,
            nzvar: skeleton.nzvar(),
            ngattr: skeleton.ngattr(),
            nvattr: skeleton.nvattr(),
            global_attributes: self.global_attributes(skeleton),
            variable_attributes: skeleton
                .variable_attribute_names()
                .iter()
                .map(|name| format!("  \"{name}\"\n"))
                .collect(),
            zvariables: self.zvariables(skeleton),
        };

        let mut hb = Handlebars::new();
        hb.register_escape_fn(no_escape);
        hb.set_strict_mode(true);
        hb.register_template_string("skeleton", TEMPLATE)
            .map_err(|err| Error::Render(err.to_string()))?;
        let text = hb
            .render("skeleton", &doc)
            .map_err(|err| Error::Render(err.to_string()))?;
        debug!(bytes = text.len(), "rendered text skeleton");
        Ok(text)
    }

    fn global_attributes(&self, skeleton: &Skeleton) -> String {
        let mut out = String::new();
        for (name, entries) in skeleton.global_attributes() {
            out.push('\n');
            for (idx, entry) in entries.iter().enumerate() {
                let label = if idx == 0 {
                    format!("\"{name}\"")
                } else {
                    String::new()
                };
                let prefix = format!(
                    "  {label:<20} {:>3}:    {:<15} ",
                    entry.number,
                    entry.data_type.name()
                );
                let block = value_block(
                    entry.data_type,
                    &entry.value,
                    self.options.global_wrap,
                    prefix.chars().count(),
                );
                let end = if idx + 1 == entries.len() { " ." } else { "" };
                out.push_str(&format!("{prefix}{block}{end}\n"));
            }
        }
        out
    }

    fn zvariables(&self, skeleton: &Skeleton) -> String {
        let mut out = String::new();
        for (name, var) in skeleton.zvariables() {
            out.push('\n');
            out.push_str(VARIABLE_COMMENT);
            out.push('\n');
            out.push_str(&definition(name, var));
            out.push('\n');

            let options = [
                ("VAR_COMPRESSION", &var.options.compression),
                ("VAR_SPARSERECORDS", &var.options.sparse_records),
                ("VAR_PADVALUE", &var.options.pad_value),
            ];
            if options.iter().any(|(_, v)| v.is_some()) {
                out.push('\n');
            }
            for (key, value) in options {
                if let Some(value) = value {
                    out.push_str(&format!("! {key}: {value}\n"));
                }
            }

            out.push('\n');
            out.push_str(ATTRIBUTE_COMMENT);
            out.push('\n');
            if let Some(attrs) = skeleton.variable_attributes(name) {
                for (idx, (attr, value)) in attrs.iter().enumerate() {
                    let prefix = format!(
                        "  {:<18} {:<16} ",
                        format!("\"{attr}\""),
                        value.data_type.name()
                    );
                    let block = value_block(
                        value.data_type,
                        &value.value,
                        self.options.variable_wrap,
                        prefix.chars().count(),
                    );
                    let end = if idx + 1 == attrs.len() { " ." } else { "" };
                    out.push_str(&format!("{prefix}{block}{end}\n"));
                }
            }

            out.push('\n');
            if var.nrv.is_empty() {
                out.push_str("! RV values were not requested.\n");
            } else {
                out.push_str("! NRV values follow...\n\n");
                for entry in &var.nrv {
                    let index: Vec<String> = entry.index.iter().map(ToString::to_string).collect();
                    let block = value_block(var.data_type, &entry.value, 0, 0);
                    out.push_str(&format!("  [ {} ] = {block}\n", index.join(", ")));
                }
            }
        }
        out
    }
}

/// `"name" DTYPE nelems dims sizes... rv dimvars...` row of a zVariable.
fn definition(name: &str, var: &ZVariable) -> String {
    let sizes: Vec<String> = var.sizes.iter().map(ToString::to_string).collect();
    let variances: Vec<&str> = var.dim_variances.iter().map(|v| flag(*v)).collect();
    let row = format!(
        "  {:<18} {:<16} {:<10} {:<6} {:<7} {:<10} {}",
        format!("\"{name}\""),
        var.data_type.name(),
        var.num_elements,
        var.dims,
        sizes.join(" "),
        flag(var.record_variance),
        variances.join(" "),
    );
    format!("{}\n", row.trim_end())
}
