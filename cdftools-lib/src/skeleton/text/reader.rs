use std::{fmt::Display, sync::LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use super::{END, GLOBAL_ATTRIBUTES, HEADER, VARIABLES, VARIABLE_ATTRIBUTES, ZVARIABLES};
use crate::skeleton::{
    dtype::DataType,
    error::{Error, Result},
    model::{AttributeValue, Header, NrvEntry, Skeleton, VariableOptions, ZVariable},
};

struct Patterns {
    header_field: Regex,
    header_option: Regex,
    variable_option: Regex,
    global_entry: Regex,
    variable_entry: Regex,
    nrv_entry: Regex,
    quoted_name: Regex,
    char_value: Regex,
    value: Regex,
    continuation: Regex,
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| {
    let rx = |s: &str| Regex::new(s).expect("regex to compile");
    Patterns {
        header_field: rx(r"^\s*(CDF NAME|DATA ENCODING|MAJORITY|FORMAT)\s*:\s*(.*?)\s*$"),
        header_option: rx(r"^!\s*(CDF_COMPRESSION|CDF_CHECKSUM)\s*:\s*(.*?)\s*$"),
        variable_option: rx(r"^!\s*(VAR_COMPRESSION|VAR_SPARSERECORDS|VAR_PADVALUE)\s*:\s*(.*?)\s*$"),
        global_entry: rx(
            r#"^\s*(?:"(?P<name>[^"]*)"\s+)?(?P<entry>\d+)\s*:\s*(?P<dtype>\S+)\s+(?P<value>\{.*\})\s*(?P<end>\.)?\s*$"#,
        ),
        variable_entry: rx(
            r#"^\s*"(?P<name>[^"]*)"\s+(?P<dtype>\S+)\s+(?P<value>\{.*\})\s*(?P<end>\.)?\s*$"#,
        ),
        nrv_entry: rx(r"^\s*\[(?P<index>[^\]]*)\]\s*=\s*(?P<value>\{.*\})\s*$"),
        quoted_name: rx(r#"^\s*"([^"]*)"\s*(.*?)\s*$"#),
        char_value: rx(r#"^\{\s*"(.*)"\s*\}$"#),
        value: rx(r"^\{\s*(.*?)\s*\}$"),
        continuation: rx(r#""\s*-\s*""#),
    }
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    None,
    Header,
    GlobalAttributes,
    VariableAttributes,
    ZVariables,
    End,
}

impl Section {
    fn from_marker(line: &str) -> Option<Self> {
        let marker = line.split_whitespace().next()?;
        match marker {
            HEADER => Some(Self::Header),
            GLOBAL_ATTRIBUTES => Some(Self::GlobalAttributes),
            VARIABLE_ATTRIBUTES => Some(Self::VariableAttributes),
            VARIABLES | ZVARIABLES => Some(Self::ZVariables),
            END => Some(Self::End),
            _ => None,
        }
    }
}

impl Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "preamble",
            Self::Header => "header",
            Self::GlobalAttributes => "GLOBALattributes",
            Self::VariableAttributes => "VARIABLEattributes",
            Self::ZVariables => "zVariables",
            Self::End => "end",
        };
        write!(f, "{name}")
    }
}

/// What the non-comment lines of a zVariable block currently describe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Definition,
    Attributes,
    Values,
}

/// zVariable being read, added to the skeleton once its block is complete.
struct PendingVariable {
    name: String,
    descriptor: ZVariable,
    attributes: Vec<(String, AttributeValue)>,
}

/// Mutable parser state threaded through [Parser::line].
struct Context {
    section: Section,
    phase: Phase,
    /// 1-based number of the current line
    line: usize,
    /// Lines of an entry not yet closed
    buffer: String,
    /// Global attribute being read with its entries so far
    attribute: Option<(String, Vec<AttributeValue>)>,
    variable: Option<PendingVariable>,
    /// The next non-comment header row holds the counters
    counts_next: bool,
    /// Counters declared in the header as (nzvar, ngattr, nvattr)
    declared: Option<(usize, usize, usize)>,
    seen: Vec<Section>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            section: Section::None,
            phase: Phase::Definition,
            line: 0,
            buffer: String::new(),
            attribute: None,
            variable: None,
            counts_next: false,
            declared: None,
            seen: Vec::default(),
        }
    }
}

struct Parser {
    ctx: Context,
    skeleton: Skeleton,
    compression: Option<String>,
    checksum: Option<String>,
}

/// Parses skeleton table text into a [Skeleton].
#[derive(Clone, Debug, Default)]
pub struct TextReader;

impl TextReader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Read a skeleton from the full text of a skeleton table.
    ///
    /// # Errors
    /// [Error::InvalidFile] identifying the line and section of the first structural problem.
    pub fn read(&self, text: &str) -> Result<Skeleton> {
        let mut parser = Parser {
            ctx: Context::default(),
            skeleton: Skeleton::new(Header::default()),
            compression: None,
            checksum: None,
        };
        for (idx, line) in text.lines().enumerate() {
            parser.ctx.line = idx + 1;
            parser.line(line)?;
            if parser.ctx.section == Section::End {
                break;
            }
        }
        if parser.ctx.section != Section::End {
            warn!("skeleton has no {END} marker");
            parser.finish()?;
        }
        Ok(parser.skeleton)
    }
}

fn is_closed(buffer: &str) -> bool {
    let trimmed = buffer.trim_end();
    trimmed.ends_with('}') || trimmed.ends_with("}.") || trimmed.ends_with("} .")
}

fn parse_count(token: Option<&str>) -> Option<usize> {
    let token = token?;
    token.rsplit('/').next()?.parse().ok()
}

impl Parser {
    fn invalid<S: Display>(&self, reason: S) -> Error {
        Error::InvalidFile {
            line: self.ctx.line,
            section: self.ctx.section.to_string(),
            reason: reason.to_string(),
        }
    }

    fn line(&mut self, raw: &str) -> Result<()> {
        let line = raw.trim();
        if let Some(section) = Section::from_marker(line) {
            return self.enter(section);
        }
        if line.is_empty() {
            return Ok(());
        }
        if line.starts_with('!') {
            return self.comment(line);
        }
        match self.ctx.section {
            Section::None | Section::End => {
                debug!(line = self.ctx.line, "ignoring line outside of a section");
                Ok(())
            }
            Section::Header => self.header(line),
            Section::GlobalAttributes => self.global_attribute(line),
            Section::VariableAttributes => self.variable_attribute_name(line),
            Section::ZVariables => self.zvariable(line),
        }
    }

    fn enter(&mut self, section: Section) -> Result<()> {
        self.close_section()?;
        debug!(line = self.ctx.line, %section, "entering section");
        if !self.ctx.seen.contains(&section) {
            self.ctx.seen.push(section);
        }
        self.ctx.section = section;
        self.ctx.phase = Phase::Definition;
        if section == Section::End {
            self.finish()?;
        }
        Ok(())
    }

    /// Flush whatever the current section was accumulating.
    fn close_section(&mut self) -> Result<()> {
        if !self.ctx.buffer.is_empty() {
            return Err(self.invalid(format!("unterminated entry {:?}", self.ctx.buffer)));
        }
        self.flush_global_attribute()?;
        self.flush_variable()
    }

    fn finish(&mut self) -> Result<()> {
        self.close_section()?;
        let header = &mut self.skeleton.header;
        if let Some(compression) = self.compression.take() {
            header.compression = compression;
        }
        if let Some(checksum) = self.checksum.take() {
            header.checksum = checksum;
        }
        for section in [
            Section::Header,
            Section::GlobalAttributes,
            Section::VariableAttributes,
            Section::ZVariables,
        ] {
            if !self.ctx.seen.contains(&section) {
                warn!("skeleton has no {section} section");
            }
        }
        if let Some(declared) = self.ctx.declared {
            let actual = (
                self.skeleton.nzvar(),
                self.skeleton.ngattr(),
                self.skeleton.nvattr(),
            );
            if declared != actual {
                warn!(?declared, ?actual, "header counts (nzvar, ngattr, nvattr) do not match content");
            }
        }
        debug!(
            nzvar = self.skeleton.nzvar(),
            ngattr = self.skeleton.ngattr(),
            nvattr = self.skeleton.nvattr(),
            "read text skeleton"
        );
        Ok(())
    }

    fn comment(&mut self, line: &str) -> Result<()> {
        match self.ctx.section {
            Section::Header => {
                if let Some(caps) = PATTERNS.header_option.captures(line) {
                    let value = caps[2].to_string();
                    match &caps[1] {
                        "CDF_COMPRESSION" => self.compression = Some(value),
                        _ => self.checksum = Some(value),
                    }
                } else if line.trim_start_matches('!').trim_start().starts_with("---") {
                    self.ctx.counts_next = true;
                }
            }
            Section::ZVariables => self.zvariable_comment(line)?,
            _ => {}
        }
        Ok(())
    }

    fn header(&mut self, line: &str) -> Result<()> {
        if self.ctx.counts_next {
            self.ctx.counts_next = false;
            let mut tokens = line.split_whitespace();
            let counts = (
                parse_count(tokens.next()),
                parse_count(tokens.next()),
                parse_count(tokens.next()),
            );
            let (Some(nzvar), Some(ngattr), Some(nvattr)) = counts else {
                return Err(self.invalid(format!("invalid counts row {line:?}")));
            };
            self.ctx.declared = Some((nzvar, ngattr, nvattr));
            return Ok(());
        }
        let Some(caps) = PATTERNS.header_field.captures(line) else {
            debug!(line = self.ctx.line, "ignoring header line");
            return Ok(());
        };
        let value = caps[2].to_string();
        let header = &mut self.skeleton.header;
        match &caps[1] {
            "CDF NAME" => header.cdf_name = value,
            "DATA ENCODING" => header.data_encoding = value,
            "MAJORITY" => header.majority = value,
            _ => header.format = value,
        }
        Ok(())
    }

    /// Append `line` to the continuation buffer, returning the complete entry once it is
    /// closed.
    fn buffered(&mut self, line: &str) -> Option<String> {
        if !self.ctx.buffer.is_empty() {
            self.ctx.buffer.push(' ');
        }
        self.ctx.buffer.push_str(line);
        if is_closed(&self.ctx.buffer) {
            Some(std::mem::take(&mut self.ctx.buffer))
        } else {
            None
        }
    }

    /// Extract the content of a `{ ... }` block.
    fn value(&self, data_type: DataType, block: &str) -> Result<String> {
        if data_type.is_char() {
            let caps = PATTERNS
                .char_value
                .captures(block)
                .ok_or_else(|| self.invalid(format!("no quoted value in {block:?}")))?;
            Ok(PATTERNS.continuation.replace_all(&caps[1], "").into_owned())
        } else {
            let caps = PATTERNS
                .value
                .captures(block)
                .ok_or_else(|| self.invalid(format!("no value in {block:?}")))?;
            Ok(caps[1].to_string())
        }
    }

    fn data_type(&self, name: &str) -> Result<DataType> {
        name.parse().map_err(|err: Error| self.invalid(err))
    }

    // GLOBALattributes

    fn global_attribute(&mut self, line: &str) -> Result<()> {
        let Some(entry) = self.buffered(line) else {
            return Ok(());
        };
        let caps = PATTERNS
            .global_entry
            .captures(&entry)
            .ok_or_else(|| self.invalid(format!("invalid global attribute entry {entry:?}")))?;

        if let Some(name) = caps.name("name") {
            self.flush_global_attribute()?;
            self.ctx.attribute = Some((name.as_str().to_string(), Vec::default()));
        }
        let data_type = self.data_type(&caps["dtype"])?;
        let value = self.value(data_type, &caps["value"])?;
        let number: usize = caps["entry"]
            .parse()
            .map_err(|_| self.invalid(format!("invalid entry number {:?}", &caps["entry"])))?;

        let Some((name, entries)) = self.ctx.attribute.as_mut() else {
            return Err(self.invalid("entry without an attribute name"));
        };
        if number != entries.len() + 1 {
            let reason = format!(
                "entry {number} of {name:?} is not contiguous, expected {}",
                entries.len() + 1
            );
            return Err(self.invalid(reason));
        }
        entries.push(AttributeValue::new(data_type, value));
        if caps.name("end").is_some() {
            self.flush_global_attribute()?;
        }
        Ok(())
    }

    fn flush_global_attribute(&mut self) -> Result<()> {
        let Some((name, entries)) = self.ctx.attribute.take() else {
            return Ok(());
        };
        self.skeleton
            .add_global_attribute(&name, entries)
            .map_err(|err| self.invalid(err))
    }

    // VARIABLEattributes

    fn variable_attribute_name(&mut self, line: &str) -> Result<()> {
        let caps = PATTERNS
            .quoted_name
            .captures(line)
            .filter(|caps| caps[2].is_empty())
            .ok_or_else(|| self.invalid(format!("expected a quoted attribute name, got {line:?}")))?;
        self.skeleton
            .declare_variable_attribute(&caps[1])
            .map_err(|err| self.invalid(err))
    }

    // zVariables

    fn zvariable_comment(&mut self, line: &str) -> Result<()> {
        if let Some(caps) = PATTERNS.variable_option.captures(line) {
            let value = caps[2].to_string();
            let Some(variable) = self.ctx.variable.as_mut() else {
                return Err(self.invalid(format!("{} without a zVariable", &caps[1])));
            };
            let options = &mut variable.descriptor.options;
            match &caps[1] {
                "VAR_COMPRESSION" => options.compression = Some(value),
                "VAR_SPARSERECORDS" => options.sparse_records = Some(value),
                _ => options.pad_value = Some(value).filter(|v| v != "None"),
            }
            return Ok(());
        }

        let text = line.trim_start_matches('!').trim_start();
        if text.starts_with("Variable") {
            self.ctx.phase = Phase::Definition;
        } else if text.starts_with("Attribute") {
            if self.ctx.variable.is_none() {
                return Err(self.invalid("attribute block without a zVariable"));
            }
            self.ctx.phase = Phase::Attributes;
        } else if text.contains("values follow") {
            self.ctx.phase = Phase::Values;
        } else if text.contains("not requested") {
            self.ctx.phase = Phase::Definition;
        }
        Ok(())
    }

    fn zvariable(&mut self, line: &str) -> Result<()> {
        let starts_definition =
            self.ctx.buffer.is_empty() && line.starts_with('"') && !line.contains('{');
        if starts_definition {
            self.ctx.phase = Phase::Definition;
        }
        match self.ctx.phase {
            Phase::Definition => self.zvariable_definition(line),
            Phase::Attributes => self.zvariable_attribute(line),
            Phase::Values => self.zvariable_value(line),
        }
    }

    fn zvariable_definition(&mut self, line: &str) -> Result<()> {
        if !self.ctx.buffer.is_empty() {
            self.ctx.buffer.push(' ');
        }
        self.ctx.buffer.push_str(line);
        let complete = matches!(
            self.ctx.buffer.split_whitespace().last(),
            Some("T" | "F")
        );
        if !complete {
            return Ok(());
        }
        let definition = std::mem::take(&mut self.ctx.buffer);
        let (name, descriptor) = self.parse_definition(&definition)?;
        self.flush_variable()?;
        debug!(line = self.ctx.line, variable = %name, "zVariable definition");
        self.ctx.variable = Some(PendingVariable {
            name,
            descriptor,
            attributes: Vec::default(),
        });
        Ok(())
    }

    /// Parse `"name" DTYPE nelems dims sizes... rv dimvars...`.
    fn parse_definition(&self, definition: &str) -> Result<(String, ZVariable)> {
        let caps = PATTERNS
            .quoted_name
            .captures(definition)
            .ok_or_else(|| self.invalid(format!("invalid zVariable definition {definition:?}")))?;
        let name = caps[1].to_string();
        let tokens: Vec<&str> = caps.get(2).map_or("", |m| m.as_str()).split_whitespace().collect();
        let short = || self.invalid(format!("incomplete definition of zVariable {name:?}"));
        if tokens.len() < 4 {
            return Err(short());
        }
        let number = |token: &str| {
            token
                .parse::<u32>()
                .map_err(|_| self.invalid(format!("invalid number {token:?} for zVariable {name:?}")))
        };
        let flag = |token: &str| match token {
            "T" => Ok(true),
            "F" => Ok(false),
            _ => Err(self.invalid(format!("invalid flag {token:?} for zVariable {name:?}"))),
        };

        let data_type = self.data_type(tokens[0])?;
        let num_elements = number(tokens[1])?;
        let dims = number(tokens[2])? as usize;
        if tokens.len() != 4 + 2 * dims {
            return Err(short());
        }
        let sizes = tokens[3..3 + dims]
            .iter()
            .map(|&t| number(t))
            .collect::<Result<Vec<_>>>()?;
        let record_variance = flag(tokens[3 + dims])?;
        let dim_variances = tokens[4 + dims..]
            .iter()
            .map(|&t| flag(t))
            .collect::<Result<Vec<_>>>()?;

        Ok((
            name.clone(),
            ZVariable {
                data_type,
                num_elements,
                dims,
                sizes,
                record_variance,
                dim_variances,
                options: VariableOptions::default(),
                nrv: Vec::default(),
            },
        ))
    }

    fn zvariable_attribute(&mut self, line: &str) -> Result<()> {
        let Some(entry) = self.buffered(line) else {
            return Ok(());
        };
        let caps = PATTERNS
            .variable_entry
            .captures(&entry)
            .ok_or_else(|| self.invalid(format!("invalid variable attribute entry {entry:?}")))?;
        let name = caps["name"].to_string();
        if !self.skeleton.variable_attribute_names().contains(&name) {
            return Err(self.invalid(format!(
                "variable attribute {name:?} is not declared in {VARIABLE_ATTRIBUTES}"
            )));
        }
        let data_type = self.data_type(&caps["dtype"])?;
        let value = self.value(data_type, &caps["value"])?;
        let Some(variable) = self.ctx.variable.as_mut() else {
            return Err(self.invalid("attribute entry without a zVariable"));
        };
        variable
            .attributes
            .push((name, AttributeValue::new(data_type, value)));
        Ok(())
    }

    fn zvariable_value(&mut self, line: &str) -> Result<()> {
        let Some(entry) = self.buffered(line) else {
            return Ok(());
        };
        let caps = PATTERNS
            .nrv_entry
            .captures(&entry)
            .ok_or_else(|| self.invalid(format!("invalid NRV entry {entry:?}")))?;
        let Some(data_type) = self.ctx.variable.as_ref().map(|v| v.descriptor.data_type) else {
            return Err(self.invalid("NRV entry without a zVariable"));
        };
        let index = caps["index"]
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u32>()
                    .map_err(|_| self.invalid(format!("invalid NRV index {s:?}")))
            })
            .collect::<Result<Vec<_>>>()?;
        let value = self.value(data_type, &caps["value"])?;
        if let Some(variable) = self.ctx.variable.as_mut() {
            variable.descriptor.nrv.push(NrvEntry::new(index, value));
        }
        Ok(())
    }

    fn flush_variable(&mut self) -> Result<()> {
        let Some(variable) = self.ctx.variable.take() else {
            return Ok(());
        };
        self.skeleton
            .add_zvariable(&variable.name, variable.descriptor)
            .map_err(|err| self.invalid(err))?;
        for (name, value) in variable.attributes {
            self.skeleton
                .add_variable_attribute(&name, value, Some(&[variable.name.as_str()]))
                .map_err(|err| self.invalid(err))?;
        }
        Ok(())
    }
}
