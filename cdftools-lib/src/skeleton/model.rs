//! In-memory representation of a CDF skeleton.
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::dtype::{Category, DataType};
use super::error::{Error, Result};

/// Skeleton header fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub cdf_name: String,
    pub data_encoding: String,
    pub majority: String,
    pub format: String,
    pub compression: String,
    pub checksum: String,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            cdf_name: String::new(),
            data_encoding: "NETWORK".to_string(),
            majority: "ROW".to_string(),
            format: "SINGLE".to_string(),
            compression: "None".to_string(),
            checksum: "None".to_string(),
        }
    }
}

/// A typed attribute value.
///
/// Character values are stored without quotes. Other values are kept as their skeleton text,
/// e.g., `1.0e+31` or `1, 2, 3` for multiple elements.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub data_type: DataType,
    pub value: String,
}

impl AttributeValue {
    pub fn new<S: Into<String>>(data_type: DataType, value: S) -> Self {
        Self {
            data_type,
            value: value.into(),
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        validate_value(self.data_type, &self.value)
    }
}

/// Check that `value` can be written as a `data_type` value.
fn validate_value(data_type: DataType, value: &str) -> std::result::Result<(), String> {
    let category = data_type.category();
    if category == Category::Char {
        if value.contains('"') {
            return Err(format!("{data_type} value {value:?} contains a double quote"));
        }
        return Ok(());
    }
    if value.trim().is_empty() {
        return Err(format!("{data_type} value is empty"));
    }
    if matches!(category, Category::Epoch | Category::Tt2000) {
        return Ok(());
    }
    for token in value.split(',').map(str::trim) {
        let ok = match category {
            Category::Integer => token.parse::<i128>().is_ok(),
            _ => token.parse::<f64>().is_ok(),
        };
        if !ok {
            return Err(format!("{token:?} is not a valid {data_type} value"));
        }
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidEntry("name is empty".to_string()));
    }
    if name.contains('"') {
        return Err(Error::InvalidEntry(format!(
            "name {name:?} contains a double quote"
        )));
    }
    Ok(())
}

/// One numbered entry of a global attribute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalEntry {
    /// Name of the attribute owning this entry
    pub attribute: String,
    /// 1-based entry number
    pub number: u32,
    pub data_type: DataType,
    pub value: String,
}

impl GlobalEntry {
    #[must_use]
    pub fn value(&self) -> AttributeValue {
        AttributeValue::new(self.data_type, self.value.clone())
    }
}

/// Partial update of an attribute entry. `None` fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryUpdate {
    pub data_type: Option<DataType>,
    pub value: Option<String>,
}

impl EntryUpdate {
    #[must_use]
    pub fn value<S: Into<String>>(value: S) -> Self {
        Self {
            data_type: None,
            value: Some(value.into()),
        }
    }

    fn apply(&self, current: Option<&AttributeValue>) -> Result<AttributeValue> {
        let data_type = self
            .data_type
            .or(current.map(|c| c.data_type))
            .ok_or_else(|| Error::InvalidEntry("data type is required".to_string()))?;
        let value = self
            .value
            .clone()
            .or(current.map(|c| c.value.clone()))
            .ok_or_else(|| Error::InvalidEntry("value is required".to_string()))?;
        let merged = AttributeValue { data_type, value };
        merged.validate().map_err(Error::InvalidEntry)?;
        Ok(merged)
    }
}

impl From<AttributeValue> for EntryUpdate {
    fn from(value: AttributeValue) -> Self {
        Self {
            data_type: Some(value.data_type),
            value: Some(value.value),
        }
    }
}

/// Per-variable storage options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableOptions {
    /// `VAR_COMPRESSION`, e.g., `None` or `GZIP.6`
    pub compression: Option<String>,
    /// `VAR_SPARSERECORDS`, e.g., `None` or `sRecords.PAD`
    pub sparse_records: Option<String>,
    /// `VAR_PADVALUE`
    pub pad_value: Option<String>,
}

/// A non-record-variant value. `index` has one 1-based index per dimension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NrvEntry {
    pub index: Vec<u32>,
    pub value: String,
}

impl NrvEntry {
    pub fn new<S: Into<String>>(index: Vec<u32>, value: S) -> Self {
        Self {
            index,
            value: value.into(),
        }
    }
}

/// zVariable descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZVariable {
    pub data_type: DataType,
    pub num_elements: u32,
    /// Number of dimensions; 0 for scalars
    pub dims: usize,
    /// Size of each dimension, empty when `dims == 0`
    pub sizes: Vec<u32>,
    pub record_variance: bool,
    /// Variance of each dimension, empty when `dims == 0`
    pub dim_variances: Vec<bool>,
    pub options: VariableOptions,
    pub nrv: Vec<NrvEntry>,
}

impl ZVariable {
    /// Record variant scalar of 1 element.
    #[must_use]
    pub fn scalar(data_type: DataType) -> Self {
        Self {
            data_type,
            num_elements: 1,
            dims: 0,
            sizes: Vec::default(),
            record_variance: true,
            dim_variances: Vec::default(),
            options: VariableOptions::default(),
            nrv: Vec::default(),
        }
    }

    /// Record variant array with every dimension variant.
    #[must_use]
    pub fn array(data_type: DataType, sizes: &[u32]) -> Self {
        Self {
            dims: sizes.len(),
            sizes: sizes.to_vec(),
            dim_variances: vec![true; sizes.len()],
            ..Self::scalar(data_type)
        }
    }

    /// Validate the descriptor of variable `name`.
    ///
    /// # Errors
    /// [Error::InvalidDescriptor] if sizes or variances do not match `dims`, there are no
    /// elements, or an NRV entry is invalid.
    pub fn validate(&self, name: &str) -> Result<()> {
        let invalid = |reason: String| Error::InvalidDescriptor {
            variable: name.to_string(),
            reason,
        };
        if self.num_elements == 0 {
            return Err(invalid("number of elements must be at least 1".to_string()));
        }
        if self.sizes.len() != self.dims {
            return Err(invalid(format!(
                "{} sizes for {} dims",
                self.sizes.len(),
                self.dims
            )));
        }
        if self.dim_variances.len() != self.dims {
            return Err(invalid(format!(
                "{} dimension variances for {} dims",
                self.dim_variances.len(),
                self.dims
            )));
        }
        if let Some(size) = self.sizes.iter().find(|s| **s == 0) {
            return Err(invalid(format!("invalid dimension size {size}")));
        }
        for entry in &self.nrv {
            if self.dims > 0 && entry.index.len() != self.dims {
                return Err(invalid(format!(
                    "NRV index {:?} does not have {} dims",
                    entry.index, self.dims
                )));
            }
            validate_value(self.data_type, &entry.value).map_err(invalid)?;
        }
        Ok(())
    }
}

/// Canonical in-memory CDF skeleton.
///
/// A skeleton is populated by one of the readers, see [Skeleton::from_text](crate::skeleton::Skeleton::from_text)
/// and [Skeleton::from_tabular](crate::skeleton::Skeleton::from_tabular), and may then be
/// edited in place. Every mutation validates the touched entity and leaves the skeleton
/// unchanged on error.
///
/// Mutations take `&mut self`; share a skeleton between threads behind a lock.
///
/// Equality is order sensitive: two skeletons are equal only if they render identically.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Skeleton {
    pub header: Header,
    global_attributes: IndexMap<String, Vec<GlobalEntry>>,
    variable_attribute_names: IndexSet<String>,
    variable_attributes: IndexMap<String, IndexMap<String, AttributeValue>>,
    zvariables: IndexMap<String, ZVariable>,
}

impl PartialEq for Skeleton {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
            && self.global_attributes.iter().eq(other.global_attributes.iter())
            && self
                .variable_attribute_names
                .iter()
                .eq(other.variable_attribute_names.iter())
            && self.zvariables.iter().eq(other.zvariables.iter())
            && self.zvariables.keys().all(|name| {
                self.variable_attributes(name)
                    .into_iter()
                    .flatten()
                    .eq(other.variable_attributes(name).into_iter().flatten())
            })
    }
}

/// Rename a key in place, keeping its position.
fn rename_key<V>(map: &mut IndexMap<String, V>, old: &str, new: &str) {
    if let Some(idx) = map.get_index_of(old) {
        if let Some((_, value)) = map.shift_remove_index(idx) {
            map.shift_insert(idx, new.to_string(), value);
        }
    }
}

impl Skeleton {
    #[must_use]
    pub fn new(header: Header) -> Self {
        Self {
            header,
            ..Self::default()
        }
    }

    /// Number of zVariables.
    #[must_use]
    pub fn nzvar(&self) -> usize {
        self.zvariables.len()
    }

    /// Number of global attributes.
    #[must_use]
    pub fn ngattr(&self) -> usize {
        self.global_attributes.len()
    }

    /// Number of declared variable attributes.
    #[must_use]
    pub fn nvattr(&self) -> usize {
        self.variable_attribute_names.len()
    }

    #[must_use]
    pub fn global_attributes(&self) -> &IndexMap<String, Vec<GlobalEntry>> {
        &self.global_attributes
    }

    #[must_use]
    pub fn global_attribute(&self, name: &str) -> Option<&[GlobalEntry]> {
        self.global_attributes.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn variable_attribute_names(&self) -> &IndexSet<String> {
        &self.variable_attribute_names
    }

    /// Attribute values of zVariable `variable`, if it has any.
    #[must_use]
    pub fn variable_attributes(&self, variable: &str) -> Option<&IndexMap<String, AttributeValue>> {
        self.variable_attributes.get(variable)
    }

    #[must_use]
    pub fn variable_attribute(&self, variable: &str, name: &str) -> Option<&AttributeValue> {
        self.variable_attributes
            .get(variable)
            .and_then(|attrs| attrs.get(name))
    }

    #[must_use]
    pub fn zvariables(&self) -> &IndexMap<String, ZVariable> {
        &self.zvariables
    }

    #[must_use]
    pub fn zvariable(&self, name: &str) -> Option<&ZVariable> {
        self.zvariables.get(name)
    }

    fn attribute_exists(&self, name: &str) -> bool {
        self.global_attributes.contains_key(name) || self.variable_attribute_names.contains(name)
    }

    fn duplicate_attribute(name: &str) -> Error {
        warn!("attribute {name:?} already exists");
        Error::DuplicateAttribute(name.to_string())
    }

    // Global attributes

    /// Add global attribute `name` with `entries` numbered from 1 in order.
    ///
    /// # Errors
    /// [Error::DuplicateAttribute] if an attribute named `name` exists, or [Error::InvalidEntry]
    /// if there are no entries or any entry is invalid.
    pub fn add_global_attribute(&mut self, name: &str, entries: Vec<AttributeValue>) -> Result<()> {
        validate_name(name)?;
        if self.attribute_exists(name) {
            return Err(Self::duplicate_attribute(name));
        }
        if entries.is_empty() {
            return Err(Error::InvalidEntry(format!(
                "global attribute {name:?} has no entries"
            )));
        }
        let mut numbered = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.into_iter().enumerate() {
            entry
                .validate()
                .map_err(|err| Error::InvalidEntry(format!("{name} entry {}: {err}", idx + 1)))?;
            numbered.push(GlobalEntry {
                attribute: name.to_string(),
                number: idx as u32 + 1,
                data_type: entry.data_type,
                value: entry.value,
            });
        }
        self.global_attributes.insert(name.to_string(), numbered);
        Ok(())
    }

    /// Append an entry to an existing global attribute returning its entry number.
    ///
    /// # Errors
    /// [Error::UnknownAttribute] or [Error::InvalidEntry].
    pub fn add_global_attribute_entry(&mut self, name: &str, value: AttributeValue) -> Result<u32> {
        let entries = self
            .global_attributes
            .get_mut(name)
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))?;
        value.validate().map_err(Error::InvalidEntry)?;
        let number = entries.len() as u32 + 1;
        entries.push(GlobalEntry {
            attribute: name.to_string(),
            number,
            data_type: value.data_type,
            value: value.value,
        });
        Ok(number)
    }

    /// Merge `update` into entry `number` of global attribute `name`.
    ///
    /// # Errors
    /// [Error::UnknownAttribute], [Error::UnknownEntry], or [Error::InvalidEntry] if the
    /// updated entry is not valid.
    pub fn set_global_attribute_entry(
        &mut self,
        name: &str,
        number: u32,
        update: EntryUpdate,
    ) -> Result<()> {
        let entries = self
            .global_attributes
            .get_mut(name)
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))?;
        let entry = entries
            .iter_mut()
            .find(|e| e.number == number)
            .ok_or_else(|| Error::UnknownEntry {
                attribute: name.to_string(),
                entry: number,
            })?;
        let merged = update.apply(Some(&entry.value()))?;
        entry.data_type = merged.data_type;
        entry.value = merged.value;
        Ok(())
    }

    /// # Errors
    /// [Error::UnknownAttribute] if `old` does not exist, [Error::DuplicateAttribute] if `new`
    /// does.
    pub fn rename_global_attribute(&mut self, old: &str, new: &str) -> Result<()> {
        if !self.global_attributes.contains_key(old) {
            return Err(Error::UnknownAttribute(old.to_string()));
        }
        validate_name(new)?;
        if self.attribute_exists(new) {
            return Err(Self::duplicate_attribute(new));
        }
        rename_key(&mut self.global_attributes, old, new);
        if let Some(entries) = self.global_attributes.get_mut(new) {
            for entry in entries {
                entry.attribute = new.to_string();
            }
        }
        Ok(())
    }

    /// Remove global attribute `name`, returning false if it did not exist.
    pub fn remove_global_attribute(&mut self, name: &str) -> bool {
        self.global_attributes.shift_remove(name).is_some()
    }

    // Variable attributes

    /// Variables targeted by a variable attribute operation. By default, every variable that
    /// currently has at least one attribute.
    fn scope(&self, variables: Option<&[&str]>) -> Result<Vec<String>> {
        match variables {
            Some(variables) => variables
                .iter()
                .map(|v| {
                    if self.zvariables.contains_key(*v) {
                        Ok((*v).to_string())
                    } else {
                        Err(Error::UnknownVariable((*v).to_string()))
                    }
                })
                .collect(),
            None => Ok(self
                .variable_attributes
                .iter()
                .filter(|(_, attrs)| !attrs.is_empty())
                .map(|(name, _)| name.clone())
                .collect()),
        }
    }

    /// Declare variable attribute `name` without assigning it to any variable.
    ///
    /// # Errors
    /// [Error::DuplicateAttribute] if an attribute named `name` exists.
    pub fn declare_variable_attribute(&mut self, name: &str) -> Result<()> {
        validate_name(name)?;
        if self.attribute_exists(name) {
            return Err(Self::duplicate_attribute(name));
        }
        self.variable_attribute_names.insert(name.to_string());
        Ok(())
    }

    /// Add variable attribute `name` with `value` to `variables`.
    ///
    /// Without `variables` the attribute must not already exist and is assigned to every
    /// variable that currently has attributes. With `variables` the attribute may already be
    /// declared but none of the listed variables may already have it.
    ///
    /// # Errors
    /// [Error::DuplicateAttribute], [Error::UnknownVariable], or [Error::InvalidEntry].
    pub fn add_variable_attribute(
        &mut self,
        name: &str,
        value: AttributeValue,
        variables: Option<&[&str]>,
    ) -> Result<()> {
        validate_name(name)?;
        value
            .validate()
            .map_err(|err| Error::InvalidEntry(format!("{name}: {err}")))?;
        let targets = self.scope(variables)?;
        let declared = self.variable_attribute_names.contains(name);
        if (variables.is_none() && declared) || self.global_attributes.contains_key(name) {
            return Err(Self::duplicate_attribute(name));
        }
        if targets
            .iter()
            .any(|v| self.variable_attribute(v, name).is_some())
        {
            return Err(Self::duplicate_attribute(name));
        }

        self.variable_attribute_names.insert(name.to_string());
        for variable in targets {
            self.variable_attributes
                .entry(variable)
                .or_default()
                .insert(name.to_string(), value.clone());
        }
        Ok(())
    }

    /// Update or insert variable attribute `name` on `variables`.
    ///
    /// Existing values are merged with `update`. Variables without the attribute get a new
    /// value which requires both fields of `update`.
    ///
    /// # Errors
    /// [Error::UnknownAttribute] if `name` is not declared, [Error::UnknownVariable], or
    /// [Error::InvalidEntry]. No variable is changed on error.
    pub fn set_variable_attribute(
        &mut self,
        name: &str,
        update: EntryUpdate,
        variables: Option<&[&str]>,
    ) -> Result<()> {
        if !self.variable_attribute_names.contains(name) {
            return Err(Error::UnknownAttribute(name.to_string()));
        }
        let targets = self.scope(variables)?;
        let mut updated = Vec::with_capacity(targets.len());
        for variable in targets {
            let value = update
                .apply(self.variable_attribute(&variable, name))
                .map_err(|err| Error::InvalidEntry(format!("{variable}/{name}: {err}")))?;
            updated.push((variable, value));
        }
        for (variable, value) in updated {
            self.variable_attributes
                .entry(variable)
                .or_default()
                .insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Rename variable attribute `old` to `new`.
    ///
    /// Without `variables` the declaration and every variable are renamed. With `variables`
    /// only those variables are renamed and `new` is declared alongside `old`.
    ///
    /// # Errors
    /// [Error::UnknownAttribute], [Error::DuplicateAttribute], or [Error::UnknownVariable].
    pub fn rename_variable_attribute(
        &mut self,
        old: &str,
        new: &str,
        variables: Option<&[&str]>,
    ) -> Result<()> {
        if !self.variable_attribute_names.contains(old) {
            return Err(Error::UnknownAttribute(old.to_string()));
        }
        validate_name(new)?;
        if self.attribute_exists(new) {
            return Err(Self::duplicate_attribute(new));
        }
        match variables {
            None => {
                self.variable_attribute_names = self
                    .variable_attribute_names
                    .iter()
                    .map(|n| if n == old { new.to_string() } else { n.clone() })
                    .collect();
                for attrs in self.variable_attributes.values_mut() {
                    rename_key(attrs, old, new);
                }
            }
            Some(_) => {
                let targets = self.scope(variables)?;
                self.variable_attribute_names.insert(new.to_string());
                for variable in targets {
                    if let Some(attrs) = self.variable_attributes.get_mut(&variable) {
                        rename_key(attrs, old, new);
                    }
                }
            }
        }
        Ok(())
    }

    /// Remove variable attribute `name` from `variables`, or remove it entirely when
    /// `variables` is `None`. Returns false if `name` was not declared.
    ///
    /// # Errors
    /// [Error::UnknownVariable] if a listed variable does not exist.
    pub fn remove_variable_attribute(
        &mut self,
        name: &str,
        variables: Option<&[&str]>,
    ) -> Result<bool> {
        if !self.variable_attribute_names.contains(name) {
            return Ok(false);
        }
        match variables {
            None => {
                self.variable_attribute_names.shift_remove(name);
                for attrs in self.variable_attributes.values_mut() {
                    attrs.shift_remove(name);
                }
            }
            Some(_) => {
                for variable in self.scope(variables)? {
                    if let Some(attrs) = self.variable_attributes.get_mut(&variable) {
                        attrs.shift_remove(name);
                    }
                }
            }
        }
        Ok(true)
    }

    // zVariables

    /// # Errors
    /// [Error::DuplicateVariable] if `name` exists, or [Error::InvalidDescriptor].
    pub fn add_zvariable(&mut self, name: &str, descriptor: ZVariable) -> Result<()> {
        validate_name(name)?;
        if self.zvariables.contains_key(name) {
            warn!("zVariable {name:?} already exists");
            return Err(Error::DuplicateVariable(name.to_string()));
        }
        descriptor.validate(name)?;
        self.zvariables.insert(name.to_string(), descriptor);
        Ok(())
    }

    /// Replace the descriptor of zVariable `name`. Its attributes are kept.
    ///
    /// # Errors
    /// [Error::UnknownVariable], or [Error::InvalidDescriptor].
    pub fn set_zvariable(&mut self, name: &str, descriptor: ZVariable) -> Result<()> {
        let Some(current) = self.zvariables.get_mut(name) else {
            return Err(Error::UnknownVariable(name.to_string()));
        };
        descriptor.validate(name)?;
        *current = descriptor;
        Ok(())
    }

    /// Replace the non-record-variant values of zVariable `name`.
    ///
    /// # Errors
    /// [Error::UnknownVariable], or [Error::InvalidDescriptor] if an entry is invalid.
    pub fn set_nrv(&mut self, name: &str, entries: Vec<NrvEntry>) -> Result<()> {
        let Some(current) = self.zvariables.get(name) else {
            return Err(Error::UnknownVariable(name.to_string()));
        };
        let descriptor = ZVariable {
            nrv: entries,
            ..current.clone()
        };
        self.set_zvariable(name, descriptor)
    }

    /// # Errors
    /// [Error::UnknownVariable] if `old` does not exist, [Error::DuplicateVariable] if `new`
    /// does.
    pub fn rename_zvariable(&mut self, old: &str, new: &str) -> Result<()> {
        if !self.zvariables.contains_key(old) {
            return Err(Error::UnknownVariable(old.to_string()));
        }
        validate_name(new)?;
        if self.zvariables.contains_key(new) {
            return Err(Error::DuplicateVariable(new.to_string()));
        }
        rename_key(&mut self.zvariables, old, new);
        rename_key(&mut self.variable_attributes, old, new);
        Ok(())
    }

    /// Remove zVariable `name` along with its attribute values, returning false if it did not
    /// exist.
    pub fn remove_zvariable(&mut self, name: &str) -> bool {
        self.variable_attributes.shift_remove(name);
        self.zvariables.shift_remove(name).is_some()
    }

    /// Check every invariant of the skeleton.
    ///
    /// # Errors
    /// The first violation found.
    pub fn validate(&self) -> Result<()> {
        for (name, entries) in &self.global_attributes {
            for (idx, entry) in entries.iter().enumerate() {
                if entry.number as usize != idx + 1 {
                    return Err(Error::InvalidEntry(format!(
                        "{name} entry {} is not contiguous",
                        entry.number
                    )));
                }
                entry
                    .value()
                    .validate()
                    .map_err(|err| Error::InvalidEntry(format!("{name}: {err}")))?;
            }
        }
        for (name, descriptor) in &self.zvariables {
            descriptor.validate(name)?;
        }
        for (variable, attrs) in &self.variable_attributes {
            if !self.zvariables.contains_key(variable) {
                return Err(Error::UnknownVariable(variable.clone()));
            }
            for (name, value) in attrs {
                if !self.variable_attribute_names.contains(name) {
                    return Err(Error::UnknownAttribute(name.clone()));
                }
                value
                    .validate()
                    .map_err(|err| Error::InvalidEntry(format!("{variable}/{name}: {err}")))?;
            }
        }
        Ok(())
    }
}
