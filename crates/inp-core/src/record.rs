//! Records
//!
//! A [`Record`] is an immutable, validated instance of a schema: one value
//! per attribute plus the optional suffix and designator. It serializes to
//! canonical text that parses back to an equal record.

use std::fmt;
use std::sync::Arc;

use crate::schema::{AttributeSpec, Level, RecordSchema};
use crate::terminals::{Designator, Terminal};
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<RecordSchema>,
    suffix: Option<u64>,
    designator: Option<Designator>,
    values: Vec<Option<Value>>,
}

impl Record {
    /// Assemble a record; absent omissible attributes take their empty value.
    /// Callers validate the result before handing it out.
    pub(crate) fn assemble(
        schema: Arc<RecordSchema>,
        suffix: Option<u64>,
        designator: Option<Designator>,
        mut values: Vec<Option<Value>>,
    ) -> Self {
        values.resize(schema.attributes.len(), None);
        for (value, attribute) in values.iter_mut().zip(&schema.attributes) {
            if value.is_none() {
                *value = attribute.kind.empty_value();
            }
        }
        Self {
            schema,
            suffix,
            designator,
            values,
        }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Schema name.
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn level(&self) -> Level {
        self.schema.level
    }

    pub fn mnemonic(&self) -> &str {
        &self.schema.mnemonic
    }

    pub fn suffix(&self) -> Option<u64> {
        self.suffix
    }

    pub fn designator(&self) -> Option<&Designator> {
        self.designator.as_ref()
    }

    /// Value of the named attribute, if it is present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema
            .attribute_index(name)
            .and_then(|idx| self.values[idx].as_ref())
    }

    /// Attributes in declaration order with their values.
    pub fn attributes(&self) -> impl Iterator<Item = (&AttributeSpec, Option<&Value>)> {
        self.schema
            .attributes
            .iter()
            .zip(self.values.iter().map(Option::as_ref))
    }

    /// Options held by this card, in text order.
    pub fn options(&self) -> &[Record] {
        self.values
            .iter()
            .flatten()
            .find_map(Value::as_options)
            .unwrap_or(&[])
    }

    /// First option with the given mnemonic.
    pub fn option(&self, mnemonic: &str) -> Option<&Record> {
        self.options()
            .iter()
            .find(|o| o.mnemonic().eq_ignore_ascii_case(mnemonic))
    }

    /// Canonical text: head, then non-empty attribute renderings, space joined.
    pub fn serialize(&self) -> String {
        let mut head = self.schema.mnemonic.clone();
        if let Some(suffix) = self.suffix {
            head.push_str(&suffix.to_string());
        }
        if let Some(designator) = &self.designator {
            head.push(':');
            head.push_str(&designator.serialize());
        }

        let mut parts = Vec::with_capacity(self.values.len() + 1);
        if !head.is_empty() {
            parts.push(head);
        }
        parts.extend(
            self.values
                .iter()
                .flatten()
                .map(Value::serialize)
                .filter(|text| !text.is_empty()),
        );
        parts.join(" ")
    }
}

/// Attribute-wise equality; schemas compare by name.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name == other.schema.name
            && self.suffix == other.suffix
            && self.designator == other.designator
            && self.values == other.values
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}
