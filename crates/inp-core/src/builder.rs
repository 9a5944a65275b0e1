//! Building records in code
//!
//! [`RecordBuilder`] takes loose inputs (native numbers, strings, values,
//! records, lists of those) and routes each through the attribute kind's
//! text parser, so a record built in code passes exactly the same checks as
//! one parsed from a deck.
//!
//! ```ignore
//! let cell = registry.record("cell")?.set("number", 5).build()?;
//! assert_eq!(cell.serialize(), "cel 5");
//! ```

use std::sync::Arc;

use inp_types::{ErrorDomain, ErrorRecord, Granularity};
use tracing::debug;

use crate::parser::ParseContext;
use crate::record::Record;
use crate::registry::Registry;
use crate::schema::AttributeSpec;
use crate::terminals::{
    format_real, Designator, DistributionRef, Integer, Jump, Real, Terminal, Text, Zaid,
};
use crate::validator;
use crate::value::Value;

// ============================================================================
// Loose inputs
// ============================================================================

/// A value supplied by code, before it has been checked against a kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Value(Value),
    Text(String),
    List(Vec<Input>),
}

impl Input {
    /// The INP text this input stands for.
    pub fn render(&self) -> String {
        match self {
            Input::Value(value) => value.serialize(),
            Input::Text(text) => text.clone(),
            Input::List(items) => items
                .iter()
                .map(Input::render)
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Value(value)
    }
}

impl From<Record> for Input {
    fn from(record: Record) -> Self {
        Input::Value(Value::from(record))
    }
}

impl From<&str> for Input {
    fn from(text: &str) -> Self {
        Input::Text(text.to_string())
    }
}

impl From<String> for Input {
    fn from(text: String) -> Self {
        Input::Text(text)
    }
}

impl From<f64> for Input {
    fn from(value: f64) -> Self {
        Input::Text(format_real(value))
    }
}

impl<T: Into<Input>> From<Vec<T>> for Input {
    fn from(items: Vec<T>) -> Self {
        Input::List(items.into_iter().map(Into::into).collect())
    }
}

macro_rules! input_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Input {
                fn from(value: $ty) -> Self {
                    Input::Text(value.to_string())
                }
            }
        )*
    };
}

input_from_display!(i32, i64, u32, u64, usize);

macro_rules! input_from_terminal {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Input {
                fn from(value: $ty) -> Self {
                    Input::Value(Value::from(value))
                }
            }
        )*
    };
}

input_from_terminal!(Integer, Real, Text, Designator, Zaid, Jump, DistributionRef);

// ============================================================================
// Suffix counter
// ============================================================================

/// Source of default suffixes for records built without one.
///
/// Allocations are strictly increasing. Explicit suffixes are observed so
/// later defaults never reuse them. Once `u64::MAX` has been handed out the
/// counter is exhausted and allocates nothing more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixCounter {
    next: Option<u64>,
}

impl Default for SuffixCounter {
    fn default() -> Self {
        Self { next: Some(1) }
    }
}

impl SuffixCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(next: u64) -> Self {
        Self { next: Some(next) }
    }

    /// The suffix the next allocation returns, `None` when exhausted.
    pub fn peek(&self) -> Option<u64> {
        self.next
    }

    pub fn allocate(&mut self) -> Option<u64> {
        let suffix = self.next?;
        self.next = suffix.checked_add(1);
        Some(suffix)
    }

    pub fn observe(&mut self, used: u64) {
        if let Some(next) = self.next {
            if used >= next {
                self.next = used.checked_add(1);
            }
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

pub struct RecordBuilder<'r> {
    registry: &'r Registry,
    index: usize,
    suffix: Option<u64>,
    designator: Option<Input>,
    inputs: Vec<Option<Input>>,
    unknown: Vec<String>,
}

impl Registry {
    /// Start building a record of the named schema.
    pub fn record(&self, schema: &str) -> Result<RecordBuilder<'_>, ErrorRecord> {
        let index = self.index_of(schema).ok_or_else(|| {
            ErrorRecord::syntax(
                ErrorDomain::Inp,
                Granularity::File,
                format!("unknown record schema '{}'", schema),
                schema,
            )
        })?;
        Ok(RecordBuilder {
            registry: self,
            index,
            suffix: None,
            designator: None,
            inputs: vec![None; self.schema_at(index).attributes.len()],
            unknown: Vec::new(),
        })
    }
}

impl<'r> RecordBuilder<'r> {
    pub fn suffix(mut self, suffix: u64) -> Self {
        self.suffix = Some(suffix);
        self
    }

    pub fn designator(mut self, designator: impl Into<Input>) -> Self {
        self.designator = Some(designator.into());
        self
    }

    pub fn set(mut self, attribute: &str, input: impl Into<Input>) -> Self {
        match self.registry.schema_at(self.index).attribute_index(attribute) {
            Some(idx) => self.inputs[idx] = Some(input.into()),
            None => self.unknown.push(attribute.to_string()),
        }
        self
    }

    /// Validate and construct, stopping at the first violation.
    pub fn build(self) -> Result<Record, ErrorRecord> {
        self.finish(None)
    }

    /// As [`build`](Self::build), taking a default suffix from `counter` when
    /// the schema has a suffix slot and none was given.
    pub fn build_with(self, counter: &mut SuffixCounter) -> Result<Record, ErrorRecord> {
        self.finish(Some(counter))
    }

    /// Every violation at once, for tooling. Empty when `build` would succeed.
    pub fn diagnose(&self) -> Vec<ErrorRecord> {
        let schema = self.registry.schema_at(self.index);
        let mut ctx = ParseContext::new(self.registry, self.input_len());
        let mut errors: Vec<ErrorRecord> = self
            .unknown
            .iter()
            .map(|name| self.unknown_attribute(name))
            .collect();
        let mut failed: Vec<&str> = Vec::new();

        let designator = match &self.designator {
            Some(input) => match coerce_designator(input) {
                Ok(designator) => Some(designator),
                Err(err) => {
                    errors.push(err);
                    failed.push("designator");
                    None
                }
            },
            None => None,
        };

        let mut values = Vec::with_capacity(self.inputs.len());
        for (attribute, input) in schema.attributes.iter().zip(&self.inputs) {
            let value = match input {
                Some(input) => match coerce(attribute, input, &mut ctx) {
                    Ok(value) => Some(value),
                    Err(err) => {
                        errors.push(err);
                        failed.push(&attribute.name);
                        None
                    }
                },
                None => None,
            };
            values.push(value);
        }

        let record = Record::assemble(Arc::clone(schema), self.suffix, designator, values);
        errors.extend(validator::diagnose(&record).into_iter().filter(|err| {
            err.attribute
                .as_deref()
                .map_or(true, |name| !failed.contains(&name))
        }));
        errors
    }

    fn finish(self, counter: Option<&mut SuffixCounter>) -> Result<Record, ErrorRecord> {
        if let Some(name) = self.unknown.first() {
            return Err(self.unknown_attribute(name));
        }
        let schema = self.registry.schema_at(self.index);
        let mut ctx = ParseContext::new(self.registry, self.input_len());

        let mut counter = counter;
        let suffix = match (self.suffix, counter.as_deref_mut(), &schema.suffix) {
            (None, Some(counter), Some(_)) => {
                let suffix = counter.allocate().ok_or_else(|| {
                    ErrorRecord::semantics(
                        ErrorDomain::Inp,
                        schema.granularity(),
                        format!("{} '{}': suffix counter is exhausted", schema.level, schema.name),
                        schema.mnemonic.as_str(),
                    )
                    .with_attribute("suffix")
                })?;
                debug!(schema = %schema.name, suffix, "default suffix allocated");
                Some(suffix)
            }
            (suffix, _, _) => suffix,
        };
        let designator = self.designator.as_ref().map(coerce_designator).transpose()?;

        let mut values = Vec::with_capacity(self.inputs.len());
        for (attribute, input) in schema.attributes.iter().zip(&self.inputs) {
            values.push(match input {
                Some(input) => Some(coerce(attribute, input, &mut ctx)?),
                None => None,
            });
        }

        let record = Record::assemble(Arc::clone(schema), suffix, designator, values);
        validator::validate(&record)?;
        if let (Some(counter), Some(suffix)) = (counter, self.suffix) {
            counter.observe(suffix);
        }
        Ok(record)
    }

    fn input_len(&self) -> usize {
        self.inputs.iter().flatten().map(|input| input.render().len() + 1).sum()
    }

    fn unknown_attribute(&self, name: &str) -> ErrorRecord {
        let schema = self.registry.schema_at(self.index);
        ErrorRecord::semantics(
            ErrorDomain::Inp,
            schema.granularity(),
            format!("{} '{}' has no attribute '{}'", schema.level, schema.name, name),
            name,
        )
        .with_attribute(name)
    }
}

fn coerce(attribute: &AttributeSpec, input: &Input, ctx: &mut ParseContext<'_>) -> Result<Value, ErrorRecord> {
    let text = input.render();
    attribute.kind.parse(text.trim(), ctx).map_err(|err| {
        if err.attribute.is_some() {
            err
        } else {
            err.with_attribute(attribute.name.as_str())
        }
    })
}

fn coerce_designator(input: &Input) -> Result<Designator, ErrorRecord> {
    Designator::parse(input.render().trim()).map_err(|err| err.with_attribute("designator"))
}
