//! Schema file format
//!
//! A schema file is one YAML document with a version and three lists of
//! record definitions:
//!
//! ```yaml
//! version: "1.0"
//! entries:
//!   - name: substance
//!     attributes:
//!       - { name: zaid, kind: zaid }
//!       - { name: fraction, kind: real }
//! options:
//!   - name: cell
//!     mnemonic: cel
//!     attributes:
//!       - name: number
//!         kind: integer
//!         constraints: [{ range: { min: 1 } }]
//! cards:
//!   - name: material
//!     mnemonic: m
//!     suffix: { required: true }
//!     attributes:
//!       - name: substances
//!         kind: { repeated: { item: { entry: substance }, min: 1 } }
//!       - name: options
//!         kind: { options: { accepts: [nlib, gas] } }
//! ```
//!
//! Kinds are either a terminal name or a single-key map for a composite.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::combinators::{Arity, OptionSet};
use crate::kind::Kind;
use crate::schema::{
    AttributeSpec, Bound, CompareOp, Constraint, DesignatorSpec, RecordSchema, SuffixSpec,
    DEFAULT_SUFFIX_MAX,
};
use crate::terminals::Particle;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaFile {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub entries: Vec<SchemaDef>,
    #[serde(default)]
    pub options: Vec<SchemaDef>,
    #[serde(default)]
    pub cards: Vec<SchemaDef>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl SchemaFile {
    pub fn len(&self) -> usize {
        self.entries.len() + self.options.len() + self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append another file's definitions after this one's.
    pub fn merge(&mut self, other: SchemaFile) {
        self.entries.extend(other.entries);
        self.options.extend(other.options);
        self.cards.extend(other.cards);
    }

    /// Convert to schemas: entries, then options, then cards, each in file order.
    pub fn into_schemas(self) -> Result<Vec<RecordSchema>> {
        let mut schemas = Vec::with_capacity(self.len());
        for def in self.entries {
            let name = def.name.clone();
            let schema = def
                .into_schema(RecordSchema::entry(name.as_str()))
                .with_context(|| format!("Invalid entry '{}'", name))?;
            schemas.push(schema);
        }
        for def in self.options {
            let name = def.name.clone();
            let base = RecordSchema::option(name.as_str(), &def.mnemonic);
            let schema = def
                .into_schema(base)
                .with_context(|| format!("Invalid option '{}'", name))?;
            schemas.push(schema);
        }
        for def in self.cards {
            let name = def.name.clone();
            let base = RecordSchema::card(name.as_str(), &def.mnemonic);
            let schema = def
                .into_schema(base)
                .with_context(|| format!("Invalid card '{}'", name))?;
            schemas.push(schema);
        }
        Ok(schemas)
    }
}

// ============================================================================
// Record definitions
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDef {
    pub name: String,
    #[serde(default)]
    pub mnemonic: String,
    #[serde(default)]
    pub suffix: Option<SuffixDef>,
    #[serde(default)]
    pub designator: Option<DesignatorDef>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
}

impl SchemaDef {
    fn into_schema(self, base: RecordSchema) -> Result<RecordSchema> {
        let mut schema = base.with_priority(self.priority);
        if let Some(group) = self.group {
            schema = schema.in_group(group);
        }
        if let Some(suffix) = self.suffix {
            schema = schema.with_suffix(suffix.into_spec());
        }
        if let Some(designator) = self.designator {
            schema = schema.with_designator(designator.into_spec()?);
        }
        for attribute in self.attributes {
            let name = attribute.name.clone();
            let spec = attribute
                .into_spec()
                .with_context(|| format!("attribute '{}'", name))?;
            schema = schema.attribute(spec);
        }
        Ok(schema)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuffixDef {
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_suffix_min")]
    pub min: u64,
    #[serde(default = "default_suffix_max")]
    pub max: u64,
}

fn default_suffix_min() -> u64 {
    1
}

fn default_suffix_max() -> u64 {
    DEFAULT_SUFFIX_MAX
}

impl SuffixDef {
    fn into_spec(self) -> SuffixSpec {
        let spec = if self.required {
            SuffixSpec::required()
        } else {
            SuffixSpec::optional()
        };
        spec.range(self.min, self.max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignatorDef {
    #[serde(default)]
    pub required: bool,
    /// Particle symbols; omitted means every particle
    #[serde(default)]
    pub particles: Option<Vec<String>>,
}

impl DesignatorDef {
    fn into_spec(self) -> Result<DesignatorSpec> {
        let spec = if self.required {
            DesignatorSpec::required()
        } else {
            DesignatorSpec::optional()
        };
        match self.particles {
            Some(symbols) => {
                let particles = symbols
                    .iter()
                    .map(|symbol| particle(symbol))
                    .collect::<Result<Vec<_>>>()?;
                Ok(spec.allowing(particles))
            }
            None => Ok(spec),
        }
    }
}

fn particle(symbol: &str) -> Result<Particle> {
    let mut chars = symbol.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            Particle::from_symbol(c).ok_or_else(|| anyhow!("Unknown particle symbol '{}'", symbol))
        }
        _ => Err(anyhow!("Particle symbol must be one character, got '{}'", symbol)),
    }
}

// ============================================================================
// Attributes and kinds
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    pub kind: KindDef,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub constraints: Vec<ConstraintDef>,
}

impl AttributeDef {
    fn into_spec(self) -> Result<AttributeSpec> {
        let mut spec = AttributeSpec::new(self.name, self.kind.into_kind()?);
        if self.optional {
            spec = spec.optional();
        }
        for constraint in self.constraints {
            spec = spec.with(constraint.into_constraint()?);
        }
        Ok(spec)
    }
}

/// `integer`, or a single-key map such as `{ entry: substance }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KindDef {
    Named(String),
    Composite(Box<CompositeDef>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositeDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeated: Option<RepeatedDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<Vec<KindDef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OptionsDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepeatedDef {
    pub item: KindDef,
    #[serde(default)]
    pub min: usize,
    #[serde(default)]
    pub max: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionsDef {
    /// Accepted option mnemonics; empty accepts every registered option
    #[serde(default)]
    pub accepts: Vec<String>,
}

impl KindDef {
    pub fn into_kind(self) -> Result<Kind> {
        match self {
            KindDef::Named(name) => match name.trim().to_ascii_lowercase().as_str() {
                "integer" | "int" => Ok(Kind::Integer),
                "real" | "float" => Ok(Kind::Real),
                "string" | "text" => Ok(Kind::Text),
                "designator" => Ok(Kind::Designator),
                "zaid" => Ok(Kind::Zaid),
                "jump" => Ok(Kind::Jump),
                "distribution" => Ok(Kind::Distribution),
                other => Err(anyhow!("Unknown kind '{}'", other)),
            },
            KindDef::Composite(def) => def.into_kind(),
        }
    }
}

impl CompositeDef {
    fn into_kind(self) -> Result<Kind> {
        let set = [
            self.repeated.is_some(),
            self.choice.is_some(),
            self.entry.is_some(),
            self.options.is_some(),
        ]
        .iter()
        .filter(|s| **s)
        .count();
        if set != 1 {
            bail!("A composite kind needs exactly one of repeated, choice, entry, options");
        }

        if let Some(repeated) = self.repeated {
            let arity = match repeated.max {
                Some(max) => Arity::between(repeated.min, max),
                None => Arity::at_least(repeated.min),
            };
            return Ok(Kind::repeated(repeated.item.into_kind()?, arity));
        }
        if let Some(alternatives) = self.choice {
            if alternatives.is_empty() {
                bail!("A choice needs at least one alternative");
            }
            let kinds = alternatives
                .into_iter()
                .map(KindDef::into_kind)
                .collect::<Result<Vec<_>>>()?;
            return Ok(Kind::choice(kinds));
        }
        if let Some(entry) = self.entry {
            return Ok(Kind::entry(entry));
        }
        let accepts = self.options.unwrap_or_default().accepts;
        Ok(Kind::options(OptionSet::of(accepts)))
    }
}

// ============================================================================
// Constraints
// ============================================================================

/// Exactly one of the fields is set, e.g. `{ range: { min: 0, max: 1 } }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare: Option<CompareDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RangeDef {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub min_exclusive: bool,
    #[serde(default)]
    pub max_exclusive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareDef {
    pub op: CompareOp,
    pub sibling: String,
}

impl ConstraintDef {
    fn into_constraint(self) -> Result<Constraint> {
        match (self.range, self.one_of, self.members, self.compare) {
            (Some(range), None, None, None) => {
                if range.min.is_none() && range.max.is_none() {
                    bail!("A range needs min, max or both");
                }
                let bound = |value: f64, exclusive: bool| {
                    if exclusive {
                        Bound::exclusive(value)
                    } else {
                        Bound::inclusive(value)
                    }
                };
                Ok(Constraint::Range {
                    min: range.min.map(|v| bound(v, range.min_exclusive)),
                    max: range.max.map(|v| bound(v, range.max_exclusive)),
                })
            }
            (None, Some(words), None, None) => Ok(Constraint::one_of(words)),
            (None, None, Some(values), None) => Ok(Constraint::members(values)),
            (None, None, None, Some(compare)) => Ok(Constraint::compare(compare.op, compare.sibling)),
            _ => Err(anyhow!(
                "A constraint needs exactly one of range, one_of, members, compare"
            )),
        }
    }
}
