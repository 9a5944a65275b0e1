//! Record schemas
//!
//! Declarative description of a card, option or entry. Schemas are plain
//! data: they are registered into a [`crate::Registry`], which compiles and
//! checks them once and never changes them afterwards.

use std::fmt;

use inp_types::Granularity;
use serde::{Deserialize, Serialize};

use crate::kind::Kind;
use crate::terminals::Particle;
use crate::value::Value;

// ============================================================================
// Level
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Card,
    Option,
    Entry,
}

impl Level {
    pub fn granularity(&self) -> Granularity {
        match self {
            Level::Card => Granularity::Card,
            Level::Option => Granularity::Option,
            Level::Entry => Granularity::Entry,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Card => "Card",
            Level::Option => "Option",
            Level::Entry => "Entry",
        })
    }
}

// ============================================================================
// Suffix and designator slots
// ============================================================================

/// Largest suffix accepted when a schema does not narrow the range.
pub const DEFAULT_SUFFIX_MAX: u64 = 99_999_999;

/// Numeric suffix written directly after the mnemonic (`m1`, `tr12`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuffixSpec {
    pub required: bool,
    pub min: u64,
    pub max: u64,
}

impl SuffixSpec {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    pub fn optional() -> Self {
        Self::default()
    }

    pub fn range(mut self, min: u64, max: u64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn contains(&self, suffix: u64) -> bool {
        (self.min..=self.max).contains(&suffix)
    }
}

impl Default for SuffixSpec {
    fn default() -> Self {
        Self {
            required: false,
            min: 1,
            max: DEFAULT_SUFFIX_MAX,
        }
    }
}

/// Particle designator written after a colon (`imp:n`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesignatorSpec {
    pub required: bool,
    /// Particles allowed; `None` allows every particle
    pub particles: Option<Vec<Particle>>,
}

impl DesignatorSpec {
    pub fn required() -> Self {
        Self {
            required: true,
            particles: None,
        }
    }

    pub fn optional() -> Self {
        Self::default()
    }

    pub fn allowing(mut self, particles: impl IntoIterator<Item = Particle>) -> Self {
        self.particles = Some(particles.into_iter().collect());
        self
    }

    pub fn allows(&self, particle: Particle) -> bool {
        self.particles
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&particle))
    }
}

// ============================================================================
// Constraints
// ============================================================================

/// One end of a numeric range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub value: f64,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(value: f64) -> Self {
        Self {
            value,
            inclusive: true,
        }
    }

    pub fn exclusive(value: f64) -> Self {
        Self {
            value,
            inclusive: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Ne,
}

impl CompareOp {
    pub fn holds(&self, left: f64, right: f64) -> bool {
        match self {
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::Gt => left > right,
            CompareOp::Ge => left >= right,
            CompareOp::Ne => left != right,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Ne => "!=",
        }
    }
}

/// A predicate defined in code, for checks the declarative constraints
/// cannot express.
#[derive(Clone, Copy)]
pub struct Predicate {
    pub name: &'static str,
    pub check: fn(&Value) -> Result<(), String>,
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").field("name", &self.name).finish()
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Numeric range; either end may be open
    Range {
        min: Option<Bound>,
        max: Option<Bound>,
    },
    /// Case-insensitive string membership
    OneOf(Vec<String>),
    /// Integer membership
    Members(Vec<i64>),
    /// Comparison against an earlier sibling attribute
    Compare { op: CompareOp, sibling: String },
    Custom(Predicate),
}

impl Constraint {
    /// Inclusive `[min, max]`.
    pub fn between(min: f64, max: f64) -> Self {
        Constraint::Range {
            min: Some(Bound::inclusive(min)),
            max: Some(Bound::inclusive(max)),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Constraint::Range {
            min: Some(Bound::inclusive(min)),
            max: None,
        }
    }

    pub fn positive() -> Self {
        Constraint::Range {
            min: Some(Bound::exclusive(0.0)),
            max: None,
        }
    }

    pub fn one_of<S: Into<String>>(words: impl IntoIterator<Item = S>) -> Self {
        Constraint::OneOf(words.into_iter().map(Into::into).collect())
    }

    pub fn members(values: impl IntoIterator<Item = i64>) -> Self {
        Constraint::Members(values.into_iter().collect())
    }

    pub fn compare(op: CompareOp, sibling: impl Into<String>) -> Self {
        Constraint::Compare {
            op,
            sibling: sibling.into(),
        }
    }

    pub fn sibling(&self) -> Option<&str> {
        match self {
            Constraint::Compare { sibling, .. } => Some(sibling),
            _ => None,
        }
    }
}

// ============================================================================
// Attributes
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    /// Attribute name, also the code reported when it fails validation
    pub name: String,
    pub kind: Kind,
    pub optional: bool,
    pub constraints: Vec<Constraint>,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
            constraints: Vec::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Whether the attribute's text may be left out entirely.
    pub fn is_omissible(&self) -> bool {
        self.optional || self.kind.is_omissible()
    }
}

// ============================================================================
// Record schema
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub level: Level,
    /// Unique across the registry
    pub name: String,
    /// Lowercase keyword; empty for entries
    pub mnemonic: String,
    pub attributes: Vec<AttributeSpec>,
    pub suffix: Option<SuffixSpec>,
    pub designator: Option<DesignatorSpec>,
    /// Variant group; defaults to the mnemonic
    pub group: Option<String>,
    /// Lower values are tried first among variants of one mnemonic
    pub priority: i32,
}

impl RecordSchema {
    fn new(level: Level, name: impl Into<String>, mnemonic: &str) -> Self {
        Self {
            level,
            name: name.into(),
            mnemonic: mnemonic.to_ascii_lowercase(),
            attributes: Vec::new(),
            suffix: None,
            designator: None,
            group: None,
            priority: 0,
        }
    }

    pub fn card(name: impl Into<String>, mnemonic: &str) -> Self {
        Self::new(Level::Card, name, mnemonic)
    }

    pub fn option(name: impl Into<String>, mnemonic: &str) -> Self {
        Self::new(Level::Option, name, mnemonic)
    }

    pub fn entry(name: impl Into<String>) -> Self {
        Self::new(Level::Entry, name, "")
    }

    pub fn attribute(mut self, spec: AttributeSpec) -> Self {
        self.attributes.push(spec);
        self
    }

    pub fn with_suffix(mut self, spec: SuffixSpec) -> Self {
        self.suffix = Some(spec);
        self
    }

    pub fn with_designator(mut self, spec: DesignatorSpec) -> Self {
        self.designator = Some(spec);
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn group_id(&self) -> &str {
        self.group.as_deref().unwrap_or(&self.mnemonic)
    }

    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    pub fn attribute_spec(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn granularity(&self) -> Granularity {
        self.level.granularity()
    }
}
