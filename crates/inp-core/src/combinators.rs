//! Combinators
//!
//! `Repeated` is a homogeneous, space separated sequence with an arity.
//! `Choice` is an ordered alternation: the first alternative that parses wins
//! and earlier failures are discarded. `OptionSet` is the trailing slot of a
//! card that holds its options.

use std::fmt;

use inp_types::{ErrorDomain, ErrorRecord, Granularity};
use tracing::trace;

use crate::compiler::FragmentSource;
use crate::error::RegistryError;
use crate::grammar::GrammarFragment;
use crate::kind::Kind;
use crate::parser::ParseContext;
use crate::value::Value;

// ============================================================================
// Arity
// ============================================================================

/// Element count allowed in a [`Repeated`] sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub const fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    pub const fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: Some(n) }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// An upper bound must allow at least one element and be no lower than `min`.
    pub fn is_valid(&self) -> bool {
        match self.max {
            Some(max) => max >= 1 && max >= self.min,
            None => true,
        }
    }

    pub fn admits(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "exactly {}", max),
            Some(max) => write!(f, "{} to {}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

// ============================================================================
// Repeated
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repeated {
    pub item: Box<Kind>,
    pub arity: Arity,
}

impl Repeated {
    pub fn new(item: Kind, arity: Arity) -> Self {
        Self {
            item: Box::new(item),
            arity,
        }
    }

    /// Fragment of the non-empty form; absence of a zero-or-more sequence is
    /// expressed by the enclosing slot.
    pub(crate) fn fragment(
        &self,
        source: &mut dyn FragmentSource,
    ) -> Result<GrammarFragment, RegistryError> {
        Ok(self
            .item
            .fragment(source)?
            .repeated(self.arity.min.max(1), self.arity.max))
    }

    pub(crate) fn parse(&self, text: &str, ctx: &mut ParseContext<'_>) -> Result<Value, ErrorRecord> {
        let text = text.trim();
        if text.is_empty() {
            if self.arity.min == 0 {
                return Ok(Value::List(Vec::new()));
            }
            return Err(self.arity_error(0, text));
        }

        let items = if self.item.is_single_token() {
            text.split_whitespace()
                .map(|token| self.item.parse(token, ctx))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            ctx.split_compound(self, text)?
        };

        if !self.arity.admits(items.len()) {
            return Err(self.arity_error(items.len(), text));
        }
        Ok(Value::List(items))
    }

    pub(crate) fn arity_error(&self, found: usize, text: &str) -> ErrorRecord {
        ErrorRecord::syntax(
            ErrorDomain::Types,
            Granularity::Entry,
            format!(
                "expected {} {}, found {}",
                self.arity,
                self.item.describe(),
                found
            ),
            text,
        )
    }
}

// ============================================================================
// Choice
// ============================================================================

/// Ordered alternation. When two alternatives accept the same text the one
/// declared first always wins, so each use site must list them in the order
/// it wants ties resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Choice {
    pub alternatives: Vec<Kind>,
}

impl Choice {
    pub fn new(alternatives: impl IntoIterator<Item = Kind>) -> Self {
        Self {
            alternatives: alternatives.into_iter().collect(),
        }
    }

    pub(crate) fn fragment(
        &self,
        source: &mut dyn FragmentSource,
    ) -> Result<GrammarFragment, RegistryError> {
        let alternatives = self
            .alternatives
            .iter()
            .map(|alt| alt.fragment(source))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(GrammarFragment::alternation(alternatives))
    }

    pub(crate) fn parse(&self, text: &str, ctx: &mut ParseContext<'_>) -> Result<Value, ErrorRecord> {
        let mut failures = Vec::with_capacity(self.alternatives.len());
        for alternative in &self.alternatives {
            match alternative.parse(text, ctx) {
                Ok(value) => return Ok(value),
                // Budget exhaustion is never recovered from.
                Err(err) if ctx.is_exhausted() => return Err(err),
                Err(err) => {
                    trace!(alternative = %alternative.describe(), "choice alternative rejected");
                    failures.push(format!("{}: {}", alternative.describe(), err.message));
                }
            }
        }
        Err(ErrorRecord::syntax(
            ErrorDomain::Types,
            Granularity::Entry,
            format!("no alternative matched ({})", failures.join("; ")),
            text,
        ))
    }

    pub fn describe(&self) -> String {
        let names: Vec<String> = self.alternatives.iter().map(Kind::describe).collect();
        format!("one of ({})", names.join(" | "))
    }
}

// ============================================================================
// Option set
// ============================================================================

/// The options slot of a card: which option mnemonics it accepts.
///
/// An empty `accepts` list accepts every registered option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OptionSet {
    accepts: Vec<String>,
}

impl OptionSet {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn of<I, S>(mnemonics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut accepts: Vec<String> = mnemonics
            .into_iter()
            .map(|m| m.as_ref().to_ascii_lowercase())
            .collect();
        accepts.sort();
        accepts.dedup();
        Self { accepts }
    }

    pub fn accepted(&self) -> &[String] {
        &self.accepts
    }

    pub fn accepts(&self, mnemonic: &str) -> bool {
        self.accepts.is_empty() || self.accepts.iter().any(|m| m.eq_ignore_ascii_case(mnemonic))
    }

    /// An option mnemonic followed by a suffix digit, designator colon,
    /// whitespace or the end, then anything up to the end.
    pub(crate) fn fragment(mnemonics: &[String]) -> GrammarFragment {
        let heads = GrammarFragment::alternation(mnemonics.iter().map(|m| GrammarFragment::literal(m)));
        heads.then(GrammarFragment::new(r"(?:[0-9:\s][\s\S]*)?"))
    }
}
