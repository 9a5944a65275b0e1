//! Attribute kinds
//!
//! What an attribute holds: a terminal, a combinator over other kinds, a
//! nested entry (by schema name) or a card's option set.

use inp_types::ErrorRecord;

use crate::combinators::{Arity, Choice, OptionSet, Repeated};
use crate::compiler::FragmentSource;
use crate::error::RegistryError;
use crate::grammar::GrammarFragment;
use crate::parser::ParseContext;
use crate::terminals::{
    Designator, DistributionRef, Integer, Jump, Real, Terminal, Text, Zaid,
};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    Integer,
    Real,
    Text,
    Designator,
    Zaid,
    Jump,
    Distribution,
    Repeated(Repeated),
    Choice(Choice),
    /// Nested entry, by schema name
    Entry(String),
    Options(OptionSet),
}

impl Kind {
    pub fn repeated(item: Kind, arity: Arity) -> Self {
        Kind::Repeated(Repeated::new(item, arity))
    }

    pub fn choice(alternatives: impl IntoIterator<Item = Kind>) -> Self {
        Kind::Choice(Choice::new(alternatives))
    }

    pub fn entry(name: impl Into<String>) -> Self {
        Kind::Entry(name.into())
    }

    pub fn options(accepts: OptionSet) -> Self {
        Kind::Options(accepts)
    }

    pub fn describe(&self) -> String {
        match self {
            Kind::Integer => Integer::NAME.to_string(),
            Kind::Real => Real::NAME.to_string(),
            Kind::Text => Text::NAME.to_string(),
            Kind::Designator => Designator::NAME.to_string(),
            Kind::Zaid => Zaid::NAME.to_string(),
            Kind::Jump => Jump::NAME.to_string(),
            Kind::Distribution => DistributionRef::NAME.to_string(),
            Kind::Repeated(rep) => format!("{} {}", rep.arity, rep.item.describe()),
            Kind::Choice(choice) => choice.describe(),
            Kind::Entry(name) => format!("entry '{}'", name),
            Kind::Options(_) => "options".to_string(),
        }
    }

    /// Whether every value of this kind is exactly one whitespace-free token.
    pub fn is_single_token(&self) -> bool {
        match self {
            Kind::Integer
            | Kind::Real
            | Kind::Text
            | Kind::Designator
            | Kind::Zaid
            | Kind::Jump
            | Kind::Distribution => true,
            Kind::Choice(choice) => choice.alternatives.iter().all(Kind::is_single_token),
            Kind::Repeated(_) | Kind::Entry(_) | Kind::Options(_) => false,
        }
    }

    /// Kinds whose slot may be absent from the text and still yield a value.
    pub fn is_omissible(&self) -> bool {
        match self {
            Kind::Repeated(rep) => rep.arity.min == 0,
            Kind::Options(_) => true,
            _ => false,
        }
    }

    /// The value an absent omissible slot stands for.
    pub fn empty_value(&self) -> Option<Value> {
        match self {
            Kind::Repeated(rep) if rep.arity.min == 0 => Some(Value::List(Vec::new())),
            Kind::Options(_) => Some(Value::Options(Vec::new())),
            _ => None,
        }
    }

    /// Call `f` on this kind and every kind nested in it.
    pub fn visit<'k>(&'k self, f: &mut dyn FnMut(&'k Kind)) {
        f(self);
        match self {
            Kind::Repeated(rep) => rep.item.visit(f),
            Kind::Choice(choice) => {
                for alternative in &choice.alternatives {
                    alternative.visit(f);
                }
            }
            _ => {}
        }
    }

    /// Capture-free, anchor-free fragment of this kind.
    pub(crate) fn fragment(
        &self,
        source: &mut dyn FragmentSource,
    ) -> Result<GrammarFragment, RegistryError> {
        Ok(match self {
            Kind::Integer => Integer::fragment(),
            Kind::Real => Real::fragment(),
            Kind::Text => Text::fragment(),
            Kind::Designator => Designator::fragment(),
            Kind::Zaid => Zaid::fragment(),
            Kind::Jump => Jump::fragment(),
            Kind::Distribution => DistributionRef::fragment(),
            Kind::Repeated(rep) => rep.fragment(source)?,
            Kind::Choice(choice) => choice.fragment(source)?,
            Kind::Entry(name) => source.entry(name)?,
            Kind::Options(set) => OptionSet::fragment(&source.option_mnemonics(set)),
        })
    }

    /// Parse `text` as a value of this kind.
    pub(crate) fn parse(&self, text: &str, ctx: &mut ParseContext<'_>) -> Result<Value, ErrorRecord> {
        match self {
            Kind::Integer => terminal::<Integer>(text, ctx),
            Kind::Real => terminal::<Real>(text, ctx),
            Kind::Text => terminal::<Text>(text, ctx),
            Kind::Designator => terminal::<Designator>(text, ctx),
            Kind::Zaid => terminal::<Zaid>(text, ctx),
            Kind::Jump => terminal::<Jump>(text, ctx),
            Kind::Distribution => terminal::<DistributionRef>(text, ctx),
            Kind::Repeated(rep) => rep.parse(text, ctx),
            Kind::Choice(choice) => choice.parse(text, ctx),
            Kind::Entry(name) => ctx.parse_entry(name, text).map(Value::from),
            Kind::Options(set) => ctx.dispatch_options(set, text).map(Value::Options),
        }
    }
}

fn terminal<T>(text: &str, ctx: &mut ParseContext<'_>) -> Result<Value, ErrorRecord>
where
    T: Terminal + Into<Value>,
{
    ctx.charge(text.len(), text)?;
    Ok(T::parse(text)?.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_token_kinds() {
        assert!(Kind::Real.is_single_token());
        assert!(Kind::choice([Kind::Jump, Kind::Real]).is_single_token());
        assert!(!Kind::choice([Kind::Real, Kind::entry("substance")]).is_single_token());
        assert!(!Kind::repeated(Kind::Real, Arity::exactly(3)).is_single_token());
    }

    #[test]
    fn test_omissible_kinds() {
        assert!(Kind::repeated(Kind::Real, Arity::zero_or_more()).is_omissible());
        assert!(!Kind::repeated(Kind::Real, Arity::one_or_more()).is_omissible());
        assert!(Kind::options(OptionSet::any()).is_omissible());
        assert_eq!(
            Kind::repeated(Kind::Real, Arity::zero_or_more()).empty_value(),
            Some(Value::List(vec![]))
        );
        assert_eq!(Kind::Integer.empty_value(), None);
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            Kind::repeated(Kind::Real, Arity::exactly(3)).describe(),
            "exactly 3 real"
        );
        assert_eq!(
            Kind::choice([Kind::Jump, Kind::Real]).describe(),
            "one of (jump | real)"
        );
    }

    #[test]
    fn test_visit_reaches_nested_kinds() {
        let kind = Kind::repeated(
            Kind::choice([Kind::Jump, Kind::entry("pair")]),
            Arity::one_or_more(),
        );
        let mut seen = Vec::new();
        kind.visit(&mut |k| seen.push(k.describe()));
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[3], "entry 'pair'");
    }
}
