//! Attribute values
//!
//! One validated value per attribute of a [`Record`]. Terminals wrap the leaf
//! types, `List` holds a `Repeated` sequence, `Record` a nested entry and
//! `Options` the option records owned by a card.

use std::fmt;

use crate::record::Record;
use crate::terminals::{
    Designator, DistributionRef, Integer, Jump, Real, Terminal, Text, Zaid,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(Integer),
    Real(Real),
    Text(Text),
    Designator(Designator),
    Zaid(Zaid),
    Jump(Jump),
    Distribution(DistributionRef),
    List(Vec<Value>),
    Record(Box<Record>),
    Options(Vec<Record>),
}

impl Value {
    /// Render back to INP text. Empty sequences render as the empty string.
    pub fn serialize(&self) -> String {
        match self {
            Value::Integer(v) => v.serialize(),
            Value::Real(v) => v.serialize(),
            Value::Text(v) => v.serialize(),
            Value::Designator(v) => v.serialize(),
            Value::Zaid(v) => v.serialize(),
            Value::Jump(v) => v.serialize(),
            Value::Distribution(v) => v.serialize(),
            Value::List(items) => join_nonempty(items.iter().map(Value::serialize)),
            Value::Record(record) => record.serialize(),
            Value::Options(records) => join_nonempty(records.iter().map(Record::serialize)),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => Integer::NAME,
            Value::Real(_) => Real::NAME,
            Value::Text(_) => Text::NAME,
            Value::Designator(_) => Designator::NAME,
            Value::Zaid(_) => Zaid::NAME,
            Value::Jump(_) => Jump::NAME,
            Value::Distribution(_) => DistributionRef::NAME,
            Value::List(_) => "list",
            Value::Record(_) => "entry",
            Value::Options(_) => "options",
        }
    }

    /// Numeric view of integer and real values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(v.value() as f64),
            Value::Real(v) => Some(v.value()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(v.value()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_options(&self) -> Option<&[Record]> {
        match self {
            Value::Options(records) => Some(records),
            _ => None,
        }
    }

    pub fn as_zaid(&self) -> Option<&Zaid> {
        match self {
            Value::Zaid(z) => Some(z),
            _ => None,
        }
    }

    pub fn as_designator(&self) -> Option<&Designator> {
        match self {
            Value::Designator(d) => Some(d),
            _ => None,
        }
    }

    /// Jumps stand for "use the default" and are exempt from value checks.
    pub fn is_jump(&self) -> bool {
        matches!(self, Value::Jump(_))
    }

    /// Values that refer elsewhere instead of carrying a number.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Value::Jump(_) | Value::Distribution(_))
    }
}

fn join_nonempty(parts: impl Iterator<Item = String>) -> String {
    parts
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl From<Integer> for Value {
    fn from(v: Integer) -> Self {
        Value::Integer(v)
    }
}

impl From<Real> for Value {
    fn from(v: Real) -> Self {
        Value::Real(v)
    }
}

impl From<Text> for Value {
    fn from(v: Text) -> Self {
        Value::Text(v)
    }
}

impl From<Designator> for Value {
    fn from(v: Designator) -> Self {
        Value::Designator(v)
    }
}

impl From<Zaid> for Value {
    fn from(v: Zaid) -> Self {
        Value::Zaid(v)
    }
}

impl From<Jump> for Value {
    fn from(v: Jump) -> Self {
        Value::Jump(v)
    }
}

impl From<DistributionRef> for Value {
    fn from(v: DistributionRef) -> Self {
        Value::Distribution(v)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(Box::new(record))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_serialization_skips_empty() {
        let list = Value::List(vec![
            Value::Integer(Integer(1)),
            Value::List(vec![]),
            Value::Jump(Jump::parse("2j").unwrap()),
        ]);
        assert_eq!(list.serialize(), "1 2j");
        assert_eq!(Value::List(vec![]).serialize(), "");
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::Integer(Integer(3)).as_f64(), Some(3.0));
        assert_eq!(Value::Real(Real::parse("0.5").unwrap()).as_f64(), Some(0.5));
        assert_eq!(Value::Jump(Jump::parse("j").unwrap()).as_f64(), None);
        assert!(Value::Distribution(DistributionRef::parse("d1").unwrap()).is_placeholder());
    }

    #[test]
    fn test_display_is_canonical_text() {
        for value in [
            Value::Real(Real::parse("1.5e-7").unwrap()),
            Value::Real(Real::parse("2.0").unwrap()),
            Value::List(vec![Value::Integer(Integer(4)), Value::Jump(Jump::parse("3J").unwrap())]),
        ] {
            assert_eq!(value.to_string(), value.serialize());
        }
        assert_eq!(Value::Real(Real::parse("2.0").unwrap()).to_string(), "2");
    }
}
