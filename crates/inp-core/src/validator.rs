//! Record validator
//!
//! Checks a record against its schema after the grammar has accepted it:
//! suffix, then designator, then every attribute's constraints in declaration
//! order. [`validate`] stops at the first violation; [`diagnose`] walks the
//! whole record and returns every violation.
//!
//! All findings are Semantics errors at the record's granularity, tagged with
//! the failing attribute (`suffix` and `designator` for the head slots).
//!
//! # Constraint application
//!
//! - Custom predicates see the attribute's whole value.
//! - Every other constraint applies to each leaf of a sequence.
//! - Jumps and distribution references are placeholders and skip value checks.

use inp_types::{ErrorDomain, ErrorRecord};

use crate::record::Record;
use crate::schema::{AttributeSpec, Bound, Constraint};
use crate::terminals::{format_real, Terminal};
use crate::value::Value;

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// How far a validation pass goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Stop at the first violation
    FailFast,
    /// Report every violation
    CollectAll,
}

/// Fail-fast validation used by every construction path.
pub(crate) fn validate(record: &Record) -> Result<(), ErrorRecord> {
    match run(record, Mode::FailFast).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Every violation in `record`, in check order. Empty when it is valid.
pub fn diagnose(record: &Record) -> Vec<ErrorRecord> {
    run(record, Mode::CollectAll)
}

fn run(record: &Record, mode: Mode) -> Vec<ErrorRecord> {
    let mut findings = Findings {
        record,
        mode,
        context: None,
        errors: Vec::new(),
    };
    check_suffix(&mut findings);
    check_designator(&mut findings);
    for (spec, value) in record.attributes() {
        if findings.done() {
            break;
        }
        check_attribute(&mut findings, spec, value);
    }
    findings.errors
}

// =============================================================================
// FINDINGS
// =============================================================================

struct Findings<'a> {
    record: &'a Record,
    mode: Mode,
    /// Serialized record, rendered on the first finding
    context: Option<String>,
    errors: Vec<ErrorRecord>,
}

impl Findings<'_> {
    fn done(&self) -> bool {
        self.mode == Mode::FailFast && !self.errors.is_empty()
    }

    fn report(&mut self, attribute: &str, message: String) {
        if self.done() {
            return;
        }
        let record = self.record;
        let context = self.context.get_or_insert_with(|| record.serialize());
        self.errors.push(
            ErrorRecord::semantics(
                ErrorDomain::Inp,
                record.schema().granularity(),
                message,
                context,
            )
            .with_attribute(attribute),
        );
    }
}

// =============================================================================
// HEAD SLOTS
// =============================================================================

fn check_suffix(findings: &mut Findings<'_>) {
    let record = findings.record;
    let schema = record.schema();
    match (&schema.suffix, record.suffix()) {
        (None, Some(suffix)) => findings.report(
            "suffix",
            format!("{} '{}' takes no suffix (found {})", schema.level, schema.name, suffix),
        ),
        (Some(spec), None) if spec.required => findings.report(
            "suffix",
            format!("{} '{}' requires a suffix", schema.level, schema.name),
        ),
        (Some(spec), Some(suffix)) if !spec.contains(suffix) => findings.report(
            "suffix",
            format!("suffix {} outside {}..={}", suffix, spec.min, spec.max),
        ),
        _ => {}
    }
}

fn check_designator(findings: &mut Findings<'_>) {
    let record = findings.record;
    let schema = record.schema();
    match (&schema.designator, record.designator()) {
        (None, Some(designator)) => findings.report(
            "designator",
            format!(
                "{} '{}' takes no designator (found '{}')",
                schema.level,
                schema.name,
                designator.serialize()
            ),
        ),
        (Some(spec), None) if spec.required => findings.report(
            "designator",
            format!("{} '{}' requires a particle designator", schema.level, schema.name),
        ),
        (Some(spec), Some(designator)) => {
            for particle in designator.particles() {
                if !spec.allows(*particle) {
                    findings.report(
                        "designator",
                        format!("particle '{}' not allowed on '{}'", particle.symbol(), schema.name),
                    );
                }
            }
        }
        _ => {}
    }
}

// =============================================================================
// ATTRIBUTES
// =============================================================================

fn check_attribute(findings: &mut Findings<'_>, spec: &AttributeSpec, value: Option<&Value>) {
    let value = match value {
        Some(value) => value,
        None if spec.is_omissible() => return,
        None => {
            findings.report(&spec.name, format!("missing required attribute '{}'", spec.name));
            return;
        }
    };

    for constraint in &spec.constraints {
        if findings.done() {
            return;
        }
        if let Err(message) = check_constraint(findings.record, constraint, value) {
            findings.report(&spec.name, format!("{}: {}", spec.name, message));
        }
    }
}

fn check_constraint(record: &Record, constraint: &Constraint, value: &Value) -> Result<(), String> {
    if let Constraint::Custom(predicate) = constraint {
        return (predicate.check)(value).map_err(|msg| format!("{} ({})", msg, predicate.name));
    }

    let mut items = Vec::new();
    leaves(value, &mut items);
    for item in items.into_iter().filter(|v| !v.is_placeholder()) {
        match constraint {
            Constraint::Range { min, max } => {
                let x = number(item)?;
                if let Some(bound) = min {
                    if !above(x, bound) {
                        return Err(format!(
                            "value {} must be {} {}",
                            format_real(x),
                            if bound.inclusive { ">=" } else { ">" },
                            format_real(bound.value)
                        ));
                    }
                }
                if let Some(bound) = max {
                    if !below(x, bound) {
                        return Err(format!(
                            "value {} must be {} {}",
                            format_real(x),
                            if bound.inclusive { "<=" } else { "<" },
                            format_real(bound.value)
                        ));
                    }
                }
            }
            Constraint::OneOf(words) => {
                let text = item.serialize();
                if !words.iter().any(|w| w.eq_ignore_ascii_case(&text)) {
                    return Err(format!("'{}' is not one of {{{}}}", text, words.join(", ")));
                }
            }
            Constraint::Members(members) => {
                let x = number(item)?;
                if !members.iter().any(|m| *m as f64 == x) {
                    let listed: Vec<String> = members.iter().map(i64::to_string).collect();
                    return Err(format!(
                        "{} is not one of [{}]",
                        format_real(x),
                        listed.join(", ")
                    ));
                }
            }
            Constraint::Compare { op, sibling } => {
                // An absent or placeholder sibling has nothing to compare.
                let Some(right) = record.get(sibling).and_then(Value::as_f64) else {
                    continue;
                };
                let x = number(item)?;
                if !op.holds(x, right) {
                    return Err(format!(
                        "value {} must be {} {} ({})",
                        format_real(x),
                        op.symbol(),
                        sibling,
                        format_real(right)
                    ));
                }
            }
            Constraint::Custom(_) => {}
        }
    }
    Ok(())
}

fn leaves<'v>(value: &'v Value, out: &mut Vec<&'v Value>) {
    match value {
        Value::List(items) => items.iter().for_each(|item| leaves(item, out)),
        other => out.push(other),
    }
}

fn number(value: &Value) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("expected a number, found {} '{}'", value.type_name(), value))
}

fn above(x: f64, bound: &Bound) -> bool {
    if bound.inclusive {
        x >= bound.value
    } else {
        x > bound.value
    }
}

fn below(x: f64, bound: &Bound) -> bool {
    if bound.inclusive {
        x <= bound.value
    } else {
        x < bound.value
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use inp_types::Granularity;

    use super::*;
    use crate::combinators::Arity;
    use crate::kind::Kind;
    use crate::schema::{CompareOp, DesignatorSpec, Predicate, RecordSchema, SuffixSpec};
    use crate::terminals::{Designator, Integer, Jump, Particle, Real, Text};

    fn int(v: i64) -> Value {
        Value::Integer(Integer(v))
    }

    fn real(v: f64) -> Value {
        Value::Real(Real::new(v).unwrap())
    }

    fn transform() -> Arc<RecordSchema> {
        Arc::new(
            RecordSchema::card("transform", "tr")
                .with_suffix(SuffixSpec::required().range(1, 999))
                .attribute(AttributeSpec::new("low", Kind::Real))
                .attribute(
                    AttributeSpec::new("high", Kind::Real)
                        .with(Constraint::compare(CompareOp::Gt, "low")),
                )
                .attribute(
                    AttributeSpec::new("weights", Kind::repeated(Kind::Real, Arity::zero_or_more()))
                        .with(Constraint::between(0.0, 1.0)),
                )
                .attribute(
                    AttributeSpec::new("unit", Kind::Text)
                        .optional()
                        .with(Constraint::one_of(["deg", "rad"])),
                ),
        )
    }

    fn record(suffix: Option<u64>, values: Vec<Option<Value>>) -> Record {
        Record::assemble(transform(), suffix, None, values)
    }

    #[test]
    fn test_valid_record() {
        let rec = record(Some(3), vec![Some(real(0.0)), Some(real(1.0))]);
        assert!(validate(&rec).is_ok());
        assert!(diagnose(&rec).is_empty());
    }

    #[test]
    fn test_suffix_out_of_range_is_semantics() {
        let err = validate(&record(Some(1000), vec![Some(real(0.0)), Some(real(1.0))])).unwrap_err();
        assert!(err.is_semantics());
        assert_eq!(err.granularity, Granularity::Card);
        assert_eq!(err.attribute.as_deref(), Some("suffix"));
        assert!(err.message.contains("1000"));
    }

    #[test]
    fn test_missing_required_suffix() {
        let err = validate(&record(None, vec![Some(real(0.0)), Some(real(1.0))])).unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("suffix"));
    }

    #[test]
    fn test_missing_required_attribute() {
        let err = validate(&record(Some(1), vec![Some(real(0.0))])).unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("high"));
        assert!(err.message.contains("missing"));
    }

    #[test]
    fn test_sibling_comparison() {
        let err = validate(&record(Some(1), vec![Some(real(2.0)), Some(real(1.0))])).unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("high"));
        assert!(err.message.contains("> low"));
    }

    #[test]
    fn test_range_applies_elementwise_and_skips_jumps() {
        let weights = Value::List(vec![real(0.5), Value::Jump(Jump::new(2).unwrap()), real(0.25)]);
        let rec = record(Some(1), vec![Some(real(0.0)), Some(real(1.0)), Some(weights)]);
        assert!(validate(&rec).is_ok());

        let weights = Value::List(vec![real(0.5), real(1.5)]);
        let rec = record(Some(1), vec![Some(real(0.0)), Some(real(1.0)), Some(weights)]);
        let err = validate(&rec).unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("weights"));
        assert!(err.message.contains("1.5"));
    }

    #[test]
    fn test_one_of_is_case_insensitive() {
        let unit = |s: &str| Some(Value::Text(Text::parse(s).unwrap()));
        let ok = record(Some(1), vec![Some(real(0.0)), Some(real(1.0)), None, unit("DEG")]);
        assert!(validate(&ok).is_ok());
        let bad = record(Some(1), vec![Some(real(0.0)), Some(real(1.0)), None, unit("grad")]);
        assert_eq!(validate(&bad).unwrap_err().attribute.as_deref(), Some("unit"));
    }

    #[test]
    fn test_diagnose_collects_every_violation() {
        let weights = Value::List(vec![real(2.0)]);
        let rec = record(Some(5000), vec![Some(real(3.0)), Some(real(1.0)), Some(weights)]);
        let errors = diagnose(&rec);
        let attrs: Vec<_> = errors.iter().filter_map(|e| e.attribute.as_deref()).collect();
        assert_eq!(attrs, vec!["suffix", "high", "weights"]);
        assert_eq!(validate(&rec).unwrap_err(), errors[0]);
    }

    #[test]
    fn test_designator_checks() {
        let schema = Arc::new(
            RecordSchema::option("importance", "imp")
                .with_designator(DesignatorSpec::required().allowing([Particle::Neutron, Particle::Photon])),
        );
        let missing = Record::assemble(Arc::clone(&schema), None, None, vec![]);
        let err = validate(&missing).unwrap_err();
        assert!(err.is_semantics());
        assert_eq!(err.attribute.as_deref(), Some("designator"));

        let electron = Record::assemble(schema, None, Some(Designator::single(Particle::Electron)), vec![]);
        assert!(validate(&electron).unwrap_err().message.contains("'e'"));
    }

    #[test]
    fn test_members_and_custom_predicates() {
        fn even(value: &Value) -> Result<(), String> {
            match value.as_i64() {
                Some(v) if v % 2 == 0 => Ok(()),
                _ => Err("must be even".to_string()),
            }
        }
        let schema = Arc::new(
            RecordSchema::option("mode", "mode").attribute(
                AttributeSpec::new("code", Kind::Integer)
                    .with(Constraint::members([1, 2, 3, 4]))
                    .with(Constraint::Custom(Predicate { name: "even", check: even })),
            ),
        );
        let rec = |v| Record::assemble(Arc::clone(&schema), None, None, vec![Some(int(v))]);
        assert!(validate(&rec(2)).is_ok());
        assert!(validate(&rec(5)).unwrap_err().message.contains("not one of"));
        assert!(validate(&rec(3)).unwrap_err().message.contains("even"));
    }
}
