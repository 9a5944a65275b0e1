//! Schema registry
//!
//! Schemas are registered once through a [`RegistryBuilder`], checked,
//! compiled into matchers and frozen. The resulting [`Registry`] is
//! read-only and can be shared across threads.
//!
//! Variants sharing a mnemonic are tried in `(priority, suffixed first,
//! registration order)` order.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info};

use crate::compiler::{self, CompiledSchema, FragmentSource, FragmentTable, FrozenFragments};
use crate::config::EngineConfig;
use crate::error::RegistryError;
use crate::grammar::GrammarFragment;
use crate::kind::Kind;
use crate::schema::{Level, RecordSchema};

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    schemas: Vec<RecordSchema>,
    config: EngineConfig,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn register(mut self, schema: RecordSchema) -> Self {
        self.schemas.push(schema);
        self
    }

    pub fn extend(mut self, schemas: impl IntoIterator<Item = RecordSchema>) -> Self {
        self.schemas.extend(schemas);
        self
    }

    /// Check every schema, then compile all matchers.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let RegistryBuilder { schemas, config } = self;

        let mut by_name = HashMap::with_capacity(schemas.len());
        for (idx, schema) in schemas.iter().enumerate() {
            if by_name.insert(schema.name.clone(), idx).is_some() {
                return Err(RegistryError::DuplicateSchema(schema.name.clone()));
            }
        }
        for schema in &schemas {
            check_schema(schema)?;
        }

        let card_mnemonics = longest_first(&schemas, Level::Card);
        let option_mnemonics = longest_first(&schemas, Level::Option);
        for schema in &schemas {
            check_references(schema, &schemas, &by_name, &option_mnemonics)?;
        }

        let mut variants: HashMap<(Level, String), Vec<usize>> = HashMap::new();
        for (idx, schema) in schemas.iter().enumerate() {
            if schema.level != Level::Entry {
                variants
                    .entry((schema.level, schema.mnemonic.clone()))
                    .or_default()
                    .push(idx);
            }
        }
        for ((level, mnemonic), list) in variants.iter_mut() {
            check_group(*level, mnemonic, list, &schemas)?;
            list.sort_by_key(|&idx| {
                let schema = &schemas[idx];
                (schema.priority, schema.suffix.is_none(), idx)
            });
        }

        let mut table = FragmentTable::new(&schemas, &by_name, &option_mnemonics);
        for schema in schemas.iter().filter(|s| s.level == Level::Entry) {
            table.entry(&schema.name)?;
        }
        for schema in &schemas {
            check_boundaries(schema, &schemas, &by_name)?;
        }
        let compiled = schemas
            .iter()
            .map(|schema| compiler::compile_schema(schema, &mut table, &option_mnemonics, &config))
            .collect::<Result<Vec<_>, _>>()?;
        let item_matchers = compile_item_matchers(&schemas, &mut table, &config)?;
        let entry_fragments = table.into_entries();

        info!(
            schemas = schemas.len(),
            cards = card_mnemonics.len(),
            options = option_mnemonics.len(),
            entries = entry_fragments.len(),
            "schema registry built"
        );

        Ok(Registry {
            schemas: schemas.into_iter().map(Arc::new).collect(),
            compiled,
            by_name,
            variants,
            card_mnemonics,
            option_mnemonics,
            entry_fragments,
            item_matchers,
            config,
        })
    }
}

fn longest_first(schemas: &[RecordSchema], level: Level) -> Vec<String> {
    let mut mnemonics: Vec<String> = schemas
        .iter()
        .filter(|s| s.level == level)
        .map(|s| s.mnemonic.clone())
        .collect();
    mnemonics.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    mnemonics.dedup();
    mnemonics
}

fn valid_mnemonic(mnemonic: &str) -> bool {
    let mut chars = mnemonic.chars();
    let first_ok = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '*');
    first_ok
        && mnemonic
            .chars()
            .all(|c| !c.is_whitespace() && c != ':')
        && !mnemonic.ends_with(|c: char| c.is_ascii_digit())
}

fn check_schema(schema: &RecordSchema) -> Result<(), RegistryError> {
    let name = &schema.name;
    match schema.level {
        Level::Entry => {
            if !schema.mnemonic.is_empty() {
                return Err(RegistryError::EntryMnemonic {
                    schema: name.clone(),
                    mnemonic: schema.mnemonic.clone(),
                });
            }
            if schema.suffix.is_some() || schema.designator.is_some() {
                return Err(RegistryError::EntryHead(name.clone()));
            }
            if schema.attributes.iter().all(|a| a.is_omissible()) {
                return Err(RegistryError::EmptyEntry(name.clone()));
            }
        }
        Level::Card | Level::Option => {
            if schema.mnemonic.is_empty() {
                return Err(RegistryError::MissingMnemonic {
                    level: schema.level,
                    schema: name.clone(),
                });
            }
            if !valid_mnemonic(&schema.mnemonic) {
                return Err(RegistryError::InvalidMnemonic {
                    schema: name.clone(),
                    mnemonic: schema.mnemonic.clone(),
                });
            }
        }
    }

    if let Some(suffix) = &schema.suffix {
        if suffix.min > suffix.max {
            return Err(RegistryError::InvalidSuffixRange {
                schema: name.clone(),
                min: suffix.min,
                max: suffix.max,
            });
        }
    }

    let last = schema.attributes.len().saturating_sub(1);
    for (i, attribute) in schema.attributes.iter().enumerate() {
        if schema.attributes[..i].iter().any(|a| a.name == attribute.name) {
            return Err(RegistryError::DuplicateAttribute {
                schema: name.clone(),
                attribute: attribute.name.clone(),
            });
        }

        if let Kind::Options(_) = attribute.kind {
            if schema.level != Level::Card {
                return Err(RegistryError::OptionsOutsideCard {
                    schema: name.clone(),
                });
            }
            if i != last {
                return Err(RegistryError::OptionsNotLast {
                    schema: name.clone(),
                    attribute: attribute.name.clone(),
                });
            }
        }

        let mut nested_options = false;
        let mut bad_arity = None;
        attribute.kind.visit(&mut |kind| match kind {
            Kind::Repeated(rep) if !rep.arity.is_valid() => bad_arity = Some(rep.arity),
            Kind::Choice(choice) => {
                nested_options |= choice
                    .alternatives
                    .iter()
                    .any(|alt| matches!(alt, Kind::Options(_)));
            }
            Kind::Repeated(rep) => nested_options |= matches!(*rep.item, Kind::Options(_)),
            _ => {}
        });
        if nested_options {
            return Err(RegistryError::OptionsNotLast {
                schema: name.clone(),
                attribute: attribute.name.clone(),
            });
        }
        if let Some(arity) = bad_arity {
            return Err(RegistryError::InvalidArity {
                schema: name.clone(),
                attribute: attribute.name.clone(),
                min: arity.min,
                max: arity.max.unwrap_or_default(),
            });
        }

        for sibling in attribute.constraints.iter().filter_map(|c| c.sibling()) {
            let earlier = schema.attributes[..i].iter().any(|a| a.name == sibling);
            if !earlier {
                return Err(RegistryError::ForwardSiblingReference {
                    schema: name.clone(),
                    attribute: attribute.name.clone(),
                    sibling: sibling.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn check_references(
    schema: &RecordSchema,
    schemas: &[RecordSchema],
    by_name: &HashMap<String, usize>,
    option_mnemonics: &[String],
) -> Result<(), RegistryError> {
    for attribute in &schema.attributes {
        let mut result = Ok(());
        attribute.kind.visit(&mut |kind| {
            if result.is_err() {
                return;
            }
            match kind {
                Kind::Entry(entry) => {
                    let known = by_name
                        .get(entry)
                        .map_or(false, |&idx| schemas[idx].level == Level::Entry);
                    if !known {
                        result = Err(RegistryError::UnknownEntry {
                            schema: schema.name.clone(),
                            attribute: attribute.name.clone(),
                            entry: entry.clone(),
                        });
                    }
                }
                Kind::Options(set) => {
                    if let Some(option) = set
                        .accepted()
                        .iter()
                        .find(|m| !option_mnemonics.contains(*m))
                    {
                        result = Err(RegistryError::UnknownOption {
                            schema: schema.name.clone(),
                            attribute: attribute.name.clone(),
                            option: option.clone(),
                        });
                    } else if compiler::accepted_mnemonics(option_mnemonics, set).is_empty() {
                        result = Err(RegistryError::EmptyOptionSet {
                            schema: schema.name.clone(),
                            attribute: attribute.name.clone(),
                        });
                    }
                }
                _ => {}
            }
        });
        result?;
    }
    Ok(())
}

// ============================================================================
// Attribute boundaries
// ============================================================================

/// Token shapes, coarse enough to tell whether two kinds can read the same token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenClass {
    Numeric,
    Text,
    Designator,
    Jump,
    Distribution,
    Mnemonic,
}

impl TokenClass {
    fn overlaps(self, other: TokenClass) -> bool {
        use TokenClass::*;
        match (self, other) {
            (Text, _) | (_, Text) => true,
            (Mnemonic, Numeric) | (Numeric, Mnemonic) => false,
            (Mnemonic, _) | (_, Mnemonic) => true,
            (a, b) => a == b,
        }
    }
}

struct Shapes<'s> {
    schemas: &'s [RecordSchema],
    by_name: &'s HashMap<String, usize>,
}

impl<'s> Shapes<'s> {
    fn entry(&self, name: &str) -> Option<&'s RecordSchema> {
        self.by_name.get(name).map(|&idx| &self.schemas[idx])
    }

    fn terminal(kind: &Kind) -> Option<TokenClass> {
        Some(match kind {
            Kind::Integer | Kind::Real | Kind::Zaid => TokenClass::Numeric,
            Kind::Text => TokenClass::Text,
            Kind::Designator => TokenClass::Designator,
            Kind::Jump => TokenClass::Jump,
            Kind::Distribution => TokenClass::Distribution,
            Kind::Options(_) => TokenClass::Mnemonic,
            _ => return None,
        })
    }

    /// Classes of the first token a value of `kind` can start with.
    fn first(&self, kind: &Kind, out: &mut Vec<TokenClass>) {
        if let Some(class) = Self::terminal(kind) {
            out.push(class);
            return;
        }
        match kind {
            Kind::Repeated(rep) => self.first(&rep.item, out),
            Kind::Choice(choice) => choice.alternatives.iter().for_each(|alt| self.first(alt, out)),
            Kind::Entry(name) => {
                for attribute in self.entry(name).map_or(&[][..], |s| &s.attributes[..]) {
                    self.first(&attribute.kind, out);
                    if !attribute.is_omissible() {
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    /// Classes of every token a value of `kind` can contain.
    fn all(&self, kind: &Kind, out: &mut Vec<TokenClass>) {
        if let Some(class) = Self::terminal(kind) {
            out.push(class);
            return;
        }
        match kind {
            Kind::Repeated(rep) => self.all(&rep.item, out),
            Kind::Choice(choice) => choice.alternatives.iter().for_each(|alt| self.all(alt, out)),
            Kind::Entry(name) => {
                for attribute in self.entry(name).map_or(&[][..], |s| &s.attributes[..]) {
                    self.all(&attribute.kind, out);
                }
            }
            _ => {}
        }
    }

    /// Token count of `kind`, `None` when it varies.
    fn width(&self, kind: &Kind) -> Option<usize> {
        match kind {
            Kind::Repeated(rep) if rep.arity.max == Some(rep.arity.min) => {
                self.width(&rep.item).map(|w| w * rep.arity.min)
            }
            Kind::Repeated(_) | Kind::Options(_) => None,
            Kind::Choice(choice) => {
                let mut widths = choice.alternatives.iter().map(|alt| self.width(alt));
                let first = widths.next().flatten()?;
                widths.all(|w| w == Some(first)).then_some(first)
            }
            Kind::Entry(name) => self.entry(name)?.attributes.iter().try_fold(0, |sum, attribute| {
                if attribute.is_omissible() {
                    None
                } else {
                    self.width(&attribute.kind).map(|w| sum + w)
                }
            }),
            _ => Some(1),
        }
    }
}

/// An attribute that may be absent, or may span a varying number of tokens,
/// must not be followed by one that can start with a token it could take:
/// the text would not say where one ends and the next begins. The scan stops
/// at the first following attribute that is always present.
fn check_boundaries(
    schema: &RecordSchema,
    schemas: &[RecordSchema],
    by_name: &HashMap<String, usize>,
) -> Result<(), RegistryError> {
    let shapes = Shapes { schemas, by_name };
    for (i, attribute) in schema.attributes.iter().enumerate() {
        if !attribute.is_omissible() && shapes.width(&attribute.kind).is_some() {
            continue;
        }
        let mut taken = Vec::new();
        shapes.all(&attribute.kind, &mut taken);
        for next in &schema.attributes[i + 1..] {
            let mut leading = Vec::new();
            shapes.first(&next.kind, &mut leading);
            if taken.iter().any(|a| leading.iter().any(|b| a.overlaps(*b))) {
                return Err(RegistryError::AmbiguousBoundary {
                    schema: schema.name.clone(),
                    attribute: attribute.name.clone(),
                    next: next.name.clone(),
                });
            }
            if !next.is_omissible() {
                break;
            }
        }
    }
    Ok(())
}

fn check_group(
    level: Level,
    mnemonic: &str,
    variants: &[usize],
    schemas: &[RecordSchema],
) -> Result<(), RegistryError> {
    let Some((&first, rest)) = variants.split_first() else {
        return Ok(());
    };
    let group = schemas[first].group_id();
    if let Some(&other) = rest.iter().find(|&&idx| schemas[idx].group_id() != group) {
        return Err(RegistryError::GroupMismatch {
            level,
            mnemonic: mnemonic.to_string(),
            first: schemas[first].name.clone(),
            second: schemas[other].name.clone(),
        });
    }
    Ok(())
}

/// Anchored matchers for repeated items that span several tokens.
fn compile_item_matchers(
    schemas: &[RecordSchema],
    table: &mut FragmentTable<'_>,
    config: &EngineConfig,
) -> Result<HashMap<Kind, Regex>, RegistryError> {
    let mut items: Vec<(&str, &Kind)> = Vec::new();
    for schema in schemas {
        for attribute in &schema.attributes {
            attribute.kind.visit(&mut |kind| {
                if let Kind::Repeated(rep) = kind {
                    if !rep.item.is_single_token() {
                        items.push((schema.name.as_str(), rep.item.as_ref()));
                    }
                }
            });
        }
    }

    let mut matchers = HashMap::new();
    for (schema, item) in items {
        if matchers.contains_key(item) {
            continue;
        }
        let fragment = item.fragment(table)?;
        let matcher = compiler::compile(schema, &fragment.anchored().pattern(), config)?;
        debug!(schema, item = %item.describe(), "compiled repeated item matcher");
        matchers.insert(item.clone(), matcher);
    }
    Ok(matchers)
}

// ============================================================================
// Registry
// ============================================================================

/// Immutable set of compiled schemas.
#[derive(Debug)]
pub struct Registry {
    schemas: Vec<Arc<RecordSchema>>,
    compiled: Vec<CompiledSchema>,
    by_name: HashMap<String, usize>,
    variants: HashMap<(Level, String), Vec<usize>>,
    card_mnemonics: Vec<String>,
    option_mnemonics: Vec<String>,
    entry_fragments: HashMap<String, GrammarFragment>,
    item_matchers: HashMap<Kind, Regex>,
    config: EngineConfig,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn schema(&self, name: &str) -> Option<&RecordSchema> {
        self.index_of(name).map(|idx| self.schemas[idx].as_ref())
    }

    pub fn schemas(&self) -> impl Iterator<Item = &RecordSchema> {
        self.schemas.iter().map(|s| s.as_ref())
    }

    /// Variants of `mnemonic` at `level`, in trial order.
    pub fn variants(&self, level: Level, mnemonic: &str) -> Vec<&RecordSchema> {
        self.variant_indices(level, mnemonic)
            .iter()
            .map(|&idx| self.schemas[idx].as_ref())
            .collect()
    }

    /// Card mnemonics, longest first.
    pub fn card_mnemonics(&self) -> &[String] {
        &self.card_mnemonics
    }

    /// Option mnemonics, longest first.
    pub fn option_mnemonics(&self) -> &[String] {
        &self.option_mnemonics
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn variant_indices(&self, level: Level, mnemonic: &str) -> &[usize] {
        self.variants
            .get(&(level, mnemonic.to_ascii_lowercase()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn schema_at(&self, idx: usize) -> &Arc<RecordSchema> {
        &self.schemas[idx]
    }

    pub(crate) fn compiled_at(&self, idx: usize) -> &CompiledSchema {
        &self.compiled[idx]
    }

    pub(crate) fn item_matcher(&self, item: &Kind) -> Option<&Regex> {
        self.item_matchers.get(item)
    }

    pub(crate) fn fragments(&self) -> FrozenFragments<'_> {
        FrozenFragments {
            entries: &self.entry_fragments,
            option_mnemonics: &self.option_mnemonics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{Arity, OptionSet};
    use crate::schema::{AttributeSpec, CompareOp, Constraint, SuffixSpec};

    fn cel() -> RecordSchema {
        RecordSchema::option("cell", "cel").attribute(AttributeSpec::new("number", Kind::Integer))
    }

    #[test]
    fn test_registry_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }

    #[test]
    fn test_duplicate_schema_name() {
        let err = Registry::builder().register(cel()).register(cel()).build().unwrap_err();
        assert_eq!(err, RegistryError::DuplicateSchema("cell".to_string()));
    }

    #[test]
    fn test_mnemonic_rules() {
        let err = Registry::builder()
            .register(RecordSchema::option("bad", ""))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::MissingMnemonic { .. }));

        let err = Registry::builder()
            .register(RecordSchema::option("bad", "tr2"))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidMnemonic { .. }));

        assert!(valid_mnemonic("*tr"));
        assert!(!valid_mnemonic("1m"));
    }

    #[test]
    fn test_unknown_entry_reference() {
        let schema = RecordSchema::option("o", "o")
            .attribute(AttributeSpec::new("x", Kind::entry("missing")));
        let err = Registry::builder().register(schema).build().unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownEntry {
                schema: "o".to_string(),
                attribute: "x".to_string(),
                entry: "missing".to_string(),
            }
        );
    }

    #[test]
    fn test_options_must_be_last_on_a_card() {
        let card = RecordSchema::card("c", "c")
            .attribute(AttributeSpec::new("options", Kind::options(OptionSet::any())))
            .attribute(AttributeSpec::new("n", Kind::Integer));
        let err = Registry::builder().register(cel()).register(card).build().unwrap_err();
        assert!(matches!(err, RegistryError::OptionsNotLast { .. }));

        let option = RecordSchema::option("o", "o")
            .attribute(AttributeSpec::new("options", Kind::options(OptionSet::any())));
        let err = Registry::builder().register(cel()).register(option).build().unwrap_err();
        assert!(matches!(err, RegistryError::OptionsOutsideCard { .. }));
    }

    #[test]
    fn test_option_set_needs_registered_options() {
        let card = RecordSchema::card("c", "c")
            .attribute(AttributeSpec::new("options", Kind::options(OptionSet::any())));
        let err = Registry::builder().register(card.clone()).build().unwrap_err();
        assert!(matches!(err, RegistryError::EmptyOptionSet { .. }));

        let card = RecordSchema::card("c", "c")
            .attribute(AttributeSpec::new("options", Kind::options(OptionSet::of(["vol"]))));
        let err = Registry::builder().register(cel()).register(card).build().unwrap_err();
        assert!(matches!(err, RegistryError::UnknownOption { option, .. } if option == "vol"));
    }

    #[test]
    fn test_forward_sibling_reference() {
        let schema = RecordSchema::option("cut", "cut")
            .attribute(
                AttributeSpec::new("low", Kind::Real).with(Constraint::compare(CompareOp::Lt, "high")),
            )
            .attribute(AttributeSpec::new("high", Kind::Real));
        let err = Registry::builder().register(schema).build().unwrap_err();
        assert!(matches!(err, RegistryError::ForwardSiblingReference { sibling, .. } if sibling == "high"));
    }

    #[test]
    fn test_entry_checks() {
        let empty = RecordSchema::entry("e")
            .attribute(AttributeSpec::new("x", Kind::Real).optional());
        assert_eq!(
            Registry::builder().register(empty).build().unwrap_err(),
            RegistryError::EmptyEntry("e".to_string())
        );

        let headed = RecordSchema::entry("e")
            .with_suffix(SuffixSpec::optional())
            .attribute(AttributeSpec::new("x", Kind::Real));
        assert_eq!(
            Registry::builder().register(headed).build().unwrap_err(),
            RegistryError::EntryHead("e".to_string())
        );

        let recursive = RecordSchema::entry("e")
            .attribute(AttributeSpec::new("x", Kind::repeated(Kind::entry("e"), Arity::one_or_more())));
        assert_eq!(
            Registry::builder().register(recursive).build().unwrap_err(),
            RegistryError::RecursiveEntry("e".to_string())
        );
    }

    #[test]
    fn test_invalid_arity() {
        let schema = RecordSchema::option("o", "o")
            .attribute(AttributeSpec::new("x", Kind::repeated(Kind::Real, Arity::between(3, 2))));
        let err = Registry::builder().register(schema).build().unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArity { min: 3, max: 2, .. }));
    }

    #[test]
    fn test_variant_order() {
        let plain = RecordSchema::option("trcl-number", "trcl")
            .attribute(AttributeSpec::new("number", Kind::Integer));
        let late = RecordSchema::option("trcl-late", "trcl")
            .with_priority(5)
            .attribute(AttributeSpec::new("name", Kind::Text));
        let numbered = RecordSchema::option("trcl-numbered", "trcl")
            .with_suffix(SuffixSpec::optional())
            .attribute(AttributeSpec::new("values", Kind::repeated(Kind::Real, Arity::exactly(3))));
        let registry = Registry::builder()
            .register(late)
            .register(plain)
            .register(numbered)
            .build()
            .unwrap();
        let names: Vec<&str> = registry
            .variants(Level::Option, "TRCL")
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["trcl-numbered", "trcl-number", "trcl-late"]);
    }

    #[test]
    fn test_ambiguous_boundaries_are_rejected() {
        let both_optional = RecordSchema::option("opt", "opt")
            .attribute(AttributeSpec::new("a", Kind::Integer).optional())
            .attribute(AttributeSpec::new("b", Kind::Integer).optional());
        let err = Registry::builder().register(both_optional).build().unwrap_err();
        assert_eq!(
            err,
            RegistryError::AmbiguousBoundary {
                schema: "opt".to_string(),
                attribute: "a".to_string(),
                next: "b".to_string(),
            }
        );

        // A real may be written as a bare integer.
        let open_ended = RecordSchema::option("o", "o")
            .attribute(AttributeSpec::new("values", Kind::repeated(Kind::Real, Arity::one_or_more())))
            .attribute(AttributeSpec::new("count", Kind::Integer));
        let err = Registry::builder().register(open_ended).build().unwrap_err();
        assert!(matches!(err, RegistryError::AmbiguousBoundary { ref next, .. } if next == "count"));

        let through_entry = RecordSchema::entry("pair")
            .attribute(AttributeSpec::new("zaid", Kind::Zaid))
            .attribute(AttributeSpec::new("fraction", Kind::Real));
        let card = RecordSchema::card("mix", "mx")
            .attribute(AttributeSpec::new("tag", Kind::Integer).optional())
            .attribute(AttributeSpec::new("pairs", Kind::repeated(Kind::entry("pair"), Arity::one_or_more())));
        let err = Registry::builder()
            .register(through_entry)
            .register(card)
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::AmbiguousBoundary { ref attribute, .. } if attribute == "tag"));
    }

    #[test]
    fn test_distinct_boundaries_are_accepted() {
        let pair = RecordSchema::entry("pair")
            .attribute(AttributeSpec::new("zaid", Kind::Zaid))
            .attribute(AttributeSpec::new("fraction", Kind::Real));
        let card = RecordSchema::card("mix", "mx")
            .attribute(AttributeSpec::new("pairs", Kind::repeated(Kind::entry("pair"), Arity::one_or_more())))
            .attribute(AttributeSpec::new("options", Kind::options(OptionSet::any())));
        let fixed = RecordSchema::option("tr", "tr")
            .attribute(AttributeSpec::new("shift", Kind::repeated(Kind::Real, Arity::exactly(3))))
            .attribute(AttributeSpec::new("matrix", Kind::repeated(Kind::Real, Arity::between(0, 9))));
        let tagged = RecordSchema::option("tag", "tag")
            .attribute(AttributeSpec::new("count", Kind::Integer).optional())
            .attribute(AttributeSpec::new("particle", Kind::Designator).optional());
        let registry = Registry::builder()
            .register(pair)
            .register(card)
            .register(fixed)
            .register(tagged)
            .register(cel())
            .build()
            .unwrap();

        let record = registry.record("tag").unwrap().set("particle", "n").build().unwrap();
        assert_eq!(record.serialize(), "tag n");
        assert_eq!(registry.parse_option("tag", &record.serialize()).unwrap(), record);
    }

    #[test]
    fn test_group_mismatch() {
        let a = RecordSchema::option("a", "x").attribute(AttributeSpec::new("n", Kind::Integer));
        let b = RecordSchema::option("b", "x")
            .in_group("other")
            .attribute(AttributeSpec::new("r", Kind::Real));
        let err = Registry::builder().register(a).register(b).build().unwrap_err();
        assert!(matches!(err, RegistryError::GroupMismatch { .. }));
    }

    #[test]
    fn test_mnemonics_longest_first() {
        let registry = Registry::builder()
            .register(cel())
            .register(RecordSchema::option("c", "c").attribute(AttributeSpec::new("n", Kind::Integer)))
            .register(RecordSchema::option("cell-long", "cell").attribute(AttributeSpec::new("n", Kind::Integer)))
            .build()
            .unwrap();
        assert_eq!(registry.option_mnemonics(), &["cell", "cel", "c"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.schema("cell").is_some());
    }
}
