//! Grammar compiler
//!
//! Splices a schema's attribute fragments into one pattern:
//!
//! ```text
//! mnemonic (suffix)? (":" designator)? attr1 attr2 ...
//! ```
//!
//! Each schema gets a fully anchored, case-insensitive matcher with one
//! capture group per slot. Options also get a leading-span matcher whose
//! match must end at the end of the input or right before another option
//! mnemonic. Nested entries are spliced capture-free.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

use crate::combinators::OptionSet;
use crate::config::EngineConfig;
use crate::error::RegistryError;
use crate::grammar::GrammarFragment;
use crate::schema::{Level, RecordSchema};
use crate::terminals::{Designator, Terminal};

/// Resolves the parts of a fragment that depend on other schemas.
pub(crate) trait FragmentSource {
    /// Capture-free fragment of the entry schema `name`.
    fn entry(&mut self, name: &str) -> Result<GrammarFragment, RegistryError>;

    /// Registered option mnemonics accepted by `set`, longest first.
    fn option_mnemonics(&self, set: &OptionSet) -> Vec<String>;
}

/// Capture group index of every slot in a schema's full matcher.
#[derive(Debug, Clone, Default)]
pub(crate) struct Slots {
    pub suffix: Option<usize>,
    pub designator: Option<usize>,
    pub attributes: Vec<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledSchema {
    pub full: Regex,
    /// Options only
    pub leading: Option<Regex>,
    pub slots: Slots,
}

/// Build the fragment for `schema`; with `capture` every slot gets a group.
pub(crate) fn sequence(
    schema: &RecordSchema,
    capture: bool,
    source: &mut dyn FragmentSource,
) -> Result<(GrammarFragment, Slots), RegistryError> {
    let wrap = |fragment: GrammarFragment| {
        if capture {
            fragment.capture()
        } else {
            fragment
        }
    };
    let mut slots = Slots::default();
    let mut frag = GrammarFragment::literal(&schema.mnemonic);

    // Suffix and designator stay syntactically optional even when required,
    // so their absence is reported by the validator.
    if schema.suffix.is_some() {
        slots.suffix = Some(frag.groups() + 1);
        frag = frag.then(wrap(GrammarFragment::new("[0-9]+")).optional());
    }
    if schema.designator.is_some() {
        slots.designator = Some(frag.groups() + 1);
        frag = frag.then(
            GrammarFragment::literal(":")
                .then(wrap(Designator::fragment()))
                .optional(),
        );
    }

    let headed = !schema.mnemonic.is_empty();
    let first_required = schema.attributes.iter().position(|a| !a.is_omissible());
    for (i, attribute) in schema.attributes.iter().enumerate() {
        let index = frag.groups() + 1;
        let piece = wrap(attribute.kind.fragment(source)?);
        frag = if !headed && first_required.map_or(true, |r| i < r) {
            // Leading omissible attributes of an entry carry their own separator.
            frag.then(piece.then(GrammarFragment::separator()).optional())
        } else if !headed && first_required == Some(i) {
            frag.then(piece)
        } else if attribute.is_omissible() {
            frag.then(GrammarFragment::separator().then(piece).optional())
        } else {
            frag.spaced(piece)
        };
        slots.attributes.push(index);
    }
    Ok((frag, slots))
}

/// `^(BODY)` followed by another option mnemonic or the end.
pub(crate) fn leading_fragment(body: &GrammarFragment, option_mnemonics: &[String]) -> GrammarFragment {
    let heads = GrammarFragment::alternation(
        option_mnemonics
            .iter()
            .map(|m| GrammarFragment::literal(m)),
    );
    let next_option = GrammarFragment::separator()
        .then(heads)
        .then(GrammarFragment::new(r"[0-9:\s]|$"));
    let end = GrammarFragment::new(r"\s*$");
    body.embedded()
        .capture()
        .then(GrammarFragment::alternation([next_option, end]))
}

pub(crate) fn compile(
    schema: &str,
    pattern: &str,
    config: &EngineConfig,
) -> Result<Regex, RegistryError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(config.regex_size_limit)
        .build()
        .map_err(|e| RegistryError::Pattern {
            schema: schema.to_string(),
            message: e.to_string(),
        })
}

/// Compile the full (and, for options, leading) matcher of one schema.
pub(crate) fn compile_schema(
    schema: &RecordSchema,
    source: &mut dyn FragmentSource,
    all_option_mnemonics: &[String],
    config: &EngineConfig,
) -> Result<CompiledSchema, RegistryError> {
    let (captured, slots) = sequence(schema, true, source)?;
    let full = compile(&schema.name, &captured.anchored().pattern(), config)?;
    let leading = if schema.level == Level::Option {
        let (plain, _) = sequence(schema, false, source)?;
        let leading = leading_fragment(&plain, all_option_mnemonics);
        Some(compile(&schema.name, &leading.prefix_pattern(), config)?)
    } else {
        None
    };
    Ok(CompiledSchema {
        full,
        leading,
        slots,
    })
}

// ============================================================================
// Fragment table
// ============================================================================

/// Memoized entry fragments used while a registry is being built.
pub(crate) struct FragmentTable<'s> {
    schemas: &'s [RecordSchema],
    by_name: &'s HashMap<String, usize>,
    option_mnemonics: &'s [String],
    memo: HashMap<String, GrammarFragment>,
    visiting: Vec<String>,
}

impl<'s> FragmentTable<'s> {
    pub fn new(
        schemas: &'s [RecordSchema],
        by_name: &'s HashMap<String, usize>,
        option_mnemonics: &'s [String],
    ) -> Self {
        Self {
            schemas,
            by_name,
            option_mnemonics,
            memo: HashMap::new(),
            visiting: Vec::new(),
        }
    }

    pub fn into_entries(self) -> HashMap<String, GrammarFragment> {
        self.memo
    }
}

impl FragmentSource for FragmentTable<'_> {
    fn entry(&mut self, name: &str) -> Result<GrammarFragment, RegistryError> {
        if let Some(fragment) = self.memo.get(name) {
            return Ok(fragment.clone());
        }
        if self.visiting.iter().any(|v| v == name) {
            return Err(RegistryError::RecursiveEntry(name.to_string()));
        }
        let (schemas, by_name) = (self.schemas, self.by_name);
        let schema = by_name
            .get(name)
            .map(|&idx| &schemas[idx])
            .filter(|s| s.level == Level::Entry)
            .ok_or_else(|| RegistryError::UnknownEntry {
                schema: self.visiting.last().cloned().unwrap_or_default(),
                attribute: String::new(),
                entry: name.to_string(),
            })?;

        self.visiting.push(name.to_string());
        let result = sequence(schema, false, self);
        self.visiting.pop();
        let (fragment, _) = result?;
        self.memo.insert(name.to_string(), fragment.clone());
        Ok(fragment)
    }

    fn option_mnemonics(&self, set: &OptionSet) -> Vec<String> {
        accepted_mnemonics(self.option_mnemonics, set)
    }
}

pub(crate) fn accepted_mnemonics(all: &[String], set: &OptionSet) -> Vec<String> {
    all.iter().filter(|m| set.accepts(m)).cloned().collect()
}

/// Read-only source over the fragments of a built registry.
pub(crate) struct FrozenFragments<'r> {
    pub entries: &'r HashMap<String, GrammarFragment>,
    pub option_mnemonics: &'r [String],
}

impl FragmentSource for FrozenFragments<'_> {
    fn entry(&mut self, name: &str) -> Result<GrammarFragment, RegistryError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownEntry {
                schema: String::new(),
                attribute: String::new(),
                entry: name.to_string(),
            })
    }

    fn option_mnemonics(&self, set: &OptionSet) -> Vec<String> {
        accepted_mnemonics(self.option_mnemonics, set)
    }
}
