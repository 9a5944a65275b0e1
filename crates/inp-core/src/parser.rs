//! Parse / dispatch engine
//!
//! A card is matched whole against its anchored matcher. The text captured by
//! its trailing option slot is then segmented left to right: at each step
//! the candidates are the options whose mnemonic prefixes the remainder,
//! longest mnemonic first, then variant order. The first candidate whose
//! leading-span matcher accepts is re-parsed with its full matcher and
//! validated, and the remainder advances past it. Accepted spans are never
//! revisited.
//!
//! Every matcher call is charged against a step budget proportional to the
//! input length.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use inp_types::{ErrorDomain, ErrorRecord, Granularity};
use regex::Regex;
use tracing::{debug, trace};

use crate::combinators::{OptionSet, Repeated};
use crate::compiler;
use crate::error::RegistryError;
use crate::kind::Kind;
use crate::record::Record;
use crate::registry::Registry;
use crate::schema::{Level, RecordSchema};
use crate::terminals::{Designator, Terminal};
use crate::validator;
use crate::value::Value;

/// Characters of oversized input kept in the error context.
const OVERSIZE_CONTEXT_CHARS: usize = 80;

// ============================================================================
// Parse context
// ============================================================================

/// Per-call parse state: the registry and the remaining step budget.
pub struct ParseContext<'r> {
    registry: &'r Registry,
    remaining: usize,
    spent: usize,
    exhausted: bool,
    local_matchers: HashMap<Kind, Regex>,
}

impl<'r> ParseContext<'r> {
    pub(crate) fn new(registry: &'r Registry, input_len: usize) -> Self {
        Self {
            registry,
            remaining: registry.config().step_budget(input_len),
            spent: 0,
            exhausted: false,
            local_matchers: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Steps used so far.
    pub fn spent(&self) -> usize {
        self.spent
    }

    /// Spend `cost` steps (at least one) before running a matcher.
    pub(crate) fn charge(&mut self, cost: usize, context: &str) -> Result<(), ErrorRecord> {
        let cost = cost.max(1);
        if self.exhausted || cost > self.remaining {
            self.exhausted = true;
            return Err(ErrorRecord::syntax(
                ErrorDomain::Inp,
                Granularity::File,
                format!("step budget exhausted after {} steps", self.spent),
                context,
            ));
        }
        self.remaining -= cost;
        self.spent += cost;
        Ok(())
    }

    /// Parse `text` with exactly the schema at `idx`, then validate.
    pub(crate) fn parse_schema(&mut self, idx: usize, text: &str) -> Result<Record, ErrorRecord> {
        let registry = self.registry;
        let schema = registry.schema_at(idx);
        let compiled = registry.compiled_at(idx);

        self.charge(text.len(), text)?;
        let caps = compiled.full.captures(text).ok_or_else(|| {
            ErrorRecord::syntax(
                ErrorDomain::Inp,
                schema.granularity(),
                format!("text does not match {} '{}'", schema.level, schema.name),
                text,
            )
        })?;

        let suffix = compiled
            .slots
            .suffix
            .and_then(|slot| caps.get(slot))
            .map(|m| parse_suffix(m.as_str()));
        let designator = match compiled.slots.designator.and_then(|slot| caps.get(slot)) {
            Some(m) => Some(Designator::parse(m.as_str()).map_err(|e| e.with_attribute("designator"))?),
            None => None,
        };

        let mut values = Vec::with_capacity(schema.attributes.len());
        for (attribute, &slot) in schema.attributes.iter().zip(&compiled.slots.attributes) {
            let value = match caps.get(slot) {
                Some(m) => Some(
                    attribute
                        .kind
                        .parse(m.as_str(), self)
                        .map_err(|e| name_attribute(e, &attribute.name))?,
                ),
                None => attribute.kind.empty_value(),
            };
            values.push(value);
        }

        let record = Record::assemble(Arc::clone(schema), suffix, designator, values);
        validator::validate(&record)?;
        trace!(schema = %schema.name, "record parsed");
        Ok(record)
    }

    /// Try the variants of `mnemonic` in order; the first whose full matcher
    /// accepts `text` is parsed and its errors are final.
    pub(crate) fn parse_variants(
        &mut self,
        level: Level,
        mnemonic: &str,
        text: &str,
    ) -> Result<Record, ErrorRecord> {
        let registry = self.registry;
        let candidates = registry.variant_indices(level, mnemonic);
        if candidates.is_empty() {
            return Err(ErrorRecord::syntax(
                ErrorDomain::Inp,
                level.granularity(),
                format!("unknown {} mnemonic '{}'", level, mnemonic),
                text,
            ));
        }
        match self.select_variant(candidates, text)? {
            Some(idx) => self.parse_schema(idx, text),
            None => Err(ErrorRecord::syntax(
                ErrorDomain::Inp,
                level.granularity(),
                format!("text matches no {} '{}' variant", level, mnemonic),
                text,
            )),
        }
    }

    fn select_variant(&mut self, candidates: &[usize], text: &str) -> Result<Option<usize>, ErrorRecord> {
        let registry = self.registry;
        for &idx in candidates {
            self.charge(text.len(), text)?;
            let name = &registry.schema_at(idx).name;
            if registry.compiled_at(idx).full.is_match(text) {
                debug!(schema = %name, "variant selected");
                return Ok(Some(idx));
            }
            trace!(schema = %name, "variant rejected");
        }
        Ok(None)
    }

    /// Dispatch over every card mnemonic that prefixes `text`.
    pub(crate) fn parse_any_card(&mut self, text: &str) -> Result<Record, ErrorRecord> {
        let registry = self.registry;
        for mnemonic in registry.card_mnemonics() {
            if !starts_with_mnemonic(text, mnemonic) {
                continue;
            }
            let candidates = registry.variant_indices(Level::Card, mnemonic);
            if let Some(idx) = self.select_variant(candidates, text)? {
                return self.parse_schema(idx, text);
            }
        }
        Err(ErrorRecord::syntax(
            ErrorDomain::Inp,
            Granularity::Card,
            format!("no card matches '{}'", first_token(text)),
            text,
        ))
    }

    pub(crate) fn parse_entry(&mut self, name: &str, text: &str) -> Result<Record, ErrorRecord> {
        let idx = self
            .registry
            .index_of(name)
            .filter(|&idx| self.registry.schema_at(idx).level == Level::Entry)
            .ok_or_else(|| unknown_schema("entry", name, text))?;
        self.parse_schema(idx, text)
    }

    /// Segment `text` into option records, left to right, without backtracking.
    pub(crate) fn dispatch_options(
        &mut self,
        set: &OptionSet,
        text: &str,
    ) -> Result<Vec<Record>, ErrorRecord> {
        let registry = self.registry;
        let mut records = Vec::new();
        let mut remainder = text.trim();

        while !remainder.is_empty() {
            let mut accepted = None;
            'search: for mnemonic in registry.option_mnemonics() {
                if !set.accepts(mnemonic) || !starts_with_mnemonic(remainder, mnemonic) {
                    continue;
                }
                for &idx in registry.variant_indices(Level::Option, mnemonic) {
                    let Some(leading) = &registry.compiled_at(idx).leading else {
                        continue;
                    };
                    // A rejected candidate costs its mnemonic; an accepted one
                    // also pays for the span it consumed.
                    self.charge(mnemonic.len(), remainder)?;
                    if let Some(span) = leading.captures(remainder).and_then(|c| c.get(1)) {
                        self.charge(span.end(), remainder)?;
                        accepted = Some((idx, span.end()));
                        break 'search;
                    }
                    trace!(schema = %registry.schema_at(idx).name, "option candidate rejected");
                }
            }

            let Some((idx, end)) = accepted else {
                return Err(ErrorRecord::syntax(
                    ErrorDomain::Inp,
                    Granularity::Option,
                    format!("no option matches '{}'", first_token(remainder)),
                    remainder,
                ));
            };
            let span = remainder[..end].trim_end();
            debug!(option = %registry.schema_at(idx).name, span, "option accepted");
            records.push(self.parse_schema(idx, span)?);
            remainder = remainder[end..].trim_start();
        }
        Ok(records)
    }

    /// Split a sequence of multi-token items. Each item takes the shortest
    /// token run its matcher accepts; when the rest of the sequence cannot be
    /// split, the previous item is retried with a longer run.
    pub(crate) fn split_compound(&mut self, rep: &Repeated, text: &str) -> Result<Vec<Value>, ErrorRecord> {
        let item = rep.item.as_ref();
        let matcher = self.item_matcher(item, text)?;
        let tokens = token_spans(text);
        let (min_tokens, max_tokens) = token_bounds(self.registry, item);
        let first = |pos: usize| pos + min_tokens.max(1);
        let last = |pos: usize| max_tokens.map_or(tokens.len(), |max| (pos + max).min(tokens.len()));

        // Item ends chosen so far; (position, item count) pairs known to lead nowhere.
        let mut cuts: Vec<usize> = Vec::new();
        let mut dead: HashSet<(usize, usize)> = HashSet::new();
        let mut furthest = 0;
        let mut covered = None;
        let mut pos = 0;
        let mut next_k = first(0);
        let mut fresh = true;

        loop {
            if pos == tokens.len() {
                if rep.arity.admits(cuts.len()) {
                    break;
                }
                covered = Some(cuts.len());
            } else if !(fresh && dead.contains(&(pos, cuts.len())))
                && rep.arity.max.map_or(true, |max| cuts.len() < max)
            {
                let mut advanced = false;
                for k in next_k..=last(pos) {
                    let slice = &text[tokens[pos].0..tokens[k - 1].1];
                    self.charge(slice.len(), slice)?;
                    if matcher.is_match(slice) {
                        cuts.push(k);
                        pos = k;
                        furthest = furthest.max(pos);
                        next_k = first(pos);
                        fresh = true;
                        advanced = true;
                        break;
                    }
                }
                if advanced {
                    continue;
                }
            }

            dead.insert((pos, cuts.len()));
            let Some(end) = cuts.pop() else {
                if let Some(found) = covered {
                    return Err(rep.arity_error(found, text));
                }
                let context = tokens.get(furthest).map_or("", |&(start, _)| &text[start..]);
                return Err(ErrorRecord::syntax(
                    ErrorDomain::Types,
                    Granularity::Entry,
                    format!("expected {}", item.describe()),
                    context,
                ));
            };
            pos = cuts.last().copied().unwrap_or(0);
            next_k = end + 1;
            fresh = false;
        }

        let mut items = Vec::with_capacity(cuts.len());
        let mut start = 0;
        for end in cuts {
            items.push(item.parse(&text[tokens[start].0..tokens[end - 1].1], self)?);
            start = end;
        }
        Ok(items)
    }

    fn item_matcher(&mut self, item: &Kind, text: &str) -> Result<Regex, ErrorRecord> {
        if let Some(matcher) = self.registry.item_matcher(item) {
            return Ok(matcher.clone());
        }
        if let Some(matcher) = self.local_matchers.get(item) {
            return Ok(matcher.clone());
        }
        let registry = self.registry;
        let mut source = registry.fragments();
        let matcher = item
            .fragment(&mut source)
            .and_then(|fragment| {
                compiler::compile(&item.describe(), &fragment.anchored().pattern(), registry.config())
            })
            .map_err(|e| registry_error(e, text))?;
        self.local_matchers.insert(item.clone(), matcher.clone());
        Ok(matcher)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Suffix digits; values beyond `u64` saturate and fail the range check.
fn parse_suffix(digits: &str) -> u64 {
    digits.parse().unwrap_or(u64::MAX)
}

fn name_attribute(err: ErrorRecord, attribute: &str) -> ErrorRecord {
    if err.attribute.is_some() {
        err
    } else {
        err.with_attribute(attribute)
    }
}

fn starts_with_mnemonic(text: &str, mnemonic: &str) -> bool {
    text.get(..mnemonic.len())
        .map_or(false, |head| head.eq_ignore_ascii_case(mnemonic))
}

fn first_token(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

fn token_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push((s, i));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}

/// Minimum and maximum number of tokens a value of `kind` spans.
fn token_bounds(registry: &Registry, kind: &Kind) -> (usize, Option<usize>) {
    match kind {
        Kind::Repeated(rep) => {
            let (min, max) = token_bounds(registry, &rep.item);
            (
                min.saturating_mul(rep.arity.min),
                max.zip(rep.arity.max).map(|(a, b)| a.saturating_mul(b)),
            )
        }
        Kind::Choice(choice) => {
            let bounds: Vec<_> = choice
                .alternatives
                .iter()
                .map(|alt| token_bounds(registry, alt))
                .collect();
            let min = bounds.iter().map(|b| b.0).min().unwrap_or(0);
            let max = bounds
                .iter()
                .map(|b| b.1)
                .try_fold(0, |acc, max| max.map(|m| acc.max(m)));
            (min, max)
        }
        Kind::Entry(name) => match registry.schema(name) {
            Some(schema) => entry_bounds(registry, schema),
            None => (1, None),
        },
        Kind::Options(_) => (0, None),
        _ => (1, Some(1)),
    }
}

fn entry_bounds(registry: &Registry, schema: &RecordSchema) -> (usize, Option<usize>) {
    schema
        .attributes
        .iter()
        .fold((0, Some(0)), |(min, max), attribute| {
            let (a_min, a_max) = token_bounds(registry, &attribute.kind);
            let a_min = if attribute.is_omissible() { 0 } else { a_min };
            (min + a_min, max.zip(a_max).map(|(x, y)| x + y))
        })
}

fn head(text: &str, chars: usize) -> &str {
    text.char_indices().nth(chars).map_or(text, |(i, _)| &text[..i])
}

fn unknown_schema(what: &str, name: &str, text: &str) -> ErrorRecord {
    ErrorRecord::syntax(
        ErrorDomain::Inp,
        Granularity::File,
        format!("unknown {} schema '{}'", what, name),
        text,
    )
}

fn registry_error(err: RegistryError, text: &str) -> ErrorRecord {
    ErrorRecord::syntax(ErrorDomain::Inp, Granularity::File, err.to_string(), text)
}

// ============================================================================
// Public entry points
// ============================================================================

impl Registry {
    /// Check the size limit, trim and open a parse context.
    pub(crate) fn start<'t>(&self, text: &'t str) -> Result<(ParseContext<'_>, &'t str), ErrorRecord> {
        let limit = self.config().max_input_bytes;
        if text.len() > limit {
            return Err(ErrorRecord::syntax(
                ErrorDomain::Inp,
                Granularity::File,
                format!("input of {} bytes exceeds the {} byte limit", text.len(), limit),
                head(text, OVERSIZE_CONTEXT_CHARS),
            ));
        }
        let text = text.trim();
        Ok((ParseContext::new(self, text.len()), text))
    }

    /// Parse a card whose mnemonic is known.
    pub fn parse_card(&self, mnemonic: &str, text: &str) -> Result<Record, ErrorRecord> {
        let (mut ctx, text) = self.start(text)?;
        ctx.parse_variants(Level::Card, mnemonic, text)
    }

    /// Parse a card, choosing the schema by its leading mnemonic.
    pub fn parse_any_card(&self, text: &str) -> Result<Record, ErrorRecord> {
        let (mut ctx, text) = self.start(text)?;
        ctx.parse_any_card(text)
    }

    /// Parse a single option whose mnemonic is known.
    pub fn parse_option(&self, mnemonic: &str, text: &str) -> Result<Record, ErrorRecord> {
        let (mut ctx, text) = self.start(text)?;
        ctx.parse_variants(Level::Option, mnemonic, text)
    }

    pub fn parse_entry(&self, name: &str, text: &str) -> Result<Record, ErrorRecord> {
        let (mut ctx, text) = self.start(text)?;
        ctx.parse_entry(name, text)
    }

    /// Parse with one named schema, bypassing variant selection.
    pub fn parse_as(&self, name: &str, text: &str) -> Result<Record, ErrorRecord> {
        let (mut ctx, text) = self.start(text)?;
        let idx = self
            .index_of(name)
            .ok_or_else(|| unknown_schema("record", name, text))?;
        ctx.parse_schema(idx, text)
    }

    /// Parse a bare value of any kind, e.g. a `Repeated` sequence.
    pub fn parse_value(&self, kind: &Kind, text: &str) -> Result<Value, ErrorRecord> {
        let (mut ctx, text) = self.start(text)?;
        kind.parse(text, &mut ctx)
    }
}
