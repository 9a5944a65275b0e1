//! INP Types - Level 1 Foundation Types
//!
//! Pure data structures shared by the grammar engine and anything that reports
//! its failures. This crate depends on no other workspace crate.
//!
//! ## Contents
//!
//! - Error taxonomy axes: [`ErrorDomain`], [`ErrorStage`], [`Granularity`]
//! - The single error value raised by parsing and validation: [`ErrorRecord`]
//! - Bounded context rendering: [`truncate_context`]

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of lines of offending text kept in an error's context.
pub const CONTEXT_LINE_BUDGET: usize = 5;

/// Marker appended to context that was cut short.
pub const ELLIPSIS: &str = "...";

// ============================================================================
// TAXONOMY AXES
// ============================================================================

/// Which subsystem the failing text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorDomain {
    /// INP card deck records
    Inp,
    /// PTRAC event-log records (fixed-column dialect)
    Ptrac,
    /// Terminal value types
    Types,
    /// Command line collaborator
    Cli,
    /// Schema configuration
    Config,
}

impl ErrorDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorDomain::Inp => "inp",
            ErrorDomain::Ptrac => "ptrac",
            ErrorDomain::Types => "types",
            ErrorDomain::Cli => "cli",
            ErrorDomain::Config => "config",
        }
    }
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the text failed to match a grammar or matched and then failed a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStage {
    /// Text did not match any registered grammar
    Syntax,
    /// Text matched, but a validated value violated a predicate
    Semantics,
}

impl ErrorStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStage::Syntax => "syntax",
            ErrorStage::Semantics => "semantics",
        }
    }
}

impl fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural level at which the failure was detected.
///
/// `File`, `Card`, `Option` and `Entry` belong to the INP dialect; `Block`,
/// `Line` and `Keyword` to the columnar PTRAC dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    File,
    Card,
    Option,
    Entry,
    Block,
    Line,
    Keyword,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::File => "file",
            Granularity::Card => "card",
            Granularity::Option => "option",
            Granularity::Entry => "entry",
            Granularity::Block => "block",
            Granularity::Line => "line",
            Granularity::Keyword => "keyword",
        }
    }

    /// Nesting depth within a dialect; larger is deeper.
    pub fn depth(&self) -> u8 {
        match self {
            Granularity::File => 0,
            Granularity::Card | Granularity::Block => 1,
            Granularity::Option | Granularity::Line => 2,
            Granularity::Entry | Granularity::Keyword => 3,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ERROR RECORD
// ============================================================================

/// A coded parse or validation failure.
///
/// The offending text is kept in `context`, already cut down to
/// [`CONTEXT_LINE_BUDGET`] lines, so an error never grows with the input.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{domain} {stage} error ({granularity}{}): {message}\n{context}", attribute_suffix(.attribute))]
pub struct ErrorRecord {
    pub domain: ErrorDomain,
    pub stage: ErrorStage,
    pub granularity: Granularity,
    /// Attribute that raised the error, when one applies (e.g. `suffix`)
    pub attribute: Option<String>,
    pub message: String,
    pub context: String,
}

fn attribute_suffix(attribute: &Option<String>) -> String {
    match attribute {
        Some(name) => format!(", attribute '{}'", name),
        None => String::new(),
    }
}

impl ErrorRecord {
    /// Create an error with the given coordinates; `context` is truncated.
    pub fn new(
        domain: ErrorDomain,
        stage: ErrorStage,
        granularity: Granularity,
        message: impl Into<String>,
        context: &str,
    ) -> Self {
        Self {
            domain,
            stage,
            granularity,
            attribute: None,
            message: message.into(),
            context: truncate_context(context, CONTEXT_LINE_BUDGET),
        }
    }

    /// Text did not match any grammar.
    pub fn syntax(
        domain: ErrorDomain,
        granularity: Granularity,
        message: impl Into<String>,
        context: &str,
    ) -> Self {
        Self::new(domain, ErrorStage::Syntax, granularity, message, context)
    }

    /// Text matched but a checked value was invalid.
    pub fn semantics(
        domain: ErrorDomain,
        granularity: Granularity,
        message: impl Into<String>,
        context: &str,
    ) -> Self {
        Self::new(domain, ErrorStage::Semantics, granularity, message, context)
    }

    /// Name the attribute responsible for the failure.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn is_syntax(&self) -> bool {
        self.stage == ErrorStage::Syntax
    }

    pub fn is_semantics(&self) -> bool {
        self.stage == ErrorStage::Semantics
    }

    /// Whether this error was raised below `other` in the record hierarchy.
    pub fn is_deeper_than(&self, other: &ErrorRecord) -> bool {
        self.granularity.depth() > other.granularity.depth()
    }
}

/// Keep at most `max_lines` lines of `text`, marking the cut with [`ELLIPSIS`].
pub fn truncate_context(text: &str, max_lines: usize) -> String {
    let mut lines = text.lines();
    let kept: Vec<&str> = lines.by_ref().take(max_lines).collect();
    let mut out = kept.join("\n");
    if lines.next().is_some() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(ELLIPSIS);
    }
    out
}
