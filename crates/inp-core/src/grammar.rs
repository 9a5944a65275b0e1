//! Grammar fragments
//!
//! A [`GrammarFragment`] is a regex body plus the number of capture groups it
//! contains and whether it is anchored. Fragments are only ever combined
//! through the functions here: a child is spliced into its parent by its
//! anchor-free body, so composing never corrupts an enclosing anchor.
//!
//! ```text
//! literal("m") . optional(capture(suffix)) . spaced(capture(attr)) ...
//!        └────────────── anchored() ──────────────┘  →  ^(?:...)$
//! ```

use std::fmt;

/// Whitespace between tokens.
pub const SEPARATOR: &str = r"\s+";

/// A composable, possibly anchored regex body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrammarFragment {
    body: String,
    groups: usize,
    anchored: bool,
}

impl GrammarFragment {
    /// Wrap a capture-free regex body.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            groups: 0,
            anchored: false,
        }
    }

    /// A fragment matching `text` literally.
    pub fn literal(text: &str) -> Self {
        Self::new(regex::escape(text))
    }

    /// The empty fragment; neutral element of [`then`](Self::then).
    pub fn empty() -> Self {
        Self::new("")
    }

    /// The token separator.
    pub fn separator() -> Self {
        Self::new(SEPARATOR)
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Number of capture groups in the body.
    pub fn groups(&self) -> usize {
        self.groups
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Mark this fragment as matching a whole input slice.
    pub fn anchored(mut self) -> Self {
        self.anchored = true;
        self
    }

    /// The same fragment with its anchors stripped, ready for splicing.
    pub fn embedded(&self) -> Self {
        Self {
            body: self.body.clone(),
            groups: self.groups,
            anchored: false,
        }
    }

    /// Render the final pattern string.
    pub fn pattern(&self) -> String {
        if self.anchored {
            format!("^(?:{})$", self.body)
        } else {
            format!("(?:{})", self.body)
        }
    }

    /// Render a pattern anchored at the start only, for matching a leading span.
    pub fn prefix_pattern(&self) -> String {
        format!("^(?:{})", self.body)
    }

    /// Concatenate `next` directly after `self`.
    pub fn then(self, next: GrammarFragment) -> Self {
        if next.is_empty() {
            return self;
        }
        let next = next.embedded();
        Self {
            body: format!("{}(?:{})", self.body, next.body),
            groups: self.groups + next.groups,
            anchored: self.anchored,
        }
    }

    /// Concatenate with a separator in between.
    pub fn spaced(self, next: GrammarFragment) -> Self {
        self.then(Self::separator()).then(next)
    }

    /// Zero or one occurrence.
    pub fn optional(self) -> Self {
        Self {
            body: format!("(?:{})?", self.body),
            groups: self.groups,
            anchored: false,
        }
    }

    /// Wrap the body in a capture group.
    pub fn capture(self) -> Self {
        Self {
            body: format!("({})", self.body),
            groups: self.groups + 1,
            anchored: false,
        }
    }

    /// Ordered alternation: earlier alternatives take priority.
    pub fn alternation(alternatives: impl IntoIterator<Item = GrammarFragment>) -> Self {
        let mut groups = 0;
        let bodies: Vec<String> = alternatives
            .into_iter()
            .map(|alt| {
                groups += alt.groups;
                format!("(?:{})", alt.body)
            })
            .collect();
        Self {
            body: format!("(?:{})", bodies.join("|")),
            groups,
            anchored: false,
        }
    }

    /// Separator-joined repetition, `min >= 1`, lazy per element.
    ///
    /// The lazy quantifier lets a following attribute of the same shape keep
    /// its token instead of being absorbed by the repetition.
    pub fn repeated(self, min: usize, max: Option<usize>) -> Self {
        let min = min.max(1);
        let item = format!("(?:{})", self.body);
        let tail = match max {
            Some(max) if max <= 1 && min == 1 => String::new(),
            Some(max) if max <= min => format!("(?:{}{}){{{}}}", SEPARATOR, item, min - 1),
            Some(max) => format!("(?:{}{}){{{},{}}}?", SEPARATOR, item, min - 1, max - 1),
            None if min == 1 => format!("(?:{}{})*?", SEPARATOR, item),
            None => format!("(?:{}{}){{{},}}?", SEPARATOR, item, min - 1),
        };
        // The item body is written twice when there is a tail.
        let groups = if tail.is_empty() {
            self.groups
        } else {
            self.groups * 2
        };
        Self {
            body: format!("{}{}", item, tail),
            groups,
            anchored: false,
        }
    }
}

impl fmt::Display for GrammarFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern())
    }
}
