//! Registry construction errors
//!
//! These describe broken schema definitions, not broken input text. Input
//! failures are always [`inp_types::ErrorRecord`]s.

use thiserror::Error;

use crate::schema::Level;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate schema name '{0}'")]
    DuplicateSchema(String),

    #[error("{level} schema '{schema}' must have a mnemonic")]
    MissingMnemonic { level: Level, schema: String },

    #[error("Entry schema '{schema}' must not have a mnemonic (found '{mnemonic}')")]
    EntryMnemonic { schema: String, mnemonic: String },

    #[error("Entry schema '{0}' cannot take a suffix or designator")]
    EntryHead(String),

    #[error("Schema '{schema}': mnemonic '{mnemonic}' must start with a letter or '*', contain no ':' or whitespace, and not end with a digit")]
    InvalidMnemonic { schema: String, mnemonic: String },

    #[error("Schema '{schema}': duplicate attribute '{attribute}'")]
    DuplicateAttribute { schema: String, attribute: String },

    #[error("Schema '{schema}' attribute '{attribute}': unknown entry '{entry}'")]
    UnknownEntry {
        schema: String,
        attribute: String,
        entry: String,
    },

    #[error("Schema '{schema}' attribute '{attribute}': unknown option '{option}'")]
    UnknownOption {
        schema: String,
        attribute: String,
        option: String,
    },

    #[error("Schema '{schema}': option set '{attribute}' must be the last attribute")]
    OptionsNotLast { schema: String, attribute: String },

    #[error("Schema '{schema}': option sets are only allowed on cards")]
    OptionsOutsideCard { schema: String },

    #[error("Schema '{schema}' attribute '{attribute}': option set accepts no registered option")]
    EmptyOptionSet { schema: String, attribute: String },

    #[error("Schema '{schema}' attribute '{attribute}': sibling '{sibling}' is not an earlier attribute")]
    ForwardSiblingReference {
        schema: String,
        attribute: String,
        sibling: String,
    },

    #[error("Entry schema '{0}' has no required attribute")]
    EmptyEntry(String),

    #[error("Entry '{0}' refers to itself")]
    RecursiveEntry(String),

    #[error("Schema '{schema}': invalid arity {min}..{max} on '{attribute}'")]
    InvalidArity {
        schema: String,
        attribute: String,
        min: usize,
        max: usize,
    },

    #[error("{level} mnemonic '{mnemonic}': variants '{first}' and '{second}' are in different groups")]
    GroupMismatch {
        level: Level,
        mnemonic: String,
        first: String,
        second: String,
    },

    #[error("Schema '{schema}': '{next}' can start with a token that '{attribute}' may take, so their boundary is ambiguous")]
    AmbiguousBoundary {
        schema: String,
        attribute: String,
        next: String,
    },

    #[error("Schema '{schema}': invalid suffix range {min}..={max}")]
    InvalidSuffixRange { schema: String, min: u64, max: u64 },

    #[error("Schema '{schema}': failed to compile matcher: {message}")]
    Pattern { schema: String, message: String },
}

impl RegistryError {
    /// Name of the schema the error was raised for.
    pub fn schema(&self) -> &str {
        match self {
            RegistryError::DuplicateSchema(s)
            | RegistryError::EntryHead(s)
            | RegistryError::EmptyEntry(s)
            | RegistryError::RecursiveEntry(s) => s,
            RegistryError::MissingMnemonic { schema, .. }
            | RegistryError::EntryMnemonic { schema, .. }
            | RegistryError::InvalidMnemonic { schema, .. }
            | RegistryError::DuplicateAttribute { schema, .. }
            | RegistryError::UnknownEntry { schema, .. }
            | RegistryError::UnknownOption { schema, .. }
            | RegistryError::OptionsNotLast { schema, .. }
            | RegistryError::OptionsOutsideCard { schema }
            | RegistryError::EmptyOptionSet { schema, .. }
            | RegistryError::ForwardSiblingReference { schema, .. }
            | RegistryError::InvalidArity { schema, .. }
            | RegistryError::AmbiguousBoundary { schema, .. }
            | RegistryError::InvalidSuffixRange { schema, .. }
            | RegistryError::GroupMismatch { second: schema, .. }
            | RegistryError::Pattern { schema, .. } => schema,
        }
    }
}
