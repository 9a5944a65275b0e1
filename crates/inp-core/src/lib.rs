//! inp-core: grammar engine for INP card decks
//!
//! This crate turns INP text into validated, strongly typed records and back,
//! with NO I/O in the parse path:
//! - Terminal value types (integer, real, string, designator, ZAID, jump, distribution)
//! - Combinators (`Repeated`, `Choice`, option sets)
//! - Declarative record schemas and the registry that compiles them once
//! - Card / option / entry dispatch with a per-call step budget
//! - Constraint validation (fail-fast and collect-all)
//! - Canonical serialization
//! - YAML schema files and their directory loader
//!
//! ```ignore
//! let registry = SchemaLoader::from_env().build_registry(EngineConfig::from_env()?)?;
//! let card = registry.parse_card("m", "m1 1001 -0.6667 8016 -0.3333")?;
//! assert_eq!(card.serialize(), "m1 1001 -0.6667 8016 -0.3333");
//! ```

pub mod builder;
pub mod combinators;
pub(crate) mod compiler;
pub mod config;
pub mod error;
pub mod grammar;
pub mod kind;
pub mod parser;
pub mod record;
pub mod registry;
pub mod schema;
pub mod terminals;
pub mod validator;
pub mod value;

// Re-export commonly used types
pub use builder::{Input, RecordBuilder, SuffixCounter};
pub use combinators::{Arity, Choice, OptionSet, Repeated};
pub use config::loader::{SchemaLoader, SCHEMA_DIR_ENV};
pub use config::types::SchemaFile;
pub use config::EngineConfig;
pub use error::RegistryError;
pub use grammar::GrammarFragment;
pub use kind::Kind;
pub use parser::ParseContext;
pub use record::Record;
pub use registry::{Registry, RegistryBuilder};
pub use schema::{
    AttributeSpec, Bound, CompareOp, Constraint, DesignatorSpec, Level, Predicate, RecordSchema,
    SuffixSpec,
};
pub use terminals::{
    Designator, DistributionRef, Integer, Jump, Particle, Real, Terminal, Text, Zaid,
};
pub use validator::diagnose;
pub use value::Value;

pub use inp_types::{ErrorDomain, ErrorRecord, ErrorStage, Granularity};
