//! inpdeck - INP card deck records
//!
//! Parses INP card text into validated, typed records and serializes them
//! back to canonical text. The grammar engine lives in `inp-core`; this crate
//! adds the built-in [`catalog`] of definitions and a one-call API over it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! let card = inpdeck::parse_card("m1 1001 -0.6667 8016 -0.3333").unwrap();
//! assert_eq!(card.suffix(), Some(1));
//! assert_eq!(card.serialize(), "m1 1001 -0.6667 8016 -0.3333");
//! ```

pub mod catalog;

pub use catalog::{build_catalog, catalog, CatalogError, CATALOG_FILES};
pub use inp_core::*;

/// Parse one complete card against the built-in catalog.
pub fn parse_card(text: &str) -> Result<Record, ErrorRecord> {
    registry()?.parse_any_card(text)
}

/// Parse one option against the built-in catalog.
pub fn parse_option(mnemonic: &str, text: &str) -> Result<Record, ErrorRecord> {
    registry()?.parse_option(mnemonic, text)
}

fn registry() -> Result<&'static Registry, ErrorRecord> {
    catalog().map_err(|err| {
        ErrorRecord::semantics(ErrorDomain::Config, Granularity::File, err.to_string(), "")
    })
}
