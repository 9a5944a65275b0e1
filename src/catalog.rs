//! Built-in catalog
//!
//! A representative set of INP definitions (materials, transformations,
//! source definition, importances, mode, history and energy cutoffs, cell
//! parameters) compiled into the binary from `config/schemas/*.yaml` and
//! registered once per process.

use inp_core::{EngineConfig, Registry, RegistryError, SchemaFile, SchemaLoader};
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::info;

/// Embedded schema files, in the order a directory load would read them.
pub const CATALOG_FILES: &[(&str, &str)] = &[
    ("cells.yaml", include_str!("../config/schemas/cells.yaml")),
    ("data.yaml", include_str!("../config/schemas/data.yaml")),
    ("entries.yaml", include_str!("../config/schemas/entries.yaml")),
    ("materials.yaml", include_str!("../config/schemas/materials.yaml")),
    ("source.yaml", include_str!("../config/schemas/source.yaml")),
];

static CATALOG: OnceCell<Registry> = OnceCell::new();

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid engine configuration: {0}")]
    Config(String),

    #[error("Bundled schema file '{file}' is invalid: {message}")]
    Schema { file: &'static str, message: String },

    #[error("Bundled catalog failed to build: {0}")]
    Registry(#[from] RegistryError),
}

/// The process-wide catalog registry, built on first use.
///
/// Engine limits come from the environment (`INP_STEP_BUDGET_FACTOR`,
/// `INP_MAX_INPUT_BYTES`) at the time of the first call.
pub fn catalog() -> Result<&'static Registry, CatalogError> {
    CATALOG.get_or_try_init(|| {
        let config = EngineConfig::from_env().map_err(|e| CatalogError::Config(format!("{:#}", e)))?;
        build_catalog(config)
    })
}

/// Build a fresh catalog registry with explicit engine limits.
pub fn build_catalog(config: EngineConfig) -> Result<Registry, CatalogError> {
    let mut merged = SchemaFile::default();
    for &(file, text) in CATALOG_FILES {
        let part = SchemaLoader::parse(text).map_err(|e| CatalogError::Schema {
            file,
            message: format!("{:#}", e),
        })?;
        merged.merge(part);
    }
    let schemas = merged.into_schemas().map_err(|e| CatalogError::Schema {
        file: "config/schemas",
        message: format!("{:#}", e),
    })?;

    let registry = Registry::builder().with_config(config).extend(schemas).build()?;
    info!(
        schemas = registry.len(),
        cards = registry.card_mnemonics().len(),
        options = registry.option_mnemonics().len(),
        "Built-in catalog ready"
    );
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_builds() {
        let registry = build_catalog(EngineConfig::default()).unwrap();
        for name in ["material", "transformation", "source", "importance", "mode", "cutoffs"] {
            assert!(registry.schema(name).is_some(), "missing {}", name);
        }
        assert!(registry.card_mnemonics().iter().any(|m| m == "*tr"));
    }

    #[test]
    fn test_catalog_is_shared() {
        let a = catalog().unwrap();
        let b = catalog().unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_embedded_files_match_directory() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/config/schemas");
        let loaded = SchemaLoader::new(dir).load().unwrap();
        let mut embedded = SchemaFile::default();
        for (_, text) in CATALOG_FILES {
            embedded.merge(SchemaLoader::parse(text).unwrap());
        }
        assert_eq!(loaded.len(), embedded.len());
    }
}
