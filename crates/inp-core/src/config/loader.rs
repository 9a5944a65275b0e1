//! Schema loader
//!
//! Loads schema files from a directory and builds a registry from them.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::types::SchemaFile;
use super::EngineConfig;
use crate::registry::Registry;
use crate::schema::RecordSchema;

/// Environment override for the schema directory.
pub const SCHEMA_DIR_ENV: &str = "INP_SCHEMA_DIR";

pub struct SchemaLoader {
    schema_dir: PathBuf,
}

impl SchemaLoader {
    pub fn new(schema_dir: impl Into<PathBuf>) -> Self {
        Self {
            schema_dir: schema_dir.into(),
        }
    }

    /// Create loader from INP_SCHEMA_DIR, or the crate's bundled schemas
    ///
    /// Path resolution order:
    /// 1. INP_SCHEMA_DIR environment variable (explicit override)
    /// 2. Relative "config/schemas" (works when running from workspace root)
    /// 3. Workspace config found by walking up from CARGO_MANIFEST_DIR
    pub fn from_env() -> Self {
        if let Ok(dir) = std::env::var(SCHEMA_DIR_ENV) {
            return Self::new(dir);
        }

        let relative = Path::new("config/schemas");
        if relative.is_dir() {
            return Self::new(relative);
        }

        if let Some(found) = Self::find_workspace_schemas(env!("CARGO_MANIFEST_DIR")) {
            return Self::new(found);
        }

        // Let the load fail with the path in the message
        Self::new(relative)
    }

    /// Look for `config/schemas` in `start_dir` and up to four parents.
    fn find_workspace_schemas(start_dir: &str) -> Option<PathBuf> {
        let mut current = Path::new(start_dir);
        for _ in 0..5 {
            let candidate = current.join("config").join("schemas");
            if candidate.is_dir() {
                return Some(candidate);
            }
            current = current.parent()?;
        }
        None
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Read and merge every `*.yaml` file, in file name order.
    ///
    /// Files whose name starts with `_` are skipped.
    pub fn load(&self) -> Result<SchemaFile> {
        info!("Loading schema files from {}", self.schema_dir.display());

        let mut merged = SchemaFile::default();
        for path in self.find_yaml_files()? {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let file = Self::parse(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            debug!(path = %path.display(), schemas = file.len(), "schema file read");
            if merged.version.is_empty() {
                merged.version = file.version.clone();
            }
            merged.merge(file);
        }

        info!(
            "Loaded {} entries, {} options, {} cards",
            merged.entries.len(),
            merged.options.len(),
            merged.cards.len()
        );
        Ok(merged)
    }

    /// Load every file and convert the definitions to schemas.
    pub fn load_schemas(&self) -> Result<Vec<RecordSchema>> {
        self.load()?
            .into_schemas()
            .with_context(|| format!("Invalid schema in {}", self.schema_dir.display()))
    }

    /// Load every file and build a registry with `config`.
    pub fn build_registry(&self, config: EngineConfig) -> Result<Registry> {
        let schemas = self.load_schemas()?;
        Registry::builder()
            .with_config(config)
            .extend(schemas)
            .build()
            .with_context(|| format!("Failed to build registry from {}", self.schema_dir.display()))
    }

    /// Parse one schema document held in memory.
    pub fn parse(content: &str) -> Result<SchemaFile> {
        serde_yaml::from_str(content).context("Malformed schema document")
    }

    fn find_yaml_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.schema_dir)
            .with_context(|| format!("Failed to read directory {}", self.schema_dir.display()))?
        {
            let path = entry?.path();
            let skipped = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(true, |n| n.starts_with('_'));
            let yaml = path
                .extension()
                .map(|e| e == "yaml" || e == "yml")
                .unwrap_or(false);
            if path.is_file() && yaml && !skipped {
                files.push(path);
            }
        }

        // Sort for deterministic registration order
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const OPTIONS: &str = r#"
options:
  - name: cell
    mnemonic: cel
    attributes:
      - name: number
        kind: integer
        constraints: [{ range: { min: 1 } }]
"#;

    const CARDS: &str = r#"
cards:
  - name: source
    mnemonic: sdef
    attributes:
      - name: options
        kind: { options: {} }
"#;

    #[test]
    fn test_loader_creation() {
        let loader = SchemaLoader::new("config/schemas");
        assert_eq!(loader.schema_dir(), Path::new("config/schemas"));
    }

    #[test]
    fn test_load_directory_merges_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b_cards.yaml"), CARDS).unwrap();
        fs::write(dir.path().join("a_options.yaml"), OPTIONS).unwrap();
        fs::write(dir.path().join("_draft.yaml"), "cards: [{ name: broken }]").unwrap();
        fs::write(dir.path().join("notes.txt"), "not yaml").unwrap();

        let loader = SchemaLoader::new(dir.path());
        let file = loader.load().unwrap();
        assert_eq!(file.options.len(), 1);
        assert_eq!(file.cards.len(), 1);

        let registry = loader.build_registry(EngineConfig::default()).unwrap();
        let card = registry.parse_card("sdef", "sdef cel 5").unwrap();
        assert_eq!(card.options().len(), 1);
        assert_eq!(card.serialize(), "sdef cel 5");
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.yaml"), "options: [ { name: 3 ").unwrap();
        let err = SchemaLoader::new(dir.path()).load().unwrap_err();
        assert!(format!("{:#}", err).contains("bad.yaml"));
    }

    #[test]
    fn test_registry_errors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yaml"), OPTIONS).unwrap();
        fs::write(dir.path().join("b.yaml"), OPTIONS).unwrap();
        let err = SchemaLoader::new(dir.path())
            .build_registry(EngineConfig::default())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Duplicate schema name 'cell'"));
    }

    #[test]
    fn test_missing_directory() {
        let err = SchemaLoader::new("/nonexistent/inp/schemas").load().unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read directory"));
    }
}
