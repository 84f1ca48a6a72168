use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::{Catalog, Item};
use crate::error::CatalogError;

/// Name of the variable the generated `db.js` assigns the dataset to.
const DB_VARIABLE: &str = "CATALOG_DB";

/// Folder of a site that holds `db.js`. Preview paths in the dataset are
/// relative to its parent.
const SCRIPT_DIR: &str = "js";

pub trait CatalogSource: Send + Sync {
    fn load_items(&self) -> Result<Vec<Item>, CatalogError>;

    /// Directory that relative preview paths are resolved against.
    fn base_dir(&self) -> Option<&Path> {
        None
    }

    fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        Catalog::load(self.load_items()?)
    }
}

/// Reads the dataset produced by the ingestion scripts: a JSON array, either
/// bare or wrapped in the generated `const CATALOG_DB = [...];` script.
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for FileCatalogSource {
    fn load_items(&self) -> Result<Vec<Item>, CatalogError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::error!(path = %self.path.display(), "catalog dataset not found");
                return Err(CatalogError::Empty);
            }
            Err(source) => {
                return Err(CatalogError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let items = parse_items(&raw).map_err(|source| CatalogError::Parse {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(path = %self.path.display(), items = items.len(), "catalog dataset read");
        Ok(items)
    }

    /// The site root: the parent of `js/` for a generated `js/db.js`,
    /// otherwise the folder holding the dataset.
    fn base_dir(&self) -> Option<&Path> {
        let dir = self.path.parent()?;
        if dir.file_name().is_some_and(|name| name == SCRIPT_DIR) {
            return dir.parent();
        }
        Some(dir)
    }
}

/// Items held in memory, for demos and tests.
#[derive(Default)]
pub struct StaticCatalogSource {
    items: Vec<Item>,
}

impl StaticCatalogSource {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }
}

impl CatalogSource for StaticCatalogSource {
    fn load_items(&self) -> Result<Vec<Item>, CatalogError> {
        Ok(self.items.clone())
    }
}

/// Parses a dataset body. Accepts plain JSON or the generated script wrapper.
pub fn parse_items(raw: &str) -> serde_json::Result<Vec<Item>> {
    serde_json::from_str(extract_json(raw))
}

fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        return trimmed;
    }
    let Some(decl) = trimmed.find(DB_VARIABLE) else {
        return trimmed;
    };
    let after = &trimmed[decl + DB_VARIABLE.len()..];
    let Some(eq) = after.find('=') else {
        return trimmed;
    };
    after[eq + 1..].trim().trim_end_matches(';').trim_end()
}
