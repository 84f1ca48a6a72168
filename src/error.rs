use std::path::PathBuf;

/// Failures that prevent the catalog from being built. All of them are fatal at
/// startup.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog dataset is empty or missing")]
    Empty,
    #[error("failed to read catalog dataset at {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog dataset at {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A navigation path that does not exist in the category index. Never surfaced
/// to the user; the session degrades it to an empty result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("path has {depth} levels, at most {max} are supported")]
    TooDeep { depth: usize, max: usize },
    #[error("unknown category {label:?} at level {level}")]
    UnknownCategory { level: usize, label: String },
}
