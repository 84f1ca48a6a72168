use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, NavigationError};

/// Deepest category level a record can carry.
pub const MAX_DEPTH: usize = 3;

/// One downloadable design as it appears in the generated dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category_l1: String,
    #[serde(default)]
    pub category_l2: String,
    #[serde(default)]
    pub category_l3: String,
    /// Single-level datasets only carry this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub search_text: String,
    #[serde(default)]
    pub download_url: String,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category_l1: String::new(),
            category_l2: String::new(),
            category_l3: String::new(),
            category: None,
            description: None,
            preview: None,
            search_text: String::new(),
            download_url: String::new(),
        }
    }

    pub fn with_categories(mut self, l1: &str, l2: &str, l3: &str) -> Self {
        self.category_l1 = l1.to_string();
        self.category_l2 = l2.to_string();
        self.category_l3 = l3.to_string();
        self
    }

    pub fn with_search_text(mut self, text: &str) -> Self {
        self.search_text = text.to_string();
        self
    }

    /// Category label at `level` (0-based). Levels past the third are always
    /// empty.
    pub fn category_at(&self, level: usize) -> &str {
        match level {
            0 => &self.category_l1,
            1 => &self.category_l2,
            2 => &self.category_l3,
            _ => "",
        }
    }

    /// Non-empty category labels from the top, stopping at the first gap.
    pub fn category_path(&self) -> Vec<&str> {
        (0..MAX_DEPTH)
            .map(|level| self.category_at(level))
            .take_while(|label| !label.is_empty())
            .collect()
    }

    /// Folds the flat `category` field into level one and fills in a missing
    /// search key the same way the ingestion script builds it.
    fn normalize(mut self) -> Self {
        if self.category_l1.is_empty() {
            if let Some(flat) = self.category.take() {
                self.category_l1 = flat;
            }
        }
        if self.search_text.trim().is_empty() {
            self.search_text = format!(
                "{} {} {} {}",
                self.name, self.category_l1, self.category_l2, self.category_l3
            )
            .to_lowercase()
            .trim()
            .to_string();
        }
        self
    }
}

/// Distinct category labels per level, derived from the items once at load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryIndex {
    level1: BTreeSet<String>,
    level2: BTreeMap<String, BTreeSet<String>>,
    level3: BTreeMap<(String, String), BTreeSet<String>>,
}

impl CategoryIndex {
    pub fn build(items: &[Item]) -> Self {
        let mut index = Self::default();
        for item in items {
            let l1 = item.category_l1.as_str();
            let l2 = item.category_l2.as_str();
            let l3 = item.category_l3.as_str();

            index.level1.insert(l1.to_string());
            if l2.is_empty() {
                continue;
            }
            index
                .level2
                .entry(l1.to_string())
                .or_default()
                .insert(l2.to_string());
            if l3.is_empty() {
                continue;
            }
            index
                .level3
                .entry((l1.to_string(), l2.to_string()))
                .or_default()
                .insert(l3.to_string());
        }
        index
    }

    pub fn top_level(&self) -> impl Iterator<Item = &str> {
        self.level1.iter().map(String::as_str)
    }

    /// Selectable labels one level below `path`, in ascending order. Unknown
    /// paths and fully specified paths have no children.
    pub fn children(&self, path: &[String]) -> Vec<&str> {
        let labels = match path {
            [] => Some(&self.level1),
            [l1] => self.level2.get(l1),
            [l1, l2] => self.level3.get(&(l1.clone(), l2.clone())),
            _ => None,
        };
        labels
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Checks that every prefix of `path` names a real index entry.
    pub fn validate(&self, path: &[String]) -> Result<(), NavigationError> {
        if path.len() > MAX_DEPTH {
            return Err(NavigationError::TooDeep {
                depth: path.len(),
                max: MAX_DEPTH,
            });
        }
        for (level, label) in path.iter().enumerate() {
            let known = self
                .children(&path[..level])
                .iter()
                .any(|child| *child == label.as_str());
            if !known {
                return Err(NavigationError::UnknownCategory {
                    level: level + 1,
                    label: label.clone(),
                });
            }
        }
        Ok(())
    }
}

/// The immutable item list together with its category index.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<Item>,
    index: CategoryIndex,
}

impl Catalog {
    pub fn load(items: Vec<Item>) -> Result<Self, CatalogError> {
        if items.is_empty() {
            return Err(CatalogError::Empty);
        }
        let items: Vec<Item> = items.into_iter().map(Item::normalize).collect();

        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                tracing::warn!(id = %item.id, "duplicate item id in catalog");
            }
        }

        let index = CategoryIndex::build(&items);
        tracing::debug!(
            items = items.len(),
            top_level = index.level1.len(),
            "catalog index built"
        );
        Ok(Self { items, index })
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, position: usize) -> Option<&Item> {
        self.items.get(position)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn index(&self) -> &CategoryIndex {
        &self.index
    }
}
