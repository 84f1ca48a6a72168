use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::filter::{self, Query};

/// Drill-down position in the category tree. Empty means the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CategoryPath(Vec<String>);

impl CategoryPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, label: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(label.to_string());
        Self(segments)
    }

    /// First `depth` segments; a depth past the end keeps the whole path.
    pub fn truncated(&self, depth: usize) -> Self {
        Self(self.0[..depth.min(self.0.len())].to_vec())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl Deref for CategoryPath {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for CategoryPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" > "))
    }
}

/// Tracks where the user is in the category tree and what they searched for,
/// and keeps the filtered view in step with both.
#[derive(Debug, Clone)]
pub struct Navigator {
    catalog: Arc<Catalog>,
    path: CategoryPath,
    query: Query,
    children: Vec<String>,
    filtered: Vec<usize>,
}

impl Navigator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let mut navigator = Self {
            catalog,
            path: CategoryPath::root(),
            query: Query::default(),
            children: Vec::new(),
            filtered: Vec::new(),
        };
        navigator.recompute();
        navigator
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn path(&self) -> &CategoryPath {
        &self.path
    }

    pub fn query(&self) -> &str {
        self.query.raw()
    }

    /// Selectable labels one level below the current path.
    pub fn children(&self) -> &[String] {
        &self.children
    }

    /// Dataset positions of the items in view, in dataset order.
    pub fn filtered(&self) -> &[usize] {
        &self.filtered
    }

    /// Replaces the path. Paths missing from the index are accepted and simply
    /// match nothing.
    pub fn navigate_to(&mut self, path: CategoryPath) {
        if cfg!(debug_assertions) {
            if let Err(err) = self.catalog.index().validate(&path) {
                tracing::debug!(path = %path, error = %err, "navigating to a path outside the index");
            }
        }
        self.path = path;
        self.recompute();
    }

    /// Keeps the first `depth` segments of the current path.
    pub fn navigate_up(&mut self, depth: usize) {
        let path = self.path.truncated(depth);
        self.navigate_to(path);
    }

    pub fn set_query(&mut self, raw: &str) {
        self.query = Query::new(raw);
        self.recompute();
    }

    fn recompute(&mut self) {
        let index = self.catalog.index();
        self.children = index
            .children(&self.path)
            .into_iter()
            .map(str::to_string)
            .collect();
        self.filtered = filter::filter_positions(self.catalog.items(), &self.path, &self.query);
        tracing::debug!(
            path = %self.path,
            query = self.query.raw(),
            matches = self.filtered.len(),
            children = self.children.len(),
            "view recomputed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Item;

    fn navigator() -> Navigator {
        let items = vec![
            Item::new("1", "Dragon")
                .with_categories("Animals", "Dragons", "")
                .with_search_text("dragon animals dragons"),
            Item::new("2", "Box")
                .with_categories("Wood", "Boxes", "Small")
                .with_search_text("box wood boxes small"),
            Item::new("3", "Crate")
                .with_categories("Wood", "Boxes", "")
                .with_search_text("crate wood boxes"),
        ];
        Navigator::new(Arc::new(Catalog::load(items).unwrap()))
    }

    #[test]
    fn starts_at_root_with_everything_visible() {
        let nav = navigator();
        assert!(nav.path().is_root());
        assert_eq!(nav.filtered(), &[0, 1, 2]);
        assert_eq!(nav.children(), &["Animals".to_string(), "Wood".to_string()]);
    }

    #[test]
    fn navigate_to_updates_children_and_filter() {
        let mut nav = navigator();
        nav.navigate_to(["Wood"].into_iter().collect());
        assert_eq!(nav.children(), &["Boxes".to_string()]);
        assert_eq!(nav.filtered(), &[1, 2]);
    }

    #[test]
    fn navigate_up_truncates_like_a_breadcrumb() {
        let mut nav = navigator();
        nav.navigate_to(["Wood", "Boxes", "Small"].into_iter().collect());
        assert_eq!(nav.filtered(), &[1]);
        nav.navigate_up(1);
        assert_eq!(nav.path().segments(), &["Wood".to_string()]);
        assert_eq!(nav.filtered(), &[1, 2]);
        nav.navigate_up(0);
        assert!(nav.path().is_root());
    }

    #[test]
    fn unknown_path_yields_empty_view() {
        let mut nav = navigator();
        nav.navigate_to(["Glass", "Vases"].into_iter().collect());
        assert!(nav.filtered().is_empty());
        assert!(nav.children().is_empty());
    }

    #[test]
    fn query_combines_with_path() {
        let mut nav = navigator();
        nav.navigate_to(["Wood"].into_iter().collect());
        nav.set_query("CRATE");
        assert_eq!(nav.filtered(), &[2]);
        assert_eq!(nav.query(), "CRATE");
    }

    #[test]
    fn path_displays_with_separators() {
        let path: CategoryPath = ["Wood", "Boxes"].into_iter().collect();
        assert_eq!(path.to_string(), "Wood > Boxes");
        assert_eq!(path.truncated(5), path);
    }
}
