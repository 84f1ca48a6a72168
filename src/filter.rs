use crate::catalog::{Item, MAX_DEPTH};

/// Search text in the form it is compared against `Item::search_text`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    raw: String,
    needle: String,
}

impl Query {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            needle: raw.to_lowercase(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    fn matches(&self, item: &Item) -> bool {
        self.needle.is_empty() || item.search_text.contains(&self.needle)
    }
}

/// Exact, case-sensitive match of every defined path segment against the
/// item's labels at the same level.
pub fn matches_path(item: &Item, path: &[String]) -> bool {
    path.iter()
        .enumerate()
        .all(|(level, segment)| level < MAX_DEPTH && item.category_at(level) == segment.as_str())
}

pub fn matches(item: &Item, path: &[String], query: &Query) -> bool {
    matches_path(item, path) && query.matches(item)
}

/// Items under `path` whose search key contains `query`, in dataset order.
pub fn filter<'a>(items: &'a [Item], path: &[String], query: &str) -> Vec<&'a Item> {
    let query = Query::new(query);
    items
        .iter()
        .filter(|item| matches(item, path, &query))
        .collect()
}

/// Same selection as [`filter`], as positions into `items`.
pub fn filter_positions(items: &[Item], path: &[String], query: &Query) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| matches(item, path, query))
        .map(|(position, _)| position)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|label| label.to_string()).collect()
    }

    fn dataset() -> Vec<Item> {
        vec![
            Item::new("1", "Dragon")
                .with_categories("Wood", "Animals", "")
                .with_search_text("wooden dragon ornament wood animals"),
            Item::new("2", "Toolbox")
                .with_categories("Steel", "Boxes", "")
                .with_search_text("steel box tools"),
            Item::new("3", "Small box")
                .with_categories("Wood", "Boxes", "Small")
                .with_search_text("small box wood boxes small"),
            Item::new("4", "Plain box")
                .with_categories("Wood", "Boxes", "")
                .with_search_text("plain box wood boxes"),
        ]
    }

    fn ids(items: &[&Item]) -> Vec<String> {
        items.iter().map(|item| item.id.clone()).collect()
    }

    #[test]
    fn root_path_with_empty_query_keeps_everything() {
        let items = dataset();
        assert_eq!(filter(&items, &[], "").len(), items.len());
    }

    #[test]
    fn non_root_path_is_strictly_smaller_here() {
        let items = dataset();
        assert!(filter(&items, &path(&["Wood"]), "").len() < items.len());
    }

    #[test]
    fn depth_two_path_does_not_constrain_level_three() {
        let items = dataset();
        let found = filter(&items, &path(&["Wood", "Boxes"]), "");
        assert_eq!(ids(&found), vec!["3", "4"]);
    }

    #[test]
    fn path_match_is_case_sensitive() {
        let items = dataset();
        assert!(filter(&items, &path(&["wood"]), "").is_empty());
    }

    #[test]
    fn query_is_substring_and_case_insensitive() {
        let items = dataset();
        let found = filter(&items, &[], "DRAGON");
        assert_eq!(ids(&found), vec!["1"]);
        let found = filter(&items, &[], "box");
        assert_eq!(ids(&found), vec!["2", "3", "4"]);
    }

    #[test]
    fn refiltering_output_is_stable() {
        let items = dataset();
        let first: Vec<Item> = filter(&items, &path(&["Wood"]), "box")
            .into_iter()
            .cloned()
            .collect();
        let second = filter(&first, &path(&["Wood"]), "box");
        assert_eq!(ids(&second), first.iter().map(|i| i.id.clone()).collect::<Vec<_>>());
    }

    #[test]
    fn unknown_or_too_deep_path_is_empty_not_error() {
        let items = dataset();
        assert!(filter(&items, &path(&["Glass"]), "").is_empty());
        assert!(filter(&items, &path(&["Wood", "Boxes", "Small", "Tiny"]), "").is_empty());
    }

    #[test]
    fn positions_follow_dataset_order() {
        let items = dataset();
        let positions = filter_positions(&items, &path(&["Wood"]), &Query::new(""));
        assert_eq!(positions, vec![0, 2, 3]);
    }
}
