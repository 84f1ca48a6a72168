use std::sync::Arc;

use crate::catalog::{Catalog, Item};
use crate::nav::{CategoryPath, Navigator};
use crate::render::{Renderer, DEFAULT_BATCH_SIZE};

/// One clickable breadcrumb entry. `depth` is what `navigate_up` expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub label: String,
    pub depth: usize,
    pub active: bool,
}

/// Display side of a browse session. The session pushes every state change
/// through these calls and never reads anything back.
pub trait Presenter {
    fn render_breadcrumb(&mut self, crumbs: &[Crumb]);
    fn render_categories(&mut self, labels: &[String]);
    /// `reset` is true for the first batch of a new view.
    fn render_batch(&mut self, items: &[&Item], reset: bool);
    /// The current view has no items at all.
    fn render_empty(&mut self);
}

/// Owns the catalog, the navigation state and the pager, and routes every
/// transition through them in order.
#[derive(Debug)]
pub struct Session {
    navigator: Navigator,
    renderer: Renderer,
}

impl Session {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_batch_size(catalog, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(catalog: Arc<Catalog>, batch_size: usize) -> Self {
        Self {
            navigator: Navigator::new(catalog),
            renderer: Renderer::new(batch_size),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        self.navigator.catalog()
    }

    pub fn path(&self) -> &CategoryPath {
        self.navigator.path()
    }

    pub fn query(&self) -> &str {
        self.navigator.query()
    }

    pub fn children(&self) -> &[String] {
        self.navigator.children()
    }

    pub fn filtered_len(&self) -> usize {
        self.navigator.filtered().len()
    }

    pub fn rendered_len(&self) -> usize {
        self.renderer.cursor()
    }

    pub fn has_more(&self) -> bool {
        !self.renderer.is_exhausted(self.filtered_len())
    }

    /// Items handed to the presenter so far, in order.
    pub fn rendered(&self) -> impl Iterator<Item = &Item> {
        let catalog = self.navigator.catalog();
        self.navigator.filtered()[..self.rendered_len()]
            .iter()
            .filter_map(move |position| catalog.get(*position))
    }

    pub fn breadcrumb(&self) -> Vec<Crumb> {
        let path = self.navigator.path();
        let mut crumbs = Vec::with_capacity(path.depth() + 1);
        crumbs.push(Crumb {
            label: String::new(),
            depth: 0,
            active: path.is_root(),
        });
        for (index, segment) in path.iter().enumerate() {
            crumbs.push(Crumb {
                label: segment.clone(),
                depth: index + 1,
                active: index + 1 == path.depth(),
            });
        }
        crumbs
    }

    /// Publishes the initial root view.
    pub fn start<P: Presenter>(&mut self, presenter: &mut P) {
        self.navigate_to(CategoryPath::root(), presenter);
    }

    pub fn navigate_to<P: Presenter>(&mut self, path: CategoryPath, presenter: &mut P) {
        self.navigator.navigate_to(path);
        self.publish_view(presenter);
    }

    pub fn navigate_up<P: Presenter>(&mut self, depth: usize, presenter: &mut P) {
        self.navigator.navigate_up(depth);
        self.publish_view(presenter);
    }

    /// Drills one level down into `label`.
    pub fn descend<P: Presenter>(&mut self, label: &str, presenter: &mut P) {
        let path = self.navigator.path().child(label);
        self.navigate_to(path, presenter);
    }

    pub fn set_query<P: Presenter>(&mut self, raw: &str, presenter: &mut P) {
        self.navigator.set_query(raw);
        self.renderer.reset();
        self.publish_batch(presenter, true);
    }

    /// Appends the next batch if there is one. Returns the number of items
    /// rendered by this call.
    pub fn request_more<P: Presenter>(&mut self, presenter: &mut P) -> usize {
        self.publish_batch(presenter, false)
    }

    fn publish_view<P: Presenter>(&mut self, presenter: &mut P) {
        self.renderer.reset();
        presenter.render_breadcrumb(&self.breadcrumb());
        presenter.render_categories(self.navigator.children());
        self.publish_batch(presenter, true);
    }

    fn publish_batch<P: Presenter>(&mut self, presenter: &mut P, reset: bool) -> usize {
        let filtered = self.navigator.filtered();
        if filtered.is_empty() {
            if reset {
                presenter.render_empty();
            }
            return 0;
        }

        let Some(batch) = self.renderer.begin(filtered) else {
            return 0;
        };
        if batch.is_empty() {
            return 0;
        }

        let catalog = self.navigator.catalog();
        let items: Vec<&Item> = batch
            .items()
            .iter()
            .filter_map(|position| catalog.get(*position))
            .collect();
        presenter.render_batch(&items, reset);
        let count = items.len();
        let cursor = batch.commit();
        tracing::trace!(count, cursor, total = filtered.len(), "batch rendered");
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        crumbs: Vec<Crumb>,
        categories: Vec<String>,
        shown: Vec<String>,
        empty: bool,
    }

    impl Presenter for Recorder {
        fn render_breadcrumb(&mut self, crumbs: &[Crumb]) {
            self.crumbs = crumbs.to_vec();
        }

        fn render_categories(&mut self, labels: &[String]) {
            self.categories = labels.to_vec();
        }

        fn render_batch(&mut self, items: &[&Item], reset: bool) {
            if reset {
                self.shown.clear();
            }
            self.empty = false;
            self.shown.extend(items.iter().map(|item| item.id.clone()));
        }

        fn render_empty(&mut self) {
            self.shown.clear();
            self.empty = true;
        }
    }

    fn session() -> Session {
        let items = vec![
            Item::new("a", "Owl").with_categories("Animals", "Birds", ""),
            Item::new("b", "Box").with_categories("Wood", "Boxes", ""),
            Item::new("c", "Chest").with_categories("Wood", "Boxes", "Large"),
        ];
        Session::with_batch_size(Arc::new(Catalog::load(items).unwrap()), 2)
    }

    #[test]
    fn start_publishes_root_view() {
        let mut session = session();
        let mut view = Recorder::default();
        session.start(&mut view);
        assert_eq!(view.crumbs.len(), 1);
        assert!(view.crumbs[0].active);
        assert_eq!(view.categories, vec!["Animals", "Wood"]);
        assert_eq!(view.shown, vec!["a", "b"]);
        assert!(session.has_more());
    }

    #[test]
    fn request_more_appends_until_exhausted() {
        let mut session = session();
        let mut view = Recorder::default();
        session.start(&mut view);
        assert_eq!(session.request_more(&mut view), 1);
        assert_eq!(session.request_more(&mut view), 0);
        assert_eq!(view.shown, vec!["a", "b", "c"]);
        assert_eq!(session.rendered().count(), 3);
    }

    #[test]
    fn descend_builds_breadcrumb() {
        let mut session = session();
        let mut view = Recorder::default();
        session.start(&mut view);
        session.descend("Wood", &mut view);
        session.descend("Boxes", &mut view);
        let labels: Vec<&str> = view.crumbs.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["", "Wood", "Boxes"]);
        assert!(view.crumbs[2].active);
        assert_eq!(view.categories, vec!["Large"]);
        assert_eq!(view.shown, vec!["b", "c"]);
    }

    #[test]
    fn query_change_resets_cursor_without_stale_items() {
        let mut session = session();
        let mut view = Recorder::default();
        session.start(&mut view);
        session.request_more(&mut view);
        session.set_query("chest", &mut view);
        assert_eq!(session.rendered_len(), 1);
        assert_eq!(view.shown, vec!["c"]);
    }

    #[test]
    fn empty_view_signals_instead_of_failing() {
        let mut session = session();
        let mut view = Recorder::default();
        session.start(&mut view);
        session.navigate_to(["Metal"].into_iter().collect(), &mut view);
        assert!(view.empty);
        assert!(view.shown.is_empty());
        assert_eq!(session.request_more(&mut view), 0);
        assert!(!session.has_more());
    }
}
