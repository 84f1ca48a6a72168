use std::cell::Cell;

pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Slice `[cursor, cursor + batch_size)` of `filtered`, clamped to its length,
/// and the cursor after it. A cursor at or past the end yields an empty batch
/// and the cursor unchanged.
pub fn next_batch<T>(filtered: &[T], cursor: usize, batch_size: usize) -> (&[T], usize) {
    if cursor >= filtered.len() {
        return (&[], cursor);
    }
    let end = cursor.saturating_add(batch_size).min(filtered.len());
    (&filtered[cursor..end], end)
}

/// Pages a filtered list into fixed-size batches. Only one batch can be in
/// flight at a time; a request made while one is pending is ignored.
#[derive(Debug)]
pub struct Renderer {
    batch_size: usize,
    cursor: Cell<usize>,
    in_flight: Cell<bool>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl Renderer {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            cursor: Cell::new(0),
            in_flight: Cell::new(false),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of items already handed out for the current list.
    pub fn cursor(&self) -> usize {
        self.cursor.get()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.get()
    }

    /// Rewinds to the start of a new list. Needs exclusive access, so no batch
    /// of the previous list can still be pending.
    pub fn reset(&mut self) {
        self.cursor.set(0);
        self.in_flight.set(false);
    }

    /// Starts the next batch of `filtered`. Returns `None` while another batch
    /// is still pending.
    pub fn begin<'r, 'a, T>(&'r self, filtered: &'a [T]) -> Option<PendingBatch<'r, 'a, T>> {
        if self.in_flight.replace(true) {
            tracing::trace!("batch request ignored, one already in flight");
            return None;
        }
        let cursor = self.cursor.get().min(filtered.len());
        let (items, end) = next_batch(filtered, cursor, self.batch_size);
        Some(PendingBatch {
            renderer: self,
            items,
            end,
        })
    }

    /// Begins and immediately commits a batch.
    pub fn advance<'a, T>(&self, filtered: &'a [T]) -> &'a [T] {
        match self.begin(filtered) {
            Some(batch) => {
                let items = batch.items();
                batch.commit();
                items
            }
            None => &[],
        }
    }

    pub fn is_exhausted(&self, len: usize) -> bool {
        self.cursor.get() >= len
    }
}

/// A batch that has been computed but not yet committed. Dropping it without
/// committing releases the guard and leaves the cursor where it was.
#[derive(Debug)]
pub struct PendingBatch<'r, 'a, T> {
    renderer: &'r Renderer,
    items: &'a [T],
    end: usize,
}

impl<'r, 'a, T> PendingBatch<'r, 'a, T> {
    pub fn items(&self) -> &'a [T] {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Advances the cursor past this batch and returns the new cursor.
    pub fn commit(self) -> usize {
        self.renderer.cursor.set(self.end);
        self.end
    }
}

impl<T> Drop for PendingBatch<'_, '_, T> {
    fn drop(&mut self) {
        self.renderer.in_flight.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_hundred_twenty_items_in_fifties() {
        let filtered: Vec<u32> = (0..120).collect();
        let renderer = Renderer::new(50);
        let expected = [(50, 50), (50, 100), (20, 120), (0, 120)];
        for (len, cursor) in expected {
            let batch = renderer.advance(&filtered);
            assert_eq!(batch.len(), len);
            assert_eq!(renderer.cursor(), cursor);
        }
    }

    #[test]
    fn next_batch_never_exceeds_length() {
        let filtered: Vec<u32> = (0..7).collect();
        for cursor in 0..=filtered.len() {
            let (batch, end) = next_batch(&filtered, cursor, 3);
            assert!(end <= filtered.len());
            assert_eq!(batch.len(), end - cursor);
        }
    }

    #[test]
    fn next_batch_past_end_is_empty_and_keeps_cursor() {
        let filtered = [1, 2, 3];
        let (batch, cursor) = next_batch(&filtered, 9, 50);
        assert!(batch.is_empty());
        assert_eq!(cursor, 9);
    }

    #[test]
    fn reentrant_request_is_ignored() {
        let filtered: Vec<u32> = (0..10).collect();
        let renderer = Renderer::new(4);
        let first = renderer.begin(&filtered).unwrap();
        assert!(renderer.begin(&filtered).is_none());
        assert!(renderer.advance(&filtered).is_empty());
        assert_eq!(first.items(), &[0, 1, 2, 3]);
        assert_eq!(first.commit(), 4);
        let second = renderer.begin(&filtered).unwrap();
        assert_eq!(second.items(), &[4, 5, 6, 7]);
    }

    #[test]
    fn dropped_batch_does_not_advance() {
        let filtered: Vec<u32> = (0..10).collect();
        let renderer = Renderer::new(4);
        drop(renderer.begin(&filtered));
        assert_eq!(renderer.cursor(), 0);
        assert!(!renderer.is_busy());
    }

    #[test]
    fn reset_rewinds_cursor() {
        let filtered: Vec<u32> = (0..10).collect();
        let mut renderer = Renderer::new(4);
        renderer.advance(&filtered);
        renderer.reset();
        assert_eq!(renderer.cursor(), 0);
        assert_eq!(renderer.advance(&filtered), &[0, 1, 2, 3]);
    }
}
