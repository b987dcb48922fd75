//! Debounced query controller.
//!
//! Turns raw list input into canonical [`Query`] values. Text edits are held
//! back until the input has been quiet for the search delay; selections, sort
//! toggles and page changes emit immediately. The controller never reads a
//! clock itself: callers pass `now` into every call and sleep until
//! [`QueryController::deadline`] between events.

use std::time::{Duration, Instant};

use crate::query::{Query, SortDirection, SortSpec};

/// Quiet period after the last keystroke before a search is committed.
pub const DEFAULT_SEARCH_DELAY: Duration = Duration::from_millis(350);

const SEARCH_FILTER: &str = "search";

/// Raw input accepted by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryInput {
    /// Full text of the search box after an edit.
    SearchChanged(String),
    /// A dropdown selection; `None` clears the filter.
    FilterSelected(String, Option<String>),
    /// Header click on a sortable column.
    SortToggled(String),
    PageChanged(u32),
    /// Back to the unfiltered first page.
    Reset,
}

#[derive(Debug, Clone)]
struct PendingSearch {
    text: String,
    due: Instant,
}

#[derive(Debug, Clone)]
pub struct QueryController {
    initial: Query,
    current: Query,
    pending: Option<PendingSearch>,
    delay: Duration,
}

impl QueryController {
    pub fn new(initial: Query) -> Self {
        Self::with_delay(initial, DEFAULT_SEARCH_DELAY)
    }

    pub fn with_delay(initial: Query, delay: Duration) -> Self {
        Self {
            current: initial.clone(),
            initial,
            pending: None,
            delay,
        }
    }

    /// Resume at `current`, e.g. a query restored from disk. [`QueryInput::Reset`]
    /// still returns to the initial query.
    pub fn resumed_at(mut self, current: Query) -> Self {
        self.current = current;
        self
    }

    /// The last emitted query.
    pub fn current(&self) -> &Query {
        &self.current
    }

    /// Search text as typed, including an edit that has not been committed.
    pub fn search_text(&self) -> &str {
        match &self.pending {
            Some(pending) => &pending.text,
            None => self.current.filter(SEARCH_FILTER).unwrap_or(""),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending search becomes due, if one is waiting.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    /// Feed one input event. Returns the new query if one is emitted now.
    pub fn handle(&mut self, input: QueryInput, now: Instant) -> Option<Query> {
        match input {
            QueryInput::SearchChanged(text) => {
                // Restarts the window; whatever was pending is dropped.
                self.pending = Some(PendingSearch {
                    text,
                    due: now + self.delay,
                });
                None
            }
            QueryInput::FilterSelected(name, value) => {
                let mut next = self.current.clone();
                next.set_filter(name, value.unwrap_or_default());
                next.page = 1;
                self.emit(next)
            }
            QueryInput::SortToggled(field) => {
                let mut next = self.current.clone();
                let direction = match &next.sort {
                    Some(sort) if sort.field == field => sort.direction.flipped(),
                    _ => SortDirection::Asc,
                };
                next.sort = Some(SortSpec::new(field, direction));
                next.page = 1;
                self.emit(next)
            }
            QueryInput::PageChanged(page) => {
                let mut next = self.current.clone();
                next.page = page.max(1);
                self.emit(next)
            }
            QueryInput::Reset => {
                self.pending = None;
                let next = self.initial.clone();
                self.emit(next)
            }
        }
    }

    /// Commit the pending search if its delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<Query> {
        match &self.pending {
            Some(pending) if pending.due <= now => {}
            _ => return None,
        }
        let pending = self.pending.take()?;
        let mut next = self.current.clone();
        next.set_filter(SEARCH_FILTER, pending.text.trim());
        next.page = 1;
        self.emit(next)
    }

    fn emit(&mut self, next: Query) -> Option<Query> {
        if next == self.current {
            return None;
        }
        self.current = next.clone();
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> QueryController {
        QueryController::new(Query::new("agents", 20))
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_superseded_search_text_is_never_emitted() {
        let mut c = controller();
        let t0 = Instant::now();
        let mut emitted = Vec::new();

        for (offset, text) in [(0, "a"), (100, "ab"), (200, "abc")] {
            let now = t0 + ms(offset);
            emitted.extend(c.poll(now));
            emitted.extend(c.handle(QueryInput::SearchChanged(text.into()), now));
        }
        // Nothing is due before the window after the last keystroke closes.
        assert!(c.poll(t0 + ms(200) + DEFAULT_SEARCH_DELAY - ms(1)).is_none());
        emitted.extend(c.poll(t0 + ms(200) + DEFAULT_SEARCH_DELAY));
        emitted.extend(c.poll(t0 + ms(5_000)));

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].filter("search"), Some("abc"));
        assert_eq!(emitted[0].page, 1);
    }

    #[test]
    fn test_search_text_reflects_uncommitted_edit() {
        let mut c = controller();
        let now = Instant::now();
        c.handle(QueryInput::SearchChanged("nov".into()), now);
        assert_eq!(c.search_text(), "nov");
        assert!(c.current().filter("search").is_none());
        assert_eq!(c.deadline(), Some(now + DEFAULT_SEARCH_DELAY));
    }

    #[test]
    fn test_discrete_changes_emit_immediately_and_reset_page() {
        let mut c = controller();
        let now = Instant::now();
        let q = c.handle(QueryInput::PageChanged(4), now).unwrap();
        assert_eq!(q.page, 4);

        let q = c
            .handle(
                QueryInput::FilterSelected("status".into(), Some("active".into())),
                now,
            )
            .unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.filter("status"), Some("active"));

        c.handle(QueryInput::PageChanged(3), now);
        let q = c.handle(QueryInput::SortToggled("name".into()), now).unwrap();
        assert_eq!(q.page, 1);
    }

    #[test]
    fn test_page_change_keeps_other_fields() {
        let mut c = controller();
        let now = Instant::now();
        c.handle(
            QueryInput::FilterSelected("category".into(), Some("finance".into())),
            now,
        );
        c.handle(QueryInput::SortToggled("name".into()), now);
        let q = c.handle(QueryInput::PageChanged(2), now).unwrap();
        assert_eq!(q.filter("category"), Some("finance"));
        assert_eq!(q.sort, Some(SortSpec::new("name", SortDirection::Asc)));
    }

    #[test]
    fn test_sort_toggle_flips_same_field_and_resets_new_field() {
        let mut c = controller();
        let now = Instant::now();
        let asc = c.handle(QueryInput::SortToggled("name".into()), now).unwrap();
        assert_eq!(asc.sort.unwrap().direction, SortDirection::Asc);
        let desc = c.handle(QueryInput::SortToggled("name".into()), now).unwrap();
        assert_eq!(desc.sort.unwrap().direction, SortDirection::Desc);
        let other = c
            .handle(QueryInput::SortToggled("createdAt".into()), now)
            .unwrap();
        assert_eq!(
            other.sort,
            Some(SortSpec::new("createdAt", SortDirection::Asc))
        );
    }

    #[test]
    fn test_discrete_change_uses_committed_search_only() {
        let mut c = controller();
        let now = Instant::now();
        c.handle(QueryInput::SearchChanged("nova".into()), now);
        let q = c
            .handle(
                QueryInput::FilterSelected("status".into(), Some("training".into())),
                now,
            )
            .unwrap();
        assert!(q.filter("search").is_none());
        // The pending edit still lands once due.
        let q = c.poll(now + DEFAULT_SEARCH_DELAY).unwrap();
        assert_eq!(q.filter("search"), Some("nova"));
        assert_eq!(q.filter("status"), Some("training"));
    }

    #[test]
    fn test_identical_query_is_not_emitted_twice() {
        let mut c = controller();
        let now = Instant::now();
        assert!(c.handle(QueryInput::PageChanged(1), now).is_none());
        c.handle(QueryInput::SearchChanged("   ".into()), now);
        assert!(c.poll(now + DEFAULT_SEARCH_DELAY).is_none());
    }

    #[test]
    fn test_resumed_controller_resets_to_initial() {
        let restored = Query::new("agents", 20).with_page(3);
        let mut c = controller().resumed_at(restored.clone());
        assert_eq!(c.current(), &restored);
        let q = c.handle(QueryInput::Reset, Instant::now()).unwrap();
        assert_eq!(q.page, 1);
    }

    #[test]
    fn test_clearing_filter_and_reset() {
        let mut c = controller();
        let now = Instant::now();
        c.handle(
            QueryInput::FilterSelected("status".into(), Some("active".into())),
            now,
        );
        let q = c
            .handle(QueryInput::FilterSelected("status".into(), None), now)
            .unwrap();
        assert!(q.filters.is_empty());

        c.handle(QueryInput::PageChanged(5), now);
        c.handle(QueryInput::SearchChanged("x".into()), now);
        let q = c.handle(QueryInput::Reset, now).unwrap();
        assert_eq!(q, Query::new("agents", 20));
        assert!(!c.is_pending());
    }
}
