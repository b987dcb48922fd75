//! Windowed list rendering.
//!
//! Only rows that intersect the viewport, plus `overscan` rows on each side,
//! are ever built. The visible range is index arithmetic over a uniform row
//! height, so the cost per frame does not depend on the list length.

use std::ops::RangeInclusive;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::Line,
    widgets::{Block, StatefulWidget, Widget},
};

/// Slice of a list that has to be rendered for one viewport position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportWindow {
    pub start_index: usize,
    /// Inclusive.
    pub end_index: usize,
    /// Height of the skipped rows above `start_index`.
    pub top_padding: u64,
    /// Height of the skipped rows below `end_index`.
    pub bottom_padding: u64,
}

impl ViewportWindow {
    pub fn range(&self) -> RangeInclusive<usize> {
        self.start_index..=self.end_index
    }

    pub fn len(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    /// A window always holds at least one row.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Rows to render for a viewport scrolled to `scroll_offset`.
///
/// Returns `None` for an empty list or a zero row height. The total
/// scrollable height is `total_items * item_height`.
pub fn compute_window(
    scroll_offset: u64,
    viewport_height: u64,
    item_height: u64,
    total_items: usize,
    overscan: usize,
) -> Option<ViewportWindow> {
    if total_items == 0 || item_height == 0 {
        return None;
    }
    let last = total_items - 1;
    let first_visible = usize::try_from(scroll_offset / item_height).unwrap_or(usize::MAX);
    let last_visible = usize::try_from(
        scroll_offset
            .saturating_add(viewport_height)
            .div_ceil(item_height),
    )
    .unwrap_or(usize::MAX);

    let start_index = first_visible.saturating_sub(overscan).min(last);
    let end_index = last_visible.saturating_add(overscan).min(last);

    Some(ViewportWindow {
        start_index,
        end_index,
        top_padding: start_index as u64 * item_height,
        bottom_padding: (last - end_index) as u64 * item_height,
    })
}

/// Selection and scroll position of a [`VirtualList`].
///
/// The offset is in terminal rows. Rendering clamps the selection to the
/// list and scrolls just enough to keep the selected row fully visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrollState {
    selected: Option<usize>,
    offset: u64,
    viewport_height: u16,
}

impl ScrollState {
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Viewport height seen by the last render.
    pub fn viewport_height(&self) -> u16 {
        self.viewport_height
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.selected = index;
    }

    /// Back to the top with nothing selected.
    pub fn reset(&mut self) {
        self.selected = None;
        self.offset = 0;
    }

    /// Move the selection by `delta` rows, stopping at either end.
    pub fn move_by(&mut self, delta: isize, total: usize) {
        if total == 0 {
            self.selected = None;
            return;
        }
        let next = match self.selected {
            Some(current) => current.saturating_add_signed(delta),
            None if delta < 0 => total - 1,
            None => 0,
        };
        self.selected = Some(next.min(total - 1));
    }

    /// Rows that fit in the last rendered viewport, at least one.
    pub fn rows_per_page(&self, item_height: u16) -> usize {
        usize::from((self.viewport_height / item_height.max(1)).max(1))
    }

    /// Drop a selection that points past the end of a shrunk list.
    pub fn clamp(&mut self, total: usize) {
        self.selected = match (self.selected, total) {
            (_, 0) => None,
            (Some(index), _) => Some(index.min(total - 1)),
            (None, _) => None,
        };
    }

    fn follow(&mut self, viewport_height: u64, item_height: u64) {
        let Some(selected) = self.selected else {
            return;
        };
        let top = selected as u64 * item_height;
        let bottom = top + item_height;
        if top < self.offset {
            self.offset = top;
        } else if bottom > self.offset + viewport_height {
            self.offset = bottom.saturating_sub(viewport_height);
        }
    }
}

/// List widget that only builds the rows in the current window.
///
/// `row` is called with the item index and whether it is selected and must
/// return the lines of that row; lines past `item_height` are ignored.
pub struct VirtualList<'a, F> {
    total: usize,
    item_height: u16,
    overscan: usize,
    block: Option<Block<'a>>,
    highlight_style: Style,
    row: F,
}

impl<'a, F> VirtualList<'a, F>
where
    F: Fn(usize, bool) -> Vec<Line<'a>>,
{
    pub fn new(total: usize, item_height: u16, row: F) -> Self {
        Self {
            total,
            item_height: item_height.max(1),
            overscan: 0,
            block: None,
            highlight_style: Style::default(),
            row,
        }
    }

    pub fn overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn highlight_style(mut self, style: Style) -> Self {
        self.highlight_style = style;
        self
    }
}

impl<'a, F> StatefulWidget for VirtualList<'a, F>
where
    F: Fn(usize, bool) -> Vec<Line<'a>>,
{
    type State = ScrollState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut ScrollState) {
        let inner = match self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.render(area, buf);
                inner
            }
            None => area,
        };
        state.viewport_height = inner.height;
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let item_height = u64::from(self.item_height);
        let viewport = u64::from(inner.height);
        state.clamp(self.total);
        state.follow(viewport, item_height);
        let scrollable = (self.total as u64 * item_height).saturating_sub(viewport);
        state.offset = state.offset.min(scrollable);

        let Some(window) =
            compute_window(state.offset, viewport, item_height, self.total, self.overscan)
        else {
            return;
        };

        for index in window.range() {
            let selected = state.selected == Some(index);
            let row_top = (index as u64 * item_height) as i64 - state.offset as i64;
            let lines = (self.row)(index, selected);
            for line_no in 0..self.item_height {
                let y = row_top + i64::from(line_no);
                if y < 0 || y >= i64::from(inner.height) {
                    continue;
                }
                let line_area = Rect {
                    x: inner.x,
                    y: inner.y + y as u16,
                    width: inner.width,
                    height: 1,
                };
                if selected {
                    buf.set_style(line_area, self.highlight_style);
                }
                if let Some(line) = lines.get(usize::from(line_no)) {
                    buf.set_line(line_area.x, line_area.y, line, line_area.width);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_window_for_scrolled_viewport() {
        let window = compute_window(560, 520, 56, 500, 10).unwrap();
        assert_eq!(window.start_index, 0);
        assert_eq!(window.end_index, 30);
        assert_eq!(window.top_padding, 0);
        assert_eq!(window.bottom_padding, (499 - 30) * 56);
    }

    #[test]
    fn test_window_deep_in_the_list() {
        let window = compute_window(56 * 200, 520, 56, 500, 5).unwrap();
        assert_eq!(window.start_index, 195);
        // ceil((11200 + 520) / 56) = 210
        assert_eq!(window.end_index, 215);
        assert_eq!(window.top_padding, 195 * 56);
        assert_eq!(window.len(), 21);
    }

    #[test]
    fn test_window_clamps_at_the_end() {
        let window = compute_window(56 * 495, 520, 56, 500, 10).unwrap();
        assert_eq!(window.end_index, 499);
        assert_eq!(window.bottom_padding, 0);
        assert!(compute_window(0, 520, 56, 0, 10).is_none());
        assert!(compute_window(0, 520, 0, 10, 10).is_none());
    }

    #[test]
    fn test_move_by_stops_at_both_ends() {
        let mut state = ScrollState::default();
        state.move_by(1, 3);
        assert_eq!(state.selected(), Some(0));
        state.move_by(10, 3);
        assert_eq!(state.selected(), Some(2));
        state.move_by(-10, 3);
        assert_eq!(state.selected(), Some(0));
        state.move_by(1, 0);
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn test_render_builds_only_windowed_rows() {
        let built = Cell::new(0usize);
        let list = VirtualList::new(500, 1, |index, _| {
            built.set(built.get() + 1);
            vec![Line::from(format!("row {}", index))]
        })
        .overscan(2);

        let area = Rect::new(0, 0, 20, 10);
        let mut buf = Buffer::empty(area);
        let mut state = ScrollState::default();
        state.select(Some(250));
        list.render(area, &mut buf, &mut state);

        // Rows 241..=251 intersect the viewport edge, plus 2 on each side.
        assert_eq!(built.get(), 15);
        assert_eq!(state.offset(), 241);
        assert_eq!(state.viewport_height(), 10);
        let last_line: String = (0..20)
            .map(|x| buf.get(x, 9).symbol().to_string())
            .collect();
        assert!(last_line.starts_with("row 250"));
    }
}
