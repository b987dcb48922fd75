//! Progress bar widget for long running requests.

use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Gauge},
    Frame,
};
use std::time::Duration;

/// Elapsed time against an expected duration. The bar never reaches the end
/// on its own; it stops short until the request settles.
pub struct ProgressBar<'a> {
    pub title: &'a str,
    pub elapsed: Duration,
    pub expected: Duration,
    pub style: Style,
}

/// Share of the bar to fill, capped below completion.
pub fn progress_ratio(elapsed: Duration, expected: Duration) -> f64 {
    if expected.is_zero() {
        return 0.95;
    }
    (elapsed.as_secs_f64() / expected.as_secs_f64()).clamp(0.0, 0.95)
}

impl<'a> ProgressBar<'a> {
    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let ratio = progress_ratio(self.elapsed, self.expected);
        let gauge = Gauge::default()
            .block(Block::default().title(self.title).borders(Borders::ALL))
            .gauge_style(self.style)
            .label(format!("{:.1}s", self.elapsed.as_secs_f64()))
            .ratio(ratio);
        f.render_widget(gauge, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_is_capped() {
        let expected = Duration::from_secs(2);
        assert_eq!(progress_ratio(Duration::from_secs(1), expected), 0.5);
        assert_eq!(progress_ratio(Duration::from_secs(9), expected), 0.95);
        assert_eq!(progress_ratio(Duration::ZERO, Duration::ZERO), 0.95);
    }
}
