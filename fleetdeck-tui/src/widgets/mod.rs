//! Reusable widget components.

pub mod detail;
pub mod filter;
pub mod input;
pub mod progress;
pub mod status;
pub mod virtual_list;

pub use detail::DetailPanel;
pub use filter::{FilterBar, FilterChip};
pub use input::InputField;
pub use progress::{progress_ratio, ProgressBar};
pub use status::StatCard;
pub use virtual_list::{compute_window, ScrollState, ViewportWindow, VirtualList};
