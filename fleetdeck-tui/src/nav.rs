//! Navigation and view switching utilities.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum View {
    Dashboard,
    Agents,
    Generator,
    Categories,
    History,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Dashboard => "Dashboard",
            View::Agents => "Agents",
            View::Generator => "Generator",
            View::Categories => "Categories",
            View::History => "Generations",
        }
    }

    pub fn all() -> &'static [View] {
        &[
            View::Dashboard,
            View::Agents,
            View::Generator,
            View::Categories,
            View::History,
        ]
    }

    pub fn index(&self) -> usize {
        Self::all().iter().position(|v| v == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<View> {
        Self::all().get(index).copied()
    }

    pub fn next(&self) -> View {
        let all = Self::all();
        all[(self.index() + 1) % all.len()]
    }

    pub fn previous(&self) -> View {
        let idx = self.index();
        let all = Self::all();
        let prev = if idx == 0 { all.len() - 1 } else { idx - 1 };
        all[prev]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_wraps_both_ways() {
        assert_eq!(View::History.next(), View::Dashboard);
        assert_eq!(View::Dashboard.previous(), View::History);
        for view in View::all() {
            assert_eq!(View::from_index(view.index()), Some(*view));
            assert_eq!(view.next().previous(), *view);
        }
        assert_eq!(View::from_index(9), None);
    }
}
