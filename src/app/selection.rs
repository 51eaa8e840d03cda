//! Checked files in the listing.

use std::collections::HashSet;

/// Identifiers of checked files, in the order they were checked.
///
/// Identifiers that are not in the current listing are never reported as
/// selected; [`Selection::view`] filters them and [`Selection::prune`]
/// removes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<String>,
}

impl Selection {
    /// An empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check or uncheck one file.
    pub fn toggle(&mut self, id: &str) {
        if let Some(pos) = self.ids.iter().position(|s| s == id) {
            self.ids.remove(pos);
        } else {
            self.ids.push(id.to_string());
        }
    }

    /// Select every listed id, or clear if all of them are already selected.
    pub fn select_all<'a>(&mut self, listed: impl IntoIterator<Item = &'a str>) {
        let listed: Vec<&str> = listed.into_iter().collect();
        let all_selected = listed.iter().all(|id| self.contains(id));

        if all_selected {
            self.ids.clear();
        } else {
            self.ids = listed.into_iter().map(str::to_string).collect();
        }
    }

    /// Uncheck everything.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids not in the listing.
    pub fn prune<'a>(&mut self, listed: impl IntoIterator<Item = &'a str>) {
        let listed: HashSet<&str> = listed.into_iter().collect();
        self.ids.retain(|id| listed.contains(id.as_str()));
    }

    /// Whether an id is checked.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    /// Checked ids that are present in the listing.
    pub fn view<'a>(&self, listed: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let listed: HashSet<&str> = listed.into_iter().collect();
        self.ids
            .iter()
            .filter(|id| listed.contains(id.as_str()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
