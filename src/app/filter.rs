//! Search and sort applied to the file listing.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::files::FileDescriptor;

/// Field the listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Lexicographic by name.
    Name,
    /// Chronological by creation time.
    #[default]
    CreatedAt,
    /// Numeric by size.
    Size,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

/// Ordering of the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field to compare.
    pub field: SortField,
    /// Direction.
    pub direction: SortDirection,
}

impl SortSpec {
    /// Build a sort spec.
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

/// Search and sort settings, `{ "", created_at desc }` by default.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Case-insensitive substring matched against file names.
    pub search: String,
    /// Ordering.
    pub sort: SortSpec,
}

/// Partial filter; fields left `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FilterUpdate {
    /// New search string.
    pub search: Option<String>,
    /// New ordering.
    pub sort: Option<SortSpec>,
}

impl FilterUpdate {
    /// Update only the search string.
    pub fn search(search: impl Into<String>) -> Self {
        Self {
            search: Some(search.into()),
            sort: None,
        }
    }

    /// Update only the ordering.
    pub fn sort(field: SortField, direction: SortDirection) -> Self {
        Self {
            search: None,
            sort: Some(SortSpec::new(field, direction)),
        }
    }
}

impl FilterSpec {
    /// Shallow-merge a partial update.
    pub fn merge(&mut self, update: FilterUpdate) {
        if let Some(search) = update.search {
            self.search = search;
        }
        if let Some(sort) = update.sort {
            self.sort = sort;
        }
    }

    /// Whether a file name passes the search.
    pub fn matches(&self, name: &str) -> bool {
        self.search.is_empty() || name.to_lowercase().contains(&self.search.to_lowercase())
    }

    /// Filter and order a listing.
    ///
    /// Equal keys are ordered by id, so flipping the direction reverses the
    /// result exactly.
    pub fn apply(&self, files: Vec<FileDescriptor>) -> Vec<FileDescriptor> {
        let mut out: Vec<FileDescriptor> =
            files.into_iter().filter(|f| self.matches(&f.name)).collect();

        out.sort_by(|a, b| {
            let ord = compare(self.sort.field, a, b).then_with(|| a.id.cmp(&b.id));
            match self.sort.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        out
    }
}

fn compare(field: SortField, a: &FileDescriptor, b: &FileDescriptor) -> Ordering {
    match field {
        SortField::Name => a.name.cmp(&b.name),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Size => a.size.cmp(&b.size),
    }
}
