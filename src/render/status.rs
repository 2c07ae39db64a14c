//! Parser for `git status --porcelain=v1 -b -uall`.

use serde::Serialize;

/// Change categories reported by porcelain status columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Modified,
    Untracked,
    Deleted,
    Copied,
    Renamed,
    TypeChanged,
}

impl Category {
    const fn from_column(c: char) -> Option<Self> {
        match c {
            'M' => Some(Self::Modified),
            '?' => Some(Self::Untracked),
            'D' => Some(Self::Deleted),
            'C' => Some(Self::Copied),
            'R' => Some(Self::Renamed),
            'T' => Some(Self::TypeChanged),
            _ => None,
        }
    }
}

/// Structured porcelain status.
///
/// Categories with no entries stay `None` and are left out of JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GitStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub untracked: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copied: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renamed: Option<Vec<String>>,
    #[serde(rename = "type-changed", skip_serializing_if = "Option::is_none")]
    pub type_changed: Option<Vec<String>>,
}

impl GitStatus {
    /// Parse porcelain v1 output.
    ///
    /// Both status columns are inspected; a path is recorded at most once
    /// per category for a given line, so `??` yields a single untracked
    /// entry. Lines shorter than four characters are skipped.
    #[must_use]
    pub fn parse(output: &str) -> Self {
        let mut status = Self::default();

        for line in output.lines() {
            let chars: Vec<char> = line.chars().collect();
            if chars.len() < 4 {
                continue;
            }
            let path: String = chars[3..].iter().collect();

            if chars[1] == '#' {
                status.branch = Some(path.clone());
            }

            let mut seen = Vec::with_capacity(2);
            for category in [chars[0], chars[1]]
                .into_iter()
                .filter_map(Category::from_column)
            {
                if !seen.contains(&category) {
                    seen.push(category);
                    status.entries(category).push(path.clone());
                }
            }
        }

        status
    }

    fn entries(&mut self, category: Category) -> &mut Vec<String> {
        let slot = match category {
            Category::Modified => &mut self.modified,
            Category::Untracked => &mut self.untracked,
            Category::Deleted => &mut self.deleted,
            Category::Copied => &mut self.copied,
            Category::Renamed => &mut self.renamed,
            Category::TypeChanged => &mut self.type_changed,
        };
        slot.get_or_insert_with(Vec::new)
    }
}
