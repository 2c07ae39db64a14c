//! Parser for `git log --pretty=format:%h: %s`.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Commits keyed by short hash, in log order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitLog(Vec<(String, String)>);

impl GitLog {
    /// Parse one commit per line, splitting on the first `:`.
    ///
    /// The subject keeps the space that follows the colon. A line without a
    /// colon becomes a hash with an empty subject; blank lines are skipped.
    /// A repeated hash keeps its first position and takes the last subject.
    #[must_use]
    pub fn parse(output: &str) -> Self {
        let mut entries: Vec<(String, String)> = Vec::new();

        for line in output.lines().filter(|line| !line.is_empty()) {
            let (hash, subject) = line.split_once(':').unwrap_or((line, ""));
            match entries.iter_mut().find(|(h, _)| h == hash) {
                Some((_, existing)) => *existing = subject.to_string(),
                None => entries.push((hash.to_string(), subject.to_string())),
            }
        }

        Self(entries)
    }

    #[must_use]
    pub fn get(&self, hash: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(h, _)| h == hash)
            .map(|(_, subject)| subject.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(h, s)| (h.as_str(), s.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for GitLog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (hash, subject) in &self.0 {
            map.serialize_entry(hash, subject)?;
        }
        map.end()
    }
}
