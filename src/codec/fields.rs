//! Field keys and the flat field mapping.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Prefix shared by every key on the wire.
pub const KEY_PREFIX: &str = "X_BI_KEY_";

/// Reserved key whose value is a base64 list of further `key:value` pairs.
pub const ENVELOPE_KEY: &str = "X_BI_KEY_KV_PAIR";

/// Extended build information keys.
///
/// The envelope key has no variant, so a [`Fields`] mapping can never hold
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKey {
    /// Remote repository URL
    GitOrigin,
    /// `git status --porcelain=v1 -b -uall`
    GitStatus,
    /// Latest commits
    GitLog,
    /// Commits not yet pushed to the remote tracking branch
    GitLocalCommits,
    /// Working directory of the build
    BuildPath,
    /// Local build timestamp
    BuildTime,
    /// Build host name
    BuildHost,
    /// Build user name
    BuildUser,
}

impl FieldKey {
    pub const ALL: [Self; 8] = [
        Self::GitOrigin,
        Self::GitStatus,
        Self::GitLog,
        Self::GitLocalCommits,
        Self::BuildPath,
        Self::BuildTime,
        Self::BuildHost,
        Self::BuildUser,
    ];

    /// Wire name of the key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GitOrigin => "X_BI_KEY_GIT_ORIGIN",
            Self::GitStatus => "X_BI_KEY_GIT_STATUS",
            Self::GitLog => "X_BI_KEY_GIT_LOG",
            Self::GitLocalCommits => "X_BI_KEY_GIT_LOCAL_COMMITS",
            Self::BuildPath => "X_BI_KEY_BUILD_PATH",
            Self::BuildTime => "X_BI_KEY_BUILD_TIME",
            Self::BuildHost => "X_BI_KEY_BUILD_HOST",
            Self::BuildUser => "X_BI_KEY_BUILD_USER",
        }
    }

    /// Whether values under this key are base64-wrapped individually.
    ///
    /// These carry multi-line command output that would otherwise collide
    /// with the `,` framing of the envelope.
    #[must_use]
    pub const fn is_wrapped(self) -> bool {
        matches!(self, Self::GitStatus | Self::GitLog | Self::GitLocalCommits)
    }

    /// Label used by the text renderer, e.g. `git.local.commits`.
    #[must_use]
    pub fn label(self) -> String {
        normalize(self.as_str(), "")
    }

    /// Label used by the JSON renderer, e.g. `xbi.git.status`.
    #[must_use]
    pub fn json_label(self) -> String {
        normalize(self.as_str(), "xbi.")
    }
}

fn normalize(key: &str, prefix: &str) -> String {
    key.replacen(KEY_PREFIX, prefix, 1)
        .to_lowercase()
        .replace('_', ".")
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| Error::UnknownKey(s.to_string()))
    }
}

/// Flat mapping from field key to plain-text value.
///
/// Values are always stored decoded; wrapping happens only on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(BTreeMap<FieldKey, String>);

impl Fields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous one.
    pub fn insert(&mut self, key: FieldKey, value: impl Into<String>) -> Option<String> {
        self.0.insert(key, value.into())
    }

    #[must_use]
    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: FieldKey) -> bool {
        self.0.contains_key(&key)
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &str)> {
        self.0.iter().map(|(key, value)| (*key, value.as_str()))
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
