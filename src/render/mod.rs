//! Read-only views over [`BuildInfo`].

mod log;
mod status;

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::codec::FieldKey;
use crate::info::BuildInfo;

pub use log::GitLog;
pub use status::GitStatus;

const RULE: &str = "----------";

/// JSON value of one member, chosen by field key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Status(GitStatus),
    Log(GitLog),
}

impl<'a> FieldValue<'a> {
    /// Structured form for status and log fields, plain text otherwise.
    #[must_use]
    pub fn parse(key: FieldKey, raw: &'a str) -> Self {
        match key {
            FieldKey::GitStatus => Self::Status(GitStatus::parse(raw)),
            FieldKey::GitLog | FieldKey::GitLocalCommits => Self::Log(GitLog::parse(raw)),
            _ => Self::Text(raw),
        }
    }
}

impl BuildInfo {
    /// Single-line summary.
    ///
    /// Format: `<rustc>| <crate>| rev: <sha>| dirty: <bool>| host: <h>| ts: <t>| `.
    /// Missing values are left out.
    #[must_use]
    pub fn oneliner(&self) -> String {
        let standard = self.standard();
        let mut line = format!("{}| {}| ", standard.rust_version, standard.path);

        for (key, value) in &standard.settings {
            match key.as_str() {
                "vcs.revision" => {
                    let _ = write!(line, "rev: {value}| ");
                }
                "vcs.modified" => {
                    let _ = write!(line, "dirty: {value}| ");
                }
                _ => {}
            }
        }

        if let Some(host) = self.fields().get(FieldKey::BuildHost) {
            let _ = write!(line, "host: {host}| ");
        }
        if let Some(ts) = self.fields().get(FieldKey::BuildTime) {
            let _ = write!(line, "ts: {ts}| ");
        }

        line
    }

    /// Full human-readable dump.
    #[must_use]
    pub fn text(&self) -> String {
        let standard = self.standard();
        let mut out = format!("{standard}\n{RULE}\n");

        for (key, value) in &standard.settings {
            let _ = writeln!(out, "{key}:{value}");
        }
        let _ = writeln!(out, "{RULE}");

        for dep in &standard.deps {
            let _ = writeln!(out, "module:\t{}@{}-{}", dep.path, dep.version, dep.sum);
        }
        let _ = writeln!(out, "{RULE}");

        for (key, value) in self.fields().iter() {
            let _ = write!(out, "\n{}:\n{value}\n", key.label());
        }

        out
    }

    /// Pretty-printed JSON object of settings and extended fields.
    #[must_use]
    pub fn json(&self) -> String {
        let mut members: BTreeMap<String, FieldValue<'_>> = self
            .standard()
            .settings
            .iter()
            .map(|(key, value)| (key.clone(), FieldValue::Text(value)))
            .collect();

        for (key, value) in self.fields().iter() {
            members.insert(key.json_label(), FieldValue::parse(key, value));
        }

        serde_json::to_string_pretty(&members).unwrap_or_else(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Fields;
    use crate::standard::StandardInfo;

    fn standard() -> StandardInfo {
        StandardInfo::from_parts(
            Some("rustc 1.86.0"),
            Some("demo"),
            Some("0.1.0"),
            Some("profile=release;vcs.revision=abc123;vcs.modified=false"),
            Some("serde|1.0.200|deadbeef"),
        )
    }

    fn info(fields: Fields) -> BuildInfo {
        let envelope = crate::codec::encode(&fields);
        BuildInfo::new(standard(), &envelope)
    }

    fn sample_fields() -> Fields {
        let mut fields = Fields::new();
        fields.insert(FieldKey::GitStatus, "## main\n?? new.rs\n");
        fields.insert(FieldKey::GitLog, "abc123: fix bug\ndef456: add feature");
        fields.insert(FieldKey::GitLocalCommits, "abc123: fix bug");
        fields.insert(FieldKey::BuildHost, "builder");
        fields.insert(FieldKey::BuildTime, "2024-05-01T12:30:45");
        fields
    }

    #[test]
    fn oneliner_includes_present_values() {
        assert_eq!(
            info(sample_fields()).oneliner(),
            "rustc 1.86.0| demo| rev: abc123| dirty: false| host: builder| ts: 2024-05-01T12:30:45| "
        );
    }

    #[test]
    fn oneliner_omits_absent_values() {
        let info = BuildInfo::new(StandardInfo::default(), "");
        assert_eq!(info.oneliner(), "| | ");
    }

    #[test]
    fn text_has_sections_in_order() {
        let text = info(sample_fields()).text();

        let settings = text.find("profile:release").unwrap();
        let deps = text.find("module:\tserde@1.0.200-deadbeef").unwrap();
        let fields = text.find("\ngit.status:\n## main\n?? new.rs\n").unwrap();
        assert!(settings < deps && deps < fields);
        assert_eq!(text.matches(RULE).count(), 3);
        assert!(text.contains("\nbuild.host:\nbuilder\n"));
        assert!(text.contains("\ngit.local.commits:\nabc123: fix bug\n"));
    }

    #[test]
    fn json_structures_status_and_logs() {
        let json: serde_json::Value =
            serde_json::from_str(&info(sample_fields()).json()).unwrap();

        assert_eq!(json["vcs.revision"], "abc123");
        assert_eq!(json["xbi.build.host"], "builder");
        assert_eq!(json["xbi.git.status"]["branch"], "main");
        assert_eq!(json["xbi.git.status"]["untracked"][0], "new.rs");
        assert_eq!(json["xbi.git.log"]["def456"], " add feature");
        assert_eq!(json["xbi.git.local.commits"]["abc123"], " fix bug");
    }

    #[test]
    fn json_is_indented_with_two_spaces() {
        let json = info(Fields::new()).json();
        assert!(json.starts_with("{\n  \""));
    }

    #[test]
    fn empty_info_renders_empty_object() {
        assert_eq!(BuildInfo::default().json(), "{}");
    }
}
