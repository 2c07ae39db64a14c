//! Generated source artifact.

use std::path::Path;

use crate::codec::ENVELOPE_KEY;
use crate::error::{Error, Result};

/// Default file name of the generated artifact.
pub const GENERATED_FILE_NAME: &str = "xbi_generated.rs";

const TEMPLATE: &str = include_str!("template.rs.in");

/// Placeholder token replaced by the envelope, `%X_BI_KEY_KV_PAIR%`.
#[must_use]
pub fn placeholder() -> String {
    format!("%{ENVELOPE_KEY}%")
}

/// Substitute `envelope` into the template.
#[must_use]
pub fn render(envelope: &str) -> String {
    TEMPLATE.replace(&placeholder(), envelope)
}

/// Render and write the artifact to `path`.
pub fn write(path: &Path, envelope: &str) -> Result<()> {
    std::fs::write(path, render(envelope)).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(path = %path.display(), "generated build info");
    Ok(())
}

/// Find the envelope literal inside a generated artifact.
#[must_use]
pub fn extract_envelope(source: &str) -> Option<&str> {
    let start = source.find(&format!("\"{ENVELOPE_KEY}:"))? + 1;
    let len = source[start..].find('"')?;
    Some(&source[start..start + len])
}
