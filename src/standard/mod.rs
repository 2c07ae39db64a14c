//! Standard build metadata of the consuming binary.
//!
//! Captured at compile time by [`capture::export_env_vars`] in the consumer's
//! `build.rs` and read back with [`standard_info!`](crate::standard_info).

pub mod capture;

use std::fmt;

use capture::{FIELD_SEPARATOR, RECORD_SEPARATOR};

/// A crate this binary was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    /// Crate name
    pub path: String,
    /// Resolved version
    pub version: String,
    /// Registry checksum (empty for path and git dependencies)
    pub sum: String,
}

/// Standard metadata, fixed at compile time.
///
/// All fields are empty when the consuming crate's build script did not
/// export the `XBI_STD_*` variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandardInfo {
    /// Compiler version, e.g. `rustc 1.86.0 (05f9846f8 2025-03-31)`
    pub rust_version: String,
    /// Name of the main crate
    pub path: String,
    /// The main crate itself
    pub main: Module,
    /// Compiler and VCS settings in capture order
    pub settings: Vec<(String, String)>,
    /// Locked dependencies in lockfile order
    pub deps: Vec<Module>,
}

impl StandardInfo {
    /// Assemble from raw `XBI_STD_*` values as seen by `option_env!`.
    #[must_use]
    pub fn from_parts(
        rust_version: Option<&str>,
        path: Option<&str>,
        version: Option<&str>,
        settings: Option<&str>,
        deps: Option<&str>,
    ) -> Self {
        let path = path.unwrap_or_default().to_string();

        Self {
            rust_version: rust_version.unwrap_or_default().to_string(),
            main: Module {
                path: path.clone(),
                version: version.unwrap_or_default().to_string(),
                sum: String::new(),
            },
            path,
            settings: settings.map(parse_settings).unwrap_or_default(),
            deps: deps.map(parse_deps).unwrap_or_default(),
        }
    }

    /// Look up a setting by key.
    #[must_use]
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether any standard metadata was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn parse_settings(raw: &str) -> Vec<(String, String)> {
    raw.split(RECORD_SEPARATOR)
        .filter_map(|record| record.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn parse_deps(raw: &str) -> Vec<Module> {
    raw.split(RECORD_SEPARATOR)
        .filter(|record| !record.is_empty())
        .filter_map(|record| {
            let mut parts = record.splitn(3, FIELD_SEPARATOR);
            let path = parts.next()?;
            let version = parts.next()?;
            let sum = parts.next().unwrap_or_default();
            Some(Module {
                path: path.to_string(),
                version: version.to_string(),
                sum: sum.to_string(),
            })
        })
        .collect()
}

impl fmt::Display for StandardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.rust_version.is_empty() {
            writeln!(f, "rust\t{}", self.rust_version)?;
        }
        if !self.path.is_empty() {
            writeln!(f, "path\t{}", self.path)?;
        }
        if !self.main.path.is_empty() {
            writeln!(f, "mod\t{}\t{}\t{}", self.main.path, self.main.version, self.main.sum)?;
        }
        for dep in &self.deps {
            writeln!(f, "dep\t{}\t{}\t{}", dep.path, dep.version, dep.sum)?;
        }
        for (key, value) in &self.settings {
            writeln!(f, "build\t{key}={value}")?;
        }
        Ok(())
    }
}

/// Read the standard metadata exported by the calling crate's build script.
///
/// Expands to `option_env!` lookups in the caller, so the values describe the
/// crate that invokes the macro rather than `xbi` itself.
#[macro_export]
macro_rules! standard_info {
    () => {
        $crate::standard::StandardInfo::from_parts(
            option_env!("XBI_STD_RUSTC_VERSION"),
            option_env!("XBI_STD_PATH"),
            option_env!("XBI_STD_VERSION"),
            option_env!("XBI_STD_SETTINGS"),
            option_env!("XBI_STD_DEPS"),
        )
    };
}
