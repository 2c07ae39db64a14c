//! Compile-time capture of standard build metadata.
//!
//! This file is compiled twice: as `xbi::standard::capture` and, through a
//! `#[path]` module, inside this crate's own `build.rs`. It may only depend on
//! `std` and `toml`, both of which are available in either context.

use std::env;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Compiler version (`rustc --version`).
pub const RUSTC_VERSION_VAR: &str = "XBI_STD_RUSTC_VERSION";
/// Name of the crate being built.
pub const PATH_VAR: &str = "XBI_STD_PATH";
/// Version of the crate being built.
pub const VERSION_VAR: &str = "XBI_STD_VERSION";
/// `key=value` settings joined by [`RECORD_SEPARATOR`].
pub const SETTINGS_VAR: &str = "XBI_STD_SETTINGS";
/// `name|version|checksum` records joined by [`RECORD_SEPARATOR`].
pub const DEPS_VAR: &str = "XBI_STD_DEPS";

pub const RECORD_SEPARATOR: char = ';';
pub const FIELD_SEPARATOR: char = '|';

/// Upper bound for each probe command run from a build script.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Emit the `XBI_STD_*` variables for the crate currently being built.
///
/// Call this from a `build.rs`, then read the values back with
/// `xbi::standard_info!()` in the crate itself.
pub fn export_env_vars() {
    let manifest_dir =
        env::var_os("CARGO_MANIFEST_DIR").map_or_else(|| PathBuf::from("."), PathBuf::from);

    emit(RUSTC_VERSION_VAR, &rustc_version().unwrap_or_default());
    emit(PATH_VAR, &env::var("CARGO_PKG_NAME").unwrap_or_default());
    emit(VERSION_VAR, &env::var("CARGO_PKG_VERSION").unwrap_or_default());

    let settings = settings(&manifest_dir)
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(&RECORD_SEPARATOR.to_string());
    emit(SETTINGS_VAR, &settings);

    let deps = match find_lockfile(&manifest_dir) {
        Some(lockfile) => {
            println!("cargo:rerun-if-changed={}", lockfile.display());
            dependencies(&lockfile)
        }
        None => Vec::new(),
    };
    let deps = deps
        .into_iter()
        .map(|(name, version, checksum)| {
            format!("{name}{FIELD_SEPARATOR}{version}{FIELD_SEPARATOR}{checksum}")
        })
        .collect::<Vec<_>>()
        .join(&RECORD_SEPARATOR.to_string());
    emit(DEPS_VAR, &deps);

    let git_dir = manifest_dir.join(".git");
    if git_dir.exists() {
        println!("cargo:rerun-if-changed={}", git_dir.join("HEAD").display());
        println!("cargo:rerun-if-changed={}", git_dir.join("index").display());
    }
}

fn emit(name: &str, value: &str) {
    // rustc-env values end at the first newline
    let value = value.replace(['\n', '\r'], " ");
    println!("cargo:rustc-env={name}={value}");
}

fn rustc_version() -> Option<String> {
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    run(&rustc, &["--version"], None)
}

fn settings(manifest_dir: &Path) -> Vec<(String, String)> {
    let mut settings = Vec::new();

    for (key, var) in [
        ("target", "TARGET"),
        ("host", "HOST"),
        ("profile", "PROFILE"),
        ("opt-level", "OPT_LEVEL"),
        ("debug", "DEBUG"),
    ] {
        if let Ok(value) = env::var(var) {
            settings.push((key.to_string(), value));
        }
    }

    let mut features: Vec<String> = env::vars()
        .filter_map(|(name, _)| {
            name.strip_prefix("CARGO_FEATURE_")
                .map(|feature| feature.to_lowercase().replace('_', "-"))
        })
        .collect();
    features.sort();
    if !features.is_empty() {
        settings.push(("features".to_string(), features.join(",")));
    }

    if let Some(revision) = run("git", &["rev-parse", "HEAD"], Some(manifest_dir)) {
        settings.push(("vcs".to_string(), "git".to_string()));
        settings.push(("vcs.revision".to_string(), revision));

        if let Some(time) = run("git", &["log", "-1", "--format=%cI"], Some(manifest_dir)) {
            settings.push(("vcs.time".to_string(), time));
        }

        let dirty = output_within(
            Command::new("git")
                .args(["status", "--porcelain"])
                .current_dir(manifest_dir),
            COMMAND_TIMEOUT,
        )
        .filter(|(status, _)| status.success())
        .is_some_and(|(_, stdout)| !stdout.is_empty());
        settings.push(("vcs.modified".to_string(), dirty.to_string()));
    }

    settings
}

/// Locate the `Cargo.lock` governing `start`, walking up to the workspace root.
fn find_lockfile(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join("Cargo.lock"))
        .find(|candidate| candidate.is_file())
}

fn dependencies(lockfile: &Path) -> Vec<(String, String, String)> {
    let Ok(contents) = std::fs::read_to_string(lockfile) else {
        return Vec::new();
    };
    let Ok(lock) = toml::from_str::<toml::Table>(&contents) else {
        return Vec::new();
    };

    let own_name = env::var("CARGO_PKG_NAME").unwrap_or_default();
    let Some(packages) = lock.get("package").and_then(toml::Value::as_array) else {
        return Vec::new();
    };

    packages
        .iter()
        .filter_map(|package| {
            let name = package.get("name")?.as_str()?;
            if name == own_name {
                return None;
            }
            let version = package.get("version")?.as_str()?;
            let checksum = package
                .get("checksum")
                .and_then(toml::Value::as_str)
                .unwrap_or_default();
            Some((name.to_string(), version.to_string(), checksum.to_string()))
        })
        .collect()
}

fn run(program: &str, args: &[&str], dir: Option<&Path>) -> Option<String> {
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }
    output_within(&mut command, COMMAND_TIMEOUT)
        .filter(|(status, _)| status.success())
        .and_then(|(_, stdout)| String::from_utf8(stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Run `command` to completion, or kill it once `timeout` has elapsed.
///
/// Returns `None` if the command cannot start, its stdout cannot be read, or
/// the deadline passes first.
fn output_within(command: &mut Command, timeout: Duration) -> Option<(ExitStatus, Vec<u8>)> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;
    let deadline = Instant::now() + timeout;

    // Drained on a separate thread so a full pipe cannot stall the child
    let (tx, rx) = mpsc::channel();
    if let Some(mut stdout) = child.stdout.take() {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = tx.send(stdout.read_to_end(&mut buf).map(|_| buf));
        });
    }
    let stdout = rx.recv_timeout(timeout).ok().and_then(Result::ok);

    while let Some(stdout) = &stdout {
        match child.try_wait() {
            Ok(Some(status)) => return Some((status, stdout.clone())),
            Ok(None) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
            _ => break,
        }
    }

    let _ = child.kill();
    let _ = child.wait();
    None
}
