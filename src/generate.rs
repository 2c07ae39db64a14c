//! Collect, encode and emit in one step.

use std::path::{Path, PathBuf};

use crate::codec::{self, Fields};
use crate::collect::{Collector, SystemEnvironment};
use crate::command::BoundedRunner;
use crate::emit::{self, GENERATED_FILE_NAME};
use crate::error::{Error, Result};

/// Snapshot the repository and write the artifact to `path`.
///
/// Nothing is written when a mandatory query fails.
///
/// # Errors
///
/// Returns [`Error::Command`] for mandatory query failures and
/// [`Error::Write`] when the artifact cannot be persisted.
pub async fn generate(collector: &Collector<'_>, path: &Path) -> Result<Fields> {
    let fields = collector.collect().await?;
    let envelope = codec::encode(&fields);
    emit::write(path, &envelope)?;
    Ok(fields)
}

/// Generate `$OUT_DIR/xbi_generated.rs` from a build script.
///
/// Pair with [`include_build_info!`](crate::include_build_info) in the crate
/// being built. Runs on a private current-thread runtime, so it can be called
/// from a plain `fn main` in `build.rs`.
///
/// # Errors
///
/// Fails outside a build script, on mandatory query failures, and when the
/// file cannot be written.
pub fn generate_to_out_dir() -> Result<PathBuf> {
    let out_dir = std::env::var_os("OUT_DIR").ok_or(Error::MissingOutDir)?;
    let path = PathBuf::from(out_dir).join(GENERATED_FILE_NAME);

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let runner = BoundedRunner::new();
    let env = SystemEnvironment;
    let collector = Collector::new(&runner, &env);

    runtime.block_on(generate(&collector, &path))?;
    Ok(path)
}

/// Include the artifact written by [`generate_to_out_dir`], defining `XBI`.
#[macro_export]
macro_rules! include_build_info {
    () => {
        include!(concat!(env!("OUT_DIR"), "/xbi_generated.rs"));
    };
}
