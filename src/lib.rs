//! xbi - extended build information.
//!
//! Captures repository state at build time, embeds it in a generated source
//! file, and renders it at run time next to the standard build metadata.
//!
//! # Architecture
//!
//! ```text
//!  build time                          run time
//! ┌───────────┐  ┌────────┐  ┌──────┐       ┌────────┐  ┌──────────┐
//! │ Collector │─▶│ Encode │─▶│ Emit │ ═══▶  │ Decode │─▶│ Renderers│
//! └─────┬─────┘  └────────┘  └──────┘       └────────┘  └──────────┘
//!       │
//! ┌─────┴──────────┐
//! │ Bounded runner │
//! └────────────────┘
//! ```
//!
//! # Usage from a build script
//!
//! ```ignore
//! // build.rs
//! fn main() {
//!     xbi::standard::capture::export_env_vars();
//!     if let Err(e) = xbi::generate_to_out_dir() {
//!         println!("cargo:warning={e}");
//!     }
//! }
//!
//! // main.rs
//! mod generated {
//!     xbi::include_build_info!();
//! }
//!
//! fn main() {
//!     let info = xbi::build_info!(generated::XBI);
//!     println!("{}", info.oneliner());
//! }
//! ```

pub mod cli;
pub mod codec;
pub mod collect;
pub mod command;
pub mod config;
pub mod emit;
mod error;
mod generate;
mod info;
pub mod render;
pub mod standard;

pub use codec::{FieldKey, Fields};
pub use config::XbiConfig;
pub use error::{Error, Result};
pub use generate::{generate, generate_to_out_dir};
pub use info::{BuildInfo, BuildInfoBuilder};
pub use standard::StandardInfo;
