//! CLI command parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::info::BuildInfo;

/// xbigen - embed git state and build host details into generated source.
#[derive(Parser)]
#[command(name = "xbigen")]
#[command(about = "Embed git state and build host details into generated source")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Snapshot the repository and write the generated file (default).
    #[command(visible_alias = "gen")]
    Generate {
        /// Output file (overrides config).
        #[arg(short, long, env = "XBI_OUTPUT")]
        output: Option<PathBuf>,

        /// Per-command timeout in seconds (overrides config).
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Render the build information stored in a generated file.
    Inspect {
        /// Generated file to read (defaults to the configured output).
        #[arg(short, long, conflicts_with = "envelope")]
        file: Option<PathBuf>,

        /// Raw `X_BI_KEY_KV_PAIR:...` string instead of a file.
        #[arg(short, long)]
        envelope: Option<String>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show build information of xbigen itself.
    About {
        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Oneline)]
        format: Format,
    },

    /// Manage configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration.
    Show,

    /// Show the global configuration file path.
    Path,
}

/// Render mode of [`BuildInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Single-line summary.
    Oneline,
    /// Full text dump.
    Text,
    /// Structured JSON.
    Json,
}

impl Format {
    #[must_use]
    pub fn render(self, info: &BuildInfo) -> String {
        match self {
            Self::Oneline => info.oneliner(),
            Self::Text => info.text(),
            Self::Json => info.json(),
        }
    }
}
