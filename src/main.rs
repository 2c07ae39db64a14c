use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use xbi::XbiConfig;
use xbi::cli::{Cli, Commands, ConfigCommands};
use xbi::collect::{Collector, SystemEnvironment};
use xbi::command::BoundedRunner;
use xbi::emit;
use xbi::{BuildInfo, StandardInfo};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = cli.command.unwrap_or(Commands::Generate {
        output: None,
        timeout: None,
    });

    match command {
        Commands::Generate { output, timeout } => {
            let config = XbiConfig::load()?;
            let timeout = timeout.map_or(config.timeout(), Duration::from_secs);
            let runner = BoundedRunner::with_timeout(timeout);
            let env = SystemEnvironment;
            let collector = Collector::new(&runner, &env).with_options(config.collect_options());
            let path = output.unwrap_or(config.output);

            xbi::generate(&collector, &path).await?;
        }

        Commands::Inspect {
            file,
            envelope,
            format,
        } => {
            let envelope = match envelope {
                Some(envelope) => envelope,
                None => {
                    let path = match file {
                        Some(path) => path,
                        None => XbiConfig::load()?.output,
                    };
                    let source = std::fs::read_to_string(&path)
                        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
                    emit::extract_envelope(&source)
                        .ok_or_else(|| {
                            anyhow::anyhow!("no build info found in {}", path.display())
                        })?
                        .to_string()
                }
            };

            // The artifact carries only extended fields
            let info = BuildInfo::new(StandardInfo::default(), &envelope);
            println!("{}", format.render(&info));
        }

        Commands::About { format } => {
            let info = xbi::build_info!();
            println!("{}", format.render(&info));
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let config = XbiConfig::load()?;
                println!("{}", toml::to_string_pretty(&config)?);
            }
            ConfigCommands::Path => {
                let path = XbiConfig::config_path()?;
                println!("{}", path.display());
            }
        },
    }

    Ok(())
}
