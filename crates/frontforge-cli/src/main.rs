//! frontforge CLI tool.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "frontforge")]
#[command(about = "Front-end build pipeline", long_about = None)]
struct Cli {
    /// Path to the build configuration
    #[arg(long, global = true, env = "FRONTFORGE_CONFIG", default_value = "frontforge.kdl")]
    config: PathBuf,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one variant, or every bootstrapper with `all` / `all-debug`
    Build {
        /// Variant to build, e.g. release-main
        #[arg(long)]
        variant: Option<String>,
    },
    /// Build, serve, and rebuild on source changes
    Watch {
        /// Variant to watch (defaults to debug-main)
        #[arg(long)]
        variant: Option<String>,
    },
    /// Run the unit tests once
    Test {
        /// Variant the tests run against (defaults to debug-main)
        #[arg(long)]
        variant: Option<String>,
    },
    /// Run the unit tests continuously
    WatchTest {
        /// Variant the tests run against (defaults to debug-main)
        #[arg(long)]
        variant: Option<String>,
    },
    /// Serve an already built variant
    Serve {
        /// Variant to serve (defaults to debug-main)
        #[arg(long)]
        variant: Option<String>,
    },
    /// Write the source complexity report
    Analysis {
        #[arg(long)]
        variant: Option<String>,
    },
    /// Validate the build configuration
    Validate,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Build { variant } => {
            let project = commands::Project::load(&cli.config)?;
            commands::build::build(&project, variant.as_deref()).await?;
        }
        Commands::Watch { variant } => {
            let project = commands::Project::load(&cli.config)?;
            commands::watch::watch(&project, variant.as_deref()).await?;
        }
        Commands::Test { variant } => {
            let project = commands::Project::load(&cli.config)?;
            commands::tasks::test(&project, variant.as_deref(), false).await?;
        }
        Commands::WatchTest { variant } => {
            let project = commands::Project::load(&cli.config)?;
            commands::tasks::test(&project, variant.as_deref(), true).await?;
        }
        Commands::Serve { variant } => {
            let project = commands::Project::load(&cli.config)?;
            commands::watch::serve(&project, variant.as_deref()).await?;
        }
        Commands::Analysis { variant } => {
            let project = commands::Project::load(&cli.config)?;
            commands::tasks::analysis(&project, variant.as_deref()).await?;
        }
        Commands::Validate => {
            commands::validate(&cli.config)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_flag_on_task_commands() {
        let cli = Cli::try_parse_from(["frontforge", "test"]).unwrap();
        assert!(matches!(cli.command, Commands::Test { variant: None }));

        let cli = Cli::try_parse_from(["frontforge", "watch-test", "--variant", "debug-admin"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::WatchTest { variant: Some(ref v) } if v == "debug-admin"
        ));

        let cli = Cli::try_parse_from(["frontforge", "serve", "--config", "site/frontforge.kdl"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { variant: None }));
        assert_eq!(cli.config, PathBuf::from("site/frontforge.kdl"));
    }
}
