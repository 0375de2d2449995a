//! genanno CLI - Main entry point

use clap::Parser;
use genanno_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use genanno_pipeline::{Cli, Commands};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    if cli.command.is_none() {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    }

    // Verbose: debug to console. Otherwise info to console, which is where
    // task progress is reported during long runs.
    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .log_file_prefix("genanno".to_string())
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI works without logging
    let _guard = init_logging(&log_config).ok();

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn execute_command(cli: &Cli) -> genanno_pipeline::Result<()> {
    let Some(ref command) = cli.command else {
        unreachable!("Command should have been validated in main");
    };
    let config = cli.config.as_deref();

    match command {
        Commands::Run {
            proteins,
            gff,
            overrides,
        } => genanno_pipeline::commands::run::run(config, proteins, gff, overrides).await,

        Commands::Partition {
            proteins,
            out_dir,
            chunk_residues,
        } => {
            genanno_pipeline::commands::partition::run(config, proteins, out_dir, *chunk_residues)
                .await
        }

        Commands::Canonicalize {
            targets,
            work_dir,
            prefix,
        } => {
            genanno_pipeline::commands::canonicalize::run(
                config,
                targets,
                work_dir.clone(),
                prefix.clone(),
            )
            .await
        }

        Commands::Fuse {
            gff,
            tables_dir,
            prefix,
            out_dir,
        } => {
            genanno_pipeline::commands::fuse::run(
                config,
                gff,
                tables_dir,
                prefix.clone(),
                out_dir.clone(),
            )
            .await
        }
    }
}
