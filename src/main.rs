use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod config;
mod domain;
mod error;
mod infrastructure;
mod services;
mod tools;
mod ui;

use cli::{Cli, Commands, DbCommands, S3Commands, SetupCommands};
use config::PlatformConfig;
use domain::SiteRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false) // Disable ANSI escape codes for cleaner output
        .init();

    let config = PlatformConfig::load()?;

    // The site registry is an immutable snapshot for the whole invocation
    let registry = SiteRegistry::load(&config).await?;

    match cli.command {
        Commands::Migrate {
            source,
            target,
            blog_id,
            keep_prod_domain,
            skip_media,
        } => {
            commands::migrate::execute(
                &config,
                &registry,
                source,
                target,
                blog_id,
                keep_prod_domain,
                skip_media,
            )
            .await?;
        }
        Commands::Db { command } => match command {
            DbCommands::Export { target, blog_id } => {
                commands::db::export(&config, &registry, target, blog_id).await?;
            }
            DbCommands::Import {
                target,
                file,
                blog_id,
                s3_sync,
            } => {
                commands::db::import(&config, &registry, target, &file, blog_id, s3_sync).await?;
            }
        },
        Commands::Sites { env } => {
            commands::sites::execute(&config, env).await?;
        }
        Commands::Releases => {
            commands::releases::execute().await?;
        }
        Commands::Rollback { revision } => {
            commands::rollback::execute(revision).await?;
        }
        Commands::Status { secrets } => {
            commands::status::execute(&config, secrets).await?;
        }
        Commands::Switch { target } => {
            commands::switch::execute(&config, target).await?;
        }
        Commands::Jump { target } => {
            commands::jump::execute(&config, target).await?;
        }
        Commands::S3 { command } => match command {
            S3Commands::Download {
                bucket,
                profile,
                blog_id,
            } => {
                commands::s3::download(&bucket, &profile, blog_id).await?;
            }
            S3Commands::Upload {
                bucket,
                profile,
                blog_id,
            } => {
                commands::s3::upload(&bucket, &profile, blog_id).await?;
            }
        },
        Commands::Setup { command } => match command {
            SetupCommands::CreateProfiles => {
                commands::setup::create_profiles().await?;
            }
        },
    }

    Ok(())
}
