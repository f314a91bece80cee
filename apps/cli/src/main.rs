//! sitepush: deploy a local folder to a static-hosting site.

mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sitepush_deploy::Catalog;

use crate::commands::Invocation;
use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "sitepush", version, about = "Deploy a local folder to a static-hosting site")]
struct Cli {
    /// Display language (`en`, `zh-CN`).
    #[arg(long, global = true)]
    locale: Option<String>,

    /// Path to the config file.
    #[arg(long, global = true, env = "SITEPUSH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store the personal access token.
    Login {
        #[arg(long)]
        token: String,
    },
    /// Forget the stored access token.
    Logout,
    /// Select the folder to deploy.
    Folder { path: PathBuf },
    /// List the sites of the account.
    Sites,
    /// Select the site to deploy to.
    UseSite { id: String },
    /// Create a new site and select it.
    CreateSite { name: Option<String> },
    /// Deploy the selected folder to the selected site.
    Deploy {
        #[arg(long)]
        folder: Option<PathBuf>,
        #[arg(long)]
        site: Option<String>,
    },
    /// Show the current configuration.
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,sitepush=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let config = AppConfig::load_from(&config_path)?;
    let catalog = Catalog::new(config.locale(cli.locale.as_deref()));
    tracing::debug!(path = %config_path.display(), locale = catalog.locale().as_str(), "config loaded");

    let mut ctx = Invocation {
        config,
        config_path,
        catalog,
    };

    match cli.command {
        Command::Login { token } => commands::login(&mut ctx, &token)?,
        Command::Logout => commands::logout(&mut ctx)?,
        Command::Folder { path } => commands::select_folder(&mut ctx, &path)?,
        Command::Sites => commands::list_sites(&ctx).await?,
        Command::UseSite { id } => commands::use_site(&mut ctx, &id).await?,
        Command::CreateSite { name } => commands::create_site(&mut ctx, name.as_deref()).await?,
        Command::Deploy { folder, site } => return commands::deploy(&ctx, folder, site).await,
        Command::Status => commands::status(&ctx),
    }
    Ok(true)
}
