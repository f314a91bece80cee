//! Subcommand handlers.
//!
//! Each handler reads and updates [`AppConfig`], talks to the API through
//! [`Client`], and prints user-facing text through the [`Catalog`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use sitepush_api::{Client, SiteDescriptor};
use sitepush_deploy::{
    Catalog, CredentialProvider, DeployError, DeployEvent, DeployOrchestrator, Message,
    MessageFormatter,
};

use crate::config::{AppConfig, Selection};

/// Shared state for one CLI invocation.
pub struct Invocation {
    pub config: AppConfig,
    pub config_path: PathBuf,
    pub catalog: Catalog,
}

impl Invocation {
    fn say(&self, message: Message) {
        println!("{}", self.catalog.format(&message));
    }

    /// Renders a failure with the same text the deploy flow would use.
    fn fail(&self, error: impl Into<DeployError>) -> anyhow::Error {
        anyhow::anyhow!(self.catalog.format(&Message::from_error(&error.into())))
    }

    fn save(&self) -> anyhow::Result<()> {
        self.config
            .save_to(&self.config_path)
            .with_context(|| format!("failed to write {}", self.config_path.display()))
    }

    fn client(&self) -> anyhow::Result<Client> {
        let token = self.config.token().ok_or_else(|| self.fail(DeployError::NoCredential))?;
        Client::with_base_url(&token, &self.config.api_base_url()).map_err(|e| self.fail(e))
    }
}

pub fn login(ctx: &mut Invocation, token: &str) -> anyhow::Result<()> {
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!(ctx.catalog.format(&Message::TokenRequired));
    }
    ctx.config.access_token = token.to_string();
    ctx.save()?;
    ctx.say(Message::TokenSaved);
    Ok(())
}

pub fn logout(ctx: &mut Invocation) -> anyhow::Result<()> {
    ctx.config.access_token.clear();
    ctx.save()?;
    ctx.say(Message::TokenCleared);
    Ok(())
}

pub fn select_folder(ctx: &mut Invocation, path: &Path) -> anyhow::Result<()> {
    let folder = std::fs::canonicalize(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    if !folder.is_dir() {
        anyhow::bail!("{} is not a directory", folder.display());
    }
    ctx.config.folder = Some(folder.clone());
    ctx.save()?;
    ctx.say(Message::FolderSelected {
        path: folder.display().to_string(),
    });
    Ok(())
}

pub async fn list_sites(ctx: &Invocation) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let sites = client.list_sites().await.map_err(|e| ctx.fail(e))?;
    if sites.is_empty() {
        ctx.say(Message::NoSites);
        return Ok(());
    }

    let current = ctx.config.site.as_ref().map(|s| s.id.as_str());
    for site in &sites {
        let marker = if Some(site.id.as_str()) == current { "*" } else { " " };
        println!(
            "{marker} {}\t{}\t{}",
            site.display_name(),
            site.public_url(),
            site.id
        );
    }
    Ok(())
}

pub async fn use_site(ctx: &mut Invocation, site_id: &str) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let site = client.get_site(site_id).await.map_err(|e| ctx.fail(e))?;
    let name = site.display_name().to_string();
    remember_site(ctx, site)?;
    ctx.say(Message::SiteSelected { name });
    Ok(())
}

pub async fn create_site(ctx: &mut Invocation, name: Option<&str>) -> anyhow::Result<()> {
    let name = name.map(str::trim).filter(|n| !n.is_empty());
    if let Some(name) = name
        && !is_valid_site_name(name)
    {
        anyhow::bail!(ctx.catalog.format(&Message::SiteNameInvalid));
    }

    let client = ctx.client()?;
    let site = match client.create_site(name).await {
        Ok(site) => site,
        Err(e) if is_name_taken(&e) => {
            anyhow::bail!(ctx.catalog.format(&Message::SiteNameTaken));
        }
        Err(e) => return Err(ctx.fail(e)),
    };

    let created = site.display_name().to_string();
    let adjusted = name.is_some_and(|n| n != site.name);
    remember_site(ctx, site)?;
    if adjusted {
        tracing::warn!(requested = ?name, actual = %created, "site name adjusted by remote");
        ctx.say(Message::SiteCreatedAdjusted { name: created });
    } else {
        ctx.say(Message::SiteCreated { name: created });
    }
    Ok(())
}

pub fn status(ctx: &Invocation) {
    let token = if ctx.config.token().is_some() { "set" } else { "not set" };
    let folder = ctx
        .config
        .folder
        .as_ref()
        .map(|f| f.display().to_string())
        .unwrap_or_else(|| "-".into());
    let site = ctx
        .config
        .site
        .as_ref()
        .map(|s| format!("{} ({})", s.display_name(), s.public_url()))
        .unwrap_or_else(|| "-".into());

    println!("config: {}", ctx.config_path.display());
    println!("api:    {}", ctx.config.api_base_url());
    println!("token:  {token}");
    println!("folder: {folder}");
    println!("site:   {site}");
}

/// Runs a deploy and prints its progress.
///
/// Returns `Ok(false)` when the deploy failed; the failure has already been
/// printed by then.
pub async fn deploy(
    ctx: &Invocation,
    folder: Option<PathBuf>,
    site_id: Option<String>,
) -> anyhow::Result<bool> {
    let selection = Selection {
        config: &ctx.config,
        folder,
        site_id,
    };

    let mut orchestrator = DeployOrchestrator::new(Arc::new(ctx.catalog))
        .with_poll_policy(ctx.config.poll_policy())
        .with_manifest_builder(ctx.config.manifest_builder());
    let mut events = orchestrator
        .take_events()
        .context("deploy event stream already taken")?;

    let cancel = orchestrator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling deploy");
            cancel.cancel();
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event);
        }
    });

    let result = orchestrator
        .deploy_selected(&ctx.config, &selection, &ctx.config.api_base_url())
        .await;

    // Dropping the orchestrator closes the channel and ends the printer.
    drop(orchestrator);
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "event printer task failed");
    }

    Ok(result.is_ok())
}

fn print_event(event: &DeployEvent) {
    match event {
        DeployEvent::Stage { message, .. }
        | DeployEvent::Uploaded { message, .. }
        | DeployEvent::Completed { message, .. } => println!("{message}"),
        DeployEvent::Failed { message } => eprintln!("{message}"),
    }
}

fn remember_site(ctx: &mut Invocation, site: SiteDescriptor) -> anyhow::Result<()> {
    ctx.config.site = Some(site);
    ctx.save()
}

/// Site names are restricted to ASCII letters and digits.
pub fn is_valid_site_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric())
}

/// The remote rejects a duplicate name with a subdomain uniqueness error.
fn is_name_taken(error: &sitepush_api::Error) -> bool {
    let text = error.to_string().to_lowercase();
    text.contains("subdomain") && text.contains("unique")
}
