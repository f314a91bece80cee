//! A single deploy attempt against one site.
//!
//! Runs the stages in order (verify, scan, create, upload, finish, poll)
//! and reports each transition on the event channel. Uploads are strictly
//! sequential so only one file's bytes are in memory at a time.

use std::path::Path;

use sitepush_api::{DeployDescriptor, DeployState, SiteDescriptor};
use sitepush_manifest::{ManifestBuilder, ScannedTree};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::DeployError;
use crate::messages::{Message, MessageFormatter};
use crate::remote::RemoteApi;
use crate::resolve::resolve_required;
use crate::types::{DeployEvent, DeployOutcome, DeployStage, PollPolicy};
use crate::url::select_url;

/// Last status seen by the poll loop.
#[derive(Debug, Clone)]
pub(crate) struct Polled {
    pub deploy: DeployDescriptor,
    pub ready: bool,
}

/// Manages one deploy attempt.
pub struct SiteDeploy<'a> {
    api: &'a dyn RemoteApi,
    formatter: &'a dyn MessageFormatter,
    builder: &'a ManifestBuilder,
    poll: PollPolicy,
    cancel: CancellationToken,
    events_tx: UnboundedSender<DeployEvent>,
}

impl<'a> SiteDeploy<'a> {
    pub fn new(
        api: &'a dyn RemoteApi,
        formatter: &'a dyn MessageFormatter,
        builder: &'a ManifestBuilder,
        poll: PollPolicy,
        cancel: CancellationToken,
        events_tx: UnboundedSender<DeployEvent>,
    ) -> Self {
        Self {
            api,
            formatter,
            builder,
            poll,
            cancel,
            events_tx,
        }
    }

    /// Runs the full pipeline for `root` onto `site`.
    pub async fn run(
        &self,
        root: &Path,
        site: &SiteDescriptor,
    ) -> Result<DeployOutcome, DeployError> {
        // 1. Verify
        self.enter(DeployStage::Verifying, Message::VerifySite);
        let verified = self.api.get_site(&site.id).await?;
        // The caller may only know the site id; prefer what the remote sent.
        let site_info = if verified.public_url().is_empty() {
            site
        } else {
            &verified
        };

        // 2. Scan
        self.enter(DeployStage::Scanning, Message::ScanFiles);
        let tree = self.scan(root).await?;
        if tree.is_empty() {
            return Err(DeployError::EmptyDeploy);
        }
        info!(
            site = %site.id,
            files = tree.len(),
            total_bytes = tree.total_bytes(),
            "scan complete"
        );

        // 3. Create
        self.enter(DeployStage::Creating, Message::CreateDeploy);
        let created = self.api.create_deploy(&site.id, &tree.manifest).await?;
        info!(
            site = %site.id,
            deploy = %created.id,
            required = created.required.len(),
            "deploy created"
        );

        // 4. Upload
        let uploaded = self.upload_required(&created, &tree).await?;

        // 5. Finish
        self.enter(DeployStage::Finishing, Message::Finish);
        self.finish(&created.id).await?;

        // 6. Poll
        self.enter(DeployStage::Polling, Message::Wait);
        let polled = self.wait_for_deploy(&created.id).await?;

        // 7. Report
        let url = select_url(&[&polled.deploy, &created], site_info);
        Ok(DeployOutcome {
            deploy: polled.deploy,
            url,
            ready: polled.ready,
            uploaded,
        })
    }

    async fn scan(&self, root: &Path) -> Result<ScannedTree, DeployError> {
        let builder = self.builder.clone();
        let root = root.to_path_buf();
        let tree = tokio::task::spawn_blocking(move || builder.build(&root)).await??;
        Ok(tree)
    }

    /// Uploads every entry of `required`, in the order given.
    async fn upload_required(
        &self,
        deploy: &DeployDescriptor,
        tree: &ScannedTree,
    ) -> Result<usize, DeployError> {
        let total = deploy.required.len();
        let mut uploaded = 0;
        self.enter(
            DeployStage::Uploading,
            Message::UploadFile {
                uploaded: 0,
                total,
            },
        );

        for entry in &deploy.required {
            self.check_cancelled()?;

            let resolved = resolve_required(entry, tree).ok_or_else(|| {
                DeployError::MissingFile {
                    entry: entry.clone(),
                }
            })?;

            let data = tokio::fs::read(&resolved.file).await?;
            debug!(
                deploy = %deploy.id,
                path = %resolved.path,
                bytes = data.len(),
                "uploading file"
            );
            self.api
                .upload_file(&deploy.id, &resolved.path, data)
                .await?;

            uploaded += 1;
            let message = self.formatter.format(&Message::UploadFile { uploaded, total });
            let _ = self.events_tx.send(DeployEvent::Uploaded {
                uploaded,
                total,
                path: resolved.path,
                message,
            });
        }

        Ok(uploaded)
    }

    /// Finalizes the deploy. A 404 means the remote already moved on.
    async fn finish(&self, deploy_id: &str) -> Result<(), DeployError> {
        match self.api.finish_deploy(deploy_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                warn!(deploy = %deploy_id, "finish returned 404, continuing");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Polls until the deploy is `ready` or `error`, or attempts run out.
    ///
    /// Running out is not an error: the last descriptor is returned with
    /// `ready == false`.
    pub(crate) async fn wait_for_deploy(&self, deploy_id: &str) -> Result<Polled, DeployError> {
        let mut attempt = 1;
        loop {
            self.check_cancelled()?;

            let deploy = self.api.get_deploy(deploy_id).await?;
            if deploy.state.is_terminal() {
                if deploy.state == DeployState::Error {
                    return Err(DeployError::DeployFailed {
                        deploy_id: deploy_id.to_string(),
                        message: deploy.error_message,
                    });
                }
                return Ok(Polled { deploy, ready: true });
            }

            debug!(deploy = %deploy_id, attempt, state = %deploy.state, "deploy not ready");
            if attempt >= self.poll.max_attempts {
                warn!(
                    deploy = %deploy_id,
                    attempts = attempt,
                    state = %deploy.state,
                    "deploy still processing, giving up on polling"
                );
                return Ok(Polled {
                    deploy,
                    ready: false,
                });
            }
            attempt += 1;

            tokio::select! {
                _ = tokio::time::sleep(self.poll.interval) => {}
                _ = self.cancel.cancelled() => return Err(DeployError::Cancelled),
            }
        }
    }

    fn enter(&self, stage: DeployStage, message: Message) {
        debug!(?stage, "deploy stage");
        let message = self.formatter.format(&message);
        let _ = self.events_tx.send(DeployEvent::Stage { stage, message });
    }

    fn check_cancelled(&self) -> Result<(), DeployError> {
        if self.cancel.is_cancelled() {
            Err(DeployError::Cancelled)
        } else {
            Ok(())
        }
    }
}
