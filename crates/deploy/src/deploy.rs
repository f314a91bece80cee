//! Deploy orchestrator.
//!
//! Owns the event channel and cancellation token, runs one [`SiteDeploy`]
//! per call, and reports the final success or failure as an event.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use sitepush_api::{Client, SiteDescriptor};
use sitepush_manifest::ManifestBuilder;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::DeployError;
use crate::messages::{Catalog, Message, MessageFormatter};
use crate::remote::RemoteApi;
use crate::selection::{CredentialProvider, DeployRequest, SelectionStore};
use crate::session::SiteDeploy;
use crate::types::{DeployEvent, DeployOutcome, PollPolicy};

/// Orchestrates deploys of a local folder to a hosting site.
pub struct DeployOrchestrator {
    events_tx: mpsc::UnboundedSender<DeployEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<DeployEvent>>,
    cancel: Mutex<CancellationToken>,
    formatter: Arc<dyn MessageFormatter>,
    builder: ManifestBuilder,
    poll: PollPolicy,
}

impl Default for DeployOrchestrator {
    fn default() -> Self {
        Self::new(Arc::new(Catalog::default()))
    }
}

impl DeployOrchestrator {
    /// Creates an orchestrator rendering messages with `formatter`.
    pub fn new(formatter: Arc<dyn MessageFormatter>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            events_tx,
            events_rx: Some(events_rx),
            cancel: Mutex::new(CancellationToken::new()),
            formatter,
            builder: ManifestBuilder::default(),
            poll: PollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Replaces the default ignore rules used when scanning.
    pub fn with_manifest_builder(mut self, builder: ManifestBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<DeployEvent>> {
        self.events_rx.take()
    }

    /// Returns the cancellation token for the current or next deploy.
    ///
    /// Cancellation is observed between uploads and between polls. Once a
    /// cancelled attempt ends the token is replaced, so later deploys need a
    /// fresh call to this method.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drops a cancelled token so it does not leak into the next attempt.
    fn rearm_cancel(&self) {
        let mut cancel = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if cancel.is_cancelled() {
            *cancel = CancellationToken::new();
        }
    }

    /// Deploys `root` to `site`.
    ///
    /// Emits [`DeployEvent::Completed`] or [`DeployEvent::Failed`] at the end.
    /// Nothing is rolled back on failure; blobs already uploaded stay on the
    /// remote and are skipped by the next attempt.
    pub async fn deploy(
        &self,
        api: &dyn RemoteApi,
        root: &Path,
        site: &SiteDescriptor,
    ) -> Result<DeployOutcome, DeployError> {
        let session = SiteDeploy::new(
            api,
            self.formatter.as_ref(),
            &self.builder,
            self.poll,
            self.cancel_token(),
            self.events_tx.clone(),
        );

        let result = session.run(root, site).await;
        self.rearm_cancel();

        match result {
            Ok(outcome) => {
                let url = outcome.url.clone().unwrap_or_default();
                let message = if outcome.ready {
                    Message::DeployDone { url }
                } else {
                    Message::DeployStillProcessing { url }
                };
                let _ = self.events_tx.send(DeployEvent::Completed {
                    url: outcome.url.clone(),
                    ready: outcome.ready,
                    message: self.formatter.format(&message),
                });
                info!(
                    site = %site.id,
                    deploy = %outcome.deploy.id,
                    ready = outcome.ready,
                    uploaded = outcome.uploaded,
                    "deploy completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(site = %site.id, error = %e, "deploy failed");
                Err(self.report_failure(e))
            }
        }
    }

    /// Deploys the host's current selection to the API at `base_url`.
    ///
    /// Token, folder and site are read once. A missing one fails the attempt
    /// before any request is made.
    pub async fn deploy_selected(
        &self,
        credentials: &dyn CredentialProvider,
        selection: &dyn SelectionStore,
        base_url: &str,
    ) -> Result<DeployOutcome, DeployError> {
        let request = match DeployRequest::gather(credentials, selection) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "deploy not started");
                return Err(self.report_failure(e));
            }
        };
        let client = match Client::with_base_url(&request.token, base_url) {
            Ok(client) => client,
            Err(e) => return Err(self.report_failure(e.into())),
        };

        self.deploy(&client, &request.folder, &request.site).await
    }

    fn report_failure(&self, e: DeployError) -> DeployError {
        let message = self.formatter.format(&Message::from_error(&e));
        let _ = self.events_tx.send(DeployEvent::Failed { message });
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::ApiFuture;
    use crate::types::DeployStage;
    use sitepush_api::{DeployDescriptor, DeployState, Error as ApiError};
    use sitepush_manifest::{Manifest, hash_bytes};
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    fn status_error(status: u16) -> ApiError {
        if status == 401 {
            ApiError::CredentialInvalid
        } else {
            ApiError::Api {
                status,
                status_text: String::new(),
                detail: format!("status {status}"),
            }
        }
    }

    fn site() -> SiteDescriptor {
        SiteDescriptor {
            id: "s1".into(),
            name: "blog".into(),
            url: "http://blog.example.app".into(),
            ssl_url: "https://blog.example.app".into(),
            ..Default::default()
        }
    }

    /// Scripted API: fixed `required` list, scripted poll states.
    #[derive(Default)]
    struct MockApi {
        verify_status: Option<u16>,
        /// Site returned by the verify call; defaults to an id-only site.
        verified_site: Option<SiteDescriptor>,
        /// Deploy descriptors carry no URLs.
        bare_deploys: bool,
        required: Vec<String>,
        finish_status: Option<u16>,
        states: Mutex<VecDeque<&'static str>>,
        calls: Mutex<Vec<String>>,
        uploads: Mutex<Vec<(String, Vec<u8>)>>,
        manifests: Mutex<Vec<Manifest>>,
    }

    impl MockApi {
        fn new(required: &[&str], states: &[&'static str]) -> Self {
            Self {
                required: required.iter().map(|s| s.to_string()).collect(),
                states: Mutex::new(states.iter().copied().collect()),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, name: &str) -> usize {
            self.calls().iter().filter(|c| c.as_str() == name).count()
        }

        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }
    }

    impl RemoteApi for MockApi {
        fn get_site<'a>(&'a self, site_id: &'a str) -> ApiFuture<'a, SiteDescriptor> {
            Box::pin(async move {
                self.record("get_site");
                match (self.verify_status, &self.verified_site) {
                    (Some(status), _) => Err(status_error(status)),
                    (None, Some(site)) => Ok(site.clone()),
                    (None, None) => Ok(SiteDescriptor {
                        id: site_id.into(),
                        ..Default::default()
                    }),
                }
            })
        }

        fn create_deploy<'a>(
            &'a self,
            site_id: &'a str,
            files: &'a Manifest,
        ) -> ApiFuture<'a, DeployDescriptor> {
            Box::pin(async move {
                self.record("create_deploy");
                self.manifests.lock().unwrap().push(files.clone());
                let deploy_url = if self.bare_deploys {
                    String::new()
                } else {
                    "http://d1--blog.example.app".into()
                };
                Ok(DeployDescriptor {
                    id: "d1".into(),
                    site_id: site_id.into(),
                    state: DeployState::Uploading,
                    required: self.required.clone(),
                    deploy_url,
                    ..Default::default()
                })
            })
        }

        fn upload_file<'a>(
            &'a self,
            _deploy_id: &'a str,
            path: &'a str,
            data: Vec<u8>,
        ) -> ApiFuture<'a, ()> {
            Box::pin(async move {
                self.record("upload_file");
                self.uploads.lock().unwrap().push((path.to_string(), data));
                Ok(())
            })
        }

        fn finish_deploy<'a>(&'a self, _deploy_id: &'a str) -> ApiFuture<'a, ()> {
            Box::pin(async move {
                self.record("finish_deploy");
                match self.finish_status {
                    Some(status) => Err(status_error(status)),
                    None => Ok(()),
                }
            })
        }

        fn get_deploy<'a>(&'a self, deploy_id: &'a str) -> ApiFuture<'a, DeployDescriptor> {
            Box::pin(async move {
                self.record("get_deploy");
                let state = self
                    .states
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or("processing");
                Ok(DeployDescriptor {
                    id: deploy_id.into(),
                    state: DeployState::from(Some(state.to_string())),
                    deploy_ssl_url: if self.bare_deploys {
                        String::new()
                    } else {
                        "https://d1--blog.example.app".into()
                    },
                    error_message: (state == "error").then(|| "build failed".to_string()),
                    ..Default::default()
                })
            })
        }
    }

    fn site_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), b"<h1>home</h1>").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git").join("config"), b"[core]").unwrap();
        dir
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<DeployEvent>) -> Vec<DeployEvent> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn uploads_single_required_file() {
        let dir = site_dir();
        let api = MockApi::new(&["/index.html"], &["ready"]);
        let mut orch = DeployOrchestrator::default();
        let mut rx = orch.take_events().unwrap();

        let outcome = orch.deploy(&api, dir.path(), &site()).await.unwrap();

        assert!(outcome.ready);
        assert_eq!(outcome.uploaded, 1);
        let uploads = api.uploads.lock().unwrap().clone();
        assert_eq!(uploads, vec![("/index.html".to_string(), b"<h1>home</h1>".to_vec())]);

        let progress: Vec<(usize, usize)> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                DeployEvent::Uploaded {
                    uploaded, total, ..
                } => Some((uploaded, total)),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![(1, 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn events_follow_stage_order() {
        let dir = site_dir();
        let api = MockApi::new(&["/index.html"], &["ready"]);
        let mut orch = DeployOrchestrator::default();
        let mut rx = orch.take_events().unwrap();

        orch.deploy(&api, dir.path(), &site()).await.unwrap();
        let events = drain(&mut rx);

        let stages: Vec<DeployStage> = events
            .iter()
            .filter_map(|e| match e {
                DeployEvent::Stage { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect();
        assert_eq!(
            stages,
            vec![
                DeployStage::Verifying,
                DeployStage::Scanning,
                DeployStage::Creating,
                DeployStage::Uploading,
                DeployStage::Finishing,
                DeployStage::Polling,
            ]
        );
        match events.last() {
            Some(DeployEvent::Completed {
                url,
                ready,
                message,
            }) => {
                assert!(*ready);
                assert_eq!(url.as_deref(), Some("https://d1--blog.example.app"));
                assert_eq!(message, "Deploy complete: https://d1--blog.example.app");
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(
            api.calls(),
            vec!["get_site", "create_deploy", "upload_file", "finish_deploy", "get_deploy"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_ready() {
        let dir = site_dir();
        let api = MockApi::new(&[], &["processing", "processing", "ready"]);
        let orch = DeployOrchestrator::default();

        let start = tokio::time::Instant::now();
        let outcome = orch.deploy(&api, dir.path(), &site()).await.unwrap();

        assert!(outcome.ready);
        assert_eq!(outcome.deploy.state, DeployState::Ready);
        assert_eq!(api.count("get_deploy"), 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(4000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(4100), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn poll_cap_returns_last_descriptor() {
        let dir = site_dir();
        let api = MockApi::new(&[], &[]);
        let mut orch = DeployOrchestrator::default();
        let mut rx = orch.take_events().unwrap();

        let outcome = orch.deploy(&api, dir.path(), &site()).await.unwrap();

        assert!(!outcome.ready);
        assert_eq!(outcome.deploy.state, DeployState::Processing);
        assert_eq!(outcome.url.as_deref(), Some("https://d1--blog.example.app"));
        assert_eq!(api.count("get_deploy"), 30);

        let last = drain(&mut rx).pop();
        assert!(matches!(last, Some(DeployEvent::Completed { ready: false, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_poll_policy() {
        let dir = site_dir();
        let api = MockApi::new(&[], &[]);
        let orch = DeployOrchestrator::default()
            .with_poll_policy(PollPolicy::new(3, Duration::from_millis(10)));

        let start = tokio::time::Instant::now();
        let outcome = orch.deploy(&api, dir.path(), &site()).await.unwrap();

        assert!(!outcome.ready);
        assert_eq!(api.count("get_deploy"), 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(20), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(100), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn error_state_fails_deploy() {
        let dir = site_dir();
        let api = MockApi::new(&[], &["processing", "error"]);
        let orch = DeployOrchestrator::default();

        let err = orch.deploy(&api, dir.path(), &site()).await.unwrap_err();
        match err {
            DeployError::DeployFailed { deploy_id, message } => {
                assert_eq!(deploy_id, "d1");
                assert_eq!(message.as_deref(), Some("build failed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(api.count("get_deploy"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn finish_404_is_ignored() {
        let dir = site_dir();
        let api = MockApi {
            finish_status: Some(404),
            ..MockApi::new(&[], &["ready"])
        };
        let orch = DeployOrchestrator::default();

        let outcome = orch.deploy(&api, dir.path(), &site()).await.unwrap();
        assert!(outcome.ready);
        assert_eq!(api.count("get_deploy"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn finish_500_stops_deploy() {
        let dir = site_dir();
        let api = MockApi {
            finish_status: Some(500),
            ..MockApi::new(&[], &["ready"])
        };
        let mut orch = DeployOrchestrator::default();
        let mut rx = orch.take_events().unwrap();

        let err = orch.deploy(&api, dir.path(), &site()).await.unwrap_err();
        assert!(matches!(
            err,
            DeployError::Api(ApiError::Api { status: 500, .. })
        ));
        assert_eq!(api.count("get_deploy"), 0);

        let last = drain(&mut rx).pop();
        match last {
            Some(DeployEvent::Failed { message }) => assert!(message.contains("500"), "{message}"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn empty_folder_fails_before_create() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("node_modules").join("x.js"), b"x").unwrap();
        std::fs::write(dir.path().join(".DS_Store"), b"x").unwrap();
        let api = MockApi::new(&[], &["ready"]);
        let orch = DeployOrchestrator::default();

        let err = orch.deploy(&api, dir.path(), &site()).await.unwrap_err();
        assert!(matches!(err, DeployError::EmptyDeploy));
        assert_eq!(api.calls(), vec!["get_site"]);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_digest_is_missing_file() {
        let dir = site_dir();
        let unknown = "0123456789abcdef0123456789abcdef01234567";
        let api = MockApi::new(&[unknown], &["ready"]);
        let orch = DeployOrchestrator::default();

        let err = orch.deploy(&api, dir.path(), &site()).await.unwrap_err();
        match err {
            DeployError::MissingFile { entry } => assert_eq!(entry, unknown),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(api.count("upload_file"), 0);
        assert_eq!(api.count("finish_deploy"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn digest_entry_uploads_mapped_path() {
        let dir = site_dir();
        std::fs::create_dir(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css").join("a.css"), b"a{}").unwrap();
        let digest = hash_bytes(b"a{}");
        let api = MockApi::new(&[&digest, "index.html"], &["ready"]);
        let orch = DeployOrchestrator::default();

        let outcome = orch.deploy(&api, dir.path(), &site()).await.unwrap();
        assert_eq!(outcome.uploaded, 2);

        let paths: Vec<String> = api
            .uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _)| p.clone())
            .collect();
        assert_eq!(paths, vec!["/css/a.css", "/index.html"]);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_credential_stops_at_verify() {
        let dir = site_dir();
        let api = MockApi {
            verify_status: Some(401),
            ..MockApi::new(&["/index.html"], &["ready"])
        };
        let orch = DeployOrchestrator::default();

        let err = orch.deploy(&api, dir.path(), &site()).await.unwrap_err();
        assert!(err.is_credential_invalid());
        assert_eq!(api.calls(), vec!["get_site"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_uploads() {
        let dir = site_dir();
        let api = MockApi::new(&["/index.html"], &["ready"]);
        let orch = DeployOrchestrator::default();
        orch.cancel_token().cancel();

        let err = orch.deploy(&api, dir.path(), &site()).await.unwrap_err();
        assert!(matches!(err, DeployError::Cancelled));
        assert_eq!(api.count("upload_file"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_while_polling() {
        let dir = site_dir();
        let api = MockApi::new(&[], &[]);
        let orch = DeployOrchestrator::default();
        let cancel = orch.cancel_token();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(4500)).await;
            cancel.cancel();
        });

        let err = orch.deploy(&api, dir.path(), &site()).await.unwrap_err();
        assert!(matches!(err, DeployError::Cancelled));
        assert_eq!(api.count("get_deploy"), 3);
        canceller.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_does_not_outlive_its_attempt() {
        let dir = site_dir();
        let api = MockApi::new(&["/index.html"], &["ready", "ready"]);
        let orch = DeployOrchestrator::default();
        let stale = orch.cancel_token();
        stale.cancel();

        let err = orch.deploy(&api, dir.path(), &site()).await.unwrap_err();
        assert!(matches!(err, DeployError::Cancelled));

        let fresh = orch.cancel_token();
        assert!(!fresh.is_cancelled());
        let outcome = orch.deploy(&api, dir.path(), &site()).await.unwrap();
        assert!(outcome.ready);
        assert_eq!(api.count("upload_file"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn verified_site_url_fills_in_for_id_only_selection() {
        let dir = site_dir();
        let api = MockApi {
            verified_site: Some(SiteDescriptor {
                id: "s2".into(),
                name: "docs".into(),
                ssl_url: "https://verified.example.app".into(),
                ..Default::default()
            }),
            bare_deploys: true,
            ..MockApi::new(&[], &["ready"])
        };
        let orch = DeployOrchestrator::default();
        let selected = SiteDescriptor {
            id: "s2".into(),
            ..Default::default()
        };

        let outcome = orch.deploy(&api, dir.path(), &selected).await.unwrap();
        assert_eq!(outcome.url.as_deref(), Some("https://verified.example.app"));
    }

    #[tokio::test(start_paused = true)]
    async fn caller_site_url_used_when_verify_has_none() {
        let dir = site_dir();
        let api = MockApi {
            bare_deploys: true,
            ..MockApi::new(&[], &["ready"])
        };
        let orch = DeployOrchestrator::default();

        let outcome = orch.deploy(&api, dir.path(), &site()).await.unwrap();
        assert_eq!(outcome.url.as_deref(), Some("https://blog.example.app"));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_ignore_rules_shape_the_manifest() {
        let dir = site_dir();
        std::fs::write(dir.path().join("notes.md"), b"draft").unwrap();
        std::fs::create_dir(dir.path().join("drafts")).unwrap();
        std::fs::write(dir.path().join("drafts").join("a.html"), b"a").unwrap();
        let api = MockApi::new(&[], &["ready"]);
        let orch = DeployOrchestrator::default().with_manifest_builder(
            ManifestBuilder::default()
                .ignore_dir("drafts")
                .ignore_file("notes.md"),
        );

        orch.deploy(&api, dir.path(), &site()).await.unwrap();

        let manifests = api.manifests.lock().unwrap();
        let paths: Vec<&str> = manifests[0].keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["/index.html"]);
    }

    #[tokio::test]
    async fn take_events_once() {
        let mut orch = DeployOrchestrator::default();
        assert!(orch.take_events().is_some());
        assert!(orch.take_events().is_none());
    }

    /// Content-addressed remote: asks only for blobs it has not seen.
    #[derive(Default)]
    struct BlobStoreApi {
        blobs: Mutex<HashSet<String>>,
        required_history: Mutex<Vec<Vec<String>>>,
    }

    impl RemoteApi for BlobStoreApi {
        fn get_site<'a>(&'a self, site_id: &'a str) -> ApiFuture<'a, SiteDescriptor> {
            Box::pin(async move {
                Ok(SiteDescriptor {
                    id: site_id.into(),
                    ..Default::default()
                })
            })
        }

        fn create_deploy<'a>(
            &'a self,
            _site_id: &'a str,
            files: &'a Manifest,
        ) -> ApiFuture<'a, DeployDescriptor> {
            Box::pin(async move {
                let blobs = self.blobs.lock().unwrap();
                let mut seen = HashSet::new();
                let required: Vec<String> = files
                    .iter()
                    .filter(|(_, digest)| !blobs.contains(*digest) && seen.insert(digest.to_string()))
                    .map(|(_, digest)| digest.clone())
                    .collect();
                self.required_history.lock().unwrap().push(required.clone());
                Ok(DeployDescriptor {
                    id: "d1".into(),
                    required,
                    ..Default::default()
                })
            })
        }

        fn upload_file<'a>(
            &'a self,
            _deploy_id: &'a str,
            _path: &'a str,
            data: Vec<u8>,
        ) -> ApiFuture<'a, ()> {
            Box::pin(async move {
                self.blobs.lock().unwrap().insert(hash_bytes(&data));
                Ok(())
            })
        }

        fn finish_deploy<'a>(&'a self, _deploy_id: &'a str) -> ApiFuture<'a, ()> {
            Box::pin(async move { Ok(()) })
        }

        fn get_deploy<'a>(&'a self, deploy_id: &'a str) -> ApiFuture<'a, DeployDescriptor> {
            Box::pin(async move {
                Ok(DeployDescriptor {
                    id: deploy_id.into(),
                    state: DeployState::Ready,
                    ..Default::default()
                })
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn redeploy_of_unchanged_tree_uploads_nothing() {
        let dir = site_dir();
        std::fs::write(dir.path().join("about.html"), b"about").unwrap();
        std::fs::write(dir.path().join("copy.html"), b"about").unwrap();
        let api = BlobStoreApi::default();
        let orch = DeployOrchestrator::default();

        let first = orch.deploy(&api, dir.path(), &site()).await.unwrap();
        let second = orch.deploy(&api, dir.path(), &site()).await.unwrap();

        assert_eq!(first.uploaded, 2);
        assert_eq!(second.uploaded, 0);
        let history = api.required_history.lock().unwrap();
        assert_eq!(history[0].len(), 2);
        assert!(history[1].is_empty());
    }

    struct Host {
        token: Option<&'static str>,
        folder: Option<std::path::PathBuf>,
    }

    impl CredentialProvider for Host {
        fn token(&self) -> Option<String> {
            self.token.map(String::from)
        }
    }

    impl SelectionStore for Host {
        fn folder(&self) -> Option<std::path::PathBuf> {
            self.folder.clone()
        }

        fn site(&self) -> Option<SiteDescriptor> {
            Some(site())
        }
    }

    #[tokio::test]
    async fn deploy_selected_requires_credential() {
        let mut orchestrator = DeployOrchestrator::default();
        let mut rx = orchestrator.take_events().unwrap();
        let host = Host {
            token: None,
            folder: Some("/srv/site".into()),
        };

        // Unroutable base URL: the attempt must fail before any request.
        let err = orchestrator
            .deploy_selected(&host, &host, "http://127.0.0.1:9")
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::NoCredential));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DeployEvent::Failed { .. }));
    }

    #[tokio::test]
    async fn deploy_selected_requires_folder() {
        let orchestrator = DeployOrchestrator::default();
        let host = Host {
            token: Some("tok"),
            folder: None,
        };

        let err = orchestrator
            .deploy_selected(&host, &host, "http://127.0.0.1:9")
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::NoFolderSelected));
    }
}
