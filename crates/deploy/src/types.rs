//! Data types for the deploy flow.

use std::time::Duration;

use sitepush_api::DeployDescriptor;

/// Step of a single deploy attempt.
///
/// The end of an attempt is reported with [`DeployEvent::Completed`] or
/// [`DeployEvent::Failed`] rather than a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStage {
    Verifying,
    Scanning,
    Creating,
    Uploading,
    Finishing,
    Polling,
}

/// Progress event emitted during a deploy. Purely observational.
#[derive(Debug, Clone)]
pub enum DeployEvent {
    /// Entered a new stage.
    Stage { stage: DeployStage, message: String },
    /// One required file was uploaded.
    Uploaded {
        uploaded: usize,
        total: usize,
        path: String,
        message: String,
    },
    /// The deploy ended without error. `ready` is false on soft timeout.
    Completed {
        url: Option<String>,
        ready: bool,
        message: String,
    },
    /// The deploy attempt failed.
    Failed { message: String },
}

/// How long to wait for the remote to finish processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);

    /// At least one status fetch is always made.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_INTERVAL)
    }
}

/// Result of a deploy attempt that did not fail.
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    /// Most recent descriptor seen while polling.
    pub deploy: DeployDescriptor,
    /// Best URL for the deploy, see [`crate::url::URL_PREFERENCE`].
    pub url: Option<String>,
    /// False when polling gave up before the deploy became ready.
    pub ready: bool,
    /// Number of files uploaded in this attempt.
    pub uploaded: usize,
}
