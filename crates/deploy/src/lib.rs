//! Deploy flow: push a local folder to a static-hosting site.
//!
//! This crate implements the **business logic** of a deploy. It is a
//! library crate with no UI dependencies; the host supplies the token and
//! the folder/site selection and renders the progress events.
//!
//! # Pipeline
//!
//! 1. **Verify**: confirm the site still exists
//! 2. **Scan**: hash every eligible file under the folder
//! 3. **Create**: submit the manifest; the remote answers with what it lacks
//! 4. **Upload**: send each required file, one at a time
//! 5. **Finish**: mark the upload phase done
//! 6. **Poll**: wait for the remote to report `ready` or `error`

pub mod deploy;
pub mod error;
pub mod messages;
pub mod remote;
pub mod resolve;
pub mod selection;
pub mod session;
pub mod types;
pub mod url;

// Re-export primary types for convenience.
pub use deploy::DeployOrchestrator;
pub use error::DeployError;
pub use messages::{Catalog, Locale, Message, MessageFormatter};
pub use remote::{ApiFuture, RemoteApi};
pub use resolve::{ResolvedEntry, resolve_required};
pub use selection::{CredentialProvider, DeployRequest, SelectionStore};
pub use session::SiteDeploy;
pub use types::{DeployEvent, DeployOutcome, DeployStage, PollPolicy};
pub use url::{URL_PREFERENCE, UrlSource, preferred_url, select_url};
