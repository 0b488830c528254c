use super::domain::{Application, ApplicationId, ApplicationStatus};
use super::lifecycle::LifecycleIntent;

/// Storage abstraction so the service module can be exercised in isolation.
///
/// `save` must refuse a record whose `revision` no longer matches the stored
/// one, then store it with the revision incremented.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError>;
    fn load(&self, id: &ApplicationId) -> Result<Application, RepositoryError>;
    fn save(&self, application: Application) -> Result<Application, RepositoryError>;
    fn list(&self, status: Option<ApplicationStatus>) -> Result<Vec<Application>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("application {} changed since it was read (revision {expected} expected, {actual} stored)", .id.0)]
    Conflict {
        id: ApplicationId,
        expected: u64,
        actual: u64,
    },
    #[error("application already exists")]
    Duplicate,
    #[error("application not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for interview scheduling, disbursement and borrower notices.
pub trait IntentPublisher: Send + Sync {
    fn publish(&self, intent: LifecycleIntent) -> Result<(), IntentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("intent transport unavailable: {0}")]
    Transport(String),
}
