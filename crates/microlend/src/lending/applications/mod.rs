//! Loan application lifecycle: submission, review transitions, and the principal
//! change and withdrawal sub-workflows that can hold an application open.

pub mod domain;
pub mod lifecycle;
pub mod principal_change;
pub mod repository;
pub mod router;
pub mod service;
pub mod withdrawal;

#[cfg(test)]
mod tests;

pub use domain::{
    Actor, ActorId, Application, ApplicationForm, ApplicationId, ApplicationStatus,
    ApplicationStatusView, ReloanSnapshot, Role, StatusChange, WithdrawalReason,
};
pub use lifecycle::{IntentKind, LifecycleAction, LifecycleError, LifecycleIntent, PendingAction};
pub use principal_change::PrincipalChangeDecision;
pub use repository::{ApplicationRepository, IntentError, IntentPublisher, RepositoryError};
pub use router::{application_router, TermsView};
pub use service::{ApplicationServiceError, LoanApplicationService};
pub use withdrawal::WithdrawalDecision;
