use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::domain::{Actor, Application, ApplicationForm, ApplicationId, ApplicationStatus, Role, WithdrawalReason};
use super::lifecycle::{self, LifecycleAction, LifecycleError, LifecycleIntent};
use super::principal_change::{self, PrincipalChangeDecision};
use super::repository::{ApplicationRepository, IntentPublisher, RepositoryError};
use super::withdrawal::{self, WithdrawalDecision};
use crate::lending::terms::{FinalTerms, ReloanError, TermsEngine};

/// Service composing the terms engine, repository, and intent publisher.
///
/// Every action is a single load, transition, save, publish cycle. A stale save
/// surfaces as [`RepositoryError::Conflict`] and is never retried here. Intents
/// the publisher refuses are logged and do not fail the saved action.
pub struct LoanApplicationService<R, P> {
    engine: Arc<TermsEngine>,
    repository: Arc<R>,
    intents: Arc<P>,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("loan-{id:06}"))
}

impl<R, P> LoanApplicationService<R, P>
where
    R: ApplicationRepository + 'static,
    P: IntentPublisher + 'static,
{
    pub fn new(repository: Arc<R>, intents: Arc<P>, engine: Arc<TermsEngine>) -> Self {
        Self {
            engine,
            repository,
            intents,
        }
    }

    pub fn engine(&self) -> &TermsEngine {
        &self.engine
    }

    /// Price a form without persisting anything.
    pub fn quote(&self, form: &ApplicationForm) -> Result<FinalTerms, ApplicationServiceError> {
        let terms = self
            .engine
            .final_terms(form.category, form.requested_amount, form.reloan.as_ref())?;
        Ok(terms)
    }

    /// Submit a borrower's form, returning the repository-backed application.
    pub fn submit(
        &self,
        actor: &Actor,
        form: ApplicationForm,
    ) -> Result<Application, ApplicationServiceError> {
        if actor.role != Role::Borrower {
            return Err(LifecycleError::Unauthorized {
                role: actor.role,
                action: "submit an application",
            }
            .into());
        }

        let terms = self.quote(&form)?;
        let application = Application::new(next_application_id(), actor, form.category, &terms, Utc::now());
        let stored = self.repository.insert(application)?;

        info!(
            application_id = %stored.id.0,
            category = stored.category.label(),
            loan_amount = %stored.app_loan_amount,
            "loan application submitted"
        );
        Ok(stored)
    }

    pub fn get(&self, application_id: &ApplicationId) -> Result<Application, ApplicationServiceError> {
        Ok(self.repository.load(application_id)?)
    }

    pub fn list(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, ApplicationServiceError> {
        Ok(self.repository.list(status)?)
    }

    pub fn transition(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
        action: LifecycleAction,
        reason: Option<&str>,
    ) -> Result<Application, ApplicationServiceError> {
        self.apply(application_id, actor, action.label(), |application| {
            lifecycle::transition(application, actor, action, reason, Utc::now())
        })
    }

    pub fn schedule_interview(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
    ) -> Result<Application, ApplicationServiceError> {
        self.transition(application_id, actor, LifecycleAction::ScheduleInterview, None)
    }

    pub fn clear(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
    ) -> Result<Application, ApplicationServiceError> {
        self.transition(application_id, actor, LifecycleAction::Clear, None)
    }

    pub fn approve(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
    ) -> Result<Application, ApplicationServiceError> {
        self.transition(application_id, actor, LifecycleAction::Approve, None)
    }

    pub fn disburse(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
    ) -> Result<Application, ApplicationServiceError> {
        self.transition(application_id, actor, LifecycleAction::Disburse, None)
    }

    pub fn deny(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
        reason: &str,
    ) -> Result<Application, ApplicationServiceError> {
        self.transition(application_id, actor, LifecycleAction::Deny, Some(reason))
    }

    pub fn propose_principal_change(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
        requested_principal: Decimal,
    ) -> Result<Application, ApplicationServiceError> {
        self.apply(application_id, actor, "propose a principal change", |application| {
            principal_change::propose(&self.engine, application, actor, requested_principal, Utc::now())
        })
    }

    pub fn respond_to_principal_change(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
        decision: PrincipalChangeDecision,
    ) -> Result<Application, ApplicationServiceError> {
        self.apply(application_id, actor, "respond to a principal change", |application| {
            principal_change::respond(&self.engine, application, actor, decision, Utc::now())
        })
    }

    pub fn request_withdrawal(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
        reason: WithdrawalReason,
    ) -> Result<Application, ApplicationServiceError> {
        self.apply(application_id, actor, "request a withdrawal", |application| {
            withdrawal::request(application, actor, reason, Utc::now())
        })
    }

    pub fn decide_withdrawal(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
        decision: &WithdrawalDecision,
    ) -> Result<Application, ApplicationServiceError> {
        self.apply(application_id, actor, "decide a withdrawal request", |application| {
            withdrawal::decide(application, actor, decision, Utc::now())
        })
    }

    fn apply<F>(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
        action: &'static str,
        step: F,
    ) -> Result<Application, ApplicationServiceError>
    where
        F: FnOnce(&mut Application) -> Result<Vec<LifecycleIntent>, LifecycleError>,
    {
        let mut application = self.repository.load(application_id)?;
        let from = application.status;

        let intents = match step(&mut application) {
            Ok(intents) => intents,
            Err(err) => {
                warn!(
                    application_id = %application_id.0,
                    actor = %actor.id.0,
                    role = actor.role.label(),
                    status = from.label(),
                    "refused to {action}: {err}"
                );
                return Err(err.into());
            }
        };

        let stored = self.repository.save(application)?;
        // the saved record stands even when the outbox rejects an intent
        for intent in intents {
            let kind = intent.kind;
            if let Err(err) = self.intents.publish(intent) {
                warn!(
                    application_id = %stored.id.0,
                    intent = ?kind,
                    revision = stored.revision,
                    "intent not published after {action}: {err}"
                );
            }
        }

        info!(
            application_id = %stored.id.0,
            actor = %actor.id.0,
            from = from.label(),
            to = stored.status.label(),
            revision = stored.revision,
            "{action}"
        );
        Ok(stored)
    }
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error(transparent)]
    Terms(#[from] ReloanError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
