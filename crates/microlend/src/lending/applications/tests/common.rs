use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::lending::applications::domain::{
    Actor, Application, ApplicationForm, ApplicationId, ApplicationStatus, Role,
};
use crate::lending::applications::lifecycle::LifecycleIntent;
use crate::lending::applications::repository::{
    ApplicationRepository, IntentError, IntentPublisher, RepositoryError,
};
use crate::lending::applications::{application_router, LoanApplicationService};
use crate::lending::terms::{LoanCategory, MergeStrategy, ReloanContext, TermsEngine};

pub(super) fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn engine() -> TermsEngine {
    TermsEngine::default()
}

pub(super) fn borrower() -> Actor {
    Actor::new("borrower-17", Role::Borrower)
}

pub(super) fn other_borrower() -> Actor {
    Actor::new("borrower-99", Role::Borrower)
}

pub(super) fn officer() -> Actor {
    Actor::new("officer-3", Role::LoanOfficer)
}

pub(super) fn manager() -> Actor {
    Actor::new("manager-1", Role::Manager)
}

pub(super) fn form(amount: Decimal) -> ApplicationForm {
    ApplicationForm {
        category: LoanCategory::WithCollateral,
        requested_amount: amount,
        reloan: None,
    }
}

pub(super) fn reloan_form(amount: Decimal, balance: Decimal, strategy: MergeStrategy) -> ApplicationForm {
    ApplicationForm {
        category: LoanCategory::WithCollateral,
        requested_amount: amount,
        reloan: Some(ReloanContext {
            remaining_balance: balance,
            merge_strategy: strategy,
        }),
    }
}

/// An application for 20,000 with collateral, freshly submitted.
pub(super) fn applied() -> Application {
    application_for(&form(dec!(20000)))
}

pub(super) fn application_for(form: &ApplicationForm) -> Application {
    let terms = engine()
        .final_terms(form.category, form.requested_amount, form.reloan.as_ref())
        .expect("fixture terms resolve");
    Application::new(
        ApplicationId("loan-fixture".to_string()),
        &borrower(),
        form.category,
        &terms,
        at(),
    )
}

pub(super) fn with_status(status: ApplicationStatus) -> Application {
    let mut application = applied();
    application.status = status;
    application
}

pub(super) fn build_service() -> (
    LoanApplicationService<MemoryRepository, MemoryIntents>,
    Arc<MemoryRepository>,
    Arc<MemoryIntents>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let intents = Arc::new(MemoryIntents::default());
    let service = LoanApplicationService::new(repository.clone(), intents.clone(), Arc::new(engine()));
    (service, repository, intents)
}

pub(super) fn application_router_with_service(
    service: LoanApplicationService<MemoryRepository, MemoryIntents>,
) -> axum::Router {
    application_router(Arc::new(service))
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
}

impl ApplicationRepository for MemoryRepository {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Duplicate);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn load(&self, id: &ApplicationId) -> Result<Application, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        guard.get(id).cloned().ok_or(RepositoryError::NotFound)
    }

    fn save(&self, mut application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard.get(&application.id).ok_or(RepositoryError::NotFound)?;
        if stored.revision != application.revision {
            return Err(RepositoryError::Conflict {
                id: application.id.clone(),
                expected: application.revision,
                actual: stored.revision,
            });
        }
        application.revision += 1;
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn list(&self, status: Option<ApplicationStatus>) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut applications: Vec<_> = guard
            .values()
            .filter(|app| status.map_or(true, |status| app.status == status))
            .cloned()
            .collect();
        applications.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(applications)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryIntents {
    events: Arc<Mutex<Vec<LifecycleIntent>>>,
}

impl MemoryIntents {
    pub(super) fn events(&self) -> Vec<LifecycleIntent> {
        self.events.lock().expect("intent mutex poisoned").clone()
    }
}

impl IntentPublisher for MemoryIntents {
    fn publish(&self, intent: LifecycleIntent) -> Result<(), IntentError> {
        self.events
            .lock()
            .expect("intent mutex poisoned")
            .push(intent);
        Ok(())
    }
}

pub(super) struct OfflineIntents;

impl IntentPublisher for OfflineIntents {
    fn publish(&self, _intent: LifecycleIntent) -> Result<(), IntentError> {
        Err(IntentError::Transport("outbox offline".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _application: Application) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn load(&self, _id: &ApplicationId) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save(&self, _application: Application) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _status: Option<ApplicationStatus>) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Parse a money amount carried in an intent's details.
pub(super) fn detail_amount(intent: &LifecycleIntent, key: &str) -> Option<Decimal> {
    intent.details.get(key).and_then(|value| value.parse().ok())
}

/// Parse a money amount serialized into a JSON payload.
pub(super) fn json_amount(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(raw) => raw.parse().ok(),
        Value::Number(number) => number.to_string().parse().ok(),
        _ => None,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
