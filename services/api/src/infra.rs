use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use microlend::config::AppConfig;
use microlend::error::AppError;
use microlend::lending::applications::{
    Application, ApplicationId, ApplicationRepository, ApplicationStatus, IntentError,
    IntentPublisher, LifecycleIntent, RepositoryError,
};
use microlend::lending::terms::TermsEngine;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Build the terms engine from the configured catalog.
pub(crate) fn load_engine() -> Result<TermsEngine, AppError> {
    let config = AppConfig::load()?;
    let catalog = config.lending.load_catalog()?;
    Ok(TermsEngine::new(Arc::new(catalog)))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
}

impl InMemoryApplicationRepository {
    fn guard(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<ApplicationId, Application>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.guard()?;
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Duplicate);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn load(&self, id: &ApplicationId) -> Result<Application, RepositoryError> {
        let guard = self.guard()?;
        guard.get(id).cloned().ok_or(RepositoryError::NotFound)
    }

    fn save(&self, mut application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.guard()?;
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
        let guard = self.guard()?;
        let mut applications: Vec<_> = guard
            .values()
            .filter(|application| status.map_or(true, |status| application.status == status))
            .cloned()
            .collect();
        applications.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(applications)
    }
}

/// Outbox standing in for the scheduling, payout and notification collaborators.
#[derive(Default, Clone)]
pub(crate) struct InMemoryIntentPublisher {
    events: Arc<Mutex<Vec<(DateTime<Utc>, LifecycleIntent)>>>,
}

impl IntentPublisher for InMemoryIntentPublisher {
    fn publish(&self, intent: LifecycleIntent) -> Result<(), IntentError> {
        info!(
            application_id = %intent.application_id.0,
            kind = ?intent.kind,
            "lifecycle intent queued"
        );
        let mut guard = self
            .events
            .lock()
            .map_err(|_| IntentError::Transport("intent mutex poisoned".to_string()))?;
        guard.push((Utc::now(), intent));
        Ok(())
    }
}

impl InMemoryIntentPublisher {
    pub(crate) fn events(&self) -> Vec<(DateTime<Utc>, LifecycleIntent)> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}
