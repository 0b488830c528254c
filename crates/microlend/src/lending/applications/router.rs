use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{Actor, ApplicationForm, ApplicationId, ApplicationStatus, WithdrawalReason};
use super::lifecycle::{LifecycleAction, LifecycleError};
use super::principal_change::PrincipalChangeDecision;
use super::repository::{ApplicationRepository, IntentPublisher, RepositoryError};
use super::service::{ApplicationServiceError, LoanApplicationService};
use super::withdrawal::WithdrawalDecision;
use crate::lending::terms::{round_money, FinalTerms, QuoteView};

type SharedService<R, P> = Arc<LoanApplicationService<R, P>>;

/// Router builder exposing pricing and lifecycle endpoints.
pub fn application_router<R, P>(service: SharedService<R, P>) -> Router
where
    R: ApplicationRepository + 'static,
    P: IntentPublisher + 'static,
{
    Router::new()
        .route("/api/v1/loans/catalog", get(catalog_handler::<R, P>))
        .route("/api/v1/loans/quote", post(quote_handler::<R, P>))
        .route(
            "/api/v1/loans/applications",
            post(submit_handler::<R, P>).get(list_handler::<R, P>),
        )
        .route(
            "/api/v1/loans/applications/:application_id",
            get(status_handler::<R, P>),
        )
        .route(
            "/api/v1/loans/applications/:application_id/transitions",
            post(transition_handler::<R, P>),
        )
        .route(
            "/api/v1/loans/applications/:application_id/principal-change",
            post(propose_principal_handler::<R, P>),
        )
        .route(
            "/api/v1/loans/applications/:application_id/principal-change/response",
            post(respond_principal_handler::<R, P>),
        )
        .route(
            "/api/v1/loans/applications/:application_id/withdrawal",
            post(request_withdrawal_handler::<R, P>),
        )
        .route(
            "/api/v1/loans/applications/:application_id/withdrawal/decision",
            post(decide_withdrawal_handler::<R, P>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SubmitRequest {
    pub actor: Actor,
    pub form: ApplicationForm,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TransitionRequest {
    pub actor: Actor,
    pub action: LifecycleAction,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ProposePrincipalRequest {
    pub actor: Actor,
    pub requested_principal: Decimal,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RespondPrincipalRequest {
    pub actor: Actor,
    pub decision: PrincipalChangeDecision,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WithdrawalRequest {
    pub actor: Actor,
    pub reason: WithdrawalReason,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WithdrawalDecisionRequest {
    pub actor: Actor,
    #[serde(flatten)]
    pub decision: WithdrawalDecision,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
}

/// Settled terms as shown on the application form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermsView {
    pub quote: QuoteView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_strategy: Option<&'static str>,
    pub requested_amount: Decimal,
    pub principal: Decimal,
    pub balance_deduction: Decimal,
    pub net_proceeds: Decimal,
}

impl From<&FinalTerms> for TermsView {
    fn from(terms: &FinalTerms) -> Self {
        Self {
            quote: terms.quote.rounded(),
            merge_strategy: terms.strategy.map(|strategy| strategy.label()),
            requested_amount: round_money(terms.requested_amount),
            principal: round_money(terms.principal),
            balance_deduction: round_money(terms.balance_deduction),
            net_proceeds: round_money(terms.net_proceeds),
        }
    }
}

pub(crate) async fn catalog_handler<R, P>(State(service): State<SharedService<R, P>>) -> Response
where
    R: ApplicationRepository + 'static,
    P: IntentPublisher + 'static,
{
    (StatusCode::OK, Json(service.engine().catalog().clone())).into_response()
}

pub(crate) async fn quote_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Json(form): Json<ApplicationForm>,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: IntentPublisher + 'static,
{
    match service.quote(&form) {
        Ok(terms) => (StatusCode::OK, Json(TermsView::from(&terms))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Json(request): Json<SubmitRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: IntentPublisher + 'static,
{
    match service.submit(&request.actor, request.form) {
        Ok(application) => (StatusCode::CREATED, Json(application.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: IntentPublisher + 'static,
{
    match service.list(query.status) {
        Ok(applications) => {
            let views: Vec<_> = applications.iter().map(|app| app.status_view()).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: IntentPublisher + 'static,
{
    match service.get(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, Json(application.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn transition_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(application_id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: IntentPublisher + 'static,
{
    let id = ApplicationId(application_id);
    match service.transition(&id, &request.actor, request.action, request.reason.as_deref()) {
        Ok(application) => (StatusCode::OK, Json(application.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn propose_principal_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(application_id): Path<String>,
    Json(request): Json<ProposePrincipalRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: IntentPublisher + 'static,
{
    let id = ApplicationId(application_id);
    match service.propose_principal_change(&id, &request.actor, request.requested_principal) {
        Ok(application) => (StatusCode::ACCEPTED, Json(application.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn respond_principal_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(application_id): Path<String>,
    Json(request): Json<RespondPrincipalRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: IntentPublisher + 'static,
{
    let id = ApplicationId(application_id);
    match service.respond_to_principal_change(&id, &request.actor, request.decision) {
        Ok(application) => (StatusCode::OK, Json(application.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn request_withdrawal_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(application_id): Path<String>,
    Json(request): Json<WithdrawalRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: IntentPublisher + 'static,
{
    let id = ApplicationId(application_id);
    match service.request_withdrawal(&id, &request.actor, request.reason) {
        Ok(application) => (StatusCode::ACCEPTED, Json(application.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn decide_withdrawal_handler<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(application_id): Path<String>,
    Json(request): Json<WithdrawalDecisionRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: IntentPublisher + 'static,
{
    let id = ApplicationId(application_id);
    match service.decide_withdrawal(&id, &request.actor, &request.decision) {
        Ok(application) => (StatusCode::OK, Json(application.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) fn error_status(error: &ApplicationServiceError) -> StatusCode {
    match error {
        ApplicationServiceError::Terms(_)
        | ApplicationServiceError::Lifecycle(LifecycleError::Terms(_))
        | ApplicationServiceError::Lifecycle(LifecycleError::MissingReason { .. })
        | ApplicationServiceError::Lifecycle(LifecycleError::UnchangedPrincipal(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ApplicationServiceError::Lifecycle(LifecycleError::Unauthorized { .. }) => {
            StatusCode::FORBIDDEN
        }
        ApplicationServiceError::Lifecycle(_) => StatusCode::CONFLICT,
        ApplicationServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ApplicationServiceError::Repository(RepositoryError::Conflict { .. })
        | ApplicationServiceError::Repository(RepositoryError::Duplicate) => StatusCode::CONFLICT,
        ApplicationServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(error: ApplicationServiceError) -> Response {
    let status = error_status(&error);
    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}
