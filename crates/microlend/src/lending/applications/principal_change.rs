use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{Actor, Application, ApplicationStatus, Role};
use super::lifecycle::{IntentKind, LifecycleError, LifecycleIntent, PendingAction};
use crate::lending::terms::{round_money, FinalTerms, MergeStrategy, RangeError, ReloanError, TermsEngine};

const PROPOSE: &str = "propose a principal change";
const RESPOND: &str = "respond to a principal change";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalChangeDecision {
    Approve,
    Reject,
}

/// Officer proposes a new principal while the application is under review.
///
/// The proposal is priced up front so a principal no bracket accepts never
/// reaches the borrower.
pub fn propose(
    engine: &TermsEngine,
    application: &mut Application,
    actor: &Actor,
    requested_principal: Decimal,
    at: DateTime<Utc>,
) -> Result<Vec<LifecycleIntent>, LifecycleError> {
    if application.status != ApplicationStatus::Pending {
        return Err(LifecycleError::InvalidTransition {
            from: application.status,
            action: PROPOSE,
        });
    }
    if !actor.role.is_staff() {
        return Err(LifecycleError::Unauthorized {
            role: actor.role,
            action: PROPOSE,
        });
    }
    if application.pending_principal_change {
        return Err(LifecycleError::ConflictingPendingAction {
            pending: PendingAction::PrincipalChange,
            action: PROPOSE,
        });
    }
    if application.pending_withdrawal_request {
        return Err(LifecycleError::ConflictingPendingAction {
            pending: PendingAction::Withdrawal,
            action: PROPOSE,
        });
    }
    if requested_principal <= Decimal::ZERO {
        return Err(ReloanError::from(RangeError::NonPositiveAmount(requested_principal)).into());
    }
    if requested_principal == application.app_loan_amount {
        return Err(LifecycleError::UnchangedPrincipal(requested_principal));
    }

    reprice(engine, application, requested_principal)?;

    application.pending_principal_change = true;
    application.requested_principal = Some(requested_principal);
    application.principal_change_requested_by = Some(actor.id.clone());
    application.principal_change_requested_at = Some(at);
    application.updated_at = at;

    Ok(vec![LifecycleIntent::new(
        IntentKind::PrincipalChangeAwaitingBorrower,
        &application.id,
    )
    .with("current_principal", round_money(application.app_loan_amount).to_string())
    .with("requested_principal", round_money(requested_principal).to_string())
    .with("requested_by", actor.id.0.as_str())])
}

/// Borrower accepts or turns down the outstanding proposal.
pub fn respond(
    engine: &TermsEngine,
    application: &mut Application,
    actor: &Actor,
    decision: PrincipalChangeDecision,
    at: DateTime<Utc>,
) -> Result<Vec<LifecycleIntent>, LifecycleError> {
    if application.status != ApplicationStatus::Pending {
        return Err(LifecycleError::InvalidTransition {
            from: application.status,
            action: RESPOND,
        });
    }
    if actor.role != Role::Borrower || actor.id != application.borrower_id {
        return Err(LifecycleError::Unauthorized {
            role: actor.role,
            action: RESPOND,
        });
    }
    let requested_principal = match (application.pending_principal_change, application.requested_principal) {
        (true, Some(principal)) => principal,
        _ => return Err(LifecycleError::NothingPending(PendingAction::PrincipalChange)),
    };

    let event = match decision {
        PrincipalChangeDecision::Approve => {
            let terms = reprice(engine, application, requested_principal)?;
            application.apply_terms(&terms);
            "principal_change_approved"
        }
        PrincipalChangeDecision::Reject => "principal_change_rejected",
    };

    application.pending_principal_change = false;
    application.requested_principal = None;
    application.updated_at = at;

    Ok(vec![LifecycleIntent::new(IntentKind::BorrowerNotice, &application.id)
        .with("event", event)
        .with("loan_amount", round_money(application.app_loan_amount).to_string())])
}

/// Settle terms for a new total principal, keeping any rollover in place.
fn reprice(
    engine: &TermsEngine,
    application: &Application,
    principal: Decimal,
) -> Result<FinalTerms, LifecycleError> {
    let reloan = application.reloan_context();
    let requested = match reloan {
        Some(context) if context.merge_strategy == MergeStrategy::AddToPrincipal => principal
            .checked_sub(context.remaining_balance)
            .ok_or(ReloanError::AmountOverflow {
                requested: principal,
                remaining_balance: context.remaining_balance,
            })?,
        _ => principal,
    };
    Ok(engine.final_terms(application.category, requested, reloan.as_ref())?)
}
