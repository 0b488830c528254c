use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Actor, Application, ApplicationStatus, Role, WithdrawalReason};
use super::lifecycle::{IntentKind, LifecycleError, LifecycleIntent, PendingAction};

const REQUEST: &str = "request a withdrawal";
const DECIDE: &str = "decide a withdrawal request";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum WithdrawalDecision {
    Approve,
    Deny { reason: String },
}

/// Borrower asks to pull an application that has not entered review yet.
pub fn request(
    application: &mut Application,
    actor: &Actor,
    reason: WithdrawalReason,
    at: DateTime<Utc>,
) -> Result<Vec<LifecycleIntent>, LifecycleError> {
    if application.status != ApplicationStatus::Applied {
        return Err(LifecycleError::InvalidTransition {
            from: application.status,
            action: REQUEST,
        });
    }
    if actor.role != Role::Borrower || actor.id != application.borrower_id {
        return Err(LifecycleError::Unauthorized {
            role: actor.role,
            action: REQUEST,
        });
    }
    if application.pending_withdrawal_request {
        return Err(LifecycleError::ConflictingPendingAction {
            pending: PendingAction::Withdrawal,
            action: REQUEST,
        });
    }

    application.pending_withdrawal_request = true;
    application.withdrawal_reason = Some(reason);
    application.withdrawal_denial_reason = None;
    application.updated_at = at;

    Ok(vec![LifecycleIntent::new(
        IntentKind::WithdrawalAwaitingDecision,
        &application.id,
    )
    .with("reason", reason.label())])
}

/// Staff settle a pending withdrawal; denial keeps the current status.
pub fn decide(
    application: &mut Application,
    actor: &Actor,
    decision: &WithdrawalDecision,
    at: DateTime<Utc>,
) -> Result<Vec<LifecycleIntent>, LifecycleError> {
    if application.status.is_terminal() {
        return Err(LifecycleError::InvalidTransition {
            from: application.status,
            action: DECIDE,
        });
    }
    if !actor.role.is_staff() {
        return Err(LifecycleError::Unauthorized {
            role: actor.role,
            action: DECIDE,
        });
    }
    if !application.pending_withdrawal_request {
        return Err(LifecycleError::NothingPending(PendingAction::Withdrawal));
    }

    let intent = LifecycleIntent::new(IntentKind::BorrowerNotice, &application.id);
    let intent = match decision {
        WithdrawalDecision::Approve => {
            let note = application.withdrawal_reason.map(|reason| reason.label().to_string());
            application.pending_withdrawal_request = false;
            application.record_status(ApplicationStatus::Withdrawn, actor, at, note);
            intent.with("event", "withdrawn")
        }
        WithdrawalDecision::Deny { reason } => {
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(LifecycleError::MissingReason {
                    action: "deny a withdrawal request",
                });
            }
            application.pending_withdrawal_request = false;
            application.withdrawal_denial_reason = Some(reason.to_string());
            application.updated_at = at;
            intent
                .with("event", "withdrawal_denied")
                .with("reason", reason)
        }
    };

    Ok(vec![intent])
}
