use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Actor, Application, ApplicationId, ApplicationStatus, Role};
use crate::lending::terms::{round_money, ReloanError};

/// Status-changing actions staff take on an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    ScheduleInterview,
    Clear,
    Approve,
    Disburse,
    Deny,
}

impl LifecycleAction {
    pub const fn label(self) -> &'static str {
        match self {
            LifecycleAction::ScheduleInterview => "schedule an interview for",
            LifecycleAction::Clear => "clear",
            LifecycleAction::Approve => "approve",
            LifecycleAction::Disburse => "disburse",
            LifecycleAction::Deny => "deny",
        }
    }

    pub const fn all() -> [LifecycleAction; 5] {
        [
            LifecycleAction::ScheduleInterview,
            LifecycleAction::Clear,
            LifecycleAction::Approve,
            LifecycleAction::Disburse,
            LifecycleAction::Deny,
        ]
    }

    /// Status the action requires and the one it moves to. `None` means any
    /// non-terminal status is accepted.
    const fn edge(self) -> (Option<ApplicationStatus>, ApplicationStatus) {
        match self {
            LifecycleAction::ScheduleInterview => {
                (Some(ApplicationStatus::Applied), ApplicationStatus::Pending)
            }
            LifecycleAction::Clear => (Some(ApplicationStatus::Pending), ApplicationStatus::Cleared),
            LifecycleAction::Approve => {
                (Some(ApplicationStatus::Cleared), ApplicationStatus::Approved)
            }
            LifecycleAction::Disburse => {
                (Some(ApplicationStatus::Approved), ApplicationStatus::Disbursed)
            }
            LifecycleAction::Deny => (None, ApplicationStatus::Denied),
        }
    }

    pub const fn permits(self, role: Role) -> bool {
        match self {
            LifecycleAction::Approve => matches!(role, Role::Manager),
            LifecycleAction::ScheduleInterview
            | LifecycleAction::Clear
            | LifecycleAction::Disburse
            | LifecycleAction::Deny => role.is_staff(),
        }
    }
}

/// Sub-workflow that can hold an application open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAction {
    PrincipalChange,
    Withdrawal,
}

impl PendingAction {
    pub const fn label(self) -> &'static str {
        match self {
            PendingAction::PrincipalChange => "principal change",
            PendingAction::Withdrawal => "withdrawal request",
        }
    }
}

/// Rejections raised by lifecycle transitions and sub-workflows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("cannot {action} an application that is {from}")]
    InvalidTransition {
        from: ApplicationStatus,
        action: &'static str,
    },
    #[error("cannot {action} while a {} is pending", .pending.label())]
    ConflictingPendingAction {
        pending: PendingAction,
        action: &'static str,
    },
    #[error("there is no pending {} to decide", .0.label())]
    NothingPending(PendingAction),
    #[error("a {} may not {action}", .role.label())]
    Unauthorized { role: Role, action: &'static str },
    #[error("a reason is required to {action}")]
    MissingReason { action: &'static str },
    #[error("requested principal {0} matches the current loan amount")]
    UnchangedPrincipal(rust_decimal::Decimal),
    #[error(transparent)]
    Terms(#[from] ReloanError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    ScheduleInterview,
    PrincipalChangeAwaitingBorrower,
    WithdrawalAwaitingDecision,
    ReadyToDisburse,
    BorrowerNotice,
}

/// Work handed to an external collaborator once a transition is saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleIntent {
    pub kind: IntentKind,
    pub application_id: ApplicationId,
    pub details: BTreeMap<String, String>,
}

impl LifecycleIntent {
    pub(crate) fn new(kind: IntentKind, application_id: &ApplicationId) -> Self {
        Self {
            kind,
            application_id: application_id.clone(),
            details: BTreeMap::new(),
        }
    }

    pub(crate) fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Move an application along the happy path, or deny it.
///
/// Leaves `application` untouched on error.
pub fn transition(
    application: &mut Application,
    actor: &Actor,
    action: LifecycleAction,
    reason: Option<&str>,
    at: DateTime<Utc>,
) -> Result<Vec<LifecycleIntent>, LifecycleError> {
    let (required, target) = action.edge();
    let from = application.status;

    if from.is_terminal() || required.map_or(false, |required| required != from) {
        return Err(LifecycleError::InvalidTransition {
            from,
            action: action.label(),
        });
    }
    if !action.permits(actor.role) {
        return Err(LifecycleError::Unauthorized {
            role: actor.role,
            action: action.label(),
        });
    }
    if application.pending_withdrawal_request {
        return Err(LifecycleError::ConflictingPendingAction {
            pending: PendingAction::Withdrawal,
            action: action.label(),
        });
    }
    if application.pending_principal_change {
        return Err(LifecycleError::ConflictingPendingAction {
            pending: PendingAction::PrincipalChange,
            action: action.label(),
        });
    }

    let reason = reason.map(str::trim).filter(|reason| !reason.is_empty());
    if action == LifecycleAction::Deny && reason.is_none() {
        return Err(LifecycleError::MissingReason {
            action: action.label(),
        });
    }

    let id = &application.id;
    let intents = match action {
        LifecycleAction::ScheduleInterview => vec![LifecycleIntent::new(
            IntentKind::ScheduleInterview,
            id,
        )
        .with("requested_by", actor.id.0.as_str())],
        LifecycleAction::Clear => Vec::new(),
        LifecycleAction::Approve => vec![LifecycleIntent::new(IntentKind::ReadyToDisburse, id)
            .with("loan_amount", round_money(application.app_loan_amount).to_string())
            .with("net_proceeds", round_money(application.net_proceeds).to_string())],
        LifecycleAction::Disburse => vec![LifecycleIntent::new(IntentKind::BorrowerNotice, id)
            .with("event", "disbursed")
            .with("net_proceeds", round_money(application.net_proceeds).to_string())],
        LifecycleAction::Deny => vec![LifecycleIntent::new(IntentKind::BorrowerNotice, id)
            .with("event", "denied")
            .with("reason", reason.unwrap_or_default())],
    };

    if action == LifecycleAction::Deny {
        application.denial_reason = reason.map(str::to_string);
    }
    application.record_status(target, actor, at, reason.map(str::to_string));

    Ok(intents)
}
