use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::lending::terms::{round_money, FinalTerms, LoanCategory, MergeStrategy, ReloanContext};

/// Identifier wrapper for submitted loan applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier of whoever is acting on an application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Borrower,
    LoanOfficer,
    Manager,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Borrower => "borrower",
            Role::LoanOfficer => "loan_officer",
            Role::Manager => "manager",
        }
    }

    pub const fn is_staff(self) -> bool {
        matches!(self, Role::LoanOfficer | Role::Manager)
    }
}

/// Caller-supplied identity; the core checks capability, never authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: ActorId(id.into()),
            role,
        }
    }
}

/// Status tracked through review, approval and release of funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Pending,
    Cleared,
    Approved,
    Disbursed,
    Denied,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Cleared => "cleared",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Disbursed => "disbursed",
            ApplicationStatus::Denied => "denied",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Disbursed | ApplicationStatus::Denied | ApplicationStatus::Withdrawn
        )
    }

    pub const fn all() -> [ApplicationStatus; 7] {
        [
            ApplicationStatus::Applied,
            ApplicationStatus::Pending,
            ApplicationStatus::Cleared,
            ApplicationStatus::Approved,
            ApplicationStatus::Disbursed,
            ApplicationStatus::Denied,
            ApplicationStatus::Withdrawn,
        ]
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Closed list of reasons a borrower may give when withdrawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalReason {
    FoundOtherLender,
    NoLongerNeeded,
    AmountInsufficient,
    TermsUnacceptable,
    ProcessingTooLong,
    PersonalReasons,
}

impl WithdrawalReason {
    pub const fn label(self) -> &'static str {
        match self {
            WithdrawalReason::FoundOtherLender => "found another lender",
            WithdrawalReason::NoLongerNeeded => "loan no longer needed",
            WithdrawalReason::AmountInsufficient => "approved amount is insufficient",
            WithdrawalReason::TermsUnacceptable => "terms are unacceptable",
            WithdrawalReason::ProcessingTooLong => "processing is taking too long",
            WithdrawalReason::PersonalReasons => "personal reasons",
        }
    }
}

/// What a borrower fills in on the application form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationForm {
    pub category: LoanCategory,
    pub requested_amount: Decimal,
    #[serde(default)]
    pub reloan: Option<ReloanContext>,
}

/// Rollover recorded on the application after submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloanSnapshot {
    pub remaining_balance: Decimal,
    pub merge_strategy: MergeStrategy,
    pub balance_deduction: Decimal,
}

impl ReloanSnapshot {
    pub fn context(&self) -> ReloanContext {
        ReloanContext {
            remaining_balance: self.remaining_balance,
            merge_strategy: self.merge_strategy,
        }
    }
}

/// One entry of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: Option<ApplicationStatus>,
    pub to: ApplicationStatus,
    pub actor: ActorId,
    pub role: Role,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Persisted loan application aggregate.
///
/// `app_loan_amount`, `app_interest_rate`, `app_loan_terms` and `app_total_payable`
/// only change together, through [`Application::apply_terms`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub borrower_id: ActorId,
    pub category: LoanCategory,
    pub status: ApplicationStatus,
    /// New credit the borrower asked for, excluding any rolled-over balance.
    pub requested_amount: Decimal,
    pub app_loan_amount: Decimal,
    pub app_interest_rate: Decimal,
    pub app_loan_terms: Option<u32>,
    pub app_total_payable: Option<Decimal>,
    pub app_monthly_due: Option<Decimal>,
    pub app_service_charge: Decimal,
    pub net_proceeds: Decimal,
    pub reloan: Option<ReloanSnapshot>,
    pub pending_principal_change: bool,
    pub requested_principal: Option<Decimal>,
    pub principal_change_requested_by: Option<ActorId>,
    pub principal_change_requested_at: Option<DateTime<Utc>>,
    pub pending_withdrawal_request: bool,
    pub withdrawal_reason: Option<WithdrawalReason>,
    pub withdrawal_denial_reason: Option<String>,
    pub denial_reason: Option<String>,
    /// Optimistic concurrency token checked by the repository on save.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<StatusChange>,
}

impl Application {
    pub fn new(
        id: ApplicationId,
        borrower: &Actor,
        category: LoanCategory,
        terms: &FinalTerms,
        at: DateTime<Utc>,
    ) -> Self {
        let mut application = Self {
            id,
            borrower_id: borrower.id.clone(),
            category,
            status: ApplicationStatus::Applied,
            requested_amount: Decimal::ZERO,
            app_loan_amount: Decimal::ZERO,
            app_interest_rate: Decimal::ZERO,
            app_loan_terms: None,
            app_total_payable: None,
            app_monthly_due: None,
            app_service_charge: Decimal::ZERO,
            net_proceeds: Decimal::ZERO,
            reloan: None,
            pending_principal_change: false,
            requested_principal: None,
            principal_change_requested_by: None,
            principal_change_requested_at: None,
            pending_withdrawal_request: false,
            withdrawal_reason: None,
            withdrawal_denial_reason: None,
            denial_reason: None,
            revision: 0,
            created_at: at,
            updated_at: at,
            history: vec![StatusChange {
                from: None,
                to: ApplicationStatus::Applied,
                actor: borrower.id.clone(),
                role: borrower.role,
                at,
                note: None,
            }],
        };
        application.apply_terms(terms);
        application
    }

    /// Overwrite every financial field from freshly settled terms.
    pub fn apply_terms(&mut self, terms: &FinalTerms) {
        let quote = &terms.quote;
        self.requested_amount = terms.requested_amount;
        self.app_loan_amount = terms.principal;
        self.app_interest_rate = quote.interest_rate_percent;
        self.app_loan_terms = quote.term_months();
        self.app_total_payable = quote.total_payable();
        self.app_monthly_due = quote.fixed_terms().map(|fixed| fixed.monthly_due);
        self.app_service_charge = quote.service_charge;
        self.net_proceeds = terms.net_proceeds;
        self.reloan = terms.strategy.map(|merge_strategy| ReloanSnapshot {
            remaining_balance: terms.remaining_balance,
            merge_strategy,
            balance_deduction: terms.balance_deduction,
        });
    }

    pub fn reloan_context(&self) -> Option<ReloanContext> {
        self.reloan.as_ref().map(ReloanSnapshot::context)
    }

    pub fn has_pending_action(&self) -> bool {
        self.pending_principal_change || self.pending_withdrawal_request
    }

    pub(crate) fn record_status(
        &mut self,
        to: ApplicationStatus,
        actor: &Actor,
        at: DateTime<Utc>,
        note: Option<String>,
    ) {
        self.history.push(StatusChange {
            from: Some(self.status),
            to,
            actor: actor.id.clone(),
            role: actor.role,
            at,
            note,
        });
        self.status = to;
        self.updated_at = at;
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id.clone(),
            status: self.status.label(),
            category: self.category.label(),
            loan_amount: round_money(self.app_loan_amount),
            interest_rate_percent: self.app_interest_rate,
            term_months: self.app_loan_terms,
            total_payable: self.app_total_payable.map(round_money),
            monthly_due: self.app_monthly_due.map(round_money),
            service_charge: round_money(self.app_service_charge),
            net_proceeds: round_money(self.net_proceeds),
            pending_principal_change: self.pending_principal_change,
            requested_principal: self.requested_principal.map(round_money),
            pending_withdrawal_request: self.pending_withdrawal_request,
            withdrawal_reason: self.withdrawal_reason.map(WithdrawalReason::label),
            denial_reason: self.denial_reason.clone(),
            revision: self.revision,
        }
    }
}

/// Borrower- and staff-facing snapshot with money rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub category: &'static str,
    pub loan_amount: Decimal,
    pub interest_rate_percent: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_months: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_payable: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_due: Option<Decimal>,
    pub service_charge: Decimal,
    pub net_proceeds: Decimal,
    pub pending_principal_change: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_principal: Option<Decimal>,
    pub pending_withdrawal_request: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawal_reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denial_reason: Option<String>,
    pub revision: u64,
}
