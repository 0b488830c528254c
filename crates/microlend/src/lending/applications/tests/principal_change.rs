use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::common::*;
use crate::lending::applications::domain::ApplicationStatus;
use crate::lending::applications::lifecycle::{IntentKind, LifecycleError, PendingAction};
use crate::lending::applications::principal_change::{propose, respond, PrincipalChangeDecision};
use crate::lending::terms::{MergeStrategy, RangeError, ReloanError};

#[test]
fn proposal_is_recorded_and_awaits_the_borrower() {
    let engine = engine();
    let mut application = with_status(ApplicationStatus::Pending);

    let intents = propose(&engine, &mut application, &officer(), dec!(30000), at()).expect("proposed");

    assert!(application.pending_principal_change);
    assert_eq!(application.requested_principal, Some(dec!(30000)));
    assert_eq!(application.principal_change_requested_by, Some(officer().id));
    assert_eq!(application.principal_change_requested_at, Some(at()));
    assert_eq!(application.app_loan_amount, dec!(20000));

    assert_eq!(intents.len(), 1);
    assert_eq!(intents[0].kind, IntentKind::PrincipalChangeAwaitingBorrower);
    assert_eq!(detail_amount(&intents[0], "requested_principal"), Some(dec!(30000)));
}

#[test]
fn approval_reprices_every_financial_field() {
    let engine = engine();
    let mut application = with_status(ApplicationStatus::Pending);
    propose(&engine, &mut application, &officer(), dec!(30000), at()).expect("proposed");

    let intents = respond(&engine, &mut application, &borrower(), PrincipalChangeDecision::Approve, at())
        .expect("approved");

    assert!(!application.pending_principal_change);
    assert_eq!(application.requested_principal, None);
    assert_eq!(application.app_loan_amount, dec!(30000));
    assert_eq!(application.app_interest_rate, dec!(7));
    assert_eq!(application.app_loan_terms, Some(8));
    assert_eq!(application.app_total_payable, Some(dec!(46800)));
    assert_eq!(application.app_monthly_due, Some(dec!(5850)));
    assert_eq!(application.app_service_charge, dec!(1000));
    assert_eq!(application.net_proceeds, dec!(29000));
    assert_eq!(application.status, ApplicationStatus::Pending);
    assert_eq!(
        intents[0].details.get("event").map(String::as_str),
        Some("principal_change_approved")
    );
}

#[test]
fn approval_moves_into_a_new_bracket() {
    let engine = engine();
    let mut application = with_status(ApplicationStatus::Pending);
    propose(&engine, &mut application, &manager(), dec!(120000), at()).expect("proposed");
    respond(&engine, &mut application, &borrower(), PrincipalChangeDecision::Approve, at()).expect("approved");

    assert_eq!(application.app_loan_terms, Some(18));
    assert_eq!(application.app_interest_rate, dec!(4));
    assert_eq!(application.app_total_payable, Some(dec!(206400)));
}

#[test]
fn rejection_keeps_current_terms() {
    let engine = engine();
    let mut application = with_status(ApplicationStatus::Pending);
    let original = application.clone();
    propose(&engine, &mut application, &officer(), dec!(30000), at()).expect("proposed");

    respond(&engine, &mut application, &borrower(), PrincipalChangeDecision::Reject, at()).expect("rejected");

    assert!(!application.pending_principal_change);
    assert_eq!(application.requested_principal, None);
    assert_eq!(application.app_loan_amount, original.app_loan_amount);
    assert_eq!(application.app_total_payable, original.app_total_payable);
    assert_eq!(application.net_proceeds, original.net_proceeds);
    assert_eq!(application.principal_change_requested_by, Some(officer().id));
}

#[test]
fn second_proposal_conflicts_with_the_first() {
    let engine = engine();
    let mut application = with_status(ApplicationStatus::Pending);
    propose(&engine, &mut application, &officer(), dec!(30000), at()).expect("proposed");

    assert_eq!(
        propose(&engine, &mut application, &manager(), dec!(40000), at()),
        Err(LifecycleError::ConflictingPendingAction {
            pending: PendingAction::PrincipalChange,
            action: "propose a principal change",
        })
    );
    assert_eq!(application.requested_principal, Some(dec!(30000)));
}

#[test]
fn proposal_outside_review_is_refused() {
    let engine = engine();
    for status in [ApplicationStatus::Applied, ApplicationStatus::Cleared, ApplicationStatus::Denied] {
        let mut application = with_status(status);
        assert!(matches!(
            propose(&engine, &mut application, &officer(), dec!(30000), at()),
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }
}

#[test]
fn borrowers_cannot_propose() {
    let engine = engine();
    let mut application = with_status(ApplicationStatus::Pending);
    assert!(matches!(
        propose(&engine, &mut application, &borrower(), dec!(30000), at()),
        Err(LifecycleError::Unauthorized { .. })
    ));
}

#[test]
fn unchanged_principal_is_refused() {
    let engine = engine();
    let mut application = with_status(ApplicationStatus::Pending);
    assert_eq!(
        propose(&engine, &mut application, &officer(), dec!(20000), at()),
        Err(LifecycleError::UnchangedPrincipal(dec!(20000)))
    );
}

#[test]
fn out_of_range_principal_never_reaches_the_borrower() {
    let engine = engine();
    let mut application = with_status(ApplicationStatus::Pending);

    match propose(&engine, &mut application, &officer(), dec!(900000), at()) {
        Err(LifecycleError::Terms(ReloanError::OutOfRange(RangeError::AboveMaximum { maximum, .. }))) => {
            assert_eq!(maximum, dec!(500000))
        }
        other => panic!("expected range error, got {other:?}"),
    }
    assert!(!application.pending_principal_change);
}

#[test]
fn only_the_applicant_may_respond() {
    let engine = engine();
    let mut application = with_status(ApplicationStatus::Pending);
    propose(&engine, &mut application, &officer(), dec!(30000), at()).expect("proposed");

    for actor in [other_borrower(), officer()] {
        assert!(matches!(
            respond(&engine, &mut application, &actor, PrincipalChangeDecision::Approve, at()),
            Err(LifecycleError::Unauthorized { .. })
        ));
    }
    assert!(application.pending_principal_change);
}

#[test]
fn responding_without_a_proposal_is_refused() {
    let engine = engine();
    let mut application = with_status(ApplicationStatus::Pending);
    assert_eq!(
        respond(&engine, &mut application, &borrower(), PrincipalChangeDecision::Approve, at()),
        Err(LifecycleError::NothingPending(PendingAction::PrincipalChange))
    );
}

#[test]
fn responding_after_a_terminal_status_is_refused() {
    let engine = engine();
    let mut application = with_status(ApplicationStatus::Pending);
    propose(&engine, &mut application, &officer(), dec!(30000), at()).expect("proposed");
    application.status = ApplicationStatus::Withdrawn;

    assert!(matches!(
        respond(&engine, &mut application, &borrower(), PrincipalChangeDecision::Approve, at()),
        Err(LifecycleError::InvalidTransition {
            from: ApplicationStatus::Withdrawn,
            ..
        })
    ));
    assert_eq!(application.app_loan_amount, dec!(20000));
}

#[test]
fn rollover_is_kept_when_the_principal_changes() {
    let engine = engine();
    let mut application = application_for(&reloan_form(dec!(20000), dec!(15000), MergeStrategy::AddToPrincipal));
    application.status = ApplicationStatus::Pending;
    assert_eq!(application.app_loan_amount, dec!(35000));

    propose(&engine, &mut application, &officer(), dec!(50000), at()).expect("proposed");
    respond(&engine, &mut application, &borrower(), PrincipalChangeDecision::Approve, at()).expect("approved");

    assert_eq!(application.app_loan_amount, dec!(50000));
    assert_eq!(application.requested_amount, dec!(35000));
    assert_eq!(application.app_loan_terms, Some(10));
    assert_eq!(application.app_total_payable, Some(dec!(75000)));
    assert_eq!(application.app_service_charge, dec!(1500));
    assert_eq!(application.net_proceeds, dec!(33500));
    let reloan = application.reloan.expect("rollover kept");
    assert_eq!(reloan.remaining_balance, dec!(15000));
    assert_eq!(reloan.merge_strategy, MergeStrategy::AddToPrincipal);
}

#[test]
fn non_positive_principal_is_refused_before_repricing() {
    let engine = engine();
    let mut application = application_for(&reloan_form(dec!(20000), dec!(15000), MergeStrategy::AddToPrincipal));
    application.status = ApplicationStatus::Pending;

    for principal in [Decimal::MIN, dec!(0), dec!(-1)] {
        assert_eq!(
            propose(&engine, &mut application, &officer(), principal, at()),
            Err(LifecycleError::Terms(ReloanError::OutOfRange(RangeError::NonPositiveAmount(principal))))
        );
    }
    assert!(!application.pending_principal_change);
    assert_eq!(application.app_loan_amount, dec!(35000));
}

#[test]
fn principal_below_the_rollover_leaves_no_new_credit() {
    let engine = engine();
    let mut application = application_for(&reloan_form(dec!(20000), dec!(15000), MergeStrategy::AddToPrincipal));
    application.status = ApplicationStatus::Pending;

    assert!(matches!(
        propose(&engine, &mut application, &officer(), dec!(10000), at()),
        Err(LifecycleError::Terms(ReloanError::OutOfRange(RangeError::NonPositiveAmount(_))))
    ));
}
