use crate::infra::{load_engine, InMemoryApplicationRepository, InMemoryIntentPublisher};
use crate::pricing::render_terms;
use clap::Args;
use microlend::error::AppError;
use microlend::lending::applications::{
    Actor, Application, ApplicationForm, ApplicationRepository, ApplicationServiceError,
    LoanApplicationService, PrincipalChangeDecision, Role, WithdrawalDecision, WithdrawalReason,
};
use microlend::lending::terms::{LoanCategory, MergeStrategy, ReloanContext};
use rust_decimal::Decimal;
use std::sync::Arc;

type DemoService = LoanApplicationService<InMemoryApplicationRepository, InMemoryIntentPublisher>;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Loan category for the sample application
    #[arg(long, default_value = "with_collateral")]
    pub(crate) category: LoanCategory,
    /// Amount the sample borrower requests
    #[arg(long, default_value = "20000")]
    pub(crate) amount: Decimal,
    /// Roll over an outstanding balance into the sample application
    #[arg(long, requires = "strategy")]
    pub(crate) remaining_balance: Option<Decimal>,
    /// Merge strategy for the rolled-over balance
    #[arg(long, requires = "remaining_balance")]
    pub(crate) strategy: Option<MergeStrategy>,
    /// Principal the officer proposes during review
    #[arg(long)]
    pub(crate) proposed_principal: Option<Decimal>,
    /// Skip the withdrawal portion of the demo.
    #[arg(long)]
    pub(crate) skip_withdrawal: bool,
}

fn borrower() -> Actor {
    Actor::new("borrower-demo", Role::Borrower)
}

fn officer() -> Actor {
    Actor::new("officer-demo", Role::LoanOfficer)
}

fn manager() -> Actor {
    Actor::new("manager-demo", Role::Manager)
}

/// Print the outcome of a step; `None` ends the walkthrough.
fn step(label: &str, result: Result<Application, ApplicationServiceError>) -> Option<Application> {
    match result {
        Ok(application) => {
            println!(
                "- {label}: {} is {} (revision {})",
                application.id.0,
                application.status,
                application.revision
            );
            Some(application)
        }
        Err(err) => {
            println!("- {label}: refused ({err})");
            None
        }
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let engine = Arc::new(load_engine()?);
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let intents = Arc::new(InMemoryIntentPublisher::default());
    let service = LoanApplicationService::new(repository.clone(), intents.clone(), engine);

    let form = ApplicationForm {
        category: args.category,
        requested_amount: args.amount,
        reloan: match (args.remaining_balance, args.strategy) {
            (Some(remaining_balance), Some(merge_strategy)) => Some(ReloanContext {
                remaining_balance,
                merge_strategy,
            }),
            _ => None,
        },
    };

    println!("Micro-lending lifecycle demo");
    match service.quote(&form) {
        Ok(terms) => print!("{}", render_terms(&terms)),
        Err(err) => {
            println!("Quote unavailable: {err}");
            return Ok(());
        }
    }

    println!("\nApplication review");
    if run_review(&service, form, args.proposed_principal).is_none() {
        return Ok(());
    }

    if !args.skip_withdrawal {
        println!("\nWithdrawal before review");
        run_withdrawal(&service, args.category);
    }

    println!("\nApplications on file");
    match repository.list(None) {
        Ok(applications) => {
            for application in applications {
                let view = application.status_view();
                println!(
                    "- {} | {} | {} | net proceeds {}",
                    view.application_id.0, view.status, view.loan_amount, view.net_proceeds
                );
            }
        }
        Err(err) => println!("- repository unavailable: {err}"),
    }

    let events = intents.events();
    if events.is_empty() {
        println!("\nLifecycle intents: none dispatched");
    } else {
        println!("\nLifecycle intents");
        for (queued_at, intent) in events {
            let details: Vec<String> = intent
                .details
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            println!(
                "- {} {:?} -> {} [{}]",
                queued_at.format("%H:%M:%S"),
                intent.kind,
                intent.application_id.0,
                details.join(", ")
            );
        }
    }

    Ok(())
}

fn run_review(
    service: &DemoService,
    form: ApplicationForm,
    proposed_principal: Option<Decimal>,
) -> Option<Application> {
    let submitted = step("Submitted", service.submit(&borrower(), form))?;
    let id = submitted.id;

    step("Interview scheduled", service.schedule_interview(&id, &officer()))?;

    if let Some(principal) = proposed_principal {
        step(
            "Principal change proposed",
            service.propose_principal_change(&id, &officer(), principal),
        )?;
        let accepted = step(
            "Borrower accepted",
            service.respond_to_principal_change(&id, &borrower(), PrincipalChangeDecision::Approve),
        )?;
        println!(
            "  New principal {} over {} months",
            accepted.status_view().loan_amount,
            accepted
                .app_loan_terms
                .map(|months| months.to_string())
                .unwrap_or_else(|| "open".to_string())
        );
    }

    step("Cleared", service.clear(&id, &officer()))?;
    step("Officer approval attempt", service.approve(&id, &officer()));
    step("Approved", service.approve(&id, &manager()))?;
    let disbursed = step("Disbursed", service.disburse(&id, &officer()))?;

    println!("  Audit trail:");
    for change in &disbursed.history {
        let from = change
            .from
            .map(|status| status.label())
            .unwrap_or("new");
        println!(
            "    {} {} -> {} by {} ({})",
            change.at.format("%Y-%m-%d %H:%M:%S"),
            from,
            change.to,
            change.actor.0,
            change.role.label()
        );
    }

    match serde_json::to_string_pretty(&disbursed.status_view()) {
        Ok(json) => println!("  Status payload:\n{json}"),
        Err(err) => println!("  Status payload unavailable: {err}"),
    }
    Some(disbursed)
}

fn run_withdrawal(service: &DemoService, category: LoanCategory) -> Option<Application> {
    let minimum = service
        .engine()
        .catalog()
        .range(category)
        .map(|(minimum, _)| minimum)?;
    let form = ApplicationForm {
        category,
        requested_amount: minimum,
        reloan: None,
    };

    let submitted = step("Submitted", service.submit(&borrower(), form))?;
    let id = submitted.id;
    step(
        "Withdrawal requested",
        service.request_withdrawal(&id, &borrower(), WithdrawalReason::FoundOtherLender),
    )?;
    step("Interview while withdrawal pending", service.schedule_interview(&id, &officer()));
    step(
        "Withdrawal approved",
        service.decide_withdrawal(&id, &manager(), &WithdrawalDecision::Approve),
    )
}
