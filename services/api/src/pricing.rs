use crate::infra::load_engine;
use clap::Args;
use microlend::error::AppError;
use microlend::lending::applications::TermsView;
use microlend::lending::terms::{
    round_money, BracketCatalog, FinalTerms, LoanCategory, MergeStrategy, ReloanContext,
    ServiceChargeTier, TermsEngine,
};
use rust_decimal::Decimal;
use std::fmt::Write;

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Loan category (with_collateral, without_collateral, open_term)
    #[arg(long)]
    pub(crate) category: LoanCategory,
    /// New credit requested, excluding any rolled-over balance
    #[arg(long)]
    pub(crate) amount: Decimal,
    /// Outstanding balance of the loan being restructured
    #[arg(long, requires = "strategy")]
    pub(crate) remaining_balance: Option<Decimal>,
    /// How the outstanding balance is merged (add_to_principal, deduct_from_receivable)
    #[arg(long, requires = "remaining_balance")]
    pub(crate) strategy: Option<MergeStrategy>,
    /// Print the settled terms as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Print the catalog as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let engine = load_engine()?;
    let terms = quote_terms(&engine, &args)?;

    if args.json {
        match serde_json::to_string_pretty(&TermsView::from(&terms)) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("Quote payload unavailable: {err}"),
        }
    } else {
        print!("{}", render_terms(&terms));
    }
    Ok(())
}

/// Settle the terms the arguments describe; a refused quote is an error.
pub(crate) fn quote_terms(engine: &TermsEngine, args: &QuoteArgs) -> Result<FinalTerms, AppError> {
    let reloan = match (args.remaining_balance, args.strategy) {
        (Some(remaining_balance), Some(merge_strategy)) => Some(ReloanContext {
            remaining_balance,
            merge_strategy,
        }),
        _ => None,
    };

    Ok(engine.final_terms(args.category, args.amount, reloan.as_ref())?)
}

pub(crate) fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let engine = load_engine()?;
    if args.json {
        match serde_json::to_string_pretty(engine.catalog()) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("Catalog payload unavailable: {err}"),
        }
    } else {
        print!("{}", render_catalog(engine.catalog()));
    }
    Ok(())
}

pub(crate) fn render_terms(terms: &FinalTerms) -> String {
    let view = TermsView::from(terms);
    let quote = &view.quote;
    let mut out = String::new();

    let _ = writeln!(out, "Loan quote ({})", quote.category);
    let _ = writeln!(out, "- Requested amount: {}", view.requested_amount);
    if let Some(strategy) = view.merge_strategy {
        let _ = writeln!(
            out,
            "- Rollover: {} of {} outstanding",
            strategy,
            round_money(terms.remaining_balance)
        );
    }
    let _ = writeln!(out, "- Principal: {}", view.principal);
    let _ = writeln!(
        out,
        "- Bracket from {} at {}% per month",
        quote.bracket_min_amount, quote.interest_rate_percent
    );
    let _ = writeln!(out, "- Monthly interest: {}", quote.interest_amount);
    match (quote.term_months, quote.total_payable, quote.monthly_due) {
        (Some(months), Some(total), Some(monthly)) => {
            let _ = writeln!(out, "- Term: {months} months");
            let _ = writeln!(out, "- Total payable: {total}");
            let _ = writeln!(out, "- Monthly due: {monthly}");
        }
        _ => {
            let _ = writeln!(out, "- Term: open, interest accrues until settled");
        }
    }
    let tier = match ServiceChargeTier::for_amount(terms.principal) {
        ServiceChargeTier::Percent(rate) => format!("{rate}% of principal"),
        ServiceChargeTier::Flat(_) => "flat fee".to_string(),
        ServiceChargeTier::Undefined => "no tier applies".to_string(),
    };
    let _ = writeln!(out, "- Service charge: {} ({tier})", quote.service_charge);
    if view.balance_deduction > Decimal::ZERO {
        let _ = writeln!(out, "- Balance withheld: {}", view.balance_deduction);
    }
    let _ = writeln!(out, "- Net proceeds: {}", view.net_proceeds);
    out
}

pub(crate) fn render_catalog(catalog: &BracketCatalog) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Bracket catalog {}", catalog.version);
    for category in LoanCategory::all() {
        let _ = writeln!(out, "{}:", category.label());
        for bracket in catalog.brackets(category) {
            let term = bracket
                .term_months
                .map(|months| format!("{months} months"))
                .unwrap_or_else(|| "open term".to_string());
            let _ = writeln!(
                out,
                "  from {:>9} | {:<10} | {}% per month",
                bracket.min_amount, term, bracket.interest_rate_percent
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use microlend::lending::terms::{RangeError, ReloanError};
    use rust_decimal_macros::dec;

    fn quote_args(amount: Decimal) -> QuoteArgs {
        QuoteArgs {
            category: LoanCategory::WithoutCollateral,
            amount,
            remaining_balance: None,
            strategy: None,
            json: false,
        }
    }

    #[test]
    fn refused_quote_is_reported_as_an_error() {
        let err = quote_terms(&TermsEngine::default(), &quote_args(dec!(35000))).expect_err("above range");
        assert!(matches!(
            err,
            AppError::Quote(ReloanError::OutOfRange(RangeError::AboveMaximum { .. }))
        ));

        let terms = quote_terms(&TermsEngine::default(), &quote_args(dec!(20000))).expect("in range");
        assert_eq!(terms.principal, dec!(20000));
    }

    #[test]
    fn rollover_balance_rounds_half_away_from_zero() {
        let context = ReloanContext {
            remaining_balance: dec!(5000.125),
            merge_strategy: MergeStrategy::DeductFromReceivable,
        };
        let terms = TermsEngine::default()
            .final_terms(LoanCategory::OpenTerm, dec!(8000), Some(&context))
            .expect("in range");
        let rendered = render_terms(&terms);

        assert!(rendered.contains("of 5000.13 outstanding"));
    }

    #[test]
    fn fixed_term_quote_lists_schedule() {
        let terms = TermsEngine::default()
            .final_terms(LoanCategory::WithCollateral, dec!(20000), None)
            .expect("in range");
        let rendered = render_terms(&terms);

        assert!(rendered.contains("- Term: 8 months"));
        assert!(rendered.contains("- Total payable: 31200"));
        assert!(rendered.contains("- Monthly due: 3900"));
        assert!(rendered.contains("(5% of principal)"));
        assert!(!rendered.contains("Rollover"));
    }

    #[test]
    fn deduction_is_shown_for_rollovers() {
        let context = ReloanContext {
            remaining_balance: dec!(5000),
            merge_strategy: MergeStrategy::DeductFromReceivable,
        };
        let terms = TermsEngine::default()
            .final_terms(LoanCategory::OpenTerm, dec!(8000), Some(&context))
            .expect("in range");
        let rendered = render_terms(&terms);

        assert!(rendered.contains("Rollover: deduct_from_receivable"));
        assert!(rendered.contains("- Balance withheld: 5000"));
        assert!(rendered.contains("- Net proceeds: 2600"));
        assert!(rendered.contains("open, interest accrues"));
    }

    #[test]
    fn catalog_lists_every_category() {
        let rendered = render_catalog(&BracketCatalog::standard());
        assert!(rendered.starts_with("Bracket catalog 2024.1"));
        assert!(rendered.contains("with_collateral:"));
        assert!(rendered.contains("without_collateral:"));
        assert!(rendered.contains("open_term:"));
        assert!(rendered.contains("open term"));
    }
}
