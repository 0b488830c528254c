//! Loan terms resolution: bracket catalog, range checks, fees, amortization and
//! reloan balance merging.

mod amortization;
mod catalog;
mod charges;
mod reloan;
mod resolver;

pub use amortization::{amortize, round_money, FixedTerms, LoanQuote, QuoteView, RepaymentTerms};
pub use catalog::{Bracket, BracketCatalog, CatalogError, LoanCategory};
pub use charges::{service_charge, ServiceChargeTier};
pub use reloan::{
    apply_strategy, merge_options, merged_principal, FinalTerms, MergeOptions, MergeStrategy,
    ReloanContext, ReloanError,
};
pub use resolver::{resolve, RangeError};

use rust_decimal::Decimal;
use std::sync::Arc;

/// Stateless pricing façade over a shared, read-only catalog.
#[derive(Debug, Clone)]
pub struct TermsEngine {
    catalog: Arc<BracketCatalog>,
}

impl TermsEngine {
    pub fn new(catalog: Arc<BracketCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &BracketCatalog {
        &self.catalog
    }

    pub fn quote(&self, category: LoanCategory, amount: Decimal) -> Result<LoanQuote, RangeError> {
        let bracket = resolve(&self.catalog, category, amount, Decimal::ZERO)?;
        Ok(amortize(category, bracket, amount))
    }

    /// Settle terms for a form submission, with or without a rollover.
    pub fn final_terms(
        &self,
        category: LoanCategory,
        requested: Decimal,
        reloan: Option<&ReloanContext>,
    ) -> Result<FinalTerms, ReloanError> {
        match reloan {
            Some(context) => self.quote_reloan(category, requested, context),
            None => FinalTerms::fresh(self.quote(category, requested)?),
        }
    }

    pub fn quote_reloan(
        &self,
        category: LoanCategory,
        requested: Decimal,
        context: &ReloanContext,
    ) -> Result<FinalTerms, ReloanError> {
        let options = merge_options(category, context.remaining_balance, context.merge_strategy)?;
        let bracket = resolve(&self.catalog, category, requested, options.ceiling_reduction)?;
        let principal = merged_principal(context.merge_strategy, requested, context.remaining_balance)?;
        let quote = amortize(category, bracket, principal);

        apply_strategy(
            context.merge_strategy,
            requested,
            quote,
            context.remaining_balance,
        )
    }
}

impl Default for TermsEngine {
    fn default() -> Self {
        Self::new(Arc::new(BracketCatalog::standard()))
    }
}
