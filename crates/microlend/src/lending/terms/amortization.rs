use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::catalog::{Bracket, LoanCategory};
use super::charges::service_charge;

/// Pricing derived from a resolved bracket and the principal it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanQuote {
    pub requested_amount: Decimal,
    pub category: LoanCategory,
    pub bracket: Bracket,
    pub service_charge: Decimal,
    pub interest_rate_percent: Decimal,
    /// Flat interest for a single month.
    pub interest_amount: Decimal,
    pub repayment: RepaymentTerms,
}

/// Open-term loans have no schedule, so there is nothing to total or divide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepaymentTerms {
    Fixed(FixedTerms),
    OpenTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedTerms {
    pub term_months: u32,
    pub total_interest_amount: Decimal,
    pub total_payable: Decimal,
    pub monthly_due: Decimal,
}

impl LoanQuote {
    pub fn fixed_terms(&self) -> Option<&FixedTerms> {
        match &self.repayment {
            RepaymentTerms::Fixed(terms) => Some(terms),
            RepaymentTerms::OpenTerm => None,
        }
    }

    pub fn term_months(&self) -> Option<u32> {
        self.fixed_terms().map(|terms| terms.term_months)
    }

    pub fn total_payable(&self) -> Option<Decimal> {
        self.fixed_terms().map(|terms| terms.total_payable)
    }

    /// Two-decimal rendering for borrower-facing surfaces.
    pub fn rounded(&self) -> QuoteView {
        let fixed = self.fixed_terms();
        QuoteView {
            category: self.category.label(),
            requested_amount: round_money(self.requested_amount),
            bracket_min_amount: self.bracket.min_amount,
            interest_rate_percent: self.interest_rate_percent,
            service_charge: round_money(self.service_charge),
            interest_amount: round_money(self.interest_amount),
            term_months: fixed.map(|terms| terms.term_months),
            total_interest_amount: fixed.map(|terms| round_money(terms.total_interest_amount)),
            total_payable: fixed.map(|terms| round_money(terms.total_payable)),
            monthly_due: fixed.map(|terms| round_money(terms.monthly_due)),
        }
    }
}

/// Flat rate times term; a bracket without a term produces an open-term quote.
pub fn amortize(category: LoanCategory, bracket: Bracket, principal: Decimal) -> LoanQuote {
    let interest_amount = principal * (bracket.interest_rate_percent / dec!(100));

    let repayment = match bracket.term_months {
        Some(months) if months > 0 => {
            let months_dec = Decimal::from(months);
            let total_interest_amount = interest_amount * months_dec;
            let total_payable = principal + total_interest_amount;
            RepaymentTerms::Fixed(FixedTerms {
                term_months: months,
                total_interest_amount,
                total_payable,
                monthly_due: total_payable / months_dec,
            })
        }
        _ => RepaymentTerms::OpenTerm,
    };

    LoanQuote {
        requested_amount: principal,
        category,
        bracket,
        service_charge: service_charge(principal),
        interest_rate_percent: bracket.interest_rate_percent,
        interest_amount,
        repayment,
    }
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Presentation shape of a quote with amounts rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteView {
    pub category: &'static str,
    pub requested_amount: Decimal,
    pub bracket_min_amount: Decimal,
    pub interest_rate_percent: Decimal,
    pub service_charge: Decimal,
    pub interest_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_months: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_interest_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_payable: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_due: Option<Decimal>,
}
