use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::amortization::LoanQuote;
use super::catalog::LoanCategory;
use super::resolver::RangeError;

/// How an outstanding balance is folded into a restructured loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Balance joins the new principal and accrues interest with it.
    AddToPrincipal,
    /// Balance is withheld from the cash released; principal is untouched.
    DeductFromReceivable,
}

impl MergeStrategy {
    pub const fn label(self) -> &'static str {
        match self {
            MergeStrategy::AddToPrincipal => "add_to_principal",
            MergeStrategy::DeductFromReceivable => "deduct_from_receivable",
        }
    }
}

impl std::str::FromStr for MergeStrategy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "add_to_principal" | "add" => Ok(MergeStrategy::AddToPrincipal),
            "deduct_from_receivable" | "deduct" => Ok(MergeStrategy::DeductFromReceivable),
            other => Err(format!("unknown merge strategy '{other}'")),
        }
    }
}

/// Reloan session state, chosen once per application form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloanContext {
    pub remaining_balance: Decimal,
    pub merge_strategy: MergeStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeOptions {
    pub category: LoanCategory,
    pub strategy: MergeStrategy,
    pub ceiling_reduction: Decimal,
}

/// Settled terms after a balance merge, ready to stamp onto an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalTerms {
    pub strategy: Option<MergeStrategy>,
    pub requested_amount: Decimal,
    pub remaining_balance: Decimal,
    /// Principal the quote was amortized on.
    pub principal: Decimal,
    pub quote: LoanQuote,
    pub balance_deduction: Decimal,
    pub net_proceeds: Decimal,
}

impl FinalTerms {
    /// Terms for a fresh loan with nothing rolled over.
    pub fn fresh(quote: LoanQuote) -> Result<Self, ReloanError> {
        let requested_amount = quote.requested_amount;
        let net_proceeds = requested_amount - quote.service_charge;
        if net_proceeds < Decimal::ZERO {
            return Err(ReloanError::InsufficientProceeds {
                requested: requested_amount,
                deductions: quote.service_charge,
            });
        }

        Ok(Self {
            strategy: None,
            requested_amount,
            remaining_balance: Decimal::ZERO,
            principal: requested_amount,
            quote,
            balance_deduction: Decimal::ZERO,
            net_proceeds,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReloanError {
    #[error("remaining balance {0} cannot be negative")]
    NegativeBalance(Decimal),
    #[error("{0}; choose a different merge strategy or a smaller amount")]
    OutOfRange(#[from] RangeError),
    #[error("deductions of {deductions} leave nothing to release from the requested {requested}")]
    InsufficientProceeds {
        requested: Decimal,
        deductions: Decimal,
    },
    #[error("amounts of {requested} requested against a {remaining_balance} balance cannot be settled")]
    AmountOverflow {
        requested: Decimal,
        remaining_balance: Decimal,
    },
}

/// Eligibility adjustment the resolver must apply for this strategy.
pub fn merge_options(
    category: LoanCategory,
    remaining_balance: Decimal,
    strategy: MergeStrategy,
) -> Result<MergeOptions, ReloanError> {
    if remaining_balance < Decimal::ZERO {
        return Err(ReloanError::NegativeBalance(remaining_balance));
    }

    let ceiling_reduction = match strategy {
        MergeStrategy::AddToPrincipal => remaining_balance,
        MergeStrategy::DeductFromReceivable => Decimal::ZERO,
    };

    Ok(MergeOptions {
        category,
        strategy,
        ceiling_reduction,
    })
}

/// Principal the amortization must run on for the chosen strategy.
pub fn merged_principal(
    strategy: MergeStrategy,
    requested: Decimal,
    remaining_balance: Decimal,
) -> Result<Decimal, ReloanError> {
    match strategy {
        MergeStrategy::AddToPrincipal => requested
            .checked_add(remaining_balance)
            .ok_or(ReloanError::AmountOverflow {
                requested,
                remaining_balance,
            }),
        MergeStrategy::DeductFromReceivable => Ok(requested),
    }
}

/// Combine an amortized quote with the rollover to settle the final terms.
///
/// `quote` must already be amortized on [`merged_principal`].
pub fn apply_strategy(
    strategy: MergeStrategy,
    requested: Decimal,
    quote: LoanQuote,
    remaining_balance: Decimal,
) -> Result<FinalTerms, ReloanError> {
    if remaining_balance < Decimal::ZERO {
        return Err(ReloanError::NegativeBalance(remaining_balance));
    }

    let principal = quote.requested_amount;
    let balance_deduction = match strategy {
        MergeStrategy::AddToPrincipal => Decimal::ZERO,
        MergeStrategy::DeductFromReceivable => remaining_balance,
    };

    let overflow = ReloanError::AmountOverflow {
        requested,
        remaining_balance,
    };
    let deductions = balance_deduction
        .checked_add(quote.service_charge)
        .ok_or_else(|| overflow.clone())?;
    let net_proceeds = requested.checked_sub(deductions).ok_or(overflow)?;
    if net_proceeds < Decimal::ZERO {
        return Err(ReloanError::InsufficientProceeds {
            requested,
            deductions,
        });
    }

    Ok(FinalTerms {
        strategy: Some(strategy),
        requested_amount: requested,
        remaining_balance,
        principal,
        quote,
        balance_deduction,
        net_proceeds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lending::terms::amortization::amortize;
    use crate::lending::terms::catalog::Bracket;
    use rust_decimal_macros::dec;

    #[test]
    fn add_to_principal_reduces_ceiling_by_balance() {
        let options = merge_options(LoanCategory::WithCollateral, dec!(15000), MergeStrategy::AddToPrincipal)
            .expect("valid balance");
        assert_eq!(options.ceiling_reduction, dec!(15000));

        let deduct = merge_options(
            LoanCategory::WithCollateral,
            dec!(15000),
            MergeStrategy::DeductFromReceivable,
        )
        .expect("valid balance");
        assert_eq!(deduct.ceiling_reduction, Decimal::ZERO);
    }

    #[test]
    fn add_to_principal_releases_new_money_only() {
        let principal = merged_principal(MergeStrategy::AddToPrincipal, dec!(20000), dec!(15000))
            .expect("fits");
        assert_eq!(principal, dec!(35000));

        let quote = amortize(
            LoanCategory::WithCollateral,
            Bracket::termed(dec!(20000), 8, dec!(7)),
            principal,
        );
        let terms = apply_strategy(MergeStrategy::AddToPrincipal, dec!(20000), quote, dec!(15000))
            .expect("terms settle");

        assert_eq!(terms.principal, dec!(35000));
        assert_eq!(terms.balance_deduction, Decimal::ZERO);
        // flat 1,000 charge on a 35,000 principal
        assert_eq!(terms.net_proceeds, dec!(19000));
    }

    #[test]
    fn deduct_from_receivable_keeps_principal() {
        let quote = amortize(
            LoanCategory::WithCollateral,
            Bracket::termed(dec!(20000), 8, dec!(7)),
            dec!(20000),
        );
        let terms = apply_strategy(MergeStrategy::DeductFromReceivable, dec!(20000), quote, dec!(15000))
            .expect("terms settle");

        assert_eq!(terms.principal, dec!(20000));
        assert_eq!(terms.quote.total_payable(), Some(dec!(31200)));
        assert_eq!(terms.net_proceeds, dec!(4000));
    }

    #[test]
    fn deductions_beyond_request_are_rejected() {
        let quote = amortize(
            LoanCategory::WithoutCollateral,
            Bracket::termed(dec!(10000), 6, dec!(6)),
            dec!(10000),
        );
        let err = apply_strategy(MergeStrategy::DeductFromReceivable, dec!(10000), quote, dec!(12000))
            .expect_err("nothing left to release");
        assert_eq!(
            err,
            ReloanError::InsufficientProceeds {
                requested: dec!(10000),
                deductions: dec!(12500),
            }
        );
    }

    #[test]
    fn unrepresentable_deductions_are_rejected() {
        let quote = amortize(
            LoanCategory::WithCollateral,
            Bracket::termed(dec!(20000), 8, dec!(7)),
            dec!(20000),
        );
        let err = apply_strategy(MergeStrategy::DeductFromReceivable, dec!(20000), quote, Decimal::MAX)
            .expect_err("balance plus charge overflows");
        assert_eq!(
            err,
            ReloanError::AmountOverflow {
                requested: dec!(20000),
                remaining_balance: Decimal::MAX,
            }
        );

        assert!(matches!(
            merged_principal(MergeStrategy::AddToPrincipal, Decimal::MAX, dec!(1)),
            Err(ReloanError::AmountOverflow { .. })
        ));
    }

    #[test]
    fn negative_balance_is_rejected() {
        assert_eq!(
            merge_options(LoanCategory::OpenTerm, dec!(-1), MergeStrategy::AddToPrincipal),
            Err(ReloanError::NegativeBalance(dec!(-1)))
        );
    }
}
