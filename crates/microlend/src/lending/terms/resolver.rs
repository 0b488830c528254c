use rust_decimal::Decimal;

use super::catalog::{Bracket, BracketCatalog, LoanCategory};

/// Requested amount falls outside the category's eligible range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("requested amount {requested} is below the minimum of {minimum} for {} loans", .category.label())]
    BelowMinimum {
        category: LoanCategory,
        requested: Decimal,
        minimum: Decimal,
    },
    #[error("requested amount {requested} is above the maximum of {maximum} for {} loans", .category.label())]
    AboveMaximum {
        category: LoanCategory,
        requested: Decimal,
        maximum: Decimal,
    },
    #[error("requested amount {0} must be greater than zero")]
    NonPositiveAmount(Decimal),
    #[error("no brackets are configured for {} loans", .0.label())]
    NoBrackets(LoanCategory),
}

/// Floor-match a requested amount onto its bracket.
///
/// `ceiling_reduction` lowers every threshold (never below zero) before the range
/// check, which is how a rolled-over balance shrinks the room for new credit. The
/// returned bracket keeps its catalog threshold.
pub fn resolve(
    catalog: &BracketCatalog,
    category: LoanCategory,
    requested: Decimal,
    ceiling_reduction: Decimal,
) -> Result<Bracket, RangeError> {
    if requested <= Decimal::ZERO {
        return Err(RangeError::NonPositiveAmount(requested));
    }

    let brackets = catalog.brackets(category);
    let reduction = ceiling_reduction.max(Decimal::ZERO);
    let effective = |bracket: &Bracket| (bracket.min_amount - reduction).max(Decimal::ZERO);

    let (first, last) = match (brackets.first(), brackets.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(RangeError::NoBrackets(category)),
    };

    let minimum = effective(first);
    let maximum = effective(last);

    if requested < minimum {
        return Err(RangeError::BelowMinimum {
            category,
            requested,
            minimum,
        });
    }
    if requested > maximum {
        return Err(RangeError::AboveMaximum {
            category,
            requested,
            maximum,
        });
    }

    brackets
        .iter()
        .rev()
        .find(|bracket| effective(bracket) <= requested)
        .copied()
        .ok_or(RangeError::BelowMinimum {
            category,
            requested,
            minimum,
        })
}
