use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Collateral category chosen when the application is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanCategory {
    WithCollateral,
    WithoutCollateral,
    OpenTerm,
}

impl LoanCategory {
    pub const fn label(self) -> &'static str {
        match self {
            LoanCategory::WithCollateral => "with_collateral",
            LoanCategory::WithoutCollateral => "without_collateral",
            LoanCategory::OpenTerm => "open_term",
        }
    }

    pub const fn all() -> [LoanCategory; 3] {
        [
            LoanCategory::WithCollateral,
            LoanCategory::WithoutCollateral,
            LoanCategory::OpenTerm,
        ]
    }

    /// Open-term loans carry no fixed amortization schedule.
    pub const fn has_fixed_term(self) -> bool {
        !matches!(self, LoanCategory::OpenTerm)
    }
}

impl std::str::FromStr for LoanCategory {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "with_collateral" | "collateral" => Ok(LoanCategory::WithCollateral),
            "without_collateral" | "unsecured" => Ok(LoanCategory::WithoutCollateral),
            "open_term" | "open" => Ok(LoanCategory::OpenTerm),
            other => Err(format!("unknown loan category '{other}'")),
        }
    }
}

/// Eligibility threshold with the term and flat monthly rate it unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bracket {
    pub min_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_months: Option<u32>,
    pub interest_rate_percent: Decimal,
}

impl Bracket {
    pub const fn termed(min_amount: Decimal, term_months: u32, interest_rate_percent: Decimal) -> Self {
        Self {
            min_amount,
            term_months: Some(term_months),
            interest_rate_percent,
        }
    }

    pub const fn open(min_amount: Decimal, interest_rate_percent: Decimal) -> Self {
        Self {
            min_amount,
            term_months: None,
            interest_rate_percent,
        }
    }
}

/// Versioned reference tables of brackets, one ascending list per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketCatalog {
    pub version: String,
    pub tables: BTreeMap<LoanCategory, Vec<Bracket>>,
}

impl BracketCatalog {
    pub fn standard() -> Self {
        let mut tables = BTreeMap::new();
        tables.insert(
            LoanCategory::WithCollateral,
            vec![
                Bracket::termed(dec!(10000), 6, dec!(8)),
                Bracket::termed(dec!(20000), 8, dec!(7)),
                Bracket::termed(dec!(50000), 10, dec!(5)),
                Bracket::termed(dec!(100000), 18, dec!(4)),
                Bracket::termed(dec!(250000), 24, dec!(3.5)),
                Bracket::termed(dec!(500000), 36, dec!(3)),
            ],
        );
        tables.insert(
            LoanCategory::WithoutCollateral,
            vec![
                Bracket::termed(dec!(10000), 6, dec!(6)),
                Bracket::termed(dec!(20000), 8, dec!(5.5)),
                Bracket::termed(dec!(30000), 10, dec!(5)),
            ],
        );
        tables.insert(
            LoanCategory::OpenTerm,
            vec![
                Bracket::open(dec!(6000), dec!(6)),
                Bracket::open(dec!(30000), dec!(5)),
                Bracket::open(dec!(100000), dec!(4)),
            ],
        );

        Self {
            version: "2024.1".to_string(),
            tables,
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let catalog: BracketCatalog = serde_json::from_reader(reader)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let file = File::open(path.as_ref()).map_err(|source| CatalogError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Brackets for the category, ascending by `min_amount`.
    pub fn brackets(&self, category: LoanCategory) -> &[Bracket] {
        self.tables
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Smallest and largest threshold for the category, if it has any brackets.
    pub fn range(&self, category: LoanCategory) -> Option<(Decimal, Decimal)> {
        let brackets = self.brackets(category);
        let first = brackets.first()?;
        let last = brackets.last()?;
        Some((first.min_amount, last.min_amount))
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        for category in LoanCategory::all() {
            let brackets = self.brackets(category);
            if brackets.is_empty() {
                return Err(CatalogError::MissingCategory(category));
            }

            let mut previous: Option<Decimal> = None;
            for bracket in brackets {
                if bracket.min_amount <= Decimal::ZERO {
                    return Err(CatalogError::InvalidBracket {
                        category,
                        reason: format!("threshold {} must be positive", bracket.min_amount),
                    });
                }
                if let Some(previous) = previous {
                    if bracket.min_amount <= previous {
                        return Err(CatalogError::InvalidBracket {
                            category,
                            reason: format!(
                                "threshold {} does not ascend past {}",
                                bracket.min_amount, previous
                            ),
                        });
                    }
                }
                if bracket.interest_rate_percent < Decimal::ZERO {
                    return Err(CatalogError::InvalidBracket {
                        category,
                        reason: format!("negative rate {}", bracket.interest_rate_percent),
                    });
                }
                match (category.has_fixed_term(), bracket.term_months) {
                    (true, None) => {
                        return Err(CatalogError::InvalidBracket {
                            category,
                            reason: format!("bracket {} is missing a term", bracket.min_amount),
                        })
                    }
                    (true, Some(0)) => {
                        return Err(CatalogError::InvalidBracket {
                            category,
                            reason: format!("bracket {} has a zero-month term", bracket.min_amount),
                        })
                    }
                    (false, Some(months)) => {
                        return Err(CatalogError::InvalidBracket {
                            category,
                            reason: format!(
                                "open-term bracket {} declares a {months}-month term",
                                bracket.min_amount
                            ),
                        })
                    }
                    _ => {}
                }
                previous = Some(bracket.min_amount);
            }
        }

        Ok(())
    }
}

impl Default for BracketCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog has no brackets for {}", .0.label())]
    MissingCategory(LoanCategory),
    #[error("invalid {} bracket: {reason}", .category.label())]
    InvalidBracket {
        category: LoanCategory,
        reason: String,
    },
    #[error("unable to read catalog at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed catalog: {0}")]
    Parse(#[from] serde_json::Error),
}
