use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Fee schedule band an amount falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ServiceChargeTier {
    Percent(Decimal),
    Flat(Decimal),
    /// Below the schedule or inside one of its gaps; no charge applies.
    Undefined,
}

impl ServiceChargeTier {
    pub fn for_amount(amount: Decimal) -> Self {
        if amount >= dec!(6000) && amount <= dec!(20000) {
            ServiceChargeTier::Percent(dec!(5))
        } else if amount >= dec!(25000) && amount <= dec!(45000) {
            ServiceChargeTier::Flat(dec!(1000))
        } else if amount >= dec!(50000) {
            ServiceChargeTier::Percent(dec!(3))
        } else {
            ServiceChargeTier::Undefined
        }
    }

    pub fn charge(self, amount: Decimal) -> Decimal {
        match self {
            ServiceChargeTier::Percent(rate) => amount * rate / dec!(100),
            ServiceChargeTier::Flat(fee) => fee,
            ServiceChargeTier::Undefined => Decimal::ZERO,
        }
    }
}

/// Disclosure-only charge deducted at disbursement; never part of the payable total.
pub fn service_charge(amount: Decimal) -> Decimal {
    ServiceChargeTier::for_amount(amount).charge(amount)
}
