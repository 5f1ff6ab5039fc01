//! Installment schedule generation and remaining-installment math
//!
//! Both functions are pure: the database layer persists what `generate`
//! returns and calls `remaining` with the request's "today".

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::calendar::{add_months, months_elapsed};
use crate::error::{Error, Result};

/// Upper bound on installments for a single expense
pub const MAX_INSTALLMENTS: u32 = 72;

/// One scheduled installment before it is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallmentDraft {
    /// 1-based sequence number
    pub number: u32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

/// Round a money amount to cents, halves away from zero
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Split `amount` into `total` monthly installments starting at `start`.
///
/// Every installment carries `round(amount / total, 2)`. The rounding
/// remainder is not redistributed, so the installments can differ from the
/// expense amount by up to half a cent per installment. A `total` of zero
/// yields no installments.
pub fn generate(amount: Decimal, total: u32, start: NaiveDate) -> Result<Vec<InstallmentDraft>> {
    if total == 0 {
        return Ok(Vec::new());
    }

    let per_installment = round_money(amount / Decimal::from(total));

    (1..=total)
        .map(|number| {
            let due_date = add_months(start, number - 1).ok_or_else(|| {
                Error::InvalidData(format!(
                    "Installment {} of {} falls outside the supported date range",
                    number, total
                ))
            })?;
            Ok(InstallmentDraft {
                number,
                amount: per_installment,
                due_date,
            })
        })
        .collect()
}

/// Installments of an expense still outstanding as of `as_of`.
///
/// Counts whole calendar months since the expense date. An expense dated in
/// a later month than `as_of` has a negative elapsed count, so the result can
/// exceed `total`.
pub fn remaining(expense_date: NaiveDate, total: u32, as_of: NaiveDate) -> u32 {
    let elapsed = months_elapsed(expense_date, as_of);
    (total as i64 - elapsed).max(0) as u32
}

/// Display label for an installment, e.g. `"2/6"`
pub fn installment_label(number: u32, total: u32) -> String {
    format!("{}/{}", number, total)
}
