//! Splitting a total into monthly installments

use chrono::{Months, NaiveDate};
use serde::Serialize;

use crate::{errors::Error, money::Cents};

/// One scheduled partial payment produced by [`split`].
///
/// Installments are immutable once created; the ledger turns each one into an
/// independent [`Transaction`](crate::types::Transaction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Installment {
    /// 1-indexed position within the schedule
    #[serde(rename = "installment")]
    pub(crate) sequence_number: u32,
    /// Number of installments in the schedule
    #[serde(rename = "of")]
    pub(crate) total_count: u32,
    /// Date this installment is due
    pub(crate) due_date: NaiveDate,
    /// The amount due, in minor units
    pub(crate) amount: Cents,
}

impl Installment {
    /// Returns the 1-indexed position within the schedule
    #[must_use]
    #[inline]
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    /// Returns the number of installments in the schedule
    #[must_use]
    #[inline]
    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    /// Returns the date this installment is due
    #[must_use]
    #[inline]
    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    /// Returns the amount due
    #[must_use]
    #[inline]
    pub fn amount(&self) -> Cents {
        self.amount
    }
}

/// Splits `total` into `count` installments due one calendar month apart, starting on
/// `first_due_date`.
///
/// Every installment gets `total / count` (rounded down); the remainder of the division goes
/// to the first installment, so the amounts always add up to `total` exactly and the first
/// installment is never smaller than the others.
///
/// Due dates are computed with [`add_months`] relative to `first_due_date`, so a schedule
/// starting on the 31st lands on the last day of shorter months and returns to the 31st
/// afterwards.
///
/// # Errors
/// [`Error::InvalidArgument`] if `count` is zero, `total` is negative, or the last due date
/// would fall outside the supported calendar. No installments are produced in that case.
pub fn split(total: Cents, count: u32, first_due_date: NaiveDate) -> Result<Vec<Installment>, Error> {
    if count < 1 {
        return Err(Error::InvalidArgument(
            "installment count must be at least 1".into(),
        ));
    }
    if total.is_negative() {
        return Err(Error::InvalidArgument(format!(
            "cannot split negative total {total}"
        )));
    }
    // The last due date is the furthest out; if it exists, all of them do.
    add_months(first_due_date, count - 1)?;

    let base = total.value() / i64::from(count);
    let remainder = total.value() - base * i64::from(count);
    (0..count)
        .map(|index| {
            let amount = if index == 0 { base + remainder } else { base };
            Ok(Installment {
                sequence_number: index + 1,
                total_count: count,
                due_date: add_months(first_due_date, index)?,
                amount: Cents::from(amount),
            })
        })
        .collect()
}

/// Advances `date` by `months` calendar months, keeping the day of month where possible.
///
/// When the target month is too short, the result is clamped to its last day
/// (2024-01-31 plus one month is 2024-02-29).
///
/// # Errors
/// [`Error::InvalidArgument`] if the result is past the last representable date
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, Error> {
    date.checked_add_months(Months::new(months)).ok_or_else(|| {
        Error::InvalidArgument(format!("{date} plus {months} months is out of range"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn amounts(installments: &[Installment]) -> Vec<i64> {
        installments.iter().map(|i| i.amount().value()).collect()
    }

    fn due_dates(installments: &[Installment]) -> Vec<NaiveDate> {
        installments.iter().map(Installment::due_date).collect()
    }

    #[test]
    fn test_split_with_remainder_clamps_february() {
        let installments = split(Cents::from(10000), 3, date(2024, 1, 31)).unwrap();
        assert_eq!(amounts(&installments), vec![3334, 3333, 3333]);
        assert_eq!(
            due_dates(&installments),
            vec![date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 31)]
        );
        let numbers: Vec<(u32, u32)> = installments
            .iter()
            .map(|i| (i.sequence_number(), i.total_count()))
            .collect();
        assert_eq!(numbers, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_split_single_installment() {
        let installments = split(Cents::from(100), 1, date(2024, 5, 15)).unwrap();
        assert_eq!(
            installments,
            vec![Installment {
                sequence_number: 1,
                total_count: 1,
                due_date: date(2024, 5, 15),
                amount: Cents::from(100),
            }]
        );
    }

    #[test]
    fn test_split_remainder_goes_first() {
        let installments = split(Cents::from(999), 4, date(2024, 1, 1)).unwrap();
        assert_eq!(amounts(&installments), vec![252, 249, 249, 249]);
        assert_eq!(
            due_dates(&installments),
            vec![date(2024, 1, 1), date(2024, 2, 1), date(2024, 3, 1), date(2024, 4, 1)]
        );
    }

    #[test]
    fn test_split_zero_total() {
        let installments = split(Cents::ZERO, 2, date(2024, 1, 1)).unwrap();
        assert_eq!(amounts(&installments), vec![0, 0]);
        assert_eq!(due_dates(&installments), vec![date(2024, 1, 1), date(2024, 2, 1)]);
    }

    #[test]
    fn test_split_zero_count_is_rejected() {
        assert!(matches!(
            split(Cents::from(100), 0, date(2024, 1, 1)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_split_negative_total_is_rejected() {
        assert!(matches!(
            split(Cents::from(-1), 2, date(2024, 1, 1)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_split_past_calendar_end_is_rejected() {
        assert!(matches!(
            split(Cents::from(100), 3, NaiveDate::MAX),
            Err(Error::InvalidArgument(_))
        ));
        assert!(split(Cents::from(100), 1, NaiveDate::MAX).is_ok());
    }

    #[test]
    fn test_split_invariants() {
        let start = date(2023, 8, 30);
        for total in [0_i64, 1, 7, 99, 100, 101, 12345, 99_999_999] {
            for count in 1..=25_u32 {
                let installments = split(Cents::from(total), count, start).unwrap();
                assert_eq!(installments.len(), count as usize);
                assert_eq!(
                    Cents::try_sum(installments.iter().map(Installment::amount)).unwrap(),
                    Cents::from(total)
                );
                let first = installments[0].amount();
                assert!(installments.iter().all(|i| i.amount() <= first));
                for (index, installment) in installments.iter().enumerate() {
                    assert_eq!(installment.sequence_number() as usize, index + 1);
                    assert_eq!(
                        installment.due_date(),
                        start.checked_add_months(Months::new(index as u32)).unwrap()
                    );
                }
                assert!(installments
                    .windows(2)
                    .all(|pair| pair[0].due_date() < pair[1].due_date()));
            }
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let first = split(Cents::from(123457), 7, date(2024, 10, 31)).unwrap();
        let second = split(Cents::from(123457), 7, date(2024, 10, 31)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        assert_eq!(add_months(date(2023, 1, 31), 1).unwrap(), date(2023, 2, 28));
        assert_eq!(add_months(date(2024, 1, 31), 1).unwrap(), date(2024, 2, 29));
        assert_eq!(add_months(date(2024, 3, 31), 1).unwrap(), date(2024, 4, 30));
        assert_eq!(add_months(date(2024, 12, 15), 1).unwrap(), date(2025, 1, 15));
        assert_eq!(add_months(date(2024, 5, 15), 0).unwrap(), date(2024, 5, 15));
    }
}
