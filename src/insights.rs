//! Rule-based observations about a ledger
//!
//! Each rule looks at the transactions relative to a given `today` and produces zero or more
//! [`Insight`]s; [`generate`] runs all of them. Amount comparisons are done in `i128`, and
//! every amount an insight reports is computed with checked arithmetic.

use std::collections::BTreeMap;

use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;

use crate::{
    errors::Error,
    kpi::{self, month_start, percentage_of, Period, Totals},
    money::Cents,
    types::Transaction,
};

/// Most insights returned by [`generate`]
pub const MAX_INSIGHTS: usize = 5;

/// Savings rate, in percent, below which [`savings_goal`] suggests saving more
pub const TARGET_SAVINGS_RATE: i64 = 20;

/// Categories where spending above a threshold triggers a tip: name, monthly threshold in
/// minor units, and the percentage that could reasonably be cut
const SAVINGS_CATEGORIES: [(&str, i64, i64); 4] = [
    ("Assinaturas", 20_000, 30),
    ("Alimentação", 80_000, 20),
    ("Transporte", 50_000, 15),
    ("Lazer", 40_000, 25),
];

/// How an [`Insight`] should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightKind {
    /// Something needs attention
    Warning,
    /// Neutral observation
    Info,
    /// Suggestion to improve
    Tip,
    /// Something went well
    Success,
}

/// A single observation about the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insight {
    /// How to present it
    pub kind: InsightKind,
    /// Short headline
    pub title: String,
    /// Full explanation
    pub message: String,
    /// The amount the insight is about, if any
    pub value: Option<Cents>,
}

/// Runs every rule and keeps the first [`MAX_INSIGHTS`] results.
///
/// Rules run in this order: recurring subscriptions, spending spike, cash flow deficit,
/// savings opportunities, savings goal.
/// # Errors
/// [`Error::Overflow`] if the ledger's sums do not fit in [`Cents`]
pub fn generate(transactions: &[Transaction], today: NaiveDate) -> Result<Vec<Insight>, Error> {
    let current_month = kpi::totals(transactions, &Period::month(today))?;
    let mut insights = recurring_subscriptions(transactions, today)?;
    insights.extend(spending_spike(transactions, today)?);
    insights.extend(cash_flow_deficit(transactions, today)?);
    insights.extend(savings_opportunities(transactions, today)?);
    insights.extend(savings_goal(&current_month)?);
    insights.truncate(MAX_INSIGHTS);
    Ok(insights)
}

/// `percent`% of `amount`, truncated towards zero
fn percent_of(amount: Cents, percent: i64) -> Result<Cents, Error> {
    let part = i128::from(amount.value()) * i128::from(percent) / 100;
    i64::try_from(part).map(Cents::from).map_err(|_| Error::Overflow)
}

/// Expenses repeating with a similar amount over the last three months.
///
/// Considers expenses dated from the first day of the month three months before `today` up
/// to `today`, leaving out installments (their repetition is already known). Expenses are
/// grouped by case-insensitive title; a group of at least three whose amounts all lie within
/// 10% of their average is reported.
pub fn recurring_subscriptions(
    transactions: &[Transaction],
    today: NaiveDate,
) -> Result<Vec<Insight>, Error> {
    let Some(since) = month_start(today).checked_sub_months(Months::new(3)) else {
        return Ok(vec![]);
    };
    let mut groups: BTreeMap<String, Vec<Cents>> = BTreeMap::new();
    for transaction in transactions.iter().filter(|t| {
        t.is_active()
            && t.is_expense()
            && t.parent().is_none()
            && since <= t.date()
            && t.date() <= today
    }) {
        groups
            .entry(transaction.title().to_lowercase())
            .or_default()
            .push(transaction.amount());
    }

    let mut insights = vec![];
    for (merchant, amounts) in groups.into_iter().filter(|(_, amounts)| amounts.len() >= 3) {
        let count = amounts.len() as i64;
        let total = Cents::try_sum(amounts.iter().copied())?;
        // |amount - average| <= average / 10, scaled by count to stay in integers
        let similar = amounts.iter().all(|amount| {
            (i128::from(amount.value()) * i128::from(count) - i128::from(total.value())).abs() * 10
                <= i128::from(total.value())
        });
        if !similar || total == Cents::ZERO {
            continue;
        }
        let average = Cents::from(total.value() / count);
        let yearly = average.try_mul(12)?;
        insights.push(Insight {
            kind: InsightKind::Info,
            title: "Recurring subscription detected".into(),
            message: format!(
                "You spend {}/month on \"{merchant}\", which adds up to {}/year. \
                 Consider whether you still need it.",
                average.brl(),
                yearly.brl()
            ),
            value: Some(average),
        });
    }
    Ok(insights)
}

/// This month's spending more than 30% above the average of the previous three months.
///
/// Nothing is reported when there was no spending in the previous three months.
pub fn spending_spike(
    transactions: &[Transaction],
    today: NaiveDate,
) -> Result<Option<Insight>, Error> {
    let current = Period::month(today);
    let (Some(previous_start), Some(previous_end)) = (
        current.start().checked_sub_months(Months::new(3)),
        current.start().pred_opt(),
    ) else {
        return Ok(None);
    };
    let previous = Period::new(previous_start, previous_end)?;

    let spent = kpi::totals(transactions, &current)?.expenses;
    let before = kpi::totals(transactions, &previous)?.expenses;
    if before <= Cents::ZERO
        || i128::from(spent.value()) * 30 <= i128::from(before.value()) * 13
    {
        return Ok(None);
    }
    let average = Cents::from(before.value() / 3);
    // spent / (before / 3) - 1, as a percentage
    let increase = percentage_of(
        spent.to_decimal() * Decimal::from(3) - before.to_decimal(),
        before.to_decimal(),
    );
    Ok(Some(Insight {
        kind: InsightKind::Warning,
        title: "Spending above average".into(),
        message: format!(
            "Your spending this month is {increase:.1}% above the average of the last three months. \
             Review your expenses to stay on track."
        ),
        value: Some(spent.try_sub(average)?),
    }))
}

/// Open expenses in the next 30 days exceeding the income expected in the same window
pub fn cash_flow_deficit(
    transactions: &[Transaction],
    today: NaiveDate,
) -> Result<Option<Insight>, Error> {
    let until = today.checked_add_days(Days::new(30)).unwrap_or(NaiveDate::MAX);
    let window = Period::new(today, until)?;

    let expenses = Cents::try_sum(
        transactions
            .iter()
            .filter(|t| t.is_expense() && t.status().is_open() && window.contains(t.date()))
            .map(Transaction::amount),
    )?;
    let income = Cents::try_sum(
        transactions
            .iter()
            .filter(|t| t.is_active() && t.is_income() && window.contains(t.date()))
            .map(Transaction::amount),
    )?;
    if income >= expenses {
        return Ok(None);
    }
    Ok(Some(Insight {
        kind: InsightKind::Warning,
        title: "Watch your cash flow".into(),
        message: format!(
            "You have {} in expenses due in the next 30 days but only {} in expected income. \
             Consider postponing non-urgent payments.",
            expenses.brl(),
            income.brl()
        ),
        value: Some(expenses.try_sub(income)?),
    }))
}

/// Categories whose spending this month crossed a fixed threshold
pub fn savings_opportunities(
    transactions: &[Transaction],
    today: NaiveDate,
) -> Result<Vec<Insight>, Error> {
    let month = Period::month(today);
    let mut insights = vec![];
    for &(category, threshold, cut) in &SAVINGS_CATEGORIES {
        let spent = Cents::try_sum(
            transactions
                .iter()
                .filter(|t| {
                    t.is_active()
                        && t.is_expense()
                        && t.category() == category
                        && month.contains(t.date())
                })
                .map(Transaction::amount),
        )?;
        if spent.value() <= threshold {
            continue;
        }
        let potential = percent_of(spent, cut)?;
        insights.push(Insight {
            kind: InsightKind::Tip,
            title: format!("Savings opportunity in {category}"),
            message: format!(
                "You spent {} on {category} this month. Cutting {cut}% would save {}/month.",
                spent.brl(),
                potential.brl()
            ),
            value: Some(potential),
        });
    }
    Ok(insights)
}

/// Compares the savings rate of `totals` against [`TARGET_SAVINGS_RATE`].
///
/// Nothing is reported without income.
pub fn savings_goal(totals: &Totals) -> Result<Option<Insight>, Error> {
    if totals.income <= Cents::ZERO {
        return Ok(None);
    }
    let rate = kpi::savings_rate(totals);
    let target = percent_of(totals.income, TARGET_SAVINGS_RATE)?;
    let balance = totals.balance()?;
    let insight = if balance < target {
        let needed = target.try_sub(balance)?;
        Insight {
            kind: InsightKind::Tip,
            title: "Savings goal".into(),
            message: format!(
                "Your savings rate is {rate:.1}%. To reach {TARGET_SAVINGS_RATE}% you need to save \
                 {} more per month.",
                needed.brl()
            ),
            value: Some(needed),
        }
    } else {
        Insight {
            kind: InsightKind::Success,
            title: "Savings goal reached".into(),
            message: format!(
                "Your savings rate is {rate:.1}%, above the {TARGET_SAVINGS_RATE}% goal. Keep it up!"
            ),
            value: None,
        }
    };
    Ok(Some(insight))
}
