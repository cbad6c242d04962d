//! Aggregate figures over a list of transactions, for dashboards and reports
//!
//! Every function over transactions ignores cancelled ones. Sums are checked and fail with
//! [`Error::Overflow`] rather than wrap.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;

use crate::{
    accounts::{Account, AccountKind},
    errors::Error,
    money::Cents,
    types::Transaction,
};

/// Label used for expenses without a purchaser in [`spending_by_purchaser`]
pub const UNKNOWN_PURCHASER: &str = "—";

/// An inclusive range of dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    /// Creates a period from `start` to `end`, both included.
    /// # Errors
    /// [`Error::InvalidArgument`] if `start` is after `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, Error> {
        if start > end {
            return Err(Error::InvalidArgument(format!(
                "period starts on {start}, after its end on {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The calendar month containing `date`
    #[must_use]
    pub fn month(date: NaiveDate) -> Self {
        let start = month_start(date);
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// Returns the first day of the period
    #[must_use]
    #[inline]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Returns the last day of the period
    #[must_use]
    #[inline]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Returns whether `date` falls within the period
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The first day of the month containing `date`
pub(crate) fn month_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Income and expenses over some period
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    /// Sum of incomes
    pub income: Cents,
    /// Sum of expenses
    pub expenses: Cents,
}

impl Totals {
    /// Income minus expenses.
    /// # Errors
    /// [`Error::Overflow`] if the difference does not fit
    pub fn balance(&self) -> Result<Cents, Error> {
        self.income.try_sub(self.expenses)
    }

    fn add(&mut self, transaction: &Transaction) -> Result<(), Error> {
        if transaction.is_income() {
            self.income = self.income.try_add(transaction.amount())?;
        } else {
            self.expenses = self.expenses.try_add(transaction.amount())?;
        }
        Ok(())
    }
}

/// Sums incomes and expenses dated within `period`
pub fn totals<'a, I>(transactions: I, period: &Period) -> Result<Totals, Error>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut totals = Totals::default();
    for transaction in transactions
        .into_iter()
        .filter(|t| t.is_active() && period.contains(t.date()))
    {
        totals.add(transaction)?;
    }
    Ok(totals)
}

/// Share of income that was not spent, in percent with two decimals.
///
/// Zero when there is no income. Negative when expenses exceed income.
#[must_use]
pub fn savings_rate(totals: &Totals) -> Decimal {
    // Any two amounts fit in a Decimal, so the balance is taken there
    percentage_of(
        totals.income.to_decimal() - totals.expenses.to_decimal(),
        totals.income.to_decimal(),
    )
}

/// `part` as a percentage of `whole`, with two decimals; zero when `whole` is zero
pub(crate) fn percentage(part: Cents, whole: Cents) -> Decimal {
    percentage_of(part.to_decimal(), whole.to_decimal())
}

pub(crate) fn percentage_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part * Decimal::ONE_HUNDRED / whole).round_dp(2)
}

/// Spending in one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryShare {
    /// Category name
    pub category: String,
    /// Total spent
    pub amount: Cents,
    /// Percentage of all spending in the period, with two decimals
    pub percentage: Decimal,
    /// Number of expenses in the category
    pub transactions: usize,
}

/// Spending per category within `period`, largest first, at most `limit` entries.
///
/// Percentages are relative to all spending in the period, not only the returned categories.
pub fn category_breakdown<'a, I>(
    transactions: I,
    period: &Period,
    limit: usize,
) -> Result<Vec<CategoryShare>, Error>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut categories: BTreeMap<&str, (Cents, usize)> = BTreeMap::new();
    for transaction in transactions
        .into_iter()
        .filter(|t| t.is_active() && t.is_expense() && period.contains(t.date()))
    {
        let entry = categories
            .entry(transaction.category())
            .or_insert((Cents::ZERO, 0));
        entry.0 = entry.0.try_add(transaction.amount())?;
        entry.1 += 1;
    }
    let total = Cents::try_sum(categories.values().map(|(amount, _)| *amount))?;

    let mut shares: Vec<CategoryShare> = categories
        .into_iter()
        .map(|(category, (amount, count))| CategoryShare {
            category: category.to_string(),
            amount,
            percentage: percentage(amount, total),
            transactions: count,
        })
        .collect();
    // Stable sort keeps the alphabetical order of the map for equal amounts
    shares.sort_by(|a, b| b.amount.cmp(&a.amount));
    shares.truncate(limit);
    Ok(shares)
}

/// Income and expenses in one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyFlow {
    /// First day of the month
    pub month: NaiveDate,
    /// Sums for the month
    pub totals: Totals,
}

/// Cash flow for the `months` calendar months ending with the month of `last_month`, oldest
/// first.
pub fn monthly_flows<'a, I>(
    transactions: I,
    last_month: NaiveDate,
    months: u32,
) -> Result<Vec<MonthlyFlow>, Error>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let last = month_start(last_month);
    let mut flows: Vec<MonthlyFlow> = (0..months)
        .rev()
        .filter_map(|back| last.checked_sub_months(Months::new(back)))
        .map(|month| MonthlyFlow {
            month,
            totals: Totals::default(),
        })
        .collect();
    for transaction in transactions.into_iter().filter(|t| t.is_active()) {
        let month = month_start(transaction.date());
        if let Some(flow) = flows.iter_mut().find(|flow| flow.month == month) {
            flow.totals.add(transaction)?;
        }
    }
    Ok(flows)
}

/// Sum of open expenses that belong to an installment group, i.e. debt still to be paid off
pub fn outstanding_installments<'a, I>(transactions: I) -> Result<Cents, Error>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    Cents::try_sum(
        transactions
            .into_iter()
            .filter(|t| t.is_expense() && t.status().is_open() && t.installment().is_some())
            .map(Transaction::amount),
    )
}

/// Open expenses dated from `from` up to `days` days later, soonest first
pub fn upcoming<'a, I>(transactions: I, from: NaiveDate, days: u64) -> Vec<&'a Transaction>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let until = from.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
    let mut bills: Vec<&Transaction> = transactions
        .into_iter()
        .filter(|t| {
            t.is_expense() && t.status().is_open() && from <= t.date() && t.date() <= until
        })
        .collect();
    bills.sort_by_key(|t| (t.date(), t.id()));
    bills
}

/// Spending per purchaser within `period`, largest first
pub fn spending_by_purchaser<'a, I>(
    transactions: I,
    period: &Period,
) -> Result<Vec<(String, Cents)>, Error>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut purchasers: BTreeMap<&str, Cents> = BTreeMap::new();
    for transaction in transactions
        .into_iter()
        .filter(|t| t.is_active() && t.is_expense() && period.contains(t.date()))
    {
        let spent = purchasers
            .entry(transaction.purchaser().unwrap_or(UNKNOWN_PURCHASER))
            .or_insert(Cents::ZERO);
        *spent = spent.try_add(transaction.amount())?;
    }
    let mut spending: Vec<(String, Cents)> = purchasers
        .into_iter()
        .map(|(purchaser, amount)| (purchaser.to_string(), amount))
        .collect();
    spending.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(spending)
}

/// Sum of every account balance; credit accounts usually contribute a negative amount
pub fn consolidated_balance<'a, I>(accounts: I) -> Result<Cents, Error>
where
    I: IntoIterator<Item = &'a Account>,
{
    Cents::try_sum(accounts.into_iter().map(Account::balance))
}

/// Sum of the balances of investment accounts
pub fn invested<'a, I>(accounts: I) -> Result<Cents, Error>
where
    I: IntoIterator<Item = &'a Account>,
{
    Cents::try_sum(
        accounts
            .into_iter()
            .filter(|account| account.kind() == AccountKind::Investment)
            .map(Account::balance),
    )
}

/// What is owned minus what is owed: all account balances, investments included, less the
/// [`outstanding_installments`] of the ledger
pub fn net_worth<'a, 'b, A, T>(accounts: A, transactions: T) -> Result<Cents, Error>
where
    A: IntoIterator<Item = &'a Account>,
    T: IntoIterator<Item = &'b Transaction>,
{
    consolidated_balance(accounts)?.try_sub(outstanding_installments(transactions)?)
}

/// Average monthly spending over the `months` calendar months before the month of `today`,
/// plus the current month up to `today`.
///
/// Expenses are counted from the first day of the month `months` months back, and the sum is
/// divided by `months`. Open and paid expenses count alike.
/// # Errors
/// [`Error::InvalidArgument`] if `months` is zero, [`Error::Overflow`] if the sum does not fit
pub fn burn_rate<'a, I>(transactions: I, today: NaiveDate, months: u32) -> Result<Cents, Error>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    if months == 0 {
        return Err(Error::InvalidArgument("burn rate needs at least one month".into()));
    }
    let since = month_start(today)
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN);
    let spent = Cents::try_sum(
        transactions
            .into_iter()
            .filter(|t| t.is_active() && t.is_expense() && since <= t.date() && t.date() <= today)
            .map(Transaction::amount),
    )?;
    Ok(Cents::from(spent.value() / i64::from(months)))
}

/// Debt-to-income ratio for `period`: installment payments due in the period as a
/// percentage of the income in the period, with two decimals. Zero without income.
pub fn debt_to_income<'a, I>(transactions: I, period: &Period) -> Result<Decimal, Error>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut debt = Cents::ZERO;
    let mut income = Cents::ZERO;
    for transaction in transactions
        .into_iter()
        .filter(|t| t.is_active() && period.contains(t.date()))
    {
        if transaction.is_income() {
            income = income.try_add(transaction.amount())?;
        } else if transaction.installment().is_some() {
            debt = debt.try_add(transaction.amount())?;
        }
    }
    Ok(percentage(debt, income))
}

/// Return on investment in percent, with two decimals; zero when nothing was invested
#[must_use]
pub fn roi(invested: Cents, current_value: Cents) -> Decimal {
    percentage_of(
        current_value.to_decimal() - invested.to_decimal(),
        invested.to_decimal(),
    )
}
