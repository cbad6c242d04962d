//! Common datatypes supporting functions throughout the ledger

use std::{collections::BTreeMap, fmt::Display};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    errors::Error,
    money::Cents,
    ops,
    validation::{PurchaseRequest, ValidationLimits},
};

/// Unique identifier for a transaction
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(u32);

impl TransactionId {
    /// Returns the id `offset` places after this one, or `None` past the last id
    #[must_use]
    pub(crate) fn checked_offset(self, offset: u32) -> Option<Self> {
        self.0.checked_add(offset).map(Self)
    }
}

impl From<u32> for TransactionId {
    fn from(transaction_id: u32) -> Self {
        Self(transaction_id)
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "id[{}]", self.0)
    }
}

/// Direction of the money in a [`Transaction`]
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money coming in
    Income,
    /// Money going out
    Expense,
}

/// Payment state of a [`Transaction`]
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Not settled yet, and not past its date
    Pending,
    /// Settled
    Paid,
    /// Not settled, and past its date
    Overdue,
    /// Will never be settled; ignored by every aggregate
    Cancelled,
}

impl Status {
    /// Returns whether the transaction still has to be settled
    #[must_use]
    #[inline]
    pub fn is_open(self) -> bool {
        matches!(self, Status::Pending | Status::Overdue)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Status::Pending => "pending",
            Status::Paid => "paid",
            Status::Overdue => "overdue",
            Status::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A single entry in the ledger.
///
/// A purchase split into several installments becomes one [`Transaction`] per installment.
/// Those share a `parent` (the id of the first installment) and carry their position in
/// `installment_number` / `total_installments`. Single payments have none of the three.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier for this transaction
    pub(crate) id: TransactionId,
    /// Whether this is an income or an expense
    #[serde(rename = "type")]
    pub(crate) kind: TransactionKind,
    /// Short description, e.g. the merchant
    pub(crate) title: String,
    /// Spending or income category
    pub(crate) category: String,
    /// Who made the purchase, if recorded
    pub(crate) purchaser: Option<String>,
    /// Always non-negative; [`TransactionKind`] carries the direction
    pub(crate) amount: Cents,
    /// The date the transaction happens or is due
    pub(crate) date: NaiveDate,
    /// Payment state
    pub(crate) status: Status,
    /// First installment of the group this transaction belongs to
    pub(crate) parent: Option<TransactionId>,
    /// 1-indexed position within the installment group
    pub(crate) installment_number: Option<u32>,
    /// Size of the installment group
    pub(crate) total_installments: Option<u32>,
}

impl Transaction {
    /// Returns the unique identifier
    #[must_use]
    #[inline]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns whether this is an income or an expense
    #[must_use]
    #[inline]
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Returns the title
    #[must_use]
    #[inline]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the category
    #[must_use]
    #[inline]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns the purchaser, if any
    #[must_use]
    #[inline]
    pub fn purchaser(&self) -> Option<&str> {
        self.purchaser.as_deref()
    }

    /// Returns the amount
    #[must_use]
    #[inline]
    pub fn amount(&self) -> Cents {
        self.amount
    }

    /// Returns the date the transaction happens or is due
    #[must_use]
    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Returns the payment state
    #[must_use]
    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns the first installment of this transaction's group, if it is part of one
    #[must_use]
    #[inline]
    pub fn parent(&self) -> Option<TransactionId> {
        self.parent
    }

    /// Returns `(installment_number, total_installments)` for installments
    #[must_use]
    pub fn installment(&self) -> Option<(u32, u32)> {
        self.installment_number.zip(self.total_installments)
    }

    /// Returns whether this is an expense
    #[must_use]
    #[inline]
    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }

    /// Returns whether this is an income
    #[must_use]
    #[inline]
    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }

    /// Returns whether this transaction counts towards totals
    #[must_use]
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status != Status::Cancelled
    }
}

/// An interface to all transactions.
///
/// Every read and write of ledger state goes through this trait; loading and saving a store
/// is done by the functions in [`io`](crate::io).
pub trait TransactionStore
where
    for<'a> &'a Self: IntoIterator<Item = &'a Transaction>,
    Self: Sized,
{
    /// Validates a purchase, splits it and registers one transaction per installment.
    ///
    /// See [`ops::record_purchase`].
    fn record(
        &mut self,
        request: PurchaseRequest,
        limits: &ValidationLimits,
    ) -> Result<Vec<TransactionId>, Error> {
        ops::record_purchase(self, request, limits)
    }

    /// Fetches a transaction by ID, if one exists
    fn transaction(&self, transaction_id: TransactionId) -> Result<Option<&Transaction>, Error>;

    /// Fetches a transaction by ID for modification, if one exists
    fn transaction_mut(
        &mut self,
        transaction_id: TransactionId,
    ) -> Result<Option<&mut Transaction>, Error>;

    /// Registers a transaction in the store.
    /// # Errors
    /// [`Error::Duplicate`] if a transaction with the same id is already registered
    fn register(&mut self, transaction: Transaction) -> Result<(), Error>;

    /// Removes a transaction from the store, returning it.
    /// # Errors
    /// [`Error::NotFound`] if there is no such transaction
    fn remove(&mut self, transaction_id: TransactionId) -> Result<Transaction, Error>;

    /// Returns an id that is not in use: one past the highest registered id.
    /// # Errors
    /// [`Error::InvalidArgument`] once the highest possible id has been registered
    fn next_id(&self) -> Result<TransactionId, Error>;
}

/// Holds all transactions in an in-memory structure, ordered by id.
///
/// # Limitations
/// No persistence; use [`io`](crate::io) to load and save it.
///
/// Only a single operation is allowed on the store at any given time.
#[derive(Default, Debug)]
pub struct MemoryTransactionStore {
    /// Storage for transactions that have been registered
    pub(crate) transactions: BTreeMap<TransactionId, Transaction>,
}

impl MemoryTransactionStore {
    /// Creates a new, empty [`MemoryTransactionStore`]
    #[must_use]
    pub fn new() -> Self {
        MemoryTransactionStore::default()
    }

    /// Returns the number of stored transactions
    #[must_use]
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Returns whether the store holds no transactions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
