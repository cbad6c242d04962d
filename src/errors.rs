use rust_decimal::Decimal;

use crate::{
    accounts::AccountId,
    goals::GoalId,
    types::{Status, TransactionId},
};

/// Error type that can be returned by fallible operations in this crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error reading or writing CSV files; could wrap IO or parsing errors
    #[error("Error processing CSV")]
    Load(#[from] csv::Error),
    /// Error opening or creating a ledger file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// An input violated the preconditions of an operation, e.g. splitting into zero installments
    /// or a negative total. Nothing is produced or stored when this is returned.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A decimal amount that cannot be represented as a whole number of minor units
    #[error("Amount {0} is out of range")]
    AmountOutOfRange(Decimal),
    /// A sum, difference or product of amounts that does not fit in the money type
    #[error("Amount overflow")]
    Overflow,
    /// A [`Transaction`](crate::types::Transaction) with the same id is already in the store.
    #[error("Attempt to register already registered transaction {0}")]
    Duplicate(TransactionId),
    /// No transaction with the given id (or no installment group with the given parent) exists.
    #[error("Transaction {0} not found")]
    NotFound(TransactionId),
    /// An [`Account`](crate::accounts::Account) with the same id already exists
    #[error("Account {0} already exists")]
    DuplicateAccount(AccountId),
    /// No account with the given id exists
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),
    /// A [`Goal`](crate::goals::Goal) with the same id already exists
    #[error("Goal {0} already exists")]
    DuplicateGoal(GoalId),
    /// No goal with the given id exists
    #[error("Goal {0} not found")]
    GoalNotFound(GoalId),
    /// The transaction's current [`Status`] does not allow the requested change
    #[error("Transaction {id} is {status}")]
    InvalidStatus {
        /// The transaction that was targeted
        id: TransactionId,
        /// Its status at the time of the request
        status: Status,
    },
}
