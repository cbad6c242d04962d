use chrono::NaiveDate;
use log::{debug, info, warn};

use crate::{
    errors::Error,
    split::split,
    types::{MemoryTransactionStore, Status, Transaction, TransactionId, TransactionStore},
    validation::{sanitize_text, validate_purchase, PurchaseRequest, ValidationLimits},
};

/// Does the work of turning a purchase into ledger entries.
///
/// The request is validated and split before anything touches the store, so an invalid
/// request leaves the store unchanged. Each installment becomes a pending [`Transaction`]
/// with consecutive ids starting at [`TransactionStore::next_id`]; when there is more than one,
/// they all point at the first as their `parent`.
///
/// Returns the ids of the new transactions, in installment order.
pub fn record_purchase<S>(
    store: &mut S,
    request: PurchaseRequest,
    limits: &ValidationLimits,
) -> Result<Vec<TransactionId>, Error>
where
    S: TransactionStore,
    for<'a> &'a S: IntoIterator<Item = &'a Transaction>,
{
    for warning in validate_purchase(&request, limits)? {
        warn!("Recording {:?} anyway: {warning}", request.title);
    }
    let installments = split(request.total, request.installments, request.first_due)?;

    let first_id = store.next_id()?;
    let grouped = installments.len() > 1;
    let title = sanitize_text(&request.title);
    let category = sanitize_text(&request.category);
    let purchaser = request
        .purchaser
        .as_deref()
        .map(sanitize_text)
        .filter(|purchaser| !purchaser.is_empty());

    // Every id is claimed before the first write, so a failure leaves the store as it was
    let mut records = Vec::with_capacity(installments.len());
    for (offset, installment) in (0..).zip(&installments) {
        let id = first_id.checked_offset(offset).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "no free transaction ids for {} installments after {first_id}",
                installments.len()
            ))
        })?;
        if store.transaction(id)?.is_some() {
            return Err(Error::Duplicate(id));
        }
        records.push(Transaction {
            id,
            kind: request.kind,
            title: title.clone(),
            category: category.clone(),
            purchaser: purchaser.clone(),
            amount: installment.amount(),
            date: installment.due_date(),
            status: Status::Pending,
            parent: grouped.then_some(first_id),
            installment_number: grouped.then_some(installment.sequence_number()),
            total_installments: grouped.then_some(installment.total_count()),
        });
    }

    let mut ids = Vec::with_capacity(records.len());
    for record in records {
        ids.push(record.id);
        store.register(record)?;
    }
    debug!(
        "Recorded {title:?} as {} transaction(s) starting at {first_id}",
        ids.len()
    );
    Ok(ids)
}

/// Marks an open transaction as paid.
/// # Errors
/// [`Error::NotFound`] if there is no such transaction, [`Error::InvalidStatus`] if it is
/// already paid or cancelled
pub fn pay<S>(store: &mut S, transaction_id: TransactionId) -> Result<(), Error>
where
    S: TransactionStore,
    for<'a> &'a S: IntoIterator<Item = &'a Transaction>,
{
    let transaction = store
        .transaction_mut(transaction_id)?
        .ok_or(Error::NotFound(transaction_id))?;
    if !transaction.status.is_open() {
        return Err(Error::InvalidStatus {
            id: transaction_id,
            status: transaction.status,
        });
    }
    transaction.status = Status::Paid;
    info!("Paid {transaction_id}");
    Ok(())
}

/// Cancels every open installment of the group whose first installment is `parent`.
///
/// Installments that were already paid are left alone. A single payment (no group) can be
/// cancelled by passing its own id.
///
/// Returns the number of cancelled transactions.
/// # Errors
/// [`Error::NotFound`] if no transaction has that id or belongs to that group
pub fn cancel_group<S>(store: &mut S, parent: TransactionId) -> Result<usize, Error>
where
    S: TransactionStore,
    for<'a> &'a S: IntoIterator<Item = &'a Transaction>,
{
    let members: Vec<(TransactionId, Status)> = (&*store)
        .into_iter()
        .filter(|transaction| transaction.id == parent || transaction.parent == Some(parent))
        .map(|transaction| (transaction.id, transaction.status))
        .collect();
    if members.is_empty() {
        return Err(Error::NotFound(parent));
    }

    let mut cancelled = 0;
    for (id, status) in members {
        if !status.is_open() {
            continue;
        }
        if let Some(transaction) = store.transaction_mut(id)? {
            transaction.status = Status::Cancelled;
            cancelled += 1;
        }
    }
    info!("Cancelled {cancelled} open transaction(s) of group {parent}");
    Ok(cancelled)
}

/// Moves every pending transaction dated before `today` to [`Status::Overdue`].
///
/// Returns the number of transactions that changed.
pub fn mark_overdue<S>(store: &mut S, today: NaiveDate) -> Result<usize, Error>
where
    S: TransactionStore,
    for<'a> &'a S: IntoIterator<Item = &'a Transaction>,
{
    let late: Vec<TransactionId> = (&*store)
        .into_iter()
        .filter(|transaction| transaction.status == Status::Pending && transaction.date < today)
        .map(|transaction| transaction.id)
        .collect();
    for id in &late {
        if let Some(transaction) = store.transaction_mut(*id)? {
            transaction.status = Status::Overdue;
        }
    }
    if !late.is_empty() {
        info!("Marked {} transaction(s) overdue as of {today}", late.len());
    }
    Ok(late.len())
}

impl TransactionStore for MemoryTransactionStore {
    fn transaction(&self, transaction_id: TransactionId) -> Result<Option<&Transaction>, Error> {
        Ok(self.transactions.get(&transaction_id))
    }

    fn transaction_mut(
        &mut self,
        transaction_id: TransactionId,
    ) -> Result<Option<&mut Transaction>, Error> {
        Ok(self.transactions.get_mut(&transaction_id))
    }

    fn register(&mut self, transaction: Transaction) -> Result<(), Error> {
        if self.transactions.contains_key(&transaction.id) {
            return Err(Error::Duplicate(transaction.id));
        }
        self.transactions.insert(transaction.id, transaction);
        Ok(())
    }

    fn remove(&mut self, transaction_id: TransactionId) -> Result<Transaction, Error> {
        self.transactions
            .remove(&transaction_id)
            .ok_or(Error::NotFound(transaction_id))
    }

    fn next_id(&self) -> Result<TransactionId, Error> {
        match self.transactions.keys().next_back() {
            None => Ok(TransactionId::from(1)),
            Some(last) => last.checked_offset(1).ok_or_else(|| {
                Error::InvalidArgument(format!("no transaction id left after {last}"))
            }),
        }
    }
}

impl<'a> IntoIterator for &'a MemoryTransactionStore {
    type Item = &'a Transaction;

    type IntoIter = std::collections::btree_map::Values<'a, TransactionId, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.transactions.values()
    }
}

impl IntoIterator for MemoryTransactionStore {
    type Item = Transaction;
    type IntoIter = std::collections::btree_map::IntoValues<TransactionId, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.transactions.into_values()
    }
}
