//! Bank, credit and investment accounts whose balances feed the net worth figures

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{errors::Error, money::Cents, validation::sanitize_text};

/// Unique identifier for an account
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(u32);

impl From<u32> for AccountId {
    fn from(account_id: u32) -> Self {
        Self(account_id)
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "account[{}]", self.0)
    }
}

/// What an [`Account`] holds
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Everyday bank account
    Checking,
    /// Savings account
    Savings,
    /// Credit card; a negative balance is money owed
    Credit,
    /// Brokerage or other investment account
    Investment,
}

impl Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AccountKind::Checking => "checking",
            AccountKind::Savings => "savings",
            AccountKind::Credit => "credit",
            AccountKind::Investment => "investment",
        };
        f.write_str(name)
    }
}

impl FromStr for AccountKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "checking" => Ok(AccountKind::Checking),
            "savings" => Ok(AccountKind::Savings),
            "credit" => Ok(AccountKind::Credit),
            "investment" => Ok(AccountKind::Investment),
            other => Err(Error::InvalidArgument(format!("unknown account type {other:?}"))),
        }
    }
}

/// A named balance. Balances may be negative, e.g. an overdrawn or credit account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub(crate) id: AccountId,
    pub(crate) name: String,
    #[serde(rename = "type")]
    pub(crate) kind: AccountKind,
    pub(crate) balance: Cents,
}

impl Account {
    /// Creates an account, trimming the name and stripping markup characters from it.
    /// # Errors
    /// [`Error::InvalidArgument`] if the name is blank
    pub fn new(id: AccountId, name: &str, kind: AccountKind, balance: Cents) -> Result<Self, Error> {
        Ok(Self {
            id,
            name: account_name(name)?,
            kind,
            balance,
        })
    }

    /// Returns the unique identifier
    #[must_use]
    #[inline]
    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Returns the name
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns what the account holds
    #[must_use]
    #[inline]
    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    /// Returns the current balance
    #[must_use]
    #[inline]
    pub fn balance(&self) -> Cents {
        self.balance
    }

    /// Renames the account.
    /// # Errors
    /// [`Error::InvalidArgument`] if the name is blank; the account is left unchanged
    pub fn rename(&mut self, name: &str) -> Result<(), Error> {
        self.name = account_name(name)?;
        Ok(())
    }

    /// Replaces the balance, e.g. after reconciling with a bank statement
    pub fn set_balance(&mut self, balance: Cents) {
        self.balance = balance;
    }

    /// Adds `delta` (negative to withdraw) to the balance.
    /// # Errors
    /// [`Error::Overflow`] if the new balance does not fit; the account is left unchanged
    pub fn adjust_balance(&mut self, delta: Cents) -> Result<(), Error> {
        self.balance = self.balance.try_add(delta)?;
        Ok(())
    }
}

fn account_name(name: &str) -> Result<String, Error> {
    let name = sanitize_text(name);
    if name.is_empty() {
        return Err(Error::InvalidArgument("account name is required".into()));
    }
    Ok(name)
}

/// An interface to all accounts
pub trait AccountBook
where
    for<'a> &'a Self: IntoIterator<Item = &'a Account>,
    Self: Sized,
{
    /// Fetches an account by ID, if one exists
    fn account(&self, account_id: AccountId) -> Result<Option<&Account>, Error>;

    /// Fetches an account by ID for modification, if one exists
    fn account_mut(&mut self, account_id: AccountId) -> Result<Option<&mut Account>, Error>;

    /// Adds an account with the id it already carries.
    /// # Errors
    /// [`Error::DuplicateAccount`] if the id is taken
    fn insert(&mut self, account: Account) -> Result<(), Error>;

    /// Removes an account, returning it.
    /// # Errors
    /// [`Error::AccountNotFound`] if there is no such account
    fn remove(&mut self, account_id: AccountId) -> Result<Account, Error>;

    /// Creates an account under a fresh id and returns that id.
    /// # Errors
    /// [`Error::InvalidArgument`] for a blank name or when no id is left
    fn open(&mut self, name: &str, kind: AccountKind, balance: Cents) -> Result<AccountId, Error> {
        let id = (&*self)
            .into_iter()
            .map(|account| account.id.0)
            .max()
            .map_or(Some(1), |last| last.checked_add(1))
            .map(AccountId)
            .ok_or_else(|| Error::InvalidArgument("no account id left".into()))?;
        self.insert(Account::new(id, name, kind, balance)?)?;
        info!("Opened {kind} {id}");
        Ok(id)
    }
}

/// Holds all accounts in memory, ordered by id
#[derive(Default, Debug)]
pub struct MemoryAccountBook {
    pub(crate) accounts: BTreeMap<AccountId, Account>,
}

impl MemoryAccountBook {
    /// Creates a new, empty [`MemoryAccountBook`]
    #[must_use]
    pub fn new() -> Self {
        MemoryAccountBook::default()
    }

    /// Returns the number of accounts
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns whether there are no accounts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl AccountBook for MemoryAccountBook {
    fn account(&self, account_id: AccountId) -> Result<Option<&Account>, Error> {
        Ok(self.accounts.get(&account_id))
    }

    fn account_mut(&mut self, account_id: AccountId) -> Result<Option<&mut Account>, Error> {
        Ok(self.accounts.get_mut(&account_id))
    }

    fn insert(&mut self, account: Account) -> Result<(), Error> {
        if self.accounts.contains_key(&account.id) {
            return Err(Error::DuplicateAccount(account.id));
        }
        self.accounts.insert(account.id, account);
        Ok(())
    }

    fn remove(&mut self, account_id: AccountId) -> Result<Account, Error> {
        self.accounts
            .remove(&account_id)
            .ok_or(Error::AccountNotFound(account_id))
    }
}

impl<'a> IntoIterator for &'a MemoryAccountBook {
    type Item = &'a Account;

    type IntoIter = std::collections::btree_map::Values<'a, AccountId, Account>;

    fn into_iter(self) -> Self::IntoIter {
        self.accounts.values()
    }
}

impl IntoIterator for MemoryAccountBook {
    type Item = Account;
    type IntoIter = std::collections::btree_map::IntoValues<AccountId, Account>;

    fn into_iter(self) -> Self::IntoIter {
        self.accounts.into_values()
    }
}
