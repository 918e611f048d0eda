use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::account::{Account, AccountError, AccountId};

/// The unique identifier of a transaction
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The different types of transactions an ATM can execute
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionType {
    /// A debit to the account, limited by its balance
    Withdrawal,
    /// A credit to the account
    Deposit,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Withdrawal => f.write_str("withdrawal"),
            TransactionType::Deposit => f.write_str("deposit"),
        }
    }
}

/// A single balance changing order against one account
///
/// A transaction only refers to its account by id. The account itself is
/// handed to [`Transaction::apply`] when the transaction is executed.
///
/// Executing a transaction is not idempotent. There is no log of executed
/// transaction ids, so applying the same transaction twice moves the funds
/// twice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    id: TransactionId,
    timestamp: DateTime<Utc>,
    transaction_type: TransactionType,
    account: AccountId,
    amount: Decimal,
}

impl Transaction {
    /// Creates a transaction, stamped with the current time
    pub fn new(
        id: TransactionId,
        transaction_type: TransactionType,
        amount: Decimal,
        account: AccountId,
    ) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            transaction_type,
            account,
            amount,
        }
    }

    pub fn withdrawal(id: TransactionId, amount: Decimal, account: AccountId) -> Self {
        Self::new(id, TransactionType::Withdrawal, amount, account)
    }

    pub fn deposit(id: TransactionId, amount: Decimal, account: AccountId) -> Self {
        Self::new(id, TransactionType::Deposit, amount, account)
    }

    /// The unique id of a transaction
    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    /// The moment the transaction was created
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The type of the transaction
    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    /// The account id this transaction is for
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Applies the transaction to `account`
    ///
    /// Withdrawals fail with [`AccountError::InsufficientFunds`] if the
    /// account cannot cover the amount, deposits fail with
    /// [`AccountError::InvalidAmount`] for amounts that are not positive.
    /// Any account other than the one the transaction is bound to is
    /// rejected with [`AccountError::WrongAccount`]. A failed transaction
    /// leaves the account untouched.
    pub fn apply(&self, account: &mut Account) -> Result<(), AccountError> {
        if account.id() != &self.account {
            return Err(AccountError::WrongAccount {
                bound: self.account.clone(),
                target: account.id().clone(),
            });
        }

        match self.transaction_type {
            TransactionType::Withdrawal => account.debit(self.amount),
            TransactionType::Deposit => account.credit(self.amount),
        }
    }
}
