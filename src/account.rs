use std::fmt;

use rust_decimal::Decimal;

/// Possible errors to occur during account operations
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("The account does not hold enough funds")]
    InsufficientFunds,
    #[error("{0} is not a valid amount, amounts must be positive")]
    InvalidAmount(Decimal),
    #[error("An account cannot be opened with a negative balance of {0}")]
    InvalidAccountState(Decimal),
    #[error("The balance would exceed the largest representable amount")]
    BalanceOverflow,
    #[error("The transaction is bound to account {bound}, not to account {target}")]
    WrongAccount {
        bound: AccountId,
        target: AccountId,
    },
}

/// The unique identifier of an account
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A bank account holding a single balance
///
/// The balance is never negative. It can only be changed through
/// [`Account::debit`] and [`Account::credit`], which reject any amount
/// that is not strictly positive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    balance: Decimal,
}

impl Account {
    /// Opens an account with the specified initial balance
    pub fn new(id: AccountId, initial_balance: Decimal) -> Result<Self, AccountError> {
        if initial_balance < Decimal::ZERO {
            return Err(AccountError::InvalidAccountState(initial_balance));
        }

        Ok(Self {
            id,
            balance: initial_balance,
        })
    }

    /// The identifier of the account
    pub fn id(&self) -> &AccountId {
        &self.id
    }

    /// The current balance
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Takes the specified amount from the account
    ///
    /// Fails without touching the balance if the account does not hold
    /// at least `amount`.
    pub fn debit(&mut self, amount: Decimal) -> Result<(), AccountError> {
        check_positive(amount)?;
        if amount > self.balance {
            return Err(AccountError::InsufficientFunds);
        }
        self.balance -= amount;

        Ok(())
    }

    /// Adds the specified amount to the account
    pub fn credit(&mut self, amount: Decimal) -> Result<(), AccountError> {
        check_positive(amount)?;
        self.balance = self.balance
            .checked_add(amount)
            .ok_or(AccountError::BalanceOverflow)?;

        Ok(())
    }
}

fn check_positive(amount: Decimal) -> Result<(), AccountError> {
    match amount > Decimal::ZERO {
        true => Ok(()),
        false => Err(AccountError::InvalidAmount(amount)),
    }
}

impl serde::Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: serde::Serializer
    {
        use serde::ser::SerializeStruct;
        let mut map = serializer.serialize_struct("Account", 2)?;

        map.serialize_field("account", &self.id)?;
        map.serialize_field("balance", &self.balance)?;

        map.end()
    }
}
