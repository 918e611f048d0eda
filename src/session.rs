use std::collections::HashMap;
use std::collections::hash_map::Entry;

use rust_decimal::Decimal;

use crate::{
    Account, AccountError, AccountId, Atm, AtmError, Bank, BankError, Card, CardNumber,
    Session, Transaction, TransactionId, TransactionType,
};

/// Possible errors to occur during the replay of an operation
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Atm(#[from] AtmError),
    #[error("The operation is missing the `{0}` column")]
    MissingField(&'static str),
    #[error("There's no card with the number {0}")]
    UnknownCard(CardNumber),
    #[error("There's already a card with the number {0}")]
    DuplicateCard(CardNumber),
    #[error("There's no authenticated card in the ATM")]
    NoCardInserted,
    #[error("There's already a card in the ATM")]
    CardAlreadyInserted,
    #[error("The operation {0:?} is not a transaction")]
    NotATransaction(OperationType),
}

/// The different operations of an ATM session
#[derive(Clone, Copy, Debug, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Opens an account with an initial balance
    Open,
    /// Issues a card for an account
    Issue,
    /// Inserts a card and enters a PIN
    Insert,
    /// Withdraws from the account of the inserted card
    Withdrawal,
    /// Deposits to the account of the inserted card
    Deposit,
    /// Moves funds between two accounts of the bank
    Transfer,
    /// Ejects the inserted card
    Eject,
}

impl TryFrom<OperationType> for TransactionType {
    type Error = SessionError;

    fn try_from(operation_type: OperationType) -> Result<Self, Self::Error> {
        match operation_type {
            OperationType::Withdrawal => Ok(TransactionType::Withdrawal),
            OperationType::Deposit => Ok(TransactionType::Deposit),
            OperationType::Open
            | OperationType::Issue
            | OperationType::Insert
            | OperationType::Transfer
            | OperationType::Eject => Err(SessionError::NotATransaction(operation_type)),
        }
    }
}

/// One row of a session file
///
/// Which of the optional columns are required depends on the operation type.
#[derive(Debug, serde::Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    operation_type: OperationType,
    account: Option<AccountId>,
    counterparty: Option<AccountId>,
    card: Option<CardNumber>,
    pin: Option<String>,
    expiry: Option<String>,
    tx: Option<TransactionId>,
    #[serde(with = "rust_decimal::serde::str_option")]
    amount: Option<Decimal>,
}

impl Operation {
    /// The type of the operation
    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }
}

/// Replays ATM sessions against a single bank
///
/// Only one card can be inserted into the ATM at a time. Withdrawals and
/// deposits always go through the authenticated card, transfers are bank
/// operations and need no card.
#[derive(Debug)]
pub struct SessionEngine {
    bank: Bank,
    atm: Atm,
    cards: HashMap<CardNumber, Card>,
    session: Option<Session>,
}

impl SessionEngine {
    /// Creates a new engine for an empty bank
    pub fn new(bank: Bank, atm: Atm) -> Self {
        Self {
            bank,
            atm,
            cards: HashMap::new(),
            session: None,
        }
    }

    /// The bank the sessions operate on
    pub fn bank(&self) -> &Bank {
        &self.bank
    }

    /// Processes one operation
    ///
    /// A failed operation has no effect on any account.
    pub fn handle_operation(&mut self, operation: Operation) -> Result<(), SessionError> {
        match operation.operation_type {
            OperationType::Open => {
                let id = required(operation.account, "account")?;
                let balance = operation.amount.unwrap_or(Decimal::ZERO);
                self.bank.open_account(Account::new(id, balance)?)?;
            }
            OperationType::Issue => {
                let number = required(operation.card, "card")?;
                let pin = required(operation.pin, "pin")?;
                let account = required(operation.account, "account")?;
                if !self.bank.verify_account(&account) {
                    return Err(BankError::UnknownAccount(account).into());
                }

                match self.cards.entry(number) {
                    Entry::Vacant(v) => {
                        let card = Card::new(v.key().clone(), operation.expiry.unwrap_or_default(), &pin);
                        v.insert(card.linked_to(account));
                    }
                    Entry::Occupied(o) => return Err(SessionError::DuplicateCard(o.key().clone())),
                }
            }
            OperationType::Insert => {
                if self.session.is_some() {
                    return Err(SessionError::CardAlreadyInserted);
                }
                let number = required(operation.card, "card")?;
                let pin = required(operation.pin, "pin")?;
                let card = self.cards
                    .get(&number)
                    .ok_or(SessionError::UnknownCard(number))?;

                self.session = Some(self.atm.insert_card(card, &pin)?);
            }
            OperationType::Withdrawal | OperationType::Deposit => {
                let session = self.session
                    .as_ref()
                    .ok_or(SessionError::NoCardInserted)?;
                let id = required(operation.tx, "tx")?;
                let amount = required(operation.amount, "amount")?;
                let account = match operation.account {
                    Some(account) => account,
                    None => session.card()
                        .account()
                        .cloned()
                        .ok_or_else(|| AtmError::UnlinkedCard(session.card().number().clone()))?,
                };
                let transaction_type = TransactionType::try_from(operation.operation_type)?;

                let transaction = Transaction::new(id, transaction_type, amount, account);
                self.atm.process_transaction(&self.bank, session, &transaction)?;
            }
            OperationType::Transfer => {
                let from = required(operation.account, "account")?;
                let to = required(operation.counterparty, "counterparty")?;
                let amount = required(operation.amount, "amount")?;
                self.bank.transfer(&from, &to, amount)?;
            }
            OperationType::Eject => {
                let session = self.session
                    .take()
                    .ok_or(SessionError::NoCardInserted)?;
                self.atm.eject_card(session);
            }
        }

        Ok(())
    }
}

fn required<T>(value: Option<T>, column: &'static str) -> Result<T, SessionError> {
    value.ok_or(SessionError::MissingField(column))
}
