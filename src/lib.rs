pub use self::{
    account::{Account, AccountError, AccountId},
    atm::{Atm, AtmError, Session},
    bank::{Bank, BankError},
    card::{Card, CardNumber},
    customer::Customer,
    session::{Operation, OperationType, SessionEngine, SessionError},
    transaction::{Transaction, TransactionId, TransactionType},
};

mod account;
mod atm;
mod bank;
mod card;
mod customer;
mod session;
mod transaction;
