use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::{Account, AccountError, AccountId, Transaction};

/// Possible errors to occur during bank operations
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BankError {
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error("The account {0} is not held by this bank")]
    UnknownAccount(AccountId),
    #[error("There's already an account with the id {0}")]
    DuplicateAccount(AccountId),
}

/// The bank holding all accounts
///
/// Every account sits behind its own lock. Each debit or credit locks only
/// the account it touches, and only for the duration of that single call, so
/// transfers never hold two locks at once and cannot deadlock each other.
/// A `&Bank` can be shared between threads.
#[derive(Debug)]
pub struct Bank {
    name: String,
    code: String,
    accounts: BTreeMap<AccountId, Mutex<Account>>,
}

impl Bank {
    /// Creates a new bank without any accounts
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            accounts: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Takes custody of an account
    pub fn open_account(&mut self, account: Account) -> Result<(), BankError> {
        match self.accounts.entry(account.id().clone()) {
            Entry::Vacant(v) => {
                tracing::debug!(account = %account.id(), balance = %account.balance(), "opened account");
                v.insert(Mutex::new(account));
                Ok(())
            }
            Entry::Occupied(o) => Err(BankError::DuplicateAccount(o.key().clone())),
        }
    }

    /// Whether the bank holds an account with the specified id
    pub fn verify_account(&self, id: &AccountId) -> bool {
        self.accounts.contains_key(id)
    }

    /// The current balance of an account
    pub fn balance(&self, id: &AccountId) -> Result<Decimal, BankError> {
        self.with_account(id, |account| account.balance())
    }

    /// A snapshot of all accounts, ordered by id
    pub fn accounts(&self) -> Vec<Account> {
        self.accounts
            .values()
            .map(|account| account.lock().clone())
            .collect()
    }

    /// Executes a transaction against the account it is bound to
    pub fn execute(&self, transaction: &Transaction) -> Result<(), BankError> {
        let applied = self.with_account(transaction.account(), |account| transaction.apply(account))
            .and_then(|applied| applied.map_err(BankError::from));
        if let Err(error) = applied {
            tracing::warn!(
                transaction = %transaction.id(),
                kind = %transaction.transaction_type(),
                account = %transaction.account(),
                amount = %transaction.amount(),
                %error,
                "rejected transaction"
            );
            return Err(error);
        }
        tracing::debug!(
            transaction = %transaction.id(),
            kind = %transaction.transaction_type(),
            account = %transaction.account(),
            amount = %transaction.amount(),
            "executed transaction"
        );

        Ok(())
    }

    /// Moves `amount` from one account to another
    ///
    /// The source is debited first and the destination is only credited if
    /// that succeeded. Both accounts and the amount are checked up front, so
    /// a failing transfer leaves both balances untouched.
    ///
    /// The one exception is a destination balance that would overflow. The
    /// source is refunded then, and if that refund overflows as well (the
    /// source was credited up to [`Decimal::MAX`] in the meantime) the debited
    /// funds are lost and only an error event is logged.
    pub fn transfer(&self, from: &AccountId, to: &AccountId, amount: Decimal) -> Result<(), BankError> {
        let transferred = self.try_transfer(from, to, amount);
        if let Err(error) = &transferred {
            tracing::warn!(from = %from, to = %to, %amount, %error, "rejected transfer");
        }

        transferred
    }

    fn try_transfer(&self, from: &AccountId, to: &AccountId, amount: Decimal) -> Result<(), BankError> {
        if amount <= Decimal::ZERO {
            return Err(AccountError::InvalidAmount(amount).into());
        }
        let source = self.account(from)?;
        let destination = self.account(to)?;

        source.lock().debit(amount)?;
        let credited = destination.lock().credit(amount);
        if let Err(error) = credited {
            // only reachable on overflow of the destination balance
            if let Err(refund) = source.lock().credit(amount) {
                tracing::error!(account = %from, %amount, %refund, "failed to refund aborted transfer");
            }
            return Err(error.into());
        }
        tracing::debug!(from = %from, to = %to, %amount, "transferred funds");

        Ok(())
    }

    fn account(&self, id: &AccountId) -> Result<&Mutex<Account>, BankError> {
        self.accounts
            .get(id)
            .ok_or_else(|| BankError::UnknownAccount(id.clone()))
    }

    fn with_account<T>(&self, id: &AccountId, f: impl FnOnce(&mut Account) -> T) -> Result<T, BankError> {
        let account = self.account(id)?;
        let mut guard = account.lock();
        Ok(f(&mut *guard))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rust_decimal_macros::dec;
    use tracing_subscriber::layer::{self, Layer, SubscriberExt};

    use super::*;

    fn bank(accounts: &[(&str, Decimal)]) -> Bank {
        let mut bank = Bank::new("Example Bank", "EB123");
        for (id, balance) in accounts {
            bank.open_account(Account::new(AccountId::new(*id), *balance).unwrap()).unwrap();
        }
        bank
    }

    fn balances(bank: &Bank) -> Vec<(String, Decimal)> {
        bank.accounts()
            .iter()
            .map(|account| (account.id().to_string(), account.balance()))
            .collect()
    }

    #[test]
    fn duplicate_account() {
        let mut bank = bank(&[("A", dec!(100))]);
        assert_eq!(
            bank.open_account(Account::new("A".into(), dec!(5)).unwrap()),
            Err(BankError::DuplicateAccount("A".into())),
        );
        assert_eq!(bank.balance(&"A".into()), Ok(dec!(100)));
    }

    #[test]
    fn verify_account() {
        let bank = bank(&[("A", dec!(100))]);
        assert!(bank.verify_account(&"A".into()));
        assert!(!bank.verify_account(&"B".into()));
        assert_eq!(bank.name(), "Example Bank");
        assert_eq!(bank.code(), "EB123");
    }

    #[test]
    fn transfer() {
        let bank = bank(&[("A", dec!(100)), ("B", dec!(50))]);
        assert_eq!(bank.transfer(&"A".into(), &"B".into(), dec!(30)), Ok(()));
        assert_eq!(balances(&bank), vec![("A".to_string(), dec!(70)), ("B".to_string(), dec!(80))]);
    }

    #[test]
    fn transfer_insufficient_funds() {
        let bank = bank(&[("A", dec!(100)), ("B", dec!(50))]);
        assert_eq!(
            bank.transfer(&"A".into(), &"B".into(), dec!(150)),
            Err(BankError::Account(AccountError::InsufficientFunds)),
        );
        assert_eq!(balances(&bank), vec![("A".to_string(), dec!(100)), ("B".to_string(), dec!(50))]);
    }

    #[test]
    fn transfer_invalid_amount() {
        let bank = bank(&[("A", dec!(100)), ("B", dec!(50))]);
        assert_eq!(
            bank.transfer(&"A".into(), &"B".into(), dec!(-10)),
            Err(BankError::Account(AccountError::InvalidAmount(dec!(-10)))),
        );
        assert_eq!(
            bank.transfer(&"A".into(), &"B".into(), dec!(0)),
            Err(BankError::Account(AccountError::InvalidAmount(dec!(0)))),
        );
        assert_eq!(balances(&bank), vec![("A".to_string(), dec!(100)), ("B".to_string(), dec!(50))]);
    }

    #[test]
    fn transfer_to_unknown_account() {
        let bank = bank(&[("A", dec!(100))]);
        assert_eq!(
            bank.transfer(&"A".into(), &"Z".into(), dec!(10)),
            Err(BankError::UnknownAccount("Z".into())),
        );
        assert_eq!(bank.balance(&"A".into()), Ok(dec!(100)));
    }

    #[test]
    fn transfer_to_same_account() {
        let bank = bank(&[("A", dec!(100))]);
        assert_eq!(bank.transfer(&"A".into(), &"A".into(), dec!(60)), Ok(()));
        assert_eq!(bank.balance(&"A".into()), Ok(dec!(100)));
    }

    #[test]
    fn transfer_overflowing_destination_is_refunded() {
        let bank = bank(&[("A", dec!(100)), ("B", Decimal::MAX)]);
        assert_eq!(
            bank.transfer(&"A".into(), &"B".into(), dec!(10)),
            Err(BankError::Account(AccountError::BalanceOverflow)),
        );
        assert_eq!(balances(&bank), vec![("A".to_string(), dec!(100)), ("B".to_string(), Decimal::MAX)]);
    }

    #[test]
    fn execute_unknown_account() {
        let bank = bank(&[]);
        let deposit = Transaction::deposit("TXN001".into(), dec!(10), "A".into());
        assert_eq!(bank.execute(&deposit), Err(BankError::UnknownAccount("A".into())));
    }

    #[derive(Clone, Default)]
    struct WarningCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarningCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _: layer::Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn rejected_operations_are_logged() {
        let bank = bank(&[("A", dec!(100)), ("B", dec!(50))]);
        let warnings = WarningCounter::default();
        let subscriber = tracing_subscriber::registry().with(warnings.clone());

        tracing::subscriber::with_default(subscriber, || {
            let deposit = Transaction::deposit("TXN001".into(), dec!(10), "A".into());
            assert_eq!(bank.execute(&deposit), Ok(()));
            assert_eq!(bank.transfer(&"A".into(), &"B".into(), dec!(10)), Ok(()));
            assert_eq!(warnings.0.load(Ordering::SeqCst), 0);

            let withdrawal = Transaction::withdrawal("TXN002".into(), dec!(1000), "A".into());
            assert!(bank.execute(&withdrawal).is_err());
            let deposit = Transaction::deposit("TXN003".into(), dec!(10), "Z".into());
            assert!(bank.execute(&deposit).is_err());
            assert!(bank.transfer(&"A".into(), &"B".into(), dec!(1000)).is_err());
            assert!(bank.transfer(&"A".into(), &"B".into(), dec!(0)).is_err());
        });

        assert_eq!(warnings.0.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn concurrent_withdrawals_never_overdraw() {
        let bank = bank(&[("A", dec!(500))]);
        let withdrawal = Transaction::withdrawal("TXN001".into(), dec!(1), "A".into());

        let succeeded: usize = std::thread::scope(|scope| {
            let handles = (0..8)
                .map(|_| scope.spawn(|| {
                    (0..100)
                        .filter(|_| bank.execute(&withdrawal).is_ok())
                        .count()
                }))
                .collect::<Vec<_>>();
            handles.into_iter().map(|handle| handle.join().unwrap()).sum()
        });

        assert_eq!(succeeded, 500);
        assert_eq!(bank.balance(&"A".into()), Ok(dec!(0)));
    }

    #[test]
    fn opposite_transfers_do_not_deadlock() {
        let bank = bank(&[("A", dec!(1000)), ("B", dec!(1000))]);
        let (a, b) = (AccountId::new("A"), AccountId::new("B"));

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..1000 {
                    let _ = bank.transfer(&a, &b, dec!(3));
                }
            });
            scope.spawn(|| {
                for _ in 0..1000 {
                    let _ = bank.transfer(&b, &a, dec!(2));
                }
            });
        });

        let (a, b) = (bank.balance(&a).unwrap(), bank.balance(&b).unwrap());
        assert!(a >= dec!(0) && b >= dec!(0));
        assert_eq!(a + b, dec!(2000));
    }
}
