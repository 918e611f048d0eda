use crate::{AccountId, Bank, BankError, Card, CardNumber, Transaction};

/// Possible errors to occur while operating an ATM
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AtmError {
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error("The entered PIN does not match the card")]
    AuthenticationFailure,
    #[error("The card {0} is not linked to any account")]
    UnlinkedCard(CardNumber),
    #[error("The card is linked to account {linked}, not to account {requested}")]
    AccountMismatch {
        linked: AccountId,
        requested: AccountId,
    },
}

/// An automated teller machine
///
/// The ATM is the authorization gate in front of the bank: transactions can
/// only be processed through a [`Session`], and a session only exists after
/// the PIN of the inserted card was validated.
#[derive(Clone, Debug)]
pub struct Atm {
    location: String,
    id: String,
}

/// An authenticated card inside an ATM
///
/// Only [`Atm::insert_card`] can create a session.
#[derive(Debug)]
pub struct Session {
    card: Card,
}

impl Session {
    pub fn card(&self) -> &Card {
        &self.card
    }
}

impl Atm {
    pub fn new(location: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            id: id.into(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether `pin` is the PIN of `card`
    ///
    /// This does not change any state, failed attempts are not counted.
    pub fn validate_card(&self, card: &Card, pin: &str) -> bool {
        card.validate_pin(pin)
    }

    /// Validates the card and opens a session for it
    pub fn insert_card(&self, card: &Card, pin: &str) -> Result<Session, AtmError> {
        if !self.validate_card(card, pin) {
            tracing::warn!(atm = %self.id, card = %card.number(), "invalid PIN");
            return Err(AtmError::AuthenticationFailure);
        }
        tracing::info!(atm = %self.id, card = %card.number(), "card validated");

        Ok(Session { card: card.clone() })
    }

    /// Ends the session and hands the card back
    pub fn eject_card(&self, session: Session) {
        tracing::info!(atm = %self.id, card = %session.card.number(), "card ejected");
    }

    /// Executes a transaction for the authenticated card
    ///
    /// The transaction has to target the account the card is linked to.
    pub fn process_transaction(
        &self,
        bank: &Bank,
        session: &Session,
        transaction: &Transaction,
    ) -> Result<(), AtmError> {
        let linked = session.card
            .account()
            .ok_or_else(|| AtmError::UnlinkedCard(session.card.number().clone()))?;
        if linked != transaction.account() {
            return Err(AtmError::AccountMismatch {
                linked: linked.clone(),
                requested: transaction.account().clone(),
            });
        }

        bank.execute(transaction)?;

        Ok(())
    }
}
