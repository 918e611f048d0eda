use std::fmt;

use sha2::{Digest, Sha256};

use crate::account::AccountId;

/// The number printed on a card
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct CardNumber(String);

impl CardNumber {
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardNumber {
    fn from(number: &str) -> Self {
        Self::new(number)
    }
}

/// A bank card
///
/// The PIN is never kept in clear text. The card only stores a salted
/// SHA-256 digest of it, and [`Card::validate_pin`] compares digests in
/// constant time. A card cannot be changed after it was issued.
#[derive(Clone)]
pub struct Card {
    number: CardNumber,
    expiry: String,
    account: Option<AccountId>,
    salt: [u8; 16],
    pin_digest: [u8; 32],
}

impl Card {
    /// Issues a new card protected by `pin`
    ///
    /// The expiry is kept as an opaque marker, it is not interpreted.
    pub fn new(number: CardNumber, expiry: impl Into<String>, pin: &str) -> Self {
        let salt: [u8; 16] = rand::random();

        Self {
            number,
            expiry: expiry.into(),
            account: None,
            salt,
            pin_digest: pin_digest(&salt, pin),
        }
    }

    /// Links the card to the account it operates on
    pub fn linked_to(mut self, account: AccountId) -> Self {
        self.account = Some(account);
        self
    }

    pub fn number(&self) -> &CardNumber {
        &self.number
    }

    pub fn expiry(&self) -> &str {
        &self.expiry
    }

    /// The account the card operates on, if it is linked to one
    pub fn account(&self) -> Option<&AccountId> {
        self.account.as_ref()
    }

    /// Whether `input` is exactly the PIN the card was issued with
    pub fn validate_pin(&self, input: &str) -> bool {
        constant_time_eq(&pin_digest(&self.salt, input), &self.pin_digest)
    }

    /// A printable summary of the card, without the PIN
    pub fn details(&self) -> String {
        format!("Card Number: {}, Expiry: {}", self.number, self.expiry)
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Card")
            .field("number", &self.number)
            .field("expiry", &self.expiry)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

fn pin_digest(salt: &[u8; 16], pin: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(pin.as_bytes());

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter()
        .zip(b.iter())
        .fold(0u8, |diff, (x, y)| diff | (x ^ y))
        == 0
}
