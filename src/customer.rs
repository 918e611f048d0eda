use crate::AccountId;

/// A bank customer and the accounts they hold
///
/// Customers only reference their accounts by id, the accounts themselves
/// are kept by the [`Bank`](crate::Bank).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Customer {
    id: String,
    name: String,
    address: String,
    accounts: Vec<AccountId>,
}

impl Customer {
    pub fn new(id: impl Into<String>, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: address.into(),
            accounts: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Adds an account to the customer, ignoring accounts they already hold
    pub fn add_account(&mut self, account: AccountId) {
        if !self.accounts.contains(&account) {
            self.accounts.push(account);
        }
    }

    pub fn accounts(&self) -> &[AccountId] {
        &self.accounts
    }
}
