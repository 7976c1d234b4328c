use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Funds held by an account: base asset and quote currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balances {
    pub eth: f64,
    pub usd: f64,
}

impl Default for Balances {
    fn default() -> Self {
        Self {
            eth: 100.0,
            usd: 100_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub user_id: u64,
    pub account_key: String,
    pub email: String,
    pub balances: Balances,
}

/// In-memory account directory. The account key is a hash of the email;
/// user ids are random and only need to be unique, unlike order ids.
#[derive(Clone, Default)]
pub struct AccountStore {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn hash_email(email: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(email.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get_or_create(&self, email: &str) -> Account {
        let account_key = Self::hash_email(email);
        let mut accounts = self.accounts.lock().unwrap();

        if let Some(account) = accounts.get(&account_key) {
            return account.clone();
        }

        let account = Account {
            user_id: rand::random::<u64>(),
            account_key: account_key.clone(),
            email: email.to_string(),
            balances: Balances::default(),
        };
        accounts.insert(account_key, account.clone());
        account
    }

    pub fn get_by_user_id(&self, user_id: u64) -> Option<Account> {
        let accounts = self.accounts.lock().unwrap();
        accounts
            .values()
            .find(|account| account.user_id == user_id)
            .cloned()
    }

    /// Moves `base_amount` from seller to buyer and `quote_amount` the other
    /// way. A self-trade nets to zero and moves nothing.
    pub fn transfer(
        &self,
        seller_id: u64,
        buyer_id: u64,
        base_amount: f64,
        quote_amount: f64,
    ) -> Result<(), String> {
        let mut accounts = self.accounts.lock().unwrap();

        if seller_id == buyer_id {
            return if accounts.values().any(|a| a.user_id == seller_id) {
                Ok(())
            } else {
                Err(format!("user not found: {seller_id}"))
            };
        }

        let mut seller = None;
        let mut buyer = None;
        for account in accounts.values_mut() {
            if account.user_id == seller_id {
                seller = Some(account);
            } else if account.user_id == buyer_id {
                buyer = Some(account);
            }
        }
        let seller = seller.ok_or(format!("seller not found: {seller_id}"))?;
        let buyer = buyer.ok_or(format!("buyer not found: {buyer_id}"))?;

        seller.balances.eth -= base_amount;
        buyer.balances.eth += base_amount;
        buyer.balances.usd -= quote_amount;
        seller.balances.usd += quote_amount;

        Ok(())
    }
}
