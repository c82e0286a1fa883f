//! Database model for accounts.

use std::collections::BTreeMap;

use chrono::Utc;
use diesel::prelude::*;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use borrowscan_core::accounts::Account;

use crate::errors::StorageError;

/// Database model for accounts.
///
/// `balances` holds a JSON object mapping asset symbols to decimal strings,
/// which keeps arbitrarily large balances exact.
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::accounts)]
#[diesel(primary_key(address))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccountDB {
    pub address: String,
    pub balances: String,
    pub is_active: bool,
    pub updated_at: String,
}

impl From<&Account> for AccountDB {
    fn from(domain: &Account) -> Self {
        let balances: BTreeMap<&str, String> = domain
            .balances
            .iter()
            .map(|(symbol, balance)| (symbol.as_str(), balance.to_str_radix(10)))
            .collect();
        Self {
            address: domain.address.clone(),
            // A map of strings always serializes.
            balances: serde_json::to_string(&balances).unwrap_or_else(|_| "{}".to_string()),
            is_active: domain.is_active(),
            updated_at: Utc::now().to_rfc3339(),
        }
    }
}

impl TryFrom<AccountDB> for Account {
    type Error = StorageError;

    fn try_from(db: AccountDB) -> Result<Self, Self::Error> {
        let raw: BTreeMap<String, String> = serde_json::from_str(&db.balances).map_err(|e| {
            StorageError::Corrupt(format!("account {}: balances are not a JSON map: {}", db.address, e))
        })?;

        let mut balances = BTreeMap::new();
        for (symbol, value) in raw {
            let balance = BigUint::parse_bytes(value.as_bytes(), 10).ok_or_else(|| {
                StorageError::Corrupt(format!(
                    "account {}: {} balance '{}' is not a number",
                    db.address, symbol, value
                ))
            })?;
            balances.insert(symbol, balance);
        }

        Ok(Account {
            address: db.address,
            balances,
        })
    }
}
