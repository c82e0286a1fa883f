use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use log::debug;
use std::sync::Arc;

use borrowscan_core::accounts::{Account, AccountRepositoryTrait};
use borrowscan_core::errors::{Error, Result};

use super::model::AccountDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::accounts;
use crate::schema::accounts::dsl::*;

/// Repository for persisted borrower accounts.
pub struct AccountRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl AccountRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        Self { pool, writer }
    }

    /// Counts stored records, tombstones included.
    pub fn count(&self) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        accounts.count().get_result(&mut conn).into_core()
    }
}

#[async_trait]
impl AccountRepositoryTrait for AccountRepository {
    /// Loads every stored account, tombstones included.
    ///
    /// A record whose balances cannot be decoded fails the whole load.
    fn list_all(&self) -> Result<Vec<Account>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = accounts
            .select(AccountDB::as_select())
            .order(address.asc())
            .load::<AccountDB>(&mut conn)
            .into_core()?;

        debug!("Loaded {} stored accounts", rows.len());
        rows.into_iter()
            .map(|row| Account::try_from(row).map_err(Error::from))
            .collect()
    }

    /// Inserts the account or replaces the stored record with the same address.
    async fn upsert(&self, account: Account) -> Result<Account> {
        let account_db = AccountDB::from(&account);
        self.writer
            .exec(move |conn| {
                diesel::insert_into(accounts::table)
                    .values(&account_db)
                    .on_conflict(address)
                    .do_update()
                    .set(&account_db)
                    .execute(conn)
                    .into_core()?;
                Ok(account)
            })
            .await
    }

    async fn delete(&self, address_param: &str) -> Result<usize> {
        let address_owned = address_param.to_string();
        self.writer
            .exec(move |conn| {
                diesel::delete(accounts.find(address_owned))
                    .execute(conn)
                    .into_core()
            })
            .await
    }
}
