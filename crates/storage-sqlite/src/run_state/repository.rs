use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use borrowscan_core::errors::{DatabaseError, Error, Result};
use borrowscan_core::run_state::{RunState, RunStateRepositoryTrait, RunStateUpdate};

use super::model::{RunStateChangesDB, RunStateDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::run_states;
use crate::schema::run_states::dsl::*;

/// Repository for per bot type run state.
pub struct RunStateRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl RunStateRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl RunStateRepositoryTrait for RunStateRepository {
    fn find_by_bot_type(&self, bot_type_param: &str) -> Result<Option<RunState>> {
        let mut conn = get_connection(&self.pool)?;

        let row = run_states
            .select(RunStateDB::as_select())
            .filter(bot_type.eq(bot_type_param))
            .first::<RunStateDB>(&mut conn)
            .optional()
            .into_core()?;

        row.map(|db| RunState::try_from(db).map_err(Error::from))
            .transpose()
    }

    async fn insert(&self, state: RunState) -> Result<RunState> {
        let state_db = RunStateDB::from(&state);
        self.writer
            .exec(move |conn| {
                diesel::insert_into(run_states::table)
                    .values(&state_db)
                    .execute(conn)
                    .into_core()?;
                Ok(state)
            })
            .await
    }

    async fn update(&self, id_param: &str, changes: RunStateUpdate) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let id_owned = id_param.to_string();
        let changes_db = RunStateChangesDB::from(changes);
        self.writer
            .exec(move |conn| {
                let affected = diesel::update(run_states.find(&id_owned))
                    .set(&changes_db)
                    .execute(conn)
                    .into_core()?;
                if affected == 0 {
                    return Err(Error::Database(DatabaseError::NotFound(format!(
                        "run state {}",
                        id_owned
                    ))));
                }
                Ok(())
            })
            .await
    }
}
