//! Database models for run state.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use borrowscan_core::run_state::{CursorMap, RunState, RunStateUpdate};

use crate::errors::StorageError;

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::run_states)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RunStateDB {
    pub id: String,
    pub bot_type: String,
    pub last_wake_at: Option<String>,
    pub last_sleep_at: Option<String>,
    /// JSON object: asset symbol -> block number.
    pub cursors: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update; `None` columns are left untouched.
#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = crate::schema::run_states)]
pub struct RunStateChangesDB {
    pub last_wake_at: Option<String>,
    pub last_sleep_at: Option<String>,
    pub cursors: Option<String>,
    pub updated_at: Option<String>,
}

fn encode_cursors(cursors: &CursorMap) -> String {
    serde_json::to_string(cursors).unwrap_or_else(|_| "{}".to_string())
}

fn parse_timestamp(id: &str, value: Option<String>) -> Result<Option<DateTime<Utc>>, StorageError> {
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|at| at.with_timezone(&Utc))
                .map_err(|e| {
                    StorageError::Corrupt(format!("run state {}: bad timestamp '{}': {}", id, raw, e))
                })
        })
        .transpose()
}

impl From<&RunState> for RunStateDB {
    fn from(domain: &RunState) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: domain.id.clone(),
            bot_type: domain.bot_type.clone(),
            last_wake_at: domain.last_wake_at.map(|at| at.to_rfc3339()),
            last_sleep_at: domain.last_sleep_at.map(|at| at.to_rfc3339()),
            cursors: encode_cursors(&domain.cursors),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

impl TryFrom<RunStateDB> for RunState {
    type Error = StorageError;

    fn try_from(db: RunStateDB) -> Result<Self, Self::Error> {
        let cursors: CursorMap = serde_json::from_str(&db.cursors).map_err(|e| {
            StorageError::Corrupt(format!("run state {}: bad cursors: {}", db.id, e))
        })?;
        let last_wake_at = parse_timestamp(&db.id, db.last_wake_at)?;
        let last_sleep_at = parse_timestamp(&db.id, db.last_sleep_at)?;

        Ok(RunState {
            id: db.id,
            bot_type: db.bot_type,
            last_wake_at,
            last_sleep_at,
            cursors,
        })
    }
}

impl From<RunStateUpdate> for RunStateChangesDB {
    fn from(update: RunStateUpdate) -> Self {
        Self {
            last_wake_at: update.last_wake_at.map(|at| at.to_rfc3339()),
            last_sleep_at: update.last_sleep_at.map(|at| at.to_rfc3339()),
            cursors: update.cursors.as_ref().map(encode_cursors),
            updated_at: Some(Utc::now().to_rfc3339()),
        }
    }
}
