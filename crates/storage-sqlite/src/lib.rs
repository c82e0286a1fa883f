//! SQLite storage implementation for the borrowscan engine.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `borrowscan-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - The account and run-state repositories
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the application where Diesel dependencies exist.
//! The engine in `core` is database-agnostic and works with traits.
//!
//! ```text
//!          core (engine)
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```
//!
//! All writes go through a single writer actor, each in its own immediate
//! transaction, so a record is either fully replaced or left untouched.

pub mod db;
pub mod errors;
pub mod schema;

// Repository implementations
pub mod accounts;
pub mod run_state;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, open, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use accounts::AccountRepository;
pub use run_state::RunStateRepository;

// Re-export from borrowscan-core for convenience
pub use borrowscan_core::errors::{DatabaseError, Error, Result};
