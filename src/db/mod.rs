//! Database layer
//!
//! SQLite persistence for the membership system: connection pool creation,
//! code-embedded migrations, and per-aggregate repositories.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool};
