//! Repository layer for database persistence.
//!
//! All database access uses Diesel with diesel-async. SQLite is the default
//! backend; PostgreSQL is available behind the `postgres` feature.

pub mod catalog;
pub mod diesel_context;
pub mod diesel_models;
pub mod orders;
pub mod pool;
pub mod util;

pub use catalog::{CatalogSource, DieselCatalogRepository, ImportOutcome};
pub use diesel_context::DieselDbContext;
pub use orders::{DieselOrderRepository, OrderStore};
pub use pool::{DbError, DbPool};
pub use util::{parse_datetime, redact_url_password};
