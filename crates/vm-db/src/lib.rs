//! vm-db: SQLite-backed media catalog.
//!
//! This crate provides connection pooling, embedded migrations, typed row
//! models, query modules for libraries and items, and [`SqliteCatalog`],
//! the production implementation of [`vm_core::Catalog`].

pub mod catalog;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

pub use catalog::SqliteCatalog;
