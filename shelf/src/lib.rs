//! # Shelf
//!
//! Shelf treats your rust structs as the source of truth for **MySQL tables**.
//! A struct deriving [`DatabaseModel`](prelude::DatabaseModel) describes its
//! table, and `shelf-compile` reconciles that description with a live database.

pub use shelf_macros as macros;

pub mod database;
pub mod prelude;
pub mod schema;
