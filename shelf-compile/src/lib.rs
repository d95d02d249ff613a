//! # shelf-compile
//!
//! Connects to MySQL, compares the tables declared with
//! [`shelf`](https://docs.rs/shelf) against `information_schema`, and creates
//! or aligns them.

pub mod bootstrap;
pub mod connection;
pub mod database;
pub mod error;
#[cfg(test)]
mod tests_cfg;
