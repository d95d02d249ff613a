mod database_model;

pub use database_model::expand_derive_database_model;
