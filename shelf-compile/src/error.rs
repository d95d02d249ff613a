#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("database has unsupported type in {0}.{1}")]
    UnsupportedType(String, String),
    #[error("table `{table}` does not match its model: {}", .changes.join("; "))]
    Drift { table: String, changes: Vec<String> },
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}
