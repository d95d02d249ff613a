pub use crate::database::{
    DatabaseColumn, DatabaseDefault, DatabaseSchema, DatabaseType, IntoDatabaseSchema,
};
pub use crate::register_schemas;
pub use crate::schema::Schema;
pub use shelf_macros::DatabaseModel;
