use crate::database::DatabaseSchema;

/// A set of models whose tables are managed together.
pub trait Schema {
    fn database_schemas() -> Vec<DatabaseSchema> {
        Vec::new()
    }
}

#[macro_export]
macro_rules! register_schemas {
    ($( $name: ident ),*) => {
        pub struct Schema;

        impl $crate::schema::Schema for Schema {
            fn database_schemas() -> Vec<$crate::database::DatabaseSchema> {
                vec![ $( <$name as $crate::database::IntoDatabaseSchema>::database_schema(), )* ]
            }
        }
    };
}
