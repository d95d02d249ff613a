use std::{convert::TryFrom, fmt, str};

/// MySQL column types.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DatabaseType {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Decimal(Option<(u8, u8)>),
    Float,
    Double,
    VarChar(u32),
    Char(u32),
    Text,
    Blob,
    DateTime,
    Timestamp,
    Date,
    Time,
    Bool,
    Json,
}

/// Length used for `VARCHAR` columns without an explicit `max_len`.
pub const DEFAULT_VARCHAR_LEN: u32 = 255;

/// Precision and scale MySQL stores for a bare `DECIMAL`.
pub const DEFAULT_DECIMAL_PRECISION: (u8, u8) = (10, 0);

#[derive(Debug)]
pub struct DatabaseTypeFromStrError;

impl str::FromStr for DatabaseType {
    type Err = DatabaseTypeFromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let database_type = match s.to_ascii_lowercase().as_str() {
            "tinyint" => Self::TinyInt,
            "smallint" => Self::SmallInt,
            "int" | "integer" | "mediumint" => Self::Integer,
            "bigint" => Self::BigInt,
            "decimal" | "numeric" => Self::Decimal(None),
            "float" => Self::Float,
            "double" | "double precision" | "real" => Self::Double,
            "varchar" => Self::VarChar(DEFAULT_VARCHAR_LEN),
            "char" => Self::Char(1),
            "text" | "tinytext" | "mediumtext" | "longtext" => Self::Text,
            "blob" | "tinyblob" | "mediumblob" | "longblob" | "varbinary" | "binary" => {
                Self::Blob
            }
            "datetime" => Self::DateTime,
            "timestamp" => Self::Timestamp,
            "date" => Self::Date,
            "time" => Self::Time,
            "bool" | "boolean" => Self::Bool,
            "json" => Self::Json,
            _ => return Err(DatabaseTypeFromStrError),
        };
        Ok(database_type)
    }
}

impl DatabaseType {
    /// Builds a type from the `DATA_TYPE`, `COLUMN_TYPE` and
    /// `CHARACTER_MAXIMUM_LENGTH` columns of `information_schema.COLUMNS`.
    pub fn from_information_schema(
        data_type: &str,
        column_type: &str,
        max_len: Option<i64>,
    ) -> Result<Self, DatabaseTypeFromStrError> {
        let column_type = column_type.to_ascii_lowercase();
        if column_type.starts_with("tinyint(1)") {
            return Ok(Self::Bool);
        }

        let database_type = data_type.parse::<DatabaseType>()?;
        let len = max_len.and_then(|len| u32::try_from(len).ok());

        Ok(match database_type {
            Self::VarChar(_) => Self::VarChar(len.unwrap_or(DEFAULT_VARCHAR_LEN)),
            Self::Char(_) => Self::Char(len.unwrap_or(1)),
            Self::Decimal(None) => Self::Decimal(parse_precision(&column_type)),
            other => other,
        })
    }

    /// Whether both types are stored as the same column type, e.g. `DECIMAL`
    /// and `DECIMAL(10, 0)`.
    pub fn is_equivalent(&self, other: &DatabaseType) -> bool {
        self.stored() == other.stored()
    }

    fn stored(&self) -> DatabaseType {
        match self {
            Self::Decimal(None) => Self::Decimal(Some(DEFAULT_DECIMAL_PRECISION)),
            other => other.clone(),
        }
    }
}

fn parse_precision(column_type: &str) -> Option<(u8, u8)> {
    let args = column_type.split_once('(')?.1.split_once(')')?.0;
    let (precision, scale) = args.split_once(',')?;
    Some((precision.trim().parse().ok()?, scale.trim().parse().ok()?))
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TinyInt => write!(f, "TINYINT"),
            Self::SmallInt => write!(f, "SMALLINT"),
            Self::Integer => write!(f, "INTEGER"),
            Self::BigInt => write!(f, "BIGINT"),
            Self::Decimal(Some((p, s))) => write!(f, "DECIMAL({}, {})", p, s),
            Self::Decimal(None) => write!(f, "DECIMAL"),
            Self::Float => write!(f, "FLOAT"),
            Self::Double => write!(f, "DOUBLE"),
            Self::VarChar(len) => write!(f, "VARCHAR({})", len),
            Self::Char(len) => write!(f, "CHAR({})", len),
            Self::Text => write!(f, "TEXT"),
            Self::Blob => write!(f, "BLOB"),
            Self::DateTime => write!(f, "DATETIME"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
            Self::Date => write!(f, "DATE"),
            Self::Time => write!(f, "TIME"),
            Self::Bool => write!(f, "BOOLEAN"),
            Self::Json => write!(f, "JSON"),
        }
    }
}

#[derive(Clone, Debug, PartialOrd)]
pub enum DatabaseDefault {
    Bool(bool),
    Float(f64),
    Int(i64),
    Raw(String),
    String(String),
}

impl DatabaseDefault {
    /// Parses the text of `information_schema.COLUMNS.COLUMN_DEFAULT`.
    ///
    /// MySQL reports string defaults unquoted while MariaDB quotes them and
    /// spells a missing default as `NULL`; both are accepted.
    pub fn from_information_schema(def: &str) -> Option<Self> {
        if def.eq_ignore_ascii_case("null") {
            return None;
        }

        let default = if let Some(quoted) = def.strip_prefix('\'') {
            let s = quoted.strip_suffix('\'').unwrap_or(quoted);
            DatabaseDefault::String(s.replace("''", "'"))
        } else if let Ok(num) = def.parse::<i64>() {
            DatabaseDefault::Int(num)
        } else if let Ok(num) = def.parse::<f64>() {
            DatabaseDefault::Float(num)
        } else if is_sql_expression(def) {
            DatabaseDefault::Raw(def.to_string())
        } else {
            DatabaseDefault::String(def.to_string())
        };

        Some(default)
    }
}

fn is_sql_expression(def: &str) -> bool {
    let upper = def.to_ascii_uppercase();
    upper.starts_with("CURRENT_TIMESTAMP")
        || upper.starts_with("NOW(")
        || upper.starts_with("CURRENT_DATE")
        || upper.starts_with("CURRENT_TIME")
        || def.ends_with(')')
}

impl PartialEq for DatabaseDefault {
    fn eq(&self, other: &Self) -> bool {
        use DatabaseDefault::*;

        match (self, other) {
            (Bool(a), Bool(b)) => a == b,
            (Bool(b), Int(i)) | (Int(i), Bool(b)) => *i == i64::from(*b),
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Float(f), Int(i)) | (Int(i), Float(f)) => *f == *i as f64,
            // MySQL reports numeric-looking string defaults without quotes.
            (String(s), Int(i)) | (Int(i), String(s)) => *s == i.to_string(),
            (String(s), Float(f)) | (Float(f), String(s)) => s.parse::<f64>().ok() == Some(*f),
            (Raw(a), Raw(b)) => normalize_raw(a) == normalize_raw(b),
            (String(a), String(b)) => a == b,
            _ => false,
        }
    }
}

// `CURRENT_TIMESTAMP()` and `current_timestamp` are the same default.
fn normalize_raw(raw: &str) -> String {
    raw.trim_end_matches("()").to_ascii_lowercase()
}

impl fmt::Display for DatabaseDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseDefault::Bool(val) => write!(f, "{}", val),
            DatabaseDefault::Float(val) => write!(f, "{}", val),
            DatabaseDefault::Int(val) => write!(f, "{}", val),
            DatabaseDefault::Raw(val) => write!(f, "{}", val),
            DatabaseDefault::String(val) => write!(f, "'{}'", val.replace('\'', "''")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct DatabaseColumn {
    pub name: String,
    pub ty: DatabaseType,
    pub nullable: bool,
    pub default: Option<DatabaseDefault>,
    pub unique: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
}

impl DatabaseColumn {
    /// A `NOT NULL` column without default or keys.
    pub fn new(name: impl Into<String>, ty: DatabaseType) -> Self {
        DatabaseColumn {
            name: name.into(),
            ty,
            nullable: false,
            default: None,
            unique: false,
            primary_key: false,
            auto_increment: false,
        }
    }
}

pub trait IntoDatabaseSchema {
    fn database_schema() -> DatabaseSchema;
}

#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseSchema {
    /// Name of the Rust type the table was declared with.
    pub model_name: String,
    pub table_name: String,
    pub columns: Vec<DatabaseColumn>,
}

impl DatabaseSchema {
    pub fn column(&self, name: &str) -> Option<&DatabaseColumn> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|column| column.primary_key)
            .map(|column| column.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod test {
    use chrono::NaiveDateTime;

    use super::*;
    use crate as shelf;
    use crate::prelude::*;

    #[derive(DatabaseModel)]
    #[shelf(table = "products")]
    pub struct Product {
        #[shelf(primary_key, auto_increment)]
        pub id: i32,
        pub name: String,
        pub price: f32,
    }

    #[derive(DatabaseModel)]
    #[shelf(timestamps)]
    pub struct StockEntry {
        #[shelf(primary_key, auto_increment)]
        pub id: i64,
        #[shelf(unique, max_len = 64)]
        pub sku: String,
        #[shelf(default = 0)]
        pub quantity: i32,
        #[shelf(db_type = "Decimal(Some((10, 2)))")]
        pub unit_cost: f64,
        pub note: Option<String>,
        pub restocked_at: Option<NaiveDateTime>,
    }

    #[test]
    fn table_name() {
        assert_eq!(Product::database_schema().table_name, "products");
        assert_eq!(Product::database_schema().model_name, "Product");
        assert_eq!(StockEntry::database_schema().table_name, "stock_entry");
    }

    #[test]
    fn product_columns() {
        let columns = Product::database_schema().columns;
        let expected = vec![
            DatabaseColumn {
                name: "id".to_string(),
                ty: DatabaseType::Integer,
                nullable: false,
                default: None,
                unique: false,
                primary_key: true,
                auto_increment: true,
            },
            DatabaseColumn {
                name: "name".to_string(),
                ty: DatabaseType::VarChar(255),
                nullable: false,
                default: None,
                unique: false,
                primary_key: false,
                auto_increment: false,
            },
            DatabaseColumn {
                name: "price".to_string(),
                ty: DatabaseType::Float,
                nullable: false,
                default: None,
                unique: false,
                primary_key: false,
                auto_increment: false,
            },
        ];
        assert_eq!(columns, expected);
    }

    #[test]
    fn attributes_and_timestamps() {
        let schema = StockEntry::database_schema();
        let names: Vec<_> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "id",
                "sku",
                "quantity",
                "unit_cost",
                "note",
                "restocked_at",
                "created_at",
                "updated_at"
            ]
        );

        let sku = schema.column("sku").unwrap();
        assert_eq!(sku.ty, DatabaseType::VarChar(64));
        assert!(sku.unique);

        let quantity = schema.column("quantity").unwrap();
        assert_eq!(quantity.default, Some(DatabaseDefault::Int(0)));

        assert_eq!(
            schema.column("unit_cost").unwrap().ty,
            DatabaseType::Decimal(Some((10, 2)))
        );

        let note = schema.column("note").unwrap();
        assert!(note.nullable);
        assert_eq!(
            schema.column("restocked_at").unwrap().ty,
            DatabaseType::DateTime
        );

        let created_at = schema.column("created_at").unwrap();
        assert_eq!(created_at.ty, DatabaseType::DateTime);
        assert!(!created_at.nullable);
        assert_eq!(
            created_at.default,
            Some(DatabaseDefault::Raw("CURRENT_TIMESTAMP".to_string()))
        );

        assert_eq!(schema.primary_key_columns(), vec!["id"]);
    }

    #[test]
    fn information_schema_types() {
        let parse = |data_type, column_type, len| {
            DatabaseType::from_information_schema(data_type, column_type, len).ok()
        };

        assert_eq!(parse("int", "int(11)", None), Some(DatabaseType::Integer));
        assert_eq!(parse("int", "int", None), Some(DatabaseType::Integer));
        assert_eq!(
            parse("varchar", "varchar(255)", Some(255)),
            Some(DatabaseType::VarChar(255))
        );
        assert_eq!(parse("float", "float", None), Some(DatabaseType::Float));
        assert_eq!(parse("double", "double", None), Some(DatabaseType::Double));
        assert_eq!(parse("tinyint", "tinyint(1)", None), Some(DatabaseType::Bool));
        assert_eq!(parse("tinyint", "tinyint(4)", None), Some(DatabaseType::TinyInt));
        assert_eq!(
            parse("decimal", "decimal(10,2)", None),
            Some(DatabaseType::Decimal(Some((10, 2))))
        );
        assert_eq!(parse("geometry", "geometry", None), None);
    }

    #[test]
    fn bare_decimal_is_stored_with_default_precision() {
        let stored = DatabaseType::from_information_schema("decimal", "decimal(10,0)", None).unwrap();
        assert!(DatabaseType::Decimal(None).is_equivalent(&stored));
        assert!(stored.is_equivalent(&DatabaseType::Decimal(None)));
        assert!(!DatabaseType::Decimal(None).is_equivalent(&DatabaseType::Decimal(Some((10, 2)))));
        assert!(!DatabaseType::Float.is_equivalent(&DatabaseType::Double));
    }

    #[test]
    fn information_schema_defaults() {
        assert_eq!(DatabaseDefault::from_information_schema("NULL"), None);
        assert_eq!(
            DatabaseDefault::from_information_schema("0"),
            Some(DatabaseDefault::Int(0))
        );
        assert_eq!(
            DatabaseDefault::from_information_schema("9.5"),
            Some(DatabaseDefault::Float(9.5))
        );
        assert_eq!(
            DatabaseDefault::from_information_schema("'it''s'"),
            Some(DatabaseDefault::String("it's".to_string()))
        );
        assert_eq!(
            DatabaseDefault::from_information_schema("plain"),
            Some(DatabaseDefault::String("plain".to_string()))
        );
        assert_eq!(
            DatabaseDefault::from_information_schema("current_timestamp()"),
            Some(DatabaseDefault::Raw("CURRENT_TIMESTAMP".to_string()))
        );
    }

    #[test]
    fn default_equality() {
        assert_eq!(DatabaseDefault::Bool(true), DatabaseDefault::Int(1));
        assert_eq!(DatabaseDefault::Float(2.0), DatabaseDefault::Int(2));
        assert_eq!(
            DatabaseDefault::String("1".to_string()),
            DatabaseDefault::Int(1)
        );
        assert_ne!(
            DatabaseDefault::String("one".to_string()),
            DatabaseDefault::Int(1)
        );
        assert_eq!(
            DatabaseDefault::String("it's".to_string()).to_string(),
            "'it''s'"
        );
    }
}
