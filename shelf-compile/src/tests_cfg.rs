use std::{cell::RefCell, sync::Once};

use log::{Level, Log, Metadata, Record};
use shelf::prelude::*;

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
    #[shelf(db_type = "Text")]
    pub note: Option<String>,
}

pub fn product_schema() -> DatabaseSchema {
    Product::database_schema()
}

/// The columns MySQL reports for `products` once it has been created.
pub fn live_product_columns() -> Vec<DatabaseColumn> {
    vec![
        DatabaseColumn {
            primary_key: true,
            auto_increment: true,
            ..DatabaseColumn::new("id", DatabaseType::Integer)
        },
        DatabaseColumn::new("name", DatabaseType::VarChar(255)),
        DatabaseColumn::new("price", DatabaseType::Float),
    ]
}

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = RefCell::new(Vec::new());
}

/// Collects the records logged by this crate on the current thread.
struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("shelf_compile")
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            RECORDS.with(|records| {
                records
                    .borrow_mut()
                    .push((record.level(), record.args().to_string()))
            });
        }
    }

    fn flush(&self) {}
}

static CAPTURE_LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

/// Starts capturing log records on the current thread, dropping earlier ones.
pub fn capture_logs() {
    INIT.call_once(|| {
        log::set_logger(&CAPTURE_LOGGER).expect("logger already set");
        log::set_max_level(log::LevelFilter::Trace);
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

/// Records captured at `level` or above, oldest first.
pub fn captured_logs(level: Level) -> Vec<String> {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|(record_level, _)| *record_level <= level)
            .map(|(_, message)| message.clone())
            .collect()
    })
}
