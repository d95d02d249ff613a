use shelf::prelude::*;

register_schemas!(Product);

/// A product offered for sale.
#[derive(Clone, Debug, PartialEq, DatabaseModel)]
#[shelf(table = "products")]
pub struct Product {
    #[shelf(primary_key, auto_increment)]
    pub id: i32,
    pub name: String,
    pub price: f32,
}
