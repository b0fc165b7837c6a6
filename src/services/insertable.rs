use diesel::{AsChangeset, Insertable};
use serde::Serialize;

use crate::lifecycle::ProductRecord;
use crate::schema::order_items;
use crate::schema::order_station_status;
use crate::schema::orders;
use crate::schema::products;
use crate::types::{OrderStatus, ProductCategory, StationState};

#[derive(Insertable, AsChangeset, Serialize, Clone)]
#[diesel(table_name = products)]
pub struct NewProduct {
    pub name: String,
    pub category: ProductCategory,
    pub price: f64,
    pub is_available: bool,
}

impl From<ProductRecord> for NewProduct {
    fn from(record: ProductRecord) -> Self {
        NewProduct {
            name: record.name,
            category: record.category,
            price: record.price,
            is_available: record.is_available,
        }
    }
}

#[derive(Insertable, Serialize, Clone)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub table_id: i64,
    pub created_by_user: i64,
    pub status: OrderStatus,
}

#[derive(Insertable, Serialize, Clone)]
#[diesel(table_name = order_station_status)]
pub struct NewStationStatus {
    pub order_id: i64,
    pub bar_status: StationState,
    pub shisha_status: StationState,
}

#[derive(Insertable, Serialize, Clone)]
#[diesel(table_name = order_items)]
pub struct NewOrderItem {
    pub order_id: i64,
    pub product_id: i64,
    pub qty: i32,
    pub note: Option<String>,
}
