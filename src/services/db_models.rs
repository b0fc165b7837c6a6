use chrono::{DateTime, Utc};
use diesel::{Queryable, Selectable};
use serde::Serialize;

use crate::lifecycle::{ProductEligibility, StationBoard};
use crate::types::{OrderStatus, ProductCategory, Role, StationState};

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::profiles)]
pub struct Profile {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::tables)]
#[serde(rename_all = "camelCase")]
pub struct VenueTable {
    pub id: i64,
    pub number: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::products)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: ProductCategory,
    pub price: f64,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn eligibility(&self) -> ProductEligibility {
        ProductEligibility {
            id: self.id,
            category: self.category,
            is_available: self.is_available,
        }
    }
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::orders)]
pub struct Order {
    pub id: i64,
    pub table_id: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::order_items)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub qty: i32,
    pub note: Option<String>,
}

#[derive(Queryable, Selectable, Debug, Clone, Copy)]
#[diesel(table_name = crate::schema::order_station_status)]
pub struct OrderStationStatus {
    pub order_id: i64,
    pub bar_status: StationState,
    pub shisha_status: StationState,
}

impl OrderStationStatus {
    pub fn board(&self) -> StationBoard {
        StationBoard {
            bar_status: self.bar_status,
            shisha_status: self.shisha_status,
        }
    }
}
