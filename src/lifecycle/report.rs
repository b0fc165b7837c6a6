//! Read-side order views and the admin sales aggregation.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::lifecycle::station::StationBoard;
use crate::types::{OrderStatus, ProductCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportWindow {
    #[default]
    Today,
    Week,
}

impl ReportWindow {
    /// Local midnight today, or local midnight of the last Sunday.
    pub fn start<Tz: TimeZone>(self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let today = now.date_naive();
        let day = match self {
            ReportWindow::Today => today,
            ReportWindow::Week => {
                today - Duration::days(i64::from(today.weekday().num_days_from_sunday()))
            }
        };

        let midnight = day.and_time(NaiveTime::MIN);
        now.timezone()
            .from_local_datetime(&midnight)
            .earliest()
            .unwrap_or_else(|| now.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    New,
    InProgress,
    Completed,
}

impl StatusFilter {
    pub fn status(self) -> Option<OrderStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::New => Some(OrderStatus::New),
            StatusFilter::InProgress => Some(OrderStatus::InProgress),
            StatusFilter::Completed => Some(OrderStatus::Completed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub name: String,
    pub category: ProductCategory,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineView {
    pub id: i64,
    pub qty: i32,
    pub note: Option<String>,
    pub product: Option<ProductRef>,
}

/// An order joined with its table number, station flags and item lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: i64,
    pub status: OrderStatus,
    pub table_id: i64,
    pub table_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub station: Option<StationBoard>,
    pub items: Vec<OrderLineView>,
}

impl OrderSummary {
    pub fn contains_category(&self, category: ProductCategory) -> bool {
        self.items
            .iter()
            .any(|line| line.product.as_ref().map(|p| p.category) == Some(category))
    }

    /// Missing products count as zero.
    pub fn subtotal(&self) -> f64 {
        self.items
            .iter()
            .map(|line| {
                let price = line.product.as_ref().map_or(0.0, |p| p.price);
                f64::from(line.qty) * price
            })
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub order_count: usize,
    pub total_revenue: f64,
    pub orders: Vec<OrderSummary>,
}

pub fn summarize(orders: Vec<OrderSummary>) -> SalesReport {
    let total_revenue = orders.iter().map(OrderSummary::subtotal).sum();

    SalesReport {
        order_count: orders.len(),
        total_revenue,
        orders,
    }
}
