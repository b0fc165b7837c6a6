use actix::Message;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::lifecycle::{NewOrderRequest, OrderSummary, ProductDraft, StationBoard};
use crate::services::db_models::{Product, Profile, VenueTable};
use crate::types::{OrderStatus, Station};

#[derive(Message)]
#[rtype(result = "Result<Option<Profile>, AppError>")]
pub struct FetchProfileByEmail(pub String);

#[derive(Message)]
#[rtype(result = "Result<Vec<VenueTable>, AppError>")]
pub struct FetchActiveTables;

#[derive(Message)]
#[rtype(result = "Result<Vec<Product>, AppError>")]
pub struct FetchAvailableProducts;

#[derive(Message)]
#[rtype(result = "Result<Vec<Product>, AppError>")]
pub struct FetchAllProducts;

#[derive(Message)]
#[rtype(result = "Result<Product, AppError>")]
pub struct CreateProduct(pub ProductDraft);

#[derive(Message)]
#[rtype(result = "Result<Product, AppError>")]
pub struct UpdateProduct {
    pub id: i64,
    pub draft: ProductDraft,
}

#[derive(Message)]
#[rtype(result = "Result<(), AppError>")]
pub struct DeleteProduct(pub i64);

#[derive(Message)]
#[rtype(result = "Result<i64, AppError>")]
pub struct CreateOrder {
    pub created_by: i64,
    pub request: NewOrderRequest,
}

#[derive(Message)]
#[rtype(result = "Result<StationBoard, AppError>")]
pub struct MarkStationDone {
    pub order_id: i64,
    pub station: Station,
}

/// Orders newest first, optionally bounded by creation time and status.
#[derive(Message)]
#[rtype(result = "Result<Vec<OrderSummary>, AppError>")]
pub struct FetchOrders {
    pub since: Option<DateTime<Utc>>,
    pub statuses: Option<Vec<OrderStatus>>,
}
