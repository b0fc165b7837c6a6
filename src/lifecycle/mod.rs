//! Storage-free order lifecycle rules. The database actor applies these inside its
//! transactions; everything here is plain data in, plain data out.

pub mod catalog;
pub mod order_plan;
pub mod report;
pub mod station;

pub use catalog::{ensure_single_shisha, ProductDraft, ProductRecord, ProductUpdate};
pub use order_plan::{plan_order, NewOrderRequest, OrderPlan, ProductEligibility};
pub use report::{summarize, OrderSummary, ReportWindow, SalesReport, StatusFilter};
pub use station::{ensure_station_has_work, StationBoard};
