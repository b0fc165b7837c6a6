//! Order creation planning: shape checks, item eligibility and the initial station
//! flags. Everything here runs before the first row is written.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::lifecycle::station::StationBoard;
use crate::types::{ProductCategory, MAX_NOTE_LEN, MAX_QTY, MIN_QTY};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    #[validate(range(min = 1, message = "malformed product id"))]
    pub product_id: i64,
    #[validate(range(min = MIN_QTY, max = MAX_QTY, message = "qty must be between 1 and 20"))]
    pub qty: i32,
    #[validate(length(max = MAX_NOTE_LEN, message = "note is too long"))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    #[validate(range(min = 1, message = "malformed table id"))]
    pub table_id: i64,
    #[validate(length(min = 1, message = "Select at least one item."), nested)]
    pub items: Vec<OrderLineInput>,
}

/// The slice of a product row that decides whether it can be ordered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductEligibility {
    pub id: i64,
    pub category: ProductCategory,
    pub is_available: bool,
}

/// One item row ready for insertion. Blank notes are already `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLine {
    pub product_id: i64,
    pub qty: i32,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlan {
    pub table_id: i64,
    pub board: StationBoard,
    pub lines: Vec<PlannedLine>,
}

impl NewOrderRequest {
    pub fn product_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.items.iter().map(|item| item.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

fn trimmed_note(note: Option<&str>) -> Option<String> {
    note.map(str::trim)
        .filter(|note| !note.is_empty())
        .map(str::to_owned)
}

/// Checks every item against the fetched products and derives the station flags.
///
/// Fails on the first ineligible item, so no row gets written for a bad request.
pub fn plan_order(
    request: &NewOrderRequest,
    products: &[ProductEligibility],
) -> Result<OrderPlan, AppError> {
    request.validate()?;

    let by_id: HashMap<i64, &ProductEligibility> =
        products.iter().map(|product| (product.id, product)).collect();

    let mut categories = Vec::with_capacity(request.items.len());
    let mut lines = Vec::with_capacity(request.items.len());

    for item in &request.items {
        let product = match by_id.get(&item.product_id) {
            Some(product) if product.is_available => product,
            _ => return Err(AppError::unavailable_products()),
        };

        let note = trimmed_note(item.note.as_deref());
        if product.category == ProductCategory::Shisha && note.is_none() {
            return Err(AppError::MissingRequiredField);
        }

        categories.push(product.category);
        lines.push(PlannedLine {
            product_id: item.product_id,
            qty: item.qty,
            note,
        });
    }

    Ok(OrderPlan {
        table_id: request.table_id,
        board: StationBoard::from_categories(categories),
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StationState::{Done, Pending};

    const COLA: i64 = 1;
    const NARGILA: i64 = 2;
    const SOLD_OUT_BEER: i64 = 3;

    fn catalog() -> Vec<ProductEligibility> {
        vec![
            ProductEligibility { id: COLA, category: ProductCategory::Drink, is_available: true },
            ProductEligibility { id: NARGILA, category: ProductCategory::Shisha, is_available: true },
            ProductEligibility { id: SOLD_OUT_BEER, category: ProductCategory::Drink, is_available: false },
        ]
    }

    fn line(product_id: i64, qty: i32, note: Option<&str>) -> OrderLineInput {
        OrderLineInput { product_id, qty, note: note.map(str::to_owned) }
    }

    fn request(items: Vec<OrderLineInput>) -> NewOrderRequest {
        NewOrderRequest { table_id: 1, items }
    }

    #[test]
    fn cola_and_nargila_leave_both_stations_pending() {
        let plan = plan_order(
            &request(vec![line(COLA, 2, None), line(NARGILA, 1, Some("mint"))]),
            &catalog(),
        )
        .unwrap();

        assert_eq!(plan.board.bar_status, Pending);
        assert_eq!(plan.board.shisha_status, Pending);
        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[1].note.as_deref(), Some("mint"));
    }

    #[test]
    fn drinks_only_order_pre_completes_shisha() {
        let plan = plan_order(&request(vec![line(COLA, 3, None)]), &catalog()).unwrap();
        assert_eq!((plan.board.bar_status, plan.board.shisha_status), (Pending, Done));
    }

    #[test]
    fn shisha_only_order_pre_completes_bar() {
        let plan =
            plan_order(&request(vec![line(NARGILA, 1, Some("apple"))]), &catalog()).unwrap();
        assert_eq!((plan.board.bar_status, plan.board.shisha_status), (Done, Pending));
    }

    #[test]
    fn shisha_without_flavor_is_rejected() {
        for note in [None, Some(""), Some("   ")] {
            let err = plan_order(&request(vec![line(NARGILA, 1, note)]), &catalog()).unwrap_err();
            assert!(matches!(err, AppError::MissingRequiredField));
        }
    }

    #[test]
    fn unknown_or_unavailable_products_are_rejected() {
        let err = plan_order(&request(vec![line(COLA, 1, None), line(99, 1, None)]), &catalog())
            .unwrap_err();
        assert!(matches!(err, AppError::IneligibleItem(_)));

        let err = plan_order(&request(vec![line(SOLD_OUT_BEER, 1, None)]), &catalog()).unwrap_err();
        assert_eq!(err.to_string(), "one or more products unavailable");
    }

    #[test]
    fn shape_errors_come_first() {
        let err = plan_order(&request(vec![]), &catalog()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        for qty in [0, 21] {
            let err = plan_order(&request(vec![line(COLA, qty, None)]), &catalog()).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        let err = plan_order(&request(vec![line(COLA, 1, Some(&"x".repeat(121)))]), &catalog())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let bad_table = NewOrderRequest { table_id: 0, items: vec![line(COLA, 1, None)] };
        assert!(matches!(plan_order(&bad_table, &catalog()), Err(AppError::Validation(_))));
    }

    #[test]
    fn blank_drink_notes_become_none() {
        let plan = plan_order(
            &request(vec![line(COLA, 1, Some("  ")), line(COLA, 1, Some(" no ice "))]),
            &catalog(),
        )
        .unwrap();

        assert_eq!(plan.lines[0].note, None);
        assert_eq!(plan.lines[1].note.as_deref(), Some("no ice"));
    }

    #[test]
    fn product_ids_are_deduplicated() {
        let req = request(vec![line(COLA, 1, None), line(NARGILA, 1, Some("mint")), line(COLA, 2, None)]);
        assert_eq!(req.product_ids(), vec![COLA, NARGILA]);
    }

    #[test]
    fn request_body_uses_camel_case() {
        let req: NewOrderRequest = serde_json::from_str(
            r#"{ "tableId": 4, "items": [{ "productId": 2, "qty": 1, "note": "mint" }] }"#,
        )
        .unwrap();

        assert_eq!(req.table_id, 4);
        assert_eq!(req.items[0].product_id, 2);
        assert_eq!(req.items[0].note.as_deref(), Some("mint"));
    }
}
