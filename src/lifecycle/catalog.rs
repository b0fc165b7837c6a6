//! Catalog rules: field limits and the single shisha product.

use serde::Deserialize;

use crate::error::AppError;
use crate::types::{ProductCategory, MAX_PRODUCT_PRICE, SHISHA_PRODUCT_NAME};

const MIN_NAME_LEN: usize = 2;
const MAX_NAME_LEN: usize = 80;

/// Product fields as submitted by the admin, before any rule is applied.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    pub category: ProductCategory,
    pub price: f64,
    #[serde(default = "available_by_default")]
    pub is_available: bool,
}

fn available_by_default() -> bool {
    true
}

/// Full replacement of a product. Availability must be stated so an edit never
/// re-enables a sold-out product by omission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: String,
    pub category: ProductCategory,
    pub price: f64,
    pub is_available: bool,
}

impl From<ProductUpdate> for ProductDraft {
    fn from(update: ProductUpdate) -> Self {
        ProductDraft {
            name: update.name,
            category: update.category,
            price: update.price,
            is_available: update.is_available,
        }
    }
}

/// A draft that passed validation; shisha drafts carry the fixed name.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub name: String,
    pub category: ProductCategory,
    pub price: f64,
    pub is_available: bool,
}

impl ProductDraft {
    pub fn normalize(self) -> Result<ProductRecord, AppError> {
        if !self.price.is_finite() || !(0.0..=MAX_PRODUCT_PRICE).contains(&self.price) {
            return Err(AppError::Validation(format!(
                "price must be between 0 and {MAX_PRODUCT_PRICE}"
            )));
        }

        let name = match self.category {
            ProductCategory::Shisha => SHISHA_PRODUCT_NAME.to_owned(),
            ProductCategory::Drink => {
                let name = self.name.trim();
                let len = name.chars().count();
                if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
                    return Err(AppError::Validation(format!(
                        "name must be between {MIN_NAME_LEN} and {MAX_NAME_LEN} characters"
                    )));
                }
                name.to_owned()
            }
        };

        Ok(ProductRecord {
            name,
            category: self.category,
            price: self.price,
            is_available: self.is_available,
        })
    }
}

/// Rejects a shisha record when some *other* product already holds the category.
///
/// `existing` is the id of the stored shisha product, if any; `editing` is the id of the
/// product being updated (absent on create).
pub fn ensure_single_shisha(
    record: &ProductRecord,
    existing: Option<i64>,
    editing: Option<i64>,
) -> Result<(), AppError> {
    if record.category != ProductCategory::Shisha {
        return Ok(());
    }

    match existing {
        Some(id) if Some(id) != editing => Err(AppError::single_shisha()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, category: ProductCategory, price: f64) -> ProductDraft {
        ProductDraft {
            name: name.into(),
            category,
            price,
            is_available: true,
        }
    }

    #[test]
    fn shisha_name_is_forced() {
        let record = draft("Double apple deluxe", ProductCategory::Shisha, 15.0)
            .normalize()
            .unwrap();
        assert_eq!(record.name, SHISHA_PRODUCT_NAME);

        // too short for a drink, but the name is ignored for shisha
        let record = draft("x", ProductCategory::Shisha, 15.0).normalize().unwrap();
        assert_eq!(record.name, SHISHA_PRODUCT_NAME);
    }

    #[test]
    fn drink_names_are_trimmed_and_bounded() {
        let record = draft("  Cola  ", ProductCategory::Drink, 3.5).normalize().unwrap();
        assert_eq!(record.name, "Cola");

        assert!(matches!(
            draft("C", ProductCategory::Drink, 3.5).normalize(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            draft(&"a".repeat(81), ProductCategory::Drink, 3.5).normalize(),
            Err(AppError::Validation(_))
        ));
        assert!(draft(&"a".repeat(80), ProductCategory::Drink, 3.5).normalize().is_ok());
    }

    #[test]
    fn price_bounds() {
        assert!(draft("Cola", ProductCategory::Drink, 0.0).normalize().is_ok());
        assert!(draft("Cola", ProductCategory::Drink, 9999.0).normalize().is_ok());
        assert!(draft("Cola", ProductCategory::Drink, -0.01).normalize().is_err());
        assert!(draft("Cola", ProductCategory::Drink, 10_000.0).normalize().is_err());
        assert!(draft("Cola", ProductCategory::Drink, f64::NAN).normalize().is_err());
    }

    #[test]
    fn second_shisha_is_rejected() {
        let shisha = draft("", ProductCategory::Shisha, 20.0).normalize().unwrap();

        assert!(ensure_single_shisha(&shisha, None, None).is_ok());
        assert!(matches!(
            ensure_single_shisha(&shisha, Some(7), None),
            Err(AppError::ConstraintViolation(_))
        ));
        // updating the shisha product itself is fine
        assert!(ensure_single_shisha(&shisha, Some(7), Some(7)).is_ok());
        // turning a drink into a second shisha is not
        assert!(ensure_single_shisha(&shisha, Some(7), Some(3)).is_err());
    }

    #[test]
    fn availability_defaults_on_create_only() {
        let created: ProductDraft =
            serde_json::from_str(r#"{"name":"Cola","category":"drink","price":3.0}"#).unwrap();
        assert!(created.is_available);

        let missing = serde_json::from_str::<ProductUpdate>(
            r#"{"name":"Cola","category":"drink","price":3.0}"#,
        );
        assert!(missing.is_err());

        let update: ProductUpdate = serde_json::from_str(
            r#"{"name":"Cola","category":"drink","price":3.0,"isAvailable":false}"#,
        )
        .unwrap();
        let record = ProductDraft::from(update).normalize().unwrap();
        assert!(!record.is_available);
    }

    #[test]
    fn drinks_ignore_the_shisha_rule() {
        let cola = draft("Cola", ProductCategory::Drink, 3.0).normalize().unwrap();
        assert!(ensure_single_shisha(&cola, Some(7), None).is_ok());
    }

    #[test]
    fn sequences_never_hold_two_shisha_products() {
        // (editing id, category) applied against an in-memory catalog
        let steps = [
            (None, ProductCategory::Shisha),
            (None, ProductCategory::Shisha),
            (None, ProductCategory::Drink),
            (Some(3), ProductCategory::Shisha),
            (Some(1), ProductCategory::Drink),
            (Some(3), ProductCategory::Shisha),
            (None, ProductCategory::Shisha),
        ];

        let mut catalog: Vec<(i64, ProductCategory)> = Vec::new();
        let mut next_id = 1;

        for (editing, category) in steps {
            let record = draft("Anything", category, 5.0).normalize().unwrap();
            let existing = catalog
                .iter()
                .find(|(_, c)| *c == ProductCategory::Shisha)
                .map(|(id, _)| *id);

            if ensure_single_shisha(&record, existing, editing).is_err() {
                continue;
            }

            match editing {
                Some(id) => {
                    if let Some(row) = catalog.iter_mut().find(|(row_id, _)| *row_id == id) {
                        row.1 = category;
                    }
                }
                None => {
                    catalog.push((next_id, category));
                    next_id += 1;
                }
            }

            let shisha_count = catalog
                .iter()
                .filter(|(_, c)| *c == ProductCategory::Shisha)
                .count();
            assert!(shisha_count <= 1);
        }

        // id 1 was demoted to a drink, which freed the category for id 3
        assert_eq!(
            catalog,
            vec![
                (1, ProductCategory::Drink),
                (2, ProductCategory::Drink),
                (3, ProductCategory::Shisha),
            ]
        );
    }
}
