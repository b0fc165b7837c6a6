//! Two-station completion state machine.
//!
//! An order's aggregate status is never stored as a transition log; it is recomputed
//! from the two station fields after every station action.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::types::{OrderStatus, ProductCategory, Station, StationState};

/// The pair of per-station flags kept for every order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationBoard {
    pub bar_status: StationState,
    pub shisha_status: StationState,
}

/// `Completed` iff both stations are done, `InProgress` otherwise.
///
/// Only meaningful after a station acted; a freshly created order is `New`.
pub fn derive_status(bar: StationState, shisha: StationState) -> OrderStatus {
    match (bar, shisha) {
        (StationState::Done, StationState::Done) => OrderStatus::Completed,
        _ => OrderStatus::InProgress,
    }
}

fn pending_if(has_work: bool) -> StationState {
    if has_work {
        StationState::Pending
    } else {
        StationState::Done
    }
}

impl StationBoard {
    /// A station with nothing to make starts out done.
    pub fn initial(has_drink: bool, has_shisha: bool) -> Self {
        StationBoard {
            bar_status: pending_if(has_drink),
            shisha_status: pending_if(has_shisha),
        }
    }

    pub fn from_categories<I>(categories: I) -> Self
    where
        I: IntoIterator<Item = ProductCategory>,
    {
        let (mut has_drink, mut has_shisha) = (false, false);
        for category in categories {
            match category {
                ProductCategory::Drink => has_drink = true,
                ProductCategory::Shisha => has_shisha = true,
            }
        }

        Self::initial(has_drink, has_shisha)
    }

    /// Rebuilds a missing row from the order's items, with `station` already done.
    pub fn backfill<I>(categories: I, station: Station) -> Self
    where
        I: IntoIterator<Item = ProductCategory>,
    {
        Self::from_categories(categories).mark_done(station)
    }

    /// Monotonic: a done station stays done.
    pub fn mark_done(mut self, station: Station) -> Self {
        match station {
            Station::Bar => self.bar_status = StationState::Done,
            Station::Shisha => self.shisha_status = StationState::Done,
        }
        self
    }

    pub fn order_status(&self) -> OrderStatus {
        derive_status(self.bar_status, self.shisha_status)
    }
}

/// A station may only complete orders that contain something for it.
pub fn ensure_station_has_work<I>(categories: I, station: Station) -> Result<(), AppError>
where
    I: IntoIterator<Item = ProductCategory>,
{
    let wanted = station.category();
    if categories.into_iter().any(|category| category == wanted) {
        Ok(())
    } else {
        Err(AppError::IneligibleItem(format!(
            "order has no items for the {station} station"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProductCategory::{Drink, Shisha};
    use StationState::{Done, Pending};

    #[test]
    fn derive_status_table() {
        assert_eq!(derive_status(Done, Done), OrderStatus::Completed);
        assert_eq!(derive_status(Done, Pending), OrderStatus::InProgress);
        assert_eq!(derive_status(Pending, Done), OrderStatus::InProgress);
        assert_eq!(derive_status(Pending, Pending), OrderStatus::InProgress);
    }

    #[test]
    fn initial_flags_follow_item_categories() {
        let drinks_only = StationBoard::from_categories([Drink, Drink]);
        assert_eq!((drinks_only.bar_status, drinks_only.shisha_status), (Pending, Done));

        let shisha_only = StationBoard::from_categories([Shisha]);
        assert_eq!((shisha_only.bar_status, shisha_only.shisha_status), (Done, Pending));

        let mixed = StationBoard::from_categories([Drink, Shisha]);
        assert_eq!((mixed.bar_status, mixed.shisha_status), (Pending, Pending));
    }

    #[test]
    fn completing_a_mixed_order() {
        let board = StationBoard::from_categories([Drink, Shisha]);

        let board = board.mark_done(Station::Bar);
        assert_eq!((board.bar_status, board.shisha_status), (Done, Pending));
        assert_eq!(board.order_status(), OrderStatus::InProgress);

        let board = board.mark_done(Station::Shisha);
        assert_eq!((board.bar_status, board.shisha_status), (Done, Done));
        assert_eq!(board.order_status(), OrderStatus::Completed);
    }

    #[test]
    fn marking_done_is_idempotent() {
        let once = StationBoard::from_categories([Drink, Shisha]).mark_done(Station::Shisha);
        let twice = once.mark_done(Station::Shisha);
        assert_eq!(once, twice);
        assert_eq!(twice.order_status(), OrderStatus::InProgress);
    }

    #[test]
    fn single_station_orders_complete_in_one_step() {
        let board = StationBoard::from_categories([Drink]).mark_done(Station::Bar);
        assert_eq!(board.order_status(), OrderStatus::Completed);
    }

    #[test]
    fn backfill_forces_target_station_done() {
        let board = StationBoard::backfill([Drink, Shisha], Station::Shisha);
        assert_eq!((board.bar_status, board.shisha_status), (Pending, Done));

        let board = StationBoard::backfill(Vec::new(), Station::Bar);
        assert_eq!(board.order_status(), OrderStatus::Completed);
    }

    #[test]
    fn station_without_items_is_rejected() {
        assert!(ensure_station_has_work([Drink], Station::Bar).is_ok());
        assert!(matches!(
            ensure_station_has_work([Drink], Station::Shisha),
            Err(AppError::IneligibleItem(_))
        ));
    }
}
