use std::fmt::{Display, Formatter};
use std::io::Write;
use std::str::FromStr;

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};

/// Stored name of the one and only shisha product, whatever the admin typed.
pub const SHISHA_PRODUCT_NAME: &str = "Nargila";

pub const MAX_PRODUCT_PRICE: f64 = 9999.0;
pub const MIN_QTY: i32 = 1;
pub const MAX_QTY: i32 = 20;
pub const MAX_NOTE_LEN: u64 = 120;

pub const SESSION_KEY: &str = "session";
pub const FEED_KEY: &str = "feed";

// Varchar-backed enums: `as_str`/`FromStr`/`Display` plus the diesel glue to
// read and write them as TEXT.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown {} '{other}'", stringify!($name))),
                }
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
                let text = std::str::from_utf8(value.as_bytes())?;
                Ok(text.parse::<$name>()?)
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Waiter,
    Bar,
    Shisha,
    Admin,
}

text_enum!(Role {
    Waiter => "waiter",
    Bar => "bar",
    Shisha => "shisha",
    Admin => "admin",
});

impl Role {
    /// Landing route handed back after sign-in.
    pub fn home_route(self) -> &'static str {
        match self {
            Role::Waiter => "/orders/waiter",
            Role::Bar => "/stations/bar/orders",
            Role::Shisha => "/stations/shisha/orders",
            Role::Admin => "/admin/orders",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Drink,
    Shisha,
}

text_enum!(ProductCategory {
    Drink => "drink",
    Shisha => "shisha",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    InProgress,
    Completed,
}

text_enum!(OrderStatus {
    New => "new",
    InProgress => "in_progress",
    Completed => "completed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum StationState {
    Pending,
    Done,
}

text_enum!(StationState {
    Pending => "pending",
    Done => "done",
});

/// A fulfillment point. Each station owns exactly one product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Station {
    Bar,
    Shisha,
}

impl Station {
    pub fn category(self) -> ProductCategory {
        match self {
            Station::Bar => ProductCategory::Drink,
            Station::Shisha => ProductCategory::Shisha,
        }
    }

    pub fn allowed_roles(self) -> &'static [Role] {
        match self {
            Station::Bar => &[Role::Bar, Role::Admin],
            Station::Shisha => &[Role::Shisha, Role::Admin],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Station::Bar => "bar",
            Station::Shisha => "shisha",
        }
    }
}

impl Display for Station {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_values_round_trip_through_from_str() {
        assert_eq!("in_progress".parse::<OrderStatus>(), Ok(OrderStatus::InProgress));
        assert_eq!(OrderStatus::InProgress.as_str(), "in_progress");
        assert_eq!("shisha".parse::<ProductCategory>(), Ok(ProductCategory::Shisha));
        assert_eq!("done".parse::<StationState>(), Ok(StationState::Done));
        assert!("chef".parse::<Role>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&OrderStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");

        let station: Station = serde_json::from_str("\"shisha\"").unwrap();
        assert_eq!(station, Station::Shisha);
    }

    #[test]
    fn stations_map_to_categories_and_roles() {
        assert_eq!(Station::Bar.category(), ProductCategory::Drink);
        assert_eq!(Station::Shisha.category(), ProductCategory::Shisha);
        assert!(Station::Bar.allowed_roles().contains(&Role::Admin));
        assert!(!Station::Bar.allowed_roles().contains(&Role::Shisha));
        assert!(!Station::Shisha.allowed_roles().contains(&Role::Waiter));
    }

    #[test]
    fn home_routes_per_role() {
        assert_eq!(Role::Waiter.home_route(), "/orders/waiter");
        assert_eq!(Role::Shisha.home_route(), "/stations/shisha/orders");
        assert_eq!(Role::Admin.home_route(), "/admin/orders");
    }
}
