use std::collections::HashMap;

use actix::Handler;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::{info, warn};
use validator::Validate;

use crate::error::AppError;
use crate::lifecycle::report::{OrderLineView, ProductRef};
use crate::lifecycle::{
    ensure_single_shisha, ensure_station_has_work, plan_order, OrderSummary, ProductEligibility,
    StationBoard,
};
use crate::services::db_models::{
    Order, OrderItem, OrderStationStatus, Product, Profile, VenueTable,
};
use crate::services::db_utils::{PgActor, PgPool};
use crate::services::insertable::{NewOrder, NewOrderItem, NewProduct, NewStationStatus};
use crate::services::messages::{
    CreateOrder, CreateProduct, DeleteProduct, FetchActiveTables, FetchAllProducts,
    FetchAvailableProducts, FetchOrders, FetchProfileByEmail, MarkStationDone, UpdateProduct,
};
use crate::types::{OrderStatus, ProductCategory, Station, StationState};

fn establish_connection(
    pool: &PgPool,
) -> Result<PooledConnection<ConnectionManager<PgConnection>>, AppError> {
    Ok(pool.get()?)
}

/// Id of the stored shisha product, if the catalog has one.
fn shisha_product_id(conn: &mut PgConnection) -> QueryResult<Option<i64>> {
    use crate::schema::products::{category, dsl::products, id};

    products
        .filter(category.eq(ProductCategory::Shisha))
        .select(id)
        .first::<i64>(conn)
        .optional()
}

impl Handler<FetchProfileByEmail> for PgActor {
    type Result = Result<Option<Profile>, AppError>;

    fn handle(&mut self, msg: FetchProfileByEmail, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::profiles::{dsl::profiles, email};

        let mut conn = establish_connection(&self.0)?;

        Ok(profiles
            .filter(email.eq(msg.0.trim().to_lowercase()))
            .select(Profile::as_select())
            .first(&mut conn)
            .optional()?)
    }
}

impl Handler<FetchActiveTables> for PgActor {
    type Result = Result<Vec<VenueTable>, AppError>;

    fn handle(&mut self, _msg: FetchActiveTables, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::tables::{dsl::tables, is_active, number};

        let mut conn = establish_connection(&self.0)?;

        Ok(tables
            .filter(is_active.eq(true))
            .order(number.asc())
            .select(VenueTable::as_select())
            .load(&mut conn)?)
    }
}

impl Handler<FetchAvailableProducts> for PgActor {
    type Result = Result<Vec<Product>, AppError>;

    fn handle(&mut self, _msg: FetchAvailableProducts, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::products::{category, dsl::products, is_available, name};

        let mut conn = establish_connection(&self.0)?;

        Ok(products
            .filter(is_available.eq(true))
            .order((category.asc(), name.asc()))
            .select(Product::as_select())
            .load(&mut conn)?)
    }
}

impl Handler<FetchAllProducts> for PgActor {
    type Result = Result<Vec<Product>, AppError>;

    fn handle(&mut self, _msg: FetchAllProducts, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::products::{created_at, dsl::products};

        let mut conn = establish_connection(&self.0)?;

        Ok(products
            .order(created_at.desc())
            .select(Product::as_select())
            .load(&mut conn)?)
    }
}

impl Handler<CreateProduct> for PgActor {
    type Result = Result<Product, AppError>;

    fn handle(&mut self, msg: CreateProduct, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::products::dsl::products;

        let record = msg.0.normalize()?;
        let mut conn = establish_connection(&self.0)?;

        // a racing second shisha insert is stopped by products_single_shisha
        let product = conn
            .build_transaction()
            .run::<_, AppError, _>(|trx_conn| {
                let existing = shisha_product_id(trx_conn)?;
                ensure_single_shisha(&record, existing, None)?;

                Ok(diesel::insert_into(products)
                    .values(NewProduct::from(record))
                    .returning(Product::as_returning())
                    .get_result(trx_conn)?)
            })?;

        info!(product_id = product.id, category = %product.category, "product created");
        Ok(product)
    }
}

impl Handler<UpdateProduct> for PgActor {
    type Result = Result<Product, AppError>;

    fn handle(&mut self, msg: UpdateProduct, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::products::dsl::products;

        let product_id = msg.id;
        let record = msg.draft.normalize()?;
        let mut conn = establish_connection(&self.0)?;

        let product = conn
            .build_transaction()
            .run::<_, AppError, _>(|trx_conn| {
                let existing = shisha_product_id(trx_conn)?;
                ensure_single_shisha(&record, existing, Some(product_id))?;

                diesel::update(products.find(product_id))
                    .set(NewProduct::from(record))
                    .returning(Product::as_returning())
                    .get_result(trx_conn)
                    .optional()?
                    .ok_or_else(|| AppError::NotFound(format!("product {product_id} not found")))
            })?;

        info!(product_id, category = %product.category, "product updated");
        Ok(product)
    }
}

impl Handler<DeleteProduct> for PgActor {
    type Result = Result<(), AppError>;

    fn handle(&mut self, msg: DeleteProduct, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::products::dsl::products;

        let mut conn = establish_connection(&self.0)?;

        let deleted = diesel::delete(products.find(msg.0))
            .execute(&mut conn)
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                    AppError::ConstraintViolation("product is referenced by existing orders".into())
                }
                other => other.into(),
            })?;

        if deleted == 0 {
            return Err(AppError::NotFound(format!("product {} not found", msg.0)));
        }

        info!(product_id = msg.0, "product deleted");
        Ok(())
    }
}

impl Handler<CreateOrder> for PgActor {
    type Result = Result<i64, AppError>;

    fn handle(&mut self, msg: CreateOrder, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::order_items::dsl::order_items;
        use crate::schema::order_station_status::dsl::order_station_status;
        use crate::schema::orders::{dsl::orders, id as order_pk};
        use crate::schema::products::{dsl::products, id as product_pk};
        use crate::schema::tables::{dsl::tables, is_active};

        let CreateOrder { created_by, request } = msg;
        request.validate()?;

        let mut conn = establish_connection(&self.0)?;

        // Order, station row and items commit together or not at all.
        let order_id = conn.build_transaction().run::<_, AppError, _>(|trx_conn| {
            let fetched: Vec<Product> = products
                .filter(product_pk.eq_any(request.product_ids()))
                .select(Product::as_select())
                .load(trx_conn)
                .map_err(|err| {
                    warn!(error = %err, "product lookup failed");
                    AppError::Lookup
                })?;

            let eligibility: Vec<ProductEligibility> =
                fetched.iter().map(Product::eligibility).collect();
            let plan = plan_order(&request, &eligibility)?;

            let table_active = tables
                .find(plan.table_id)
                .select(is_active)
                .first::<bool>(trx_conn)
                .optional()?;
            if table_active != Some(true) {
                return Err(AppError::NotFound(format!(
                    "table {} not found or inactive",
                    plan.table_id
                )));
            }

            let order_id = diesel::insert_into(orders)
                .values(NewOrder {
                    table_id: plan.table_id,
                    created_by_user: created_by,
                    status: OrderStatus::New,
                })
                .returning(order_pk)
                .get_result::<i64>(trx_conn)?;

            diesel::insert_into(order_station_status)
                .values(NewStationStatus {
                    order_id,
                    bar_status: plan.board.bar_status,
                    shisha_status: plan.board.shisha_status,
                })
                .execute(trx_conn)?;

            let rows: Vec<NewOrderItem> = plan
                .lines
                .into_iter()
                .map(|line| NewOrderItem {
                    order_id,
                    product_id: line.product_id,
                    qty: line.qty,
                    note: line.note,
                })
                .collect();

            diesel::insert_into(order_items)
                .values(&rows)
                .execute(trx_conn)?;

            Ok(order_id)
        })?;

        info!(order_id, created_by, "order created");
        Ok(order_id)
    }
}

impl Handler<MarkStationDone> for PgActor {
    type Result = Result<StationBoard, AppError>;

    fn handle(&mut self, msg: MarkStationDone, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::order_items::{dsl::order_items, order_id as item_order_id};
        use crate::schema::order_station_status::{
            bar_status, dsl::order_station_status, shisha_status, updated_at,
        };
        use crate::schema::orders::{dsl::orders, status};
        use crate::schema::products::{category, dsl::products};

        let MarkStationDone { order_id, station } = msg;
        let mut conn = establish_connection(&self.0)?;

        let board = conn.build_transaction().run::<_, AppError, _>(|trx_conn| {
            // row lock serializes the two stations finishing the same order
            orders
                .find(order_id)
                .select(Order::as_select())
                .for_update()
                .first(trx_conn)
                .optional()?
                .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

            let categories: Vec<ProductCategory> = order_items
                .inner_join(products)
                .filter(item_order_id.eq(order_id))
                .select(category)
                .load(trx_conn)?;
            ensure_station_has_work(categories.iter().copied(), station)?;

            let existing = order_station_status
                .find(order_id)
                .select(OrderStationStatus::as_select())
                .first(trx_conn)
                .optional()?;

            let board = match existing {
                Some(_) => {
                    let target = diesel::update(order_station_status.find(order_id));
                    let row = match station {
                        Station::Bar => target
                            .set((bar_status.eq(StationState::Done), updated_at.eq(Utc::now())))
                            .returning(OrderStationStatus::as_returning())
                            .get_result(trx_conn),
                        Station::Shisha => target
                            .set((shisha_status.eq(StationState::Done), updated_at.eq(Utc::now())))
                            .returning(OrderStationStatus::as_returning())
                            .get_result(trx_conn),
                    }
                    .optional()?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("station status for order {order_id} not found"))
                    })?;

                    row.board()
                }
                None => {
                    warn!(order_id, %station, "station status missing, rebuilding from items");
                    let board = StationBoard::backfill(categories, station);

                    diesel::insert_into(order_station_status)
                        .values(NewStationStatus {
                            order_id,
                            bar_status: board.bar_status,
                            shisha_status: board.shisha_status,
                        })
                        .execute(trx_conn)?;

                    board
                }
            };

            diesel::update(orders.find(order_id))
                .set(status.eq(board.order_status()))
                .execute(trx_conn)?;

            Ok(board)
        })?;

        info!(order_id, %station, status = %board.order_status(), "station marked done");
        Ok(board)
    }
}

impl Handler<FetchOrders> for PgActor {
    type Result = Result<Vec<OrderSummary>, AppError>;

    fn handle(&mut self, msg: FetchOrders, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::order_items::{dsl::order_items, id as item_pk, order_id as item_order_id};
        use crate::schema::order_station_status::{
            dsl::order_station_status, order_id as station_order_id,
        };
        use crate::schema::orders::{created_at, dsl::orders, status};
        use crate::schema::products::{category, dsl::products, name, price};
        use crate::schema::tables::{dsl::tables, number};

        let mut conn = establish_connection(&self.0)?;

        conn.build_transaction()
            .repeatable_read()
            .read_only()
            .run::<_, AppError, _>(|trx_conn| {
                let mut query = orders
                    .left_join(tables)
                    .select((Order::as_select(), number.nullable()))
                    .order(created_at.desc())
                    .into_boxed();

                if let Some(since) = msg.since {
                    query = query.filter(created_at.ge(since));
                }
                if let Some(statuses) = msg.statuses {
                    query = query.filter(status.eq_any(statuses));
                }

                let rows: Vec<(Order, Option<String>)> = query.load(trx_conn)?;
                if rows.is_empty() {
                    return Ok(Vec::new());
                }

                let ids: Vec<i64> = rows.iter().map(|(order, _)| order.id).collect();

                let boards: HashMap<i64, StationBoard> = order_station_status
                    .filter(station_order_id.eq_any(&ids))
                    .select(OrderStationStatus::as_select())
                    .load(trx_conn)?
                    .into_iter()
                    .map(|row| (row.order_id, row.board()))
                    .collect();

                let item_rows: Vec<(OrderItem, Option<(String, ProductCategory, f64)>)> =
                    order_items
                        .left_join(products)
                        .select((OrderItem::as_select(), (name, category, price).nullable()))
                        .filter(item_order_id.eq_any(&ids))
                        .order(item_pk.asc())
                        .load(trx_conn)?;

                let mut lines: HashMap<i64, Vec<OrderLineView>> = HashMap::new();
                for (item, product) in item_rows {
                    lines.entry(item.order_id).or_default().push(OrderLineView {
                        id: item.id,
                        qty: item.qty,
                        note: item.note,
                        product: product.map(|(product_name, product_category, product_price)| {
                            ProductRef {
                                name: product_name,
                                category: product_category,
                                price: product_price,
                            }
                        }),
                    });
                }

                Ok(rows
                    .into_iter()
                    .map(|(order, table_number)| OrderSummary {
                        id: order.id,
                        status: order.status,
                        table_id: order.table_id,
                        table_number,
                        created_at: order.created_at,
                        station: boards.get(&order.id).copied(),
                        items: lines.remove(&order.id).unwrap_or_default(),
                    })
                    .collect())
            })
    }
}
