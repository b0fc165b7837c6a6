use actix_web::{get, HttpResponse, Responder};

pub mod db_models;
pub mod db_utils;
pub mod identity;
pub mod insertable;
pub mod live;
pub mod messages;
pub mod pg_handling;
pub mod redis_handling;

#[get("/")]
pub async fn home_page() -> impl Responder {
    HttpResponse::Ok().body("Lounge order tracker")
}

// sub-route "/auth"
pub mod auth_route {
    use actix_web::web::{Data, Json};
    use actix_web::{get, post, HttpRequest, HttpResponse};
    use serde::Deserialize;
    use serde_json::json;
    use tracing::info;
    use uuid::Uuid;
    use validator::Validate;

    use crate::error::AppError;
    use crate::services::db_utils::AppState;
    use crate::services::identity::{bearer_token, verify_password, CurrentUser};
    use crate::services::messages::FetchProfileByEmail;
    use crate::services::redis_handling::{drop_session, put_session};

    #[derive(Deserialize, Validate)]
    pub struct SignInBody {
        #[validate(email(message = "enter a valid email address"))]
        pub email: String,
        #[validate(length(min = 6, message = "password is too short"))]
        pub password: String,
    }

    #[post("/sign-in")]
    pub async fn sign_in(
        state: Data<AppState>,
        body: Json<SignInBody>,
    ) -> Result<HttpResponse, AppError> {
        let body = body.into_inner();
        body.validate()?;

        let profile = state
            .pg_db
            .send(FetchProfileByEmail(body.email))
            .await??
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(&body.password, &profile.password_hash) {
            return Err(AppError::InvalidCredentials);
        }

        let user = CurrentUser {
            id: profile.id,
            role: profile.role,
            email: Some(profile.email),
        };
        let token = Uuid::new_v4().simple().to_string();
        put_session(&state.redis_db, &token, &user, state.settings.session_ttl_secs)?;

        info!(user_id = user.id, role = %user.role, "signed in");
        Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "token": token,
            "role": user.role,
            "home": user.role.home_route(),
        })))
    }

    #[post("/sign-out")]
    pub async fn sign_out(
        state: Data<AppState>,
        req: HttpRequest,
        user: CurrentUser,
    ) -> Result<HttpResponse, AppError> {
        if let Some(token) = bearer_token(&req) {
            drop_session(&state.redis_db, token)?;
        }

        info!(user_id = user.id, "signed out");
        Ok(HttpResponse::Ok().json(json!({ "success": true })))
    }

    #[get("/me")]
    pub async fn current_actor(user: CurrentUser) -> HttpResponse {
        HttpResponse::Ok().json(user)
    }
}

// sub-route "/tables"
pub mod tables_route {
    use actix_web::web::Data;
    use actix_web::{get, HttpResponse};

    use crate::error::AppError;
    use crate::services::db_utils::AppState;
    use crate::services::identity::{require_roles, CurrentUser};
    use crate::services::messages::FetchActiveTables;
    use crate::types::Role;

    #[get("")]
    pub async fn active_tables(
        state: Data<AppState>,
        user: CurrentUser,
    ) -> Result<HttpResponse, AppError> {
        require_roles(&user, &[Role::Waiter, Role::Admin])?;

        let tables = state.pg_db.send(FetchActiveTables).await??;
        Ok(HttpResponse::Ok().json(tables))
    }
}

// sub-route "/products"
pub mod products_route {
    use actix_web::web::{Data, Json, Path};
    use actix_web::{delete, get, post, put, HttpResponse};
    use serde_json::json;

    use crate::error::AppError;
    use crate::lifecycle::{ProductDraft, ProductUpdate};
    use crate::services::db_utils::AppState;
    use crate::services::identity::{require_roles, CurrentUser};
    use crate::services::live::{ChangeNotice, FeedEvent, FeedTable};
    use crate::services::messages::{
        CreateProduct, DeleteProduct, FetchAllProducts, FetchAvailableProducts, UpdateProduct,
    };
    use crate::services::redis_handling::publish_changes;
    use crate::types::Role;

    fn catalog_changed(state: &AppState, event: FeedEvent) {
        publish_changes(&state.redis_db, &[ChangeNotice::new(FeedTable::Products, event)]);
    }

    #[get("")]
    pub async fn available_products(
        state: Data<AppState>,
        user: CurrentUser,
    ) -> Result<HttpResponse, AppError> {
        require_roles(&user, &[Role::Waiter, Role::Admin])?;

        let products = state.pg_db.send(FetchAvailableProducts).await??;
        Ok(HttpResponse::Ok().json(products))
    }

    #[get("/all")]
    pub async fn all_products(
        state: Data<AppState>,
        user: CurrentUser,
    ) -> Result<HttpResponse, AppError> {
        require_roles(&user, &[Role::Admin])?;

        let products = state.pg_db.send(FetchAllProducts).await??;
        Ok(HttpResponse::Ok().json(products))
    }

    #[post("")]
    pub async fn create_product(
        state: Data<AppState>,
        user: CurrentUser,
        body: Json<ProductDraft>,
    ) -> Result<HttpResponse, AppError> {
        require_roles(&user, &[Role::Admin])?;

        let product = state.pg_db.send(CreateProduct(body.into_inner())).await??;
        catalog_changed(&state, FeedEvent::Insert);

        Ok(HttpResponse::Ok().json(json!({ "success": true, "productId": product.id })))
    }

    #[put("/{product_id}")]
    pub async fn update_product(
        state: Data<AppState>,
        user: CurrentUser,
        path: Path<i64>,
        body: Json<ProductUpdate>,
    ) -> Result<HttpResponse, AppError> {
        require_roles(&user, &[Role::Admin])?;

        state
            .pg_db
            .send(UpdateProduct {
                id: path.into_inner(),
                draft: body.into_inner().into(),
            })
            .await??;
        catalog_changed(&state, FeedEvent::Update);

        Ok(HttpResponse::Ok().json(json!({ "success": true })))
    }

    #[delete("/{product_id}")]
    pub async fn delete_product(
        state: Data<AppState>,
        user: CurrentUser,
        path: Path<i64>,
    ) -> Result<HttpResponse, AppError> {
        require_roles(&user, &[Role::Admin])?;

        state.pg_db.send(DeleteProduct(path.into_inner())).await??;
        catalog_changed(&state, FeedEvent::Delete);

        Ok(HttpResponse::Ok().json(json!({ "success": true })))
    }
}

// sub-route "/orders"
pub mod order_route {
    use actix_web::web::{Data, Json};
    use actix_web::{get, post, HttpResponse};
    use chrono::{Local, Utc};
    use serde_json::json;

    use crate::error::AppError;
    use crate::lifecycle::{NewOrderRequest, ReportWindow};
    use crate::services::db_utils::AppState;
    use crate::services::identity::{require_roles, CurrentUser};
    use crate::services::live::ChangeNotice;
    use crate::services::messages::{CreateOrder, FetchOrders};
    use crate::services::redis_handling::publish_changes;
    use crate::types::Role;

    #[post("")]
    pub async fn create_order(
        state: Data<AppState>,
        user: CurrentUser,
        body: Json<NewOrderRequest>,
    ) -> Result<HttpResponse, AppError> {
        require_roles(&user, &[Role::Waiter, Role::Admin])?;

        let order_id = state
            .pg_db
            .send(CreateOrder {
                created_by: user.id,
                request: body.into_inner(),
            })
            .await??;
        publish_changes(&state.redis_db, &ChangeNotice::order_created());

        Ok(HttpResponse::Ok().json(json!({ "success": true, "orderId": order_id })))
    }

    /// Everything ordered today, whatever its status.
    #[get("/waiter")]
    pub async fn waiter_orders(
        state: Data<AppState>,
        user: CurrentUser,
    ) -> Result<HttpResponse, AppError> {
        require_roles(&user, &[Role::Waiter, Role::Admin])?;

        let since = ReportWindow::Today.start(&Local::now()).with_timezone(&Utc);
        let orders = state
            .pg_db
            .send(FetchOrders {
                since: Some(since),
                statuses: None,
            })
            .await??;

        Ok(HttpResponse::Ok().json(orders))
    }
}

// sub-route "/stations"
pub mod station_route {
    use actix_web::web::{Data, Path};
    use actix_web::{get, post, HttpResponse};
    use serde_json::json;

    use crate::error::AppError;
    use crate::lifecycle::OrderSummary;
    use crate::services::db_utils::AppState;
    use crate::services::identity::{require_roles, CurrentUser};
    use crate::services::live::ChangeNotice;
    use crate::services::messages::{FetchOrders, MarkStationDone};
    use crate::services::redis_handling::publish_changes;
    use crate::types::{OrderStatus, Station};

    /// Open orders with at least one item for `station`.
    pub fn station_queue(orders: Vec<OrderSummary>, station: Station) -> Vec<OrderSummary> {
        orders
            .into_iter()
            .filter(|order| matches!(order.status, OrderStatus::New | OrderStatus::InProgress))
            .filter(|order| order.contains_category(station.category()))
            .collect()
    }

    #[get("/{station}/orders")]
    pub async fn station_orders(
        state: Data<AppState>,
        user: CurrentUser,
        path: Path<Station>,
    ) -> Result<HttpResponse, AppError> {
        let station = path.into_inner();
        require_roles(&user, station.allowed_roles())?;

        let orders = state
            .pg_db
            .send(FetchOrders {
                since: None,
                statuses: Some(vec![OrderStatus::New, OrderStatus::InProgress]),
            })
            .await??;

        Ok(HttpResponse::Ok().json(station_queue(orders, station)))
    }

    #[post("/{station}/orders/{order_id}/done")]
    pub async fn mark_station_done(
        state: Data<AppState>,
        user: CurrentUser,
        path: Path<(Station, i64)>,
    ) -> Result<HttpResponse, AppError> {
        let (station, order_id) = path.into_inner();
        require_roles(&user, station.allowed_roles())?;

        let board = state
            .pg_db
            .send(MarkStationDone { order_id, station })
            .await??;
        publish_changes(&state.redis_db, &ChangeNotice::station_done());

        Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "barStatus": board.bar_status,
            "shishaStatus": board.shisha_status,
            "status": board.order_status(),
        })))
    }
}

// sub-route "/admin"
pub mod admin_route {
    use actix_web::web::{Data, Query};
    use actix_web::{get, HttpResponse};
    use chrono::{Local, Utc};
    use serde::Deserialize;

    use crate::error::AppError;
    use crate::lifecycle::{summarize, ReportWindow, StatusFilter};
    use crate::services::db_utils::AppState;
    use crate::services::identity::{require_roles, CurrentUser};
    use crate::services::messages::FetchOrders;
    use crate::types::Role;

    #[derive(Deserialize)]
    pub struct AdminOrdersQuery {
        #[serde(default)]
        pub view: ReportWindow,
        #[serde(default)]
        pub status: StatusFilter,
    }

    #[get("/orders")]
    pub async fn admin_orders(
        state: Data<AppState>,
        user: CurrentUser,
        query: Query<AdminOrdersQuery>,
    ) -> Result<HttpResponse, AppError> {
        require_roles(&user, &[Role::Admin])?;

        let since = query.view.start(&Local::now()).with_timezone(&Utc);
        let orders = state
            .pg_db
            .send(FetchOrders {
                since: Some(since),
                statuses: query.status.status().map(|status| vec![status]),
            })
            .await??;

        Ok(HttpResponse::Ok().json(summarize(orders)))
    }
}

// sub-route "/live"
pub mod live_route {
    use actix_web::web::{Data, Path};
    use actix_web::{get, HttpResponse};

    use crate::error::AppError;
    use crate::services::db_utils::AppState;
    use crate::services::identity::{require_roles, CurrentUser};
    use crate::services::live::{event_stream, Reconciler, View};

    #[get("/{view}")]
    pub async fn live_view(
        state: Data<AppState>,
        user: CurrentUser,
        path: Path<View>,
    ) -> Result<HttpResponse, AppError> {
        let view = path.into_inner();
        require_roles(&user, view.allowed_roles())?;

        let reconciler = Reconciler::new(
            view,
            state.feed.subscribe(),
            state.settings.settle_delay(),
            state.settings.poll_interval(),
        );

        Ok(HttpResponse::Ok()
            .content_type("text/event-stream")
            .insert_header(("Cache-Control", "no-cache"))
            .streaming(event_stream(reconciler)))
    }
}

// sub-route "/test"
pub mod test_route {
    use actix_web::{get, HttpResponse, Responder};

    #[get("/healthcheck")]
    pub async fn healthcheck() -> impl Responder {
        HttpResponse::Ok().body("I'm alive!")
    }
}
