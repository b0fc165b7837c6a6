use std::io;

use actix::SyncArbiter;
use actix_cors::Cors;
use actix_web::web::Data;
use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::error::AppError;
use crate::services::db_utils::{get_db_pool, AppState, PgActor};
use crate::services::live::spawn_feed_listener;

mod config;
mod error;
mod lifecycle;
mod schema;
mod services;
mod types;

const FEED_CAPACITY: usize = 256;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{context}: {err}"))
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    let settings = Settings::load().map_err(|err| startup_error("invalid configuration", err))?;
    init_tracing(&settings);

    let pool = get_db_pool(&settings.pg_database_url)
        .map_err(|err| startup_error("postgres unavailable", err))?;
    let pg_db = SyncArbiter::start(settings.pg_workers, move || PgActor(pool.clone()));

    let redis_db = redis::Client::open(settings.redis_database_uri.as_str())
        .map_err(|err| startup_error("invalid redis uri", err))?;

    let (feed, _) = broadcast::channel(FEED_CAPACITY);
    spawn_feed_listener(redis_db.clone(), feed.clone())?;

    let bind_addr = settings.bind_addr.clone();
    let state = Data::new(AppState { pg_db, redis_db, feed, settings });

    info!(%bind_addr, "starting order tracker");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                AppError::Validation(err.to_string()).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _req| {
                AppError::NotFound(err.to_string()).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                AppError::Validation(err.to_string()).into()
            }))
            .service(services::home_page)
            .service(
                web::scope("/auth")
                    .service(services::auth_route::sign_in)
                    .service(services::auth_route::sign_out)
                    .service(services::auth_route::current_actor),
            )
            .service(web::scope("/tables").service(services::tables_route::active_tables))
            .service(
                web::scope("/products")
                    .service(services::products_route::available_products)
                    .service(services::products_route::all_products)
                    .service(services::products_route::create_product)
                    .service(services::products_route::update_product)
                    .service(services::products_route::delete_product),
            )
            .service(
                web::scope("/orders")
                    .service(services::order_route::create_order)
                    .service(services::order_route::waiter_orders),
            )
            .service(
                web::scope("/stations")
                    .service(services::station_route::station_orders)
                    .service(services::station_route::mark_station_done),
            )
            .service(web::scope("/admin").service(services::admin_route::admin_orders))
            .service(web::scope("/live").service(services::live_route::live_view))
            .service(web::scope("/test").service(services::test_route::healthcheck))
    })
    .bind(bind_addr)?
    .run()
    .await
}
