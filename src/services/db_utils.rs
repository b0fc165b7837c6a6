use actix::{Actor, Addr, SyncContext};
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use tokio::sync::broadcast;

use crate::config::Settings;
use crate::error::AppError;
use crate::services::live::ChangeNotice;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

pub struct PgActor(pub PgPool);

pub struct AppState {
    pub pg_db: Addr<PgActor>,
    pub redis_db: redis::Client,
    pub feed: broadcast::Sender<ChangeNotice>,
    pub settings: Settings,
}

impl Actor for PgActor {
    type Context = SyncContext<Self>;
}

pub fn get_db_pool(db_url: &str) -> Result<PgPool, AppError> {
    let manager: ConnectionManager<PgConnection> = ConnectionManager::<PgConnection>::new(db_url);
    Ok(Pool::builder().build(manager)?)
}
