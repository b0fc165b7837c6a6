use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AppError;
use crate::services::live::ChangeNotice;
use crate::types::{Role, FEED_KEY, SESSION_KEY};

/// What the identity provider knows about a signed-in caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub role: Role,
    pub email: Option<String>,
}

fn session_key(token: &str) -> String {
    format!("{SESSION_KEY}:{token}")
}

pub fn feed_channel(notice: &ChangeNotice) -> String {
    format!("{FEED_KEY}:{}", notice.table.as_str())
}

pub fn put_session(
    db: &redis::Client,
    token: &str,
    user: &CurrentUser,
    ttl_secs: u64,
) -> Result<(), AppError> {
    let mut conn = db.get_connection()?;
    let payload =
        serde_json::to_string(user).map_err(|err| AppError::Internal(err.to_string()))?;

    redis::cmd("SET")
        .arg(session_key(token))
        .arg(payload)
        .arg("EX")
        .arg(ttl_secs)
        .query::<()>(&mut conn)?;

    Ok(())
}

pub fn get_session(db: &redis::Client, token: &str) -> Result<Option<CurrentUser>, AppError> {
    let mut conn = db.get_connection()?;

    let payload = redis::cmd("GET")
        .arg(session_key(token))
        .query::<Option<String>>(&mut conn)?;

    match payload {
        Some(json) => match serde_json::from_str::<CurrentUser>(&json) {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                warn!(error = %err, "discarding unreadable session");
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

pub fn drop_session(db: &redis::Client, token: &str) -> Result<(), AppError> {
    let mut conn = db.get_connection()?;

    redis::cmd("DEL").arg(session_key(token)).query::<i64>(&mut conn)?;

    Ok(())
}

/// Best effort: readers also poll, so a lost notice only delays a refresh.
pub fn publish_changes(db: &redis::Client, notices: &[ChangeNotice]) {
    let mut conn = match db.get_connection() {
        Ok(conn) => conn,
        Err(err) => {
            warn!(error = %err, "change feed unavailable, skipping notices");
            return;
        }
    };

    for notice in notices {
        let payload = match serde_json::to_string(notice) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to encode change notice");
                continue;
            }
        };

        if let Err(err) = redis::cmd("PUBLISH")
            .arg(feed_channel(notice))
            .arg(payload)
            .query::<i64>(&mut conn)
        {
            warn!(error = %err, table = notice.table.as_str(), "failed to publish change notice");
        }
    }
}
