use actix::MailboxError;
use actix_web::http::header::LOCATION;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Where callers are sent when the role gate turns them away.
pub const SIGN_IN_ROUTE: &str = "/auth/sign-in";

const SINGLE_SHISHA_INDEX: &str = "products_single_shisha";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    ConstraintViolation(String),

    #[error("{0}")]
    IneligibleItem(String),

    #[error("flavor mix required for shisha items")]
    MissingRequiredField,

    #[error("product check failed")]
    Lookup,

    #[error("{0}")]
    Store(String),

    #[error("{0}")]
    NotFound(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("authentication required")]
    Unauthenticated,

    #[error("role not allowed for this operation")]
    Forbidden,

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn single_shisha() -> Self {
        AppError::ConstraintViolation("only one shisha product allowed".into())
    }

    pub fn unavailable_products() -> Self {
        AppError::IneligibleItem("one or more products unavailable".into())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ConstraintViolation(_) => StatusCode::CONFLICT,
            AppError::IneligibleItem(_) | AppError::MissingRequiredField => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Lookup => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Unauthenticated | AppError::Forbidden => StatusCode::SEE_OTHER,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = self.to_string();

        match self {
            AppError::Store(msg) => error!(target: "database", error = %msg, "store operation failed"),
            AppError::Internal(msg) => error!(target: "internal", error = %msg, "internal error"),
            _ => {}
        }

        let mut builder = HttpResponse::build(self.status_code());
        if matches!(self, AppError::Unauthenticated | AppError::Forbidden) {
            builder.insert_header((LOCATION, SIGN_IN_ROUTE));
        }

        builder.json(ErrorBody { error: &message })
    }
}

impl From<DieselError> for AppError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => AppError::NotFound("record not found".into()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                if info.constraint_name() == Some(SINGLE_SHISHA_INDEX) =>
            {
                AppError::single_shisha()
            }
            other => AppError::Store(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for AppError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        AppError::Store(format!("Failed to establish connection: {err}"))
    }
}

impl From<MailboxError> for AppError {
    fn from(err: MailboxError) -> Self {
        AppError::Internal(format!("Unable to reach database actor: {err}"))
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Store(format!("Session store failure: {err}"))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use actix_web::body::to_bytes;

    use super::*;

    #[actix_web::test]
    async fn errors_render_as_error_objects() {
        let resp = AppError::MissingRequiredField.error_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "flavor mix required for shisha items");
    }

    #[test]
    fn role_gate_failures_redirect_to_sign_in() {
        for err in [AppError::Unauthenticated, AppError::Forbidden] {
            let resp = err.error_response();
            assert_eq!(resp.status(), StatusCode::SEE_OTHER);
            assert_eq!(resp.headers().get(LOCATION).unwrap(), SIGN_IN_ROUTE);
        }
    }

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(AppError::single_shisha().status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::unavailable_products().status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::Validation("bad".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Lookup.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(AppError::NotFound("order".into()).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn diesel_not_found_maps_to_not_found() {
        let err: AppError = DieselError::NotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));

        let err: AppError = DieselError::RollbackTransaction.into();
        assert!(matches!(err, AppError::Store(_)));
    }

    #[test]
    fn fixed_messages() {
        assert_eq!(AppError::single_shisha().to_string(), "only one shisha product allowed");
        assert_eq!(AppError::unavailable_products().to_string(), "one or more products unavailable");
        assert_eq!(AppError::Lookup.to_string(), "product check failed");
    }
}
