//! Identity provider and role gate.
//!
//! Sessions live in Redis under an opaque bearer token. Handlers take a
//! [`CurrentUser`] argument and call [`require_roles`] before doing any work; both a
//! missing session and a role outside the allowed set turn into a redirect to the
//! sign-in route.

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use futures::future::{ready, Ready};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::services::db_utils::AppState;
use crate::services::redis_handling::get_session;
use crate::types::Role;

pub use crate::services::redis_handling::CurrentUser;

pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn resolve(req: &HttpRequest) -> Result<CurrentUser, AppError> {
    let token = bearer_token(req).ok_or(AppError::Unauthenticated)?;
    let state = req
        .app_data::<Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state missing".into()))?;

    get_session(&state.redis_db, token)?.ok_or(AppError::Unauthenticated)
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(resolve(req))
    }
}

/// Lets the operation run only for the listed roles.
pub fn require_roles(user: &CurrentUser, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        debug!(user_id = user.id, role = %user.role, "role gate rejected caller");
        Err(AppError::Forbidden)
    }
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            warn!(error = %err, "stored password hash is unreadable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};

    use super::*;

    fn user(role: Role) -> CurrentUser {
        CurrentUser { id: 1, role, email: None }
    }

    #[test]
    fn role_sets() {
        let catalog = [Role::Admin];
        assert!(require_roles(&user(Role::Admin), &catalog).is_ok());
        assert!(matches!(require_roles(&user(Role::Waiter), &catalog), Err(AppError::Forbidden)));

        let ordering = [Role::Waiter, Role::Admin];
        assert!(require_roles(&user(Role::Waiter), &ordering).is_ok());
        assert!(require_roles(&user(Role::Bar), &ordering).is_err());
    }

    #[test]
    fn bearer_token_parsing() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer abc123"))
            .to_http_request();
        assert_eq!(bearer_token(&req), Some("abc123"));

        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Basic abc123"))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);

        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer "))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);

        assert_eq!(bearer_token(&TestRequest::default().to_http_request()), None);
    }

    #[test]
    fn missing_token_is_unauthenticated() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(resolve(&req), Err(AppError::Unauthenticated)));
    }

    #[test]
    fn password_verification() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"hookah-night", &salt)
            .unwrap()
            .to_string();

        assert!(verify_password("hookah-night", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("hookah-night", "not-a-hash"));
    }
}
