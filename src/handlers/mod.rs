pub mod admin;
pub mod cart;
pub mod orders;

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

use crate::domain::principal::{Principal, Role};
use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Extracts the caller principal from the identity headers set by the
/// upstream gateway. Authentication itself happens there; this service only
/// refuses requests that arrive without a usable `{id, role}` pair.
impl FromRequest for Principal {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(principal_from_headers(req))
    }
}

fn principal_from_headers(req: &HttpRequest) -> Result<Principal, AppError> {
    let id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or(AppError::Unauthorized)?;
    let role = req
        .headers()
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(Role::parse)
        .ok_or(AppError::Unauthorized)?;
    Ok(Principal { id, role })
}
