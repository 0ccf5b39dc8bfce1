use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpRequest, dev::Payload};

use crate::error::ApiError;

/// Header the upstream gateway puts the authenticated user id in
pub const OWNER_HEADER: &str = "x-user-id";

/// The user a request acts for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner(pub i64);

impl Owner {
    pub fn parse(value: Option<&str>) -> Result<Self, ApiError> {
        let value = value.ok_or_else(|| ApiError::Unauthorized("missing X-User-Id header".into()))?;
        value
            .trim()
            .parse()
            .map(Owner)
            .map_err(|_| ApiError::Unauthorized(format!("invalid X-User-Id header: {value:?}")))
    }
}

impl FromRequest for Owner {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let value = req.headers().get(OWNER_HEADER).and_then(|v| v.to_str().ok());
        ready(Owner::parse(value))
    }
}
