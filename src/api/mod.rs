//! REST API module.
//!
//! Contains all API routes and handlers following the web client contract.

mod groups;
mod invitations;
mod tallies;
mod users;

pub use groups::*;
pub use invitations::*;
pub use tallies::*;
pub use users::*;

use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::errors::AppError;

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<T, AppError>;

/// JSON body that has been deserialized and checked against its `Validate` rules.
///
/// Malformed bodies and missing required fields both surface as a 400 validation error.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                tracing::debug!("Rejected request body: {}", rejection.body_text());
                AppError::Validation("Invalid or incomplete request body".to_string())
            })?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Query string counterpart of [`ValidatedJson`].
pub struct ValidatedQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                tracing::debug!("Rejected query string: {}", rejection.body_text());
                AppError::Validation("Invalid query parameters".to_string())
            })?;
        value.validate()?;
        Ok(ValidatedQuery(value))
    }
}
