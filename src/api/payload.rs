//! JSON request bodies that fail to parse are reported through [`ApiError`].

use super::error::ApiError;
use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

/// `Json<T>` whose rejection (bad syntax, wrong field type, missing
/// `Content-Type`) renders as the error envelope.
#[derive(Debug)]
pub struct Payload<T>(pub T);

impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(status = %rejection.status(), "rejected request body: {}", rejection.body_text());
                Err(rejection.into())
            }
        }
    }
}
