use axum::response::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Version {
    version: String,
}

#[utoipa::path(
    get,
    path = "/version",
    responses(
        (status = 200, description = "Running service version", body = Version)
    ),
    tag = "system"
)]
pub async fn version() -> Json<Version> {
    Json(Version {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
