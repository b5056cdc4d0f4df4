//! JSON shapes exchanged with the backend.
//!
//! Responses are decoded into these types before anything else looks at them; a
//! body that does not match fails with [`ApiError::Decode`] instead of leaking
//! missing fields into the rest of the application.

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use super::ApiError;

/// Header carrying the total number of users across all pages.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// A user record as the server sends it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawUser {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// `GET /users` body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserListBody {
    pub users: Vec<RawUser>,
}

/// A decoded page: the body plus the total count from the headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserListResponse {
    pub users: Vec<RawUser>,
    pub total_count: u64,
}

/// `POST /users` request body. There is deliberately no timestamp: the server
/// assigns `createdAt`.
#[derive(Debug, Serialize)]
pub struct CreateUserBody<'a> {
    pub user: CreateUserFields<'a>,
}

#[derive(Debug, Serialize)]
pub struct CreateUserFields<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /users` response body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedUserBody {
    pub user: RawUser,
}

/// Reads the total item count. Missing or unparseable values count as zero.
pub fn total_count(headers: &HeaderMap) -> u64 {
    headers
        .get(TOTAL_COUNT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Decodes a JSON body into `T`.
///
/// # Errors
///
/// Returns [`ApiError::Decode`] if the body does not match `T`.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(ApiError::from)
}

/// Accepts ids sent as strings or as numbers; either way the client treats them as
/// opaque text.
fn opaque_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}
