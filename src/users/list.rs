//! The paginated user list query.

use std::fmt;
use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, NaiveDate};

use crate::api::{ApiError, RawUser, UserListResponse, UsersApi};
use crate::query::{Query, QueryClient, QueryError, QueryKey};

use super::model::{Page, User, UserListResult};

/// Cache namespace reserved for user list pages.
pub const USERS_TAG: &str = "users";

/// Prefix covering every cached page.
pub fn users_prefix() -> QueryKey {
    QueryKey::new(USERS_TAG)
}

/// Cache key for one page: `["users", page]`.
pub fn users_key(page: Page) -> QueryKey {
    users_prefix().with(page)
}

/// A validated `strftime` pattern for creation dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat(String);

impl DateFormat {
    /// Rejects patterns chrono cannot render.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the pattern contains an invalid
    /// specifier.
    pub fn parse(pattern: &str) -> Result<Self, String> {
        if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
            return Err(format!("invalid date format `{pattern}`"));
        }
        Ok(Self(pattern.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DateFormat {
    /// Day/month/year, as the dashboard's original pt-BR locale showed it.
    fn default() -> Self {
        Self("%d/%m/%Y".to_string())
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renders a server timestamp as a local date.
///
/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
///
/// # Errors
///
/// Returns [`ApiError::Decode`] if `raw` is neither.
pub fn format_created_at(raw: &str, format: &DateFormat) -> Result<String, ApiError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Local).format(format.as_str()).to_string());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.format(format.as_str()).to_string())
        .map_err(|_| ApiError::Decode(format!("createdAt `{raw}` is not a date")))
}

/// Converts a wire record to a display record.
///
/// # Errors
///
/// Returns [`ApiError::Decode`] if the timestamp cannot be read.
pub fn normalize_user(raw: RawUser, format: &DateFormat) -> Result<User, ApiError> {
    let created_at = format_created_at(&raw.created_at, format)?;
    Ok(User {
        id: raw.id,
        name: raw.name,
        email: raw.email,
        created_at,
    })
}

/// Converts a decoded page, keeping server order.
///
/// A total count smaller than the page itself (typically a missing header) is
/// raised to the page length.
///
/// # Errors
///
/// Returns [`ApiError::Decode`] if any timestamp cannot be read.
pub fn normalize(
    response: UserListResponse,
    format: &DateFormat,
) -> Result<UserListResult, ApiError> {
    let users = response
        .users
        .into_iter()
        .map(|raw| normalize_user(raw, format))
        .collect::<Result<Vec<_>, _>>()?;

    let len = users.len() as u64;
    let total_count = if response.total_count < len {
        tracing::warn!(
            reported = response.total_count,
            on_page = len,
            "total count smaller than page, using page length"
        );
        len
    } else {
        response.total_count
    };

    Ok(UserListResult { users, total_count })
}

/// Requests one page from the server and normalizes it, bypassing the cache.
///
/// # Errors
///
/// Returns the request or decode failure.
pub async fn get_users(
    api: &dyn UsersApi,
    page: Page,
    format: &DateFormat,
) -> Result<UserListResult, QueryError> {
    let response = api.list_users(page).await?;
    Ok(normalize(response, format)?)
}

/// Returns one page through the cache: served from memory when fresh, otherwise
/// loaded (and shared with any concurrent caller for the same page).
///
/// # Errors
///
/// Returns the request or decode failure. Nothing is cached on error.
pub async fn fetch_users(
    client: &QueryClient,
    api: &Arc<dyn UsersApi>,
    page: Page,
    format: &DateFormat,
) -> Result<UserListResult, QueryError> {
    client.fetch(&users_key(page), page_loader(api, page, format)).await
}

fn page_loader(
    api: &Arc<dyn UsersApi>,
    page: Page,
    format: &DateFormat,
) -> impl Fn() -> futures::future::BoxFuture<'static, Result<UserListResult, QueryError>>
+ Send
+ Sync
+ 'static {
    let api = Arc::clone(api);
    let format = format.clone();
    move || {
        let api = Arc::clone(&api);
        let format = format.clone();
        Box::pin(async move { get_users(&*api, page, &format).await })
    }
}

/// A subscription to one page of the user list.
pub fn user_list_query(
    client: Arc<QueryClient>,
    api: &Arc<dyn UsersApi>,
    page: Page,
    format: &DateFormat,
) -> Query<UserListResult> {
    Query::new(users_key(page), page_loader(api, page, format), client)
}
