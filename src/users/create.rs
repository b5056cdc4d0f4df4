//! The create-user mutation.

use std::sync::Arc;
use std::time::Duration;

use crate::api::UsersApi;
use crate::command::Command;
use crate::query::{Mutation, QueryClient, QueryError};

use super::list::{DateFormat, format_created_at, users_prefix};
use super::model::{NewUser, User};

/// Submits `user`, then marks every cached list page stale.
///
/// The invalidation only runs once the server has acknowledged the write; a
/// rejected submission leaves the cache exactly as it was. Once acknowledged the
/// write counts as done: a creation date that cannot be read is shown as sent.
///
/// # Errors
///
/// Returns the server's rejection.
pub async fn create_user(
    api: &dyn UsersApi,
    client: &QueryClient,
    user: NewUser,
    format: &DateFormat,
) -> Result<User, QueryError> {
    let created = api.create_user(user).await.inspect_err(|e| {
        tracing::warn!(error = %e, "create user rejected");
    })?;

    let stale = client.invalidate(&users_prefix());
    tracing::info!(id = %created.id, stale, "user created");

    let created_at = format_created_at(&created.created_at, format).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "created user has an unreadable date");
        created.created_at.clone()
    });
    Ok(User {
        id: created.id,
        name: created.name,
        email: created.email,
        created_at,
    })
}

/// [`create_user`] as a command, preceded by `delay` when it is non-zero.
///
/// The command runs detached from the view, so leaving the form does not cancel
/// the submission.
pub fn submit(
    api: Arc<dyn UsersApi>,
    client: Arc<QueryClient>,
    user: NewUser,
    format: DateFormat,
    delay: Duration,
) -> Command<Result<User, QueryError>> {
    Mutation::mutate(user, move |user| {
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            create_user(&*api, &client, user, &format).await
        })
    })
}
