use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::{Client, Response};

use crate::users::{NewUser, Page};

use super::ApiError;
use super::wire::{
    CreateUserBody, CreateUserFields, CreatedUserBody, RawUser, UserListBody, UserListResponse,
    decode, total_count,
};

/// The backend operations the dashboard depends on.
///
/// Futures are `'static` so they can be handed to the cache and to detached
/// commands without borrowing the client.
pub trait UsersApi: Send + Sync + 'static {
    /// `GET /users?page=<n>`.
    fn list_users(&self, page: Page) -> BoxFuture<'static, Result<UserListResponse, ApiError>>;

    /// `POST /users`. Any 2xx answer is a created user, even if its body cannot
    /// be read.
    fn create_user(&self, user: NewUser) -> BoxFuture<'static, Result<RawUser, ApiError>>;
}

/// [`UsersApi`] over HTTP with `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpUsersApi {
    client: Client,
    base_url: String,
}

impl HttpUsersApi {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::info!(%base_url, ?timeout, "api client ready");

        Ok(Self { client, base_url })
    }

    /// Joins `path` onto the base URL.
    pub fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Fails with [`ApiError::Status`] on anything but 2xx, keeping the body text
    /// as the server's message.
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), %body, "request rejected");
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

impl UsersApi for HttpUsersApi {
    fn list_users(&self, page: Page) -> BoxFuture<'static, Result<UserListResponse, ApiError>> {
        let request = self
            .client
            .get(self.build_url("users"))
            .query(&[("page", page.get())]);

        async move {
            tracing::debug!(%page, "GET /users");
            let response = Self::check(request.send().await?).await?;
            let total_count = total_count(response.headers());
            let body = response.bytes().await?;
            let UserListBody { users } = decode(&body).inspect_err(|e| {
                tracing::warn!(%page, error = %e, "user list did not decode");
            })?;
            Ok(UserListResponse { users, total_count })
        }
        .boxed()
    }

    fn create_user(&self, user: NewUser) -> BoxFuture<'static, Result<RawUser, ApiError>> {
        let request = self.client.post(self.build_url("users")).json(&CreateUserBody {
            user: CreateUserFields {
                name: &user.name,
                email: &user.email,
                password: &user.password,
            },
        });

        async move {
            tracing::debug!(email = %user.email, "POST /users");
            let response = Self::check(request.send().await?).await?;
            let body = response.bytes().await?;
            match decode::<CreatedUserBody>(&body) {
                Ok(CreatedUserBody { user }) => Ok(user),
                Err(e) => {
                    // Accepted all the same; show what was sent.
                    tracing::warn!(error = %e, "created user did not decode");
                    Ok(RawUser {
                        id: String::new(),
                        name: user.name,
                        email: user.email,
                        created_at: String::new(),
                    })
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let api = HttpUsersApi::new("http://localhost:3000/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(api.build_url("users"), "http://localhost:3000/api/users");
        assert_eq!(api.build_url("/users"), "http://localhost:3000/api/users");
    }
}
