//! User records: the list query, the create mutation and the create form.

pub mod create;
pub mod form;
pub mod list;
mod model;

use std::sync::Arc;
use std::time::Duration;

pub use form::{Field, FormState, FormValues, ValidationError, ValidationErrors, ValidationStatus};
pub use list::{DateFormat, USERS_TAG, users_key, users_prefix};
pub use model::{NewUser, Page, User, UserListResult};

use crate::api::UsersApi;
use crate::command::Command;
use crate::query::{Query, QueryClient, QueryError};

/// The user operations, bound to one API and one cache for the session.
#[derive(Clone)]
pub struct UsersService {
    api: Arc<dyn UsersApi>,
    client: Arc<QueryClient>,
    date_format: DateFormat,
    submit_delay: Duration,
}

impl UsersService {
    pub fn new(api: Arc<dyn UsersApi>, client: Arc<QueryClient>) -> Self {
        Self {
            api,
            client,
            date_format: DateFormat::default(),
            submit_delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_date_format(mut self, date_format: DateFormat) -> Self {
        self.date_format = date_format;
        self
    }

    /// Waits this long before every submission. Only useful to see the
    /// submitting state while testing the UI.
    #[must_use]
    pub const fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    #[must_use]
    pub const fn client(&self) -> &Arc<QueryClient> {
        &self.client
    }

    /// One page through the cache.
    ///
    /// # Errors
    ///
    /// Returns the request or decode failure.
    pub async fn fetch_page(&self, page: Page) -> Result<UserListResult, QueryError> {
        list::fetch_users(&self.client, &self.api, page, &self.date_format).await
    }

    /// A subscription keeping `page` up to date.
    pub fn page_query(&self, page: Page) -> Query<UserListResult> {
        list::user_list_query(Arc::clone(&self.client), &self.api, page, &self.date_format)
    }

    /// Creates a user and invalidates the list.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection; the cache is untouched in that case.
    pub async fn create(&self, user: NewUser) -> Result<User, QueryError> {
        create::create_user(&*self.api, &self.client, user, &self.date_format).await
    }

    /// [`create`](Self::create) as a command, after the configured delay.
    pub fn submit(&self, user: NewUser) -> Command<Result<User, QueryError>> {
        create::submit(
            Arc::clone(&self.api),
            Arc::clone(&self.client),
            user,
            self.date_format.clone(),
            self.submit_delay,
        )
    }
}

impl std::fmt::Debug for UsersService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsersService")
            .field("client", &self.client)
            .field("date_format", &self.date_format)
            .field("submit_delay", &self.submit_delay)
            .finish_non_exhaustive()
    }
}
