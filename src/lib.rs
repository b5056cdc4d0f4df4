//! # Roster
//!
//! A terminal admin dashboard for user records, served by a paginated REST API.
//!
//! The crate has three layers:
//!
//! - A small Elm-style runtime: an [`Application`](application::Application)
//!   owns its state, turns messages into new state plus [`Command`](command::Command)s,
//!   and declares [`Subscription`](subscription::Subscription)s that the
//!   [`Runtime`](runtime::Runtime) starts and stops as the state changes.
//! - A query cache ([`query`]) that deduplicates concurrent loads per key, keeps
//!   results until they are invalidated, and pushes fresh data to every watcher.
//! - The user domain ([`users`] over [`api`]) and the [`dashboard`] that ties it
//!   together on screen.
//!
//! ```no_run
//! use std::num::NonZeroU32;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use roster::api::HttpUsersApi;
//! use roster::dashboard::{Dashboard, DashboardFlags};
//! use roster::query::QueryClient;
//! use roster::runtime::Runtime;
//! use roster::users::UsersService;
//!
//! # #[tokio::main]
//! # async fn main() -> color_eyre::Result<()> {
//! let api = HttpUsersApi::new("http://localhost:3000/api", Duration::from_secs(30))?;
//! let users = UsersService::new(Arc::new(api), Arc::new(QueryClient::new()));
//! let flags = DashboardFlags {
//!     users,
//!     page_size: NonZeroU32::MIN.saturating_add(9),
//!     profile_name: "Admin".to_string(),
//!     api_url: "http://localhost:3000/api".to_string(),
//! };
//!
//! let mut terminal = ratatui::init();
//! let result = Runtime::<Dashboard>::new(flags).run(&mut terminal, 30).await;
//! ratatui::restore();
//! result
//! # }
//! ```

pub mod api;
pub mod application;
pub mod command;
pub mod config;
pub mod dashboard;
pub mod prelude;
pub mod query;
pub mod runtime;
pub mod subscription;
pub mod users;
